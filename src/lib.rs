//! Electroman core - simulation core of a tile-based side-scrolling platformer
//!
//! Core modules:
//! - `sim`: Deterministic simulation (collision resolver, screens, player FSM)
//! - `level`: Sprite status tables and level layouts → screen repository
//! - `persistence`: Checkpoint / collected-item snapshot
//! - `tuning`: Data-driven gameplay constants

pub mod error;
pub mod level;
pub mod persistence;
pub mod sim;
pub mod tuning;

pub use error::SimError;
pub use tuning::Tuning;

/// Geometry constants
pub mod consts {
    /// Tile size in pixels
    pub const SPRITE_X: i32 = 48;
    pub const SPRITE_Y: i32 = 48;
    /// Screen size in tiles
    pub const SCREEN_X: i32 = 13;
    pub const SCREEN_Y: i32 = 8;
    /// Screen size in pixels
    pub const MAX_X: i32 = SPRITE_X * SCREEN_X;
    pub const MAX_Y: i32 = SPRITE_Y * SCREEN_Y;

    /// Level grid: 16×16 screens
    pub const LEVEL_GRID: usize = 16;
    pub const LEVEL_SCREENS: usize = LEVEL_GRID * LEVEL_GRID;

    /// Movement granularity of the collision resolver (pixels)
    pub const MOVE_STEP: i32 = 2;

    /// Returned by ground probes when nothing solid is below
    pub const NO_GROUND: i32 = SCREEN_Y * (SPRITE_Y + 1);
}

use consts::LEVEL_GRID;

/// Screen index to the left, wrapping within the grid row
#[inline]
pub fn screen_left(index: u8) -> u8 {
    let (col, row) = grid_cell(index);
    grid_index((col + LEVEL_GRID - 1) % LEVEL_GRID, row)
}

/// Screen index to the right, wrapping within the grid row
#[inline]
pub fn screen_right(index: u8) -> u8 {
    let (col, row) = grid_cell(index);
    grid_index((col + 1) % LEVEL_GRID, row)
}

/// Screen index above, wrapping within the grid column
#[inline]
pub fn screen_up(index: u8) -> u8 {
    let (col, row) = grid_cell(index);
    grid_index(col, (row + LEVEL_GRID - 1) % LEVEL_GRID)
}

/// Screen index below, wrapping within the grid column
#[inline]
pub fn screen_down(index: u8) -> u8 {
    let (col, row) = grid_cell(index);
    grid_index(col, (row + 1) % LEVEL_GRID)
}

#[inline]
fn grid_cell(index: u8) -> (usize, usize) {
    let index = index as usize;
    (index % LEVEL_GRID, index / LEVEL_GRID)
}

#[inline]
fn grid_index(col: usize, row: usize) -> u8 {
    (row * LEVEL_GRID + col) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_neighbors_wrap() {
        assert_eq!(screen_left(16), 31);
        assert_eq!(screen_right(31), 16);
        assert_eq!(screen_up(3), 243);
        assert_eq!(screen_down(243), 3);
        assert_eq!(screen_right(17), 18);
        assert_eq!(screen_down(17), 33);
    }
}
