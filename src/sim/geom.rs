//! Integer box geometry
//!
//! Positions use a top-left origin with y growing downward. All collision math
//! is integer; boxes are half-open (`[x, x + w)`).

use glam::IVec2;
use serde::{Deserialize, Serialize};

/// Axis-aligned box in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self { x, y, w, h }
    }

    #[inline]
    pub fn left(&self) -> i32 {
        self.x
    }

    #[inline]
    pub fn right(&self) -> i32 {
        self.x + self.w
    }

    #[inline]
    pub fn top(&self) -> i32 {
        self.y
    }

    #[inline]
    pub fn bottom(&self) -> i32 {
        self.y + self.h
    }

    pub fn center(&self) -> IVec2 {
        IVec2::new(self.x + self.w / 2, self.y + self.h / 2)
    }

    /// Translate by an offset
    #[inline]
    pub fn offset(&self, by: IVec2) -> Self {
        Self::new(self.x + by.x, self.y + by.y, self.w, self.h)
    }

    /// Overlap test; empty boxes never overlap anything
    #[inline]
    pub fn intersects(&self, other: &Rect) -> bool {
        if self.w <= 0 || self.h <= 0 || other.w <= 0 || other.h <= 0 {
            return false;
        }
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }
}

/// Which sides of an obstacle block movement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Sides {
    pub left: bool,
    pub right: bool,
    pub top: bool,
    pub bottom: bool,
}

impl Sides {
    pub const SOLID: Sides = Sides {
        left: true,
        right: true,
        top: true,
        bottom: true,
    };

    pub const NONE: Sides = Sides {
        left: false,
        right: false,
        top: false,
        bottom: false,
    };

    /// Solid from above only (one-way platform)
    pub const PLATFORM: Sides = Sides {
        left: false,
        right: false,
        top: true,
        bottom: false,
    };
}

/// Cardinal direction for movers and cannons
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Left,
    Right,
    Up,
    Down,
}

impl Direction {
    /// Unit vector (screen coordinates)
    pub fn unit(self) -> IVec2 {
        match self {
            Direction::Left => IVec2::new(-1, 0),
            Direction::Right => IVec2::new(1, 0),
            Direction::Up => IVec2::new(0, -1),
            Direction::Down => IVec2::new(0, 1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intersects_half_open() {
        let a = Rect::new(0, 0, 48, 48);
        assert!(a.intersects(&Rect::new(47, 47, 10, 10)));
        // Touching edges do not overlap
        assert!(!a.intersects(&Rect::new(48, 0, 10, 10)));
        assert!(!a.intersects(&Rect::new(0, 48, 10, 10)));
    }

    #[test]
    fn test_empty_box_never_intersects() {
        let a = Rect::new(0, 0, 48, 48);
        assert!(!a.intersects(&Rect::new(10, 10, 0, 10)));
        assert!(!a.intersects(&Rect::new(10, 10, 10, -4)));
    }

    #[test]
    fn test_offset() {
        let r = Rect::new(18, 12, 12, 84).offset(IVec2::new(100, 50));
        assert_eq!(r, Rect::new(118, 62, 12, 84));
        assert_eq!(r.bottom(), 146);
        assert_eq!(r.center(), IVec2::new(124, 104));
    }
}
