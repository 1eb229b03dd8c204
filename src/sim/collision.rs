//! Collision resolver
//!
//! Pure queries against a screen's static obstacles: can an entity move by an
//! offset, how far did it get, and which active objects did it touch on the
//! way. Nothing here mutates level content.
//!
//! Movement is walked in 2-pixel steps along the dominant axis with the minor
//! axis advanced by an accumulated fraction (a Bresenham-style line walk), so
//! a fast mover can never skip over thin geometry.

use glam::IVec2;

use super::entity::Entity;
use super::geom::Rect;
use super::screen::Screen;
use crate::SimError;
use crate::consts::{MAX_Y, MOVE_STEP, NO_GROUND};

/// Initial value of the minor-axis accumulator
const MINOR_BIAS: f64 = 0.01;

/// Outcome of [`resolve_move`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MoveResult {
    /// Largest collision-free part of the requested offset
    pub offset: IVec2,
    /// Indices into the live active list, deduplicated, in first-touch order
    pub touched: Vec<usize>,
}

/// Does `candidate` (an entity box already moved by `direction`) run into an
/// obstacle that blocks that direction of travel?
///
/// Moving right is blocked by an obstacle's left side, left by its right side,
/// down by its top side and up by its bottom side. `ignore_ground` lets the
/// mover pass down through top sides.
pub fn point_collides(
    candidate: Rect,
    direction: IVec2,
    screen: Option<&Screen>,
    ignore_ground: bool,
) -> bool {
    let Some(screen) = screen else {
        return false;
    };
    screen.collisions.iter().any(|obstacle| {
        if !candidate.intersects(&obstacle.bbox()) {
            return false;
        }
        let sides = obstacle.sides();
        (direction.x > 0 && sides.left)
            || (direction.x < 0 && sides.right)
            || (direction.y > 0 && sides.top && !ignore_ground)
            || (direction.y < 0 && sides.bottom)
    })
}

/// Touchable active objects overlapping `bbox`
pub fn touch_query(bbox: Rect, screen: Option<&Screen>) -> Vec<usize> {
    let mut touched = Vec::new();
    collect_touches(bbox, screen, &mut touched);
    touched
}

fn collect_touches(bbox: Rect, screen: Option<&Screen>, touched: &mut Vec<usize>) {
    let Some(screen) = screen else {
        return;
    };
    for (i, obj) in screen.active.iter().enumerate() {
        if obj.is_touchable() && bbox.intersects(&obj.bbox()) && !touched.contains(&i) {
            touched.push(i);
        }
    }
}

/// Move `entity` by up to `offset`, stopping before the first blocked step
///
/// Both offset components must be even. Touches are gathered at the start
/// position and at every step that was taken, so a move that ends blocked
/// still reports what it brushed past.
pub fn resolve_move(
    entity: &Entity,
    offset: IVec2,
    screen: Option<&Screen>,
    ignore_ground: bool,
) -> Result<MoveResult, SimError> {
    if offset.x % MOVE_STEP != 0 || offset.y % MOVE_STEP != 0 {
        return Err(SimError::OddOffset {
            x: offset.x,
            y: offset.y,
        });
    }

    let bbox = entity.bbox();
    let mut touched = touch_query(bbox, screen);
    if offset == IVec2::ZERO {
        return Ok(MoveResult {
            offset: IVec2::ZERO,
            touched,
        });
    }

    // Walk the longer axis; ties walk x
    let swap = offset.x.abs() < offset.y.abs();
    let (major, minor) = if swap {
        (offset.y, offset.x)
    } else {
        (offset.x, offset.y)
    };
    let slope = (minor as f64 / major.abs() as f64) * MOVE_STEP as f64;

    let mut walked = 0;
    let mut accumulator = MINOR_BIAS;
    let mut achieved = IVec2::ZERO;
    for _ in 0..major.abs() / MOVE_STEP {
        walked += MOVE_STEP * major.signum();
        accumulator += slope;
        // Truncate, then clear the low bit (rounds down to even)
        let across = (accumulator as i32) & !1;
        let step = if swap {
            IVec2::new(across, walked)
        } else {
            IVec2::new(walked, across)
        };

        let candidate = bbox.offset(step);
        if point_collides(candidate, step, screen, ignore_ground) {
            break;
        }
        achieved = step;
        collect_touches(candidate, screen, &mut touched);
    }

    Ok(MoveResult {
        offset: achieved,
        touched,
    })
}

/// Distance from the bottom of the entity's box to the nearest solid top below
///
/// Negative when the box already sinks into the ground; [`NO_GROUND`] when
/// nothing solid is in range or no screen is live.
pub fn ground_distance(entity: &Entity, screen: Option<&Screen>) -> i32 {
    ground_distance_at(entity, IVec2::ZERO, screen)
}

/// [`ground_distance`] with the entity shifted by `offset` first
pub fn ground_distance_at(entity: &Entity, offset: IVec2, screen: Option<&Screen>) -> i32 {
    let Some(screen) = screen else {
        return NO_GROUND;
    };
    let bbox = entity.bbox().offset(offset);
    let x = bbox.x + bbox.w / 2;
    // Start 2 px inside the box so sunken boxes still hit
    let y = bbox.bottom() - 2;
    let probe = Rect::new(x, y, 2, MAX_Y - y + 2);

    screen
        .collisions
        .iter()
        .filter(|obstacle| obstacle.sides().top && probe.intersects(&obstacle.bbox()))
        .map(Entity::top)
        .min()
        .map_or(NO_GROUND, |top| top - y - 2)
}
