//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Per-screen seeded jitter only
//! - Stable iteration order (active list order)
//! - No rendering or platform dependencies; drawing goes through [`Canvas`]

pub mod behavior;
pub mod collision;
pub mod entity;
pub mod geom;
pub mod player;
pub mod random;
pub mod screen;
pub mod state;
pub mod tick;

pub use collision::{MoveResult, ground_distance, point_collides, resolve_move, touch_query};
pub use entity::{Bank, BehaviorKind, Canvas, Entity, Frame, SpriteFlags, SpriteRef, TouchKind};
pub use geom::{Direction, Rect, Sides};
pub use player::{Facing, Player, PlayerState};
pub use random::{BorlandRng, ScreenRandom};
pub use screen::{Level, Screen, ScreenManager};
pub use state::{Checkpoint, GameEvent, GamePhase, GameState};
pub use tick::{TickInput, render, tick};
