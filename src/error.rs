//! Crate error type
//!
//! Every variant except the I/O and JSON wrappers is a precondition
//! violation: a caller or data bug, never an expected runtime condition.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("screen index {0} outside 0..=255")]
    ScreenOutOfRange(usize),

    #[error("movement offset ({x}, {y}) is not a multiple of 2")]
    OddOffset { x: i32, y: i32 },

    #[error("screen {0} is empty")]
    EmptyScreen(usize),

    #[error("level has no populated screen")]
    NoStartScreen,

    #[error("invalid tuning: {0}")]
    InvalidTuning(String),

    #[error("invalid sprite {index}: {reason}")]
    InvalidSprite { index: usize, reason: String },

    #[error("invalid level: {0}")]
    InvalidLevel(String),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
