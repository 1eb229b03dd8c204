//! Checkpoint / progress snapshot
//!
//! The core only knows what to save; where it is stored is up to the caller.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::SimError;
use crate::sim::state::{Checkpoint, GameState};

/// Progress that survives a restart
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SaveData {
    pub checkpoint: Checkpoint,
    pub items_collected: u32,
    pub power: u8,
}

impl SaveData {
    pub fn from_state(state: &GameState) -> Self {
        Self {
            checkpoint: state.checkpoint(),
            items_collected: state.items_collected(),
            power: state.power(),
        }
    }

    /// Write the snapshot back; power is clamped to the tuning maximum
    pub fn apply(&self, state: &mut GameState) {
        state.set_checkpoint(self.checkpoint);
        state.set_items_collected(self.items_collected);
        state.set_power(self.power);
        log::info!(
            "Restored progress: screen {} with {} items, power {}",
            self.checkpoint.screen,
            self.items_collected,
            state.power()
        );
    }

    pub fn to_json(&self) -> Result<String, SimError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, SimError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), SimError> {
        let path = path.as_ref();
        std::fs::write(path, self.to_json()?)?;
        log::info!("Saved progress to {}", path.display());
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, SimError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}
