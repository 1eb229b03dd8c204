//! Game state and core simulation types
//!
//! Everything the tick driver mutates lives in [`GameState`]; there is no
//! global state.

use glam::IVec2;
use serde::{Deserialize, Serialize};

use super::entity::TouchKind;
use super::player::Player;
use super::screen::{Level, ScreenManager};
use crate::{SimError, Tuning};

/// Current phase of gameplay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    /// Active gameplay
    Playing,
    /// Exit reached; ticks no longer advance
    LevelComplete,
}

/// Respawn point: (level, screen, position of the checkpoint object)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Checkpoint {
    pub level: u32,
    pub screen: u8,
    pub position: IVec2,
}

/// Things that happened during a tick, for audio/UI collaborators
#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    PowerUp { power: u8 },
    ItemCollected { total: u32 },
    CheckpointReached(Checkpoint),
    Death,
    Respawn,
    ExitLocked { collected: u32, required: u32 },
    LevelComplete,
    ScreenChanged { from: u8, to: u8 },
    Teleported { screen: u8 },
    ShotFired { power: u8 },
    ObjectDestroyed { screen: u8, position: IVec2 },
}

/// Complete simulation state
#[derive(Debug, Clone)]
pub struct GameState {
    pub tuning: Tuning,
    pub level_id: u32,
    /// Level repository and live screen
    pub screens: ScreenManager,
    pub player: Player,
    pub checkpoint: Checkpoint,
    /// Weapon power (0..=max_power)
    pub power: u8,
    pub items_collected: u32,
    pub phase: GamePhase,
    /// Simulation tick counter
    pub time_ticks: u64,
    /// Events raised by the last tick
    pub events: Vec<GameEvent>,
    /// Draw collision outlines
    pub debug: bool,
    /// Fire input of the previous tick (edge detection)
    pub(crate) prev_fire: bool,
}

impl GameState {
    /// Activate the level's start screen and place the player on its first
    /// checkpoint
    pub fn new(level_id: u32, level: Level, tuning: Tuning) -> Result<Self, SimError> {
        tuning.validate()?;
        let start = level.start().ok_or(SimError::NoStartScreen)?;

        let mut screens = ScreenManager::new(level);
        screens.change_screen(start as usize)?;

        let pad = screens
            .live()
            .and_then(|screen| {
                screen
                    .active
                    .iter()
                    .find(|e| e.touch == TouchKind::Checkpoint)
                    .map(|e| e.origin)
            })
            .unwrap_or_else(|| {
                log::warn!("Start screen {} has no checkpoint; starting at the origin", start);
                IVec2::ZERO
            });

        let checkpoint = Checkpoint {
            level: level_id,
            screen: start,
            position: pad,
        };
        log::info!("Level {} starts on screen {} at {:?}", level_id, start, pad);

        Ok(Self {
            tuning,
            level_id,
            screens,
            player: Player::standing_on(pad),
            checkpoint,
            power: 0,
            items_collected: 0,
            phase: GamePhase::Playing,
            time_ticks: 0,
            events: Vec::new(),
            debug: false,
            prev_fire: false,
        })
    }

    pub fn checkpoint(&self) -> Checkpoint {
        self.checkpoint
    }

    /// Replace the stored checkpoint wholesale
    pub fn set_checkpoint(&mut self, checkpoint: Checkpoint) {
        self.checkpoint = checkpoint;
    }

    pub fn items_collected(&self) -> u32 {
        self.items_collected
    }

    pub fn set_items_collected(&mut self, items: u32) {
        self.items_collected = items;
    }

    pub fn power(&self) -> u8 {
        self.power
    }

    /// Set weapon power, clamped to the tuning maximum
    pub fn set_power(&mut self, power: u8) {
        self.power = power.min(self.tuning.max_power);
    }

    pub fn current_screen(&self) -> u8 {
        self.screens.current_index()
    }
}
