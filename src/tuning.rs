//! Gameplay tuning
//!
//! All movement and timing constants in one serializable struct. Loaded from
//! JSON overrides; missing fields fall back to the defaults.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::SimError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    // === Player ===
    /// Horizontal speed while walking, jumping and falling (px/tick)
    pub walk_speed: i32,
    /// Ascent per tick, indexed by elapsed jump ticks
    pub jump_speeds: Vec<i32>,
    /// Descent per tick, indexed by elapsed fall ticks (last entry repeats)
    pub fall_speeds: Vec<i32>,
    /// Crouch duration after landing
    pub land_ticks: u32,
    /// Turn animation duration
    pub turn_ticks: u32,
    /// Teleport fade duration (out and in)
    pub teleport_ticks: u32,

    // === Death ===
    /// Ticks after death during which extra explosions spawn
    pub death_effect_ticks: u32,
    /// Kill timer threshold before respawning at the checkpoint
    pub death_respawn_ticks: u32,

    // === Progress ===
    pub max_power: u8,
    /// Collected items needed before the exit opens
    pub exit_required_items: u32,

    // === Other entities ===
    pub enemy_speed: i32,
    pub rocket_speed: i32,
    pub bullet_speed: i32,
    pub shot_speed: i32,
    /// Base shot lifetime; each power level adds `shot_range_per_power`
    pub shot_ticks: u32,
    pub shot_range_per_power: u32,
    /// Ticks between cannon shots (before jitter)
    pub cannon_period: u32,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            walk_speed: 8,
            jump_speeds: vec![16, 16, 14, 12, 10, 8, 6, 4, 2, 0],
            fall_speeds: vec![2, 4, 6, 8, 10, 12, 14, 16],
            land_ticks: 2,
            turn_ticks: 2,
            teleport_ticks: 6,

            death_effect_ticks: 10,
            death_respawn_ticks: 40,

            max_power: 5,
            exit_required_items: 3,

            enemy_speed: 4,
            rocket_speed: 6,
            bullet_speed: 12,
            shot_speed: 16,
            shot_ticks: 8,
            shot_range_per_power: 4,
            cannon_period: 40,
        }
    }
}

impl Tuning {
    /// Parse tuning overrides from JSON
    pub fn from_json(json: &str) -> Result<Self, SimError> {
        let tuning: Self = serde_json::from_str(json)?;
        tuning.validate()?;
        Ok(tuning)
    }

    /// Load tuning overrides from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SimError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        log::info!("Loaded tuning from {}", path.display());
        Self::from_json(&json)
    }

    /// Check the resolver preconditions hold for every configured speed
    pub fn validate(&self) -> Result<(), SimError> {
        if self.jump_speeds.is_empty() || self.fall_speeds.is_empty() {
            return Err(SimError::InvalidTuning("speed tables must not be empty".into()));
        }
        let speeds = [
            ("walk_speed", self.walk_speed),
            ("enemy_speed", self.enemy_speed),
            ("rocket_speed", self.rocket_speed),
            ("bullet_speed", self.bullet_speed),
            ("shot_speed", self.shot_speed),
        ];
        for (name, speed) in speeds {
            if speed % 2 != 0 || speed < 0 {
                return Err(SimError::InvalidTuning(format!("{name} must be even and positive")));
            }
        }
        let mut tables = self.jump_speeds.iter().chain(&self.fall_speeds);
        if tables.any(|s| s % 2 != 0 || *s < 0) {
            return Err(SimError::InvalidTuning("table speeds must be even and positive".into()));
        }
        if self.max_power == 0 {
            return Err(SimError::InvalidTuning("max_power must be at least 1".into()));
        }
        Ok(())
    }

    /// Fall speed for the given elapsed fall tick
    pub fn fall_speed(&self, index: usize) -> i32 {
        self.fall_speeds
            .get(index)
            .or(self.fall_speeds.last())
            .copied()
            .unwrap_or(0)
    }

    /// Jump ascent for the given elapsed jump tick (0 past the end of the table)
    pub fn jump_speed(&self, index: usize) -> i32 {
        self.jump_speeds.get(index).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(Tuning::default().validate().is_ok());
    }

    #[test]
    fn test_partial_override() {
        let tuning = Tuning::from_json(r#"{ "walk_speed": 6, "exit_required_items": 1 }"#).unwrap();
        assert_eq!(tuning.walk_speed, 6);
        assert_eq!(tuning.exit_required_items, 1);
        assert_eq!(tuning.land_ticks, 2);
    }

    #[test]
    fn test_odd_speed_rejected() {
        let result = Tuning::from_json(r#"{ "walk_speed": 7 }"#);
        assert!(matches!(result, Err(SimError::InvalidTuning(_))));
    }

    #[test]
    fn test_table_lookup() {
        let tuning = Tuning::default();
        assert_eq!(tuning.fall_speed(0), 2);
        assert_eq!(tuning.fall_speed(100), 16);
        assert_eq!(tuning.jump_speed(0), 16);
        assert_eq!(tuning.jump_speed(100), 0);
    }
}
