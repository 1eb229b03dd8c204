//! Level description → screen repository
//!
//! A level names two sprite sets and lays out up to 256 screens, each with up
//! to four 13×8 layers of sprite indices. [`build_level`] turns that layout
//! into the populated [`Level`] the simulation runs on.

pub mod sprites;

use std::path::Path;

use glam::IVec2;
use serde::{Deserialize, Serialize};

use crate::SimError;
use crate::consts::{LEVEL_SCREENS, SCREEN_X, SCREEN_Y, SPRITE_X, SPRITE_Y};
use crate::sim::entity::{BehaviorKind, Entity, TouchKind};
use crate::sim::screen::{Level, Screen};

pub use sprites::{SET_SIZE, STATUS_BYTES, SpriteInfo, SpriteSetDesc, SpriteTable};

/// Layers per screen
pub const LAYERS: usize = 4;
/// Sprite indices per layer
pub const LAYER_SIZE: usize = (SCREEN_X * SCREEN_Y) as usize;

/// One layer of sprite indices, row-major; 0 is empty
pub type Layer = Vec<u8>;

/// Level layout as stored on disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelDesc {
    /// Names of the two sprite sets
    pub names: Vec<String>,
    /// 256 slots; `None` is an absent room, a `None` layer is empty
    pub screens: Vec<Option<Vec<Option<Layer>>>>,
}

impl LevelDesc {
    pub fn new(first_set: &str, second_set: &str) -> Self {
        Self {
            names: vec![first_set.to_string(), second_set.to_string()],
            screens: vec![None; LEVEL_SCREENS],
        }
    }

    pub fn from_json(json: &str) -> Result<Self, SimError> {
        let desc: Self = serde_json::from_str(json)?;
        desc.validate()?;
        Ok(desc)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, SimError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        log::info!("Loaded level description from {}", path.display());
        Self::from_json(&json)
    }

    /// Place a sprite index at tile `(col, row)` of a screen layer, creating
    /// the screen and layer as needed
    pub fn set_tile(
        &mut self,
        screen: usize,
        layer: usize,
        col: usize,
        row: usize,
        sprite: u8,
    ) -> Result<(), SimError> {
        if screen >= LEVEL_SCREENS {
            return Err(SimError::ScreenOutOfRange(screen));
        }
        if layer >= LAYERS || col >= SCREEN_X as usize || row >= SCREEN_Y as usize {
            return Err(SimError::InvalidLevel(format!(
                "tile ({}, {}) on layer {} outside the screen",
                col, row, layer
            )));
        }
        let slot = self.screens.get_mut(screen).ok_or_else(|| {
            SimError::InvalidLevel(format!("level has no slot for screen {}", screen))
        })?;
        let layers = slot.get_or_insert_with(|| vec![None; LAYERS]);
        // Stored screens may list fewer layers
        if layers.len() < LAYERS {
            layers.resize(LAYERS, None);
        }
        let cells = layers[layer].get_or_insert_with(|| vec![0; LAYER_SIZE]);
        let cell = cells.get_mut(row * SCREEN_X as usize + col).ok_or_else(|| {
            SimError::InvalidLevel(format!(
                "screen {} layer {} is not {} tiles",
                screen, layer, LAYER_SIZE
            ))
        })?;
        *cell = sprite;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), SimError> {
        if self.names.len() != 2 {
            return Err(SimError::InvalidLevel(format!(
                "expected 2 sprite set names, got {}",
                self.names.len()
            )));
        }
        if self.screens.len() != LEVEL_SCREENS {
            return Err(SimError::InvalidLevel(format!(
                "expected {} screens, got {}",
                LEVEL_SCREENS,
                self.screens.len()
            )));
        }
        for (index, layers) in self.screens.iter().enumerate() {
            let Some(layers) = layers else { continue };
            if layers.len() > LAYERS {
                return Err(SimError::InvalidLevel(format!(
                    "screen {} has {} layers",
                    index,
                    layers.len()
                )));
            }
            if layers.iter().flatten().any(|cells| cells.len() != LAYER_SIZE) {
                return Err(SimError::InvalidLevel(format!(
                    "screen {} has a layer that is not {} tiles",
                    index, LAYER_SIZE
                )));
            }
        }
        Ok(())
    }
}

/// Convert a level layout into a screen repository
///
/// Plain solid blocks go to the collision layer, other active sprites become
/// active objects with their behavior and touch kind, and everything else is
/// background. Layers are scanned in order, row by row.
pub fn build_level(desc: &LevelDesc, table: &mut SpriteTable) -> Result<Level, SimError> {
    desc.validate()?;
    log::info!("Converting level screens ({} / {})", desc.names[0], desc.names[1]);

    let mut level = Level::new();
    let mut converted = 0;
    for (index, layers) in desc.screens.iter().enumerate() {
        let Some(layers) = layers else { continue };
        level.set_screen(index, build_screen(layers, table)?)?;
        converted += 1;
    }

    log::info!("Conversion done: {} screens converted", converted);
    Ok(level)
}

fn build_screen(layers: &[Option<Layer>], table: &mut SpriteTable) -> Result<Screen, SimError> {
    let mut background = Vec::new();
    let mut collisions = Vec::new();
    let mut active = Vec::new();

    for cells in layers.iter().flatten() {
        for (cell, &sprite) in cells.iter().enumerate() {
            if sprite == 0 {
                continue;
            }
            let col = cell as i32 % SCREEN_X;
            let row = cell as i32 / SCREEN_X;
            let position = IVec2::new(col * SPRITE_X, row * SPRITE_Y);

            let info = table.info(sprite)?;
            let entity = Entity::new(table.frames(sprite)?, position);
            if info.is_collision() {
                collisions.push(entity);
            } else if info.is_active() {
                active.push(entity.with_behavior(info.behavior(), info.touch_kind(), info.param));
            } else {
                background.push(entity.with_behavior(
                    BehaviorKind::Static,
                    TouchKind::None,
                    info.param,
                ));
            }
        }
    }

    Ok(Screen::new(background, collisions, active))
}
