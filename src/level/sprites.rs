//! Sprite status tables
//!
//! A sprite set holds 64 sprites; each used sprite carries 8 status bytes
//! describing its flags, behavior, touch kind and collision box.

use std::collections::HashMap;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::SimError;
use crate::sim::entity::{Bank, BehaviorKind, Frame, SpriteFlags, SpriteRef, TouchKind};
use crate::sim::geom::{Rect, Sides};

/// Sprites per set
pub const SET_SIZE: usize = 64;
/// Status bytes per sprite
pub const STATUS_BYTES: usize = 8;

/// One sprite set as stored on disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpriteSetDesc {
    #[serde(rename = "used table")]
    pub used: Vec<bool>,
    #[serde(rename = "status table")]
    pub status: Vec<u8>,
}

impl Default for SpriteSetDesc {
    fn default() -> Self {
        Self::new()
    }
}

impl SpriteSetDesc {
    /// Empty set: no sprite used
    pub fn new() -> Self {
        Self {
            used: vec![false; SET_SIZE],
            status: vec![0; SET_SIZE * STATUS_BYTES],
        }
    }

    pub fn from_json(json: &str) -> Result<Self, SimError> {
        let set: Self = serde_json::from_str(json)?;
        set.validate()?;
        Ok(set)
    }

    /// Mark a sprite as used with the given status bytes
    pub fn set_sprite(&mut self, index: usize, status: [u8; STATUS_BYTES]) -> Result<(), SimError> {
        if index >= SET_SIZE {
            return Err(SimError::InvalidSprite {
                index,
                reason: format!("outside 0..{}", SET_SIZE),
            });
        }
        self.used[index] = true;
        self.status[index * STATUS_BYTES..(index + 1) * STATUS_BYTES].copy_from_slice(&status);
        Ok(())
    }

    /// Status bytes of a used sprite
    pub fn status(&self, index: usize) -> Option<[u8; STATUS_BYTES]> {
        if !self.used.get(index).copied().unwrap_or(false) {
            return None;
        }
        let bytes = self.status.get(index * STATUS_BYTES..(index + 1) * STATUS_BYTES)?;
        let mut status = [0; STATUS_BYTES];
        status.copy_from_slice(bytes);
        Some(status)
    }

    pub fn validate(&self) -> Result<(), SimError> {
        if self.used.len() != SET_SIZE || self.status.len() != SET_SIZE * STATUS_BYTES {
            return Err(SimError::InvalidLevel(format!(
                "sprite set needs {} used entries and {} status bytes, got {} and {}",
                SET_SIZE,
                SET_SIZE * STATUS_BYTES,
                self.used.len(),
                self.status.len()
            )));
        }
        Ok(())
    }
}

/// Decoded status of one sprite
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpriteInfo {
    pub flags: SpriteFlags,
    /// Behavior code (low 5 bits of byte 1)
    pub action: u8,
    /// Frame-cycle mode (high 3 bits of byte 1)
    pub aux: u8,
    pub param: u8,
    pub touch: u8,
    /// Box relative to the tile, in doubled-resolution pixels
    pub bbox: Rect,
    pub sides: Sides,
}

impl SpriteInfo {
    pub fn from_status(status: [u8; STATUS_BYTES]) -> Self {
        let coord = |i: usize| (status[i] & 0x7F) as i32 * 2;
        let (left, right, top, bottom) = (coord(4), coord(5), coord(6), coord(7));
        // Bit 7 set means the side lets things through
        let solid = |i: usize| status[i] & 0x80 == 0;

        Self {
            flags: SpriteFlags::from_bits_retain(status[0]),
            action: status[1] & 0x1F,
            aux: (status[1] & 0xE0) >> 5,
            param: status[2],
            touch: status[3],
            bbox: Rect::new(left, top, right - left, bottom - top),
            sides: Sides {
                left: solid(4),
                right: solid(5),
                top: solid(6),
                bottom: solid(7),
            },
        }
    }

    pub fn behavior(&self) -> BehaviorKind {
        BehaviorKind::from_action(self.action)
    }

    pub fn touch_kind(&self) -> TouchKind {
        TouchKind::from_code(self.touch)
    }

    /// Plain solid block: active bit only and no behavior
    pub fn is_collision(&self) -> bool {
        self.flags.bits() == SpriteFlags::ACTIVE.bits() && self.action == 0
    }

    pub fn is_active(&self) -> bool {
        self.flags.contains(SpriteFlags::ACTIVE)
    }

    fn frame(&self, index: u8) -> Frame {
        Frame {
            sprite: SpriteRef::new(Bank::Level, index),
            bbox: self.bbox,
            sides: self.sides,
            flags: self.flags,
        }
    }
}

/// Level sprite lookup: indices below 64 resolve in the first set, the rest
/// in the second
#[derive(Debug, Clone)]
pub struct SpriteTable {
    infos: Vec<Option<SpriteInfo>>,
    frames: HashMap<u8, Rc<[Frame]>>,
}

impl SpriteTable {
    pub fn new(first: &SpriteSetDesc, second: &SpriteSetDesc) -> Result<Self, SimError> {
        first.validate()?;
        second.validate()?;

        let infos: Vec<_> = (0..SET_SIZE)
            .map(|i| first.status(i))
            .chain((0..SET_SIZE).map(|i| second.status(i)))
            .map(|status| status.map(SpriteInfo::from_status))
            .collect();
        log::info!(
            "Sprite table loaded: {} sprites",
            infos.iter().filter(|info| info.is_some()).count()
        );

        Ok(Self {
            infos,
            frames: HashMap::new(),
        })
    }

    /// Status of a used sprite
    pub fn info(&self, index: u8) -> Result<SpriteInfo, SimError> {
        self.infos
            .get(index as usize)
            .copied()
            .flatten()
            .ok_or_else(|| SimError::InvalidSprite {
                index: index as usize,
                reason: "sprite not used".into(),
            })
    }

    /// Animation frames starting at `index`
    ///
    /// A sprite flagged first-frame runs through the following sprites of the
    /// same set up to the one flagged last-frame; any other sprite is a single
    /// frame. Results are cached so entities built from the same sprite share
    /// their frame list.
    pub fn frames(&mut self, index: u8) -> Result<Rc<[Frame]>, SimError> {
        if let Some(frames) = self.frames.get(&index) {
            return Ok(Rc::clone(frames));
        }

        let info = self.info(index)?;
        let mut frames = vec![info.frame(index)];
        if info.flags.contains(SpriteFlags::FIRST_FRAME)
            && !info.flags.contains(SpriteFlags::LAST_FRAME)
        {
            let set_end = (index as usize / SET_SIZE + 1) * SET_SIZE;
            let mut next = index as usize + 1;
            loop {
                if next >= set_end {
                    return Err(SimError::InvalidSprite {
                        index: index as usize,
                        reason: "animation has no last frame".into(),
                    });
                }
                let info = self.info(next as u8)?;
                frames.push(info.frame(next as u8));
                if info.flags.contains(SpriteFlags::LAST_FRAME) {
                    break;
                }
                next += 1;
            }
        }

        let frames: Rc<[Frame]> = frames.into();
        self.frames.insert(index, Rc::clone(&frames));
        Ok(frames)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_decoding() {
        // Box 4..20 × 0..24 (halved), left side passable
        let info = SpriteInfo::from_status([0xC0, 0x4F, 7, 3, 0x84, 20, 0, 24]);
        assert_eq!(info.flags, SpriteFlags::ACTIVE | SpriteFlags::TOUCHABLE);
        assert_eq!(info.action, 15);
        assert_eq!(info.aux, 2);
        assert_eq!(info.param, 7);
        assert_eq!(info.touch_kind(), TouchKind::Checkpoint);
        assert_eq!(info.bbox, Rect::new(8, 0, 32, 48));
        assert!(!info.sides.left);
        assert!(info.sides.right && info.sides.top && info.sides.bottom);
        assert_eq!(info.behavior(), BehaviorKind::Exit);
    }

    #[test]
    fn test_classification() {
        assert!(SpriteInfo::from_status([0x80, 0, 0, 0, 0, 24, 0, 24]).is_collision());
        let shootable = SpriteInfo::from_status([0xA0, 0, 0, 0, 0, 24, 0, 24]);
        assert!(!shootable.is_collision());
        assert!(shootable.is_active());
        assert!(!SpriteInfo::from_status([0x00, 0, 0, 0, 0, 24, 0, 24]).is_active());
    }

    #[test]
    fn test_set_json_keys() {
        let mut set = SpriteSetDesc::new();
        set.set_sprite(3, [0x80, 0, 0, 0, 0, 24, 0, 24]).unwrap();
        let json = serde_json::to_string(&set).unwrap();
        assert!(json.contains("\"used table\""));
        assert!(json.contains("\"status table\""));
        assert_eq!(SpriteSetDesc::from_json(&json).unwrap(), set);
    }

    #[test]
    fn test_set_rejects_short_tables() {
        let json = r#"{"used table": [true], "status table": [0, 0]}"#;
        assert!(matches!(SpriteSetDesc::from_json(json), Err(SimError::InvalidLevel(_))));
    }

    #[test]
    fn test_second_set_offset() {
        let mut second = SpriteSetDesc::new();
        second.set_sprite(1, [0x80, 0, 0, 0, 0, 24, 0, 24]).unwrap();
        let table = SpriteTable::new(&SpriteSetDesc::new(), &second).unwrap();
        assert!(table.info(65).is_ok());
        assert!(matches!(table.info(1), Err(SimError::InvalidSprite { index: 1, .. })));
    }

    #[test]
    fn test_animation_frames_grouped_and_shared() {
        let mut first = SpriteSetDesc::new();
        first.set_sprite(10, [0x81, 1, 0, 0, 0, 24, 0, 24]).unwrap();
        first.set_sprite(11, [0x80, 1, 0, 0, 0, 24, 0, 24]).unwrap();
        first.set_sprite(12, [0x82, 1, 0, 0, 0, 24, 0, 24]).unwrap();
        let mut table = SpriteTable::new(&first, &SpriteSetDesc::new()).unwrap();

        let frames = table.frames(10).unwrap();
        let indices: Vec<u8> = frames.iter().map(|f| f.sprite.index).collect();
        assert_eq!(indices, vec![10, 11, 12]);
        assert!(Rc::ptr_eq(&frames, &table.frames(10).unwrap()));

        // Mid-animation sprites stand alone
        assert_eq!(table.frames(11).unwrap().len(), 1);
    }

    #[test]
    fn test_unterminated_animation() {
        let mut first = SpriteSetDesc::new();
        first.set_sprite(62, [0x81, 1, 0, 0, 0, 24, 0, 24]).unwrap();
        first.set_sprite(63, [0x80, 1, 0, 0, 0, 24, 0, 24]).unwrap();
        let mut table = SpriteTable::new(&first, &SpriteSetDesc::new()).unwrap();
        assert!(matches!(table.frames(62), Err(SimError::InvalidSprite { index: 62, .. })));
    }
}
