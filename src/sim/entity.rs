//! Entity model
//!
//! One entity type for every screen object. Behavior variety comes from the
//! tagged [`BehaviorKind`] and [`TouchKind`], dispatched through the tables in
//! `behavior`.

use std::rc::Rc;

use bitflags::bitflags;
use glam::IVec2;
use serde::{Deserialize, Serialize};

use super::geom::{Direction, Rect, Sides};
use crate::consts::{SCREEN_X, SPRITE_X, SPRITE_Y};

bitflags! {
    /// Sprite status flags (first status byte)
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct SpriteFlags: u8 {
        const ACTIVE = 0x80;
        const TOUCHABLE = 0x40;
        const SHOOTABLE = 0x20;
        const STAYS_ACTIVE = 0x10;
        const DESTROYABLE = 0x08;
        const IN_FRONT = 0x04;
        const LAST_FRAME = 0x02;
        const FIRST_FRAME = 0x01;
    }
}

/// Sprite bank a [`SpriteRef`] indexes into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Bank {
    /// Level sprite sets (0..64 first set, 64..128 second set)
    Level,
    Hero,
    Weapons,
}

/// Renderer-facing sprite handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SpriteRef {
    pub bank: Bank,
    pub index: u8,
}

impl SpriteRef {
    pub const fn new(bank: Bank, index: u8) -> Self {
        Self { bank, index }
    }
}

/// One animation frame: image handle, box relative to the entity position,
/// and per-side collision flags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    pub sprite: SpriteRef,
    pub bbox: Rect,
    pub sides: Sides,
    pub flags: SpriteFlags,
}

/// Per-tick behavior of an active object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BehaviorKind {
    /// Inert (background, collisions, unknown actions)
    #[default]
    Static,
    Cycle,
    CyclePlus,
    Pulse,
    PulsePlus,
    Monitor,
    Display,
    Flash,
    FlashPlus,
    FlashSpecial,
    RocketUp,
    RocketDown,
    KillingFloor,
    Checkpoint,
    Teleport,
    Exit,
    Enemy,
    Cannon(Direction),
    /// Player projectile
    Shot(Direction),
    /// Cannon projectile
    Bullet(Direction),
    Explosion,
    /// Remains of a destroyed obstacle
    Debris,
}

impl BehaviorKind {
    /// Map a sprite action code to a behavior
    pub fn from_action(action: u8) -> Self {
        match action {
            0 => BehaviorKind::Static,
            1 => BehaviorKind::Cycle,
            2 => BehaviorKind::Pulse,
            3 => BehaviorKind::Monitor,
            4 => BehaviorKind::Display,
            5 => BehaviorKind::CyclePlus,
            6 => BehaviorKind::PulsePlus,
            7 => BehaviorKind::Flash,
            9 => BehaviorKind::RocketUp,
            10 => BehaviorKind::RocketDown,
            11 => BehaviorKind::KillingFloor,
            12 => BehaviorKind::Checkpoint,
            13 => BehaviorKind::Teleport,
            14 => BehaviorKind::FlashPlus,
            15 => BehaviorKind::Exit,
            16 => BehaviorKind::Enemy,
            17 => BehaviorKind::Cannon(Direction::Left),
            18 => BehaviorKind::Cannon(Direction::Right),
            19 => BehaviorKind::Cannon(Direction::Up),
            20 => BehaviorKind::Cannon(Direction::Down),
            21 => BehaviorKind::FlashSpecial,
            _ => BehaviorKind::Display,
        }
    }
}

/// What happens when the player touches an object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TouchKind {
    #[default]
    None,
    /// Power pickup
    Battery,
    Teleport,
    Checkpoint,
    /// Hazard
    Killer,
    /// Collectible item counted towards the exit
    Floppy,
    Exit,
    SpecialGood,
    SpecialBad,
}

impl TouchKind {
    pub fn from_code(code: u8) -> Self {
        match code {
            1 => TouchKind::Battery,
            2 => TouchKind::Teleport,
            3 => TouchKind::Checkpoint,
            4 => TouchKind::Killer,
            5 => TouchKind::Floppy,
            6 => TouchKind::Exit,
            7 => TouchKind::SpecialGood,
            8 => TouchKind::SpecialBad,
            _ => TouchKind::None,
        }
    }

    /// Pickups disappear for good once collected
    pub fn is_pickup(self) -> bool {
        matches!(self, TouchKind::Battery | TouchKind::Floppy | TouchKind::SpecialGood)
    }
}

/// Renderer surface
pub trait Canvas {
    fn draw_sprite(&mut self, sprite: SpriteRef, position: IVec2);

    /// Debug collision outline
    fn draw_box(&mut self, _bbox: Rect, _sides: Sides) {}
}

/// Draw call postponed until the whole active layer is drawn
pub type DeferredDraw = Box<dyn FnOnce(&mut dyn Canvas)>;

/// A positioned, animated, collidable screen object
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    /// Animation frames (never empty)
    pub frames: Rc<[Frame]>,
    pub frame: usize,
    /// Top-left position
    pub position: IVec2,
    /// Position in the level repository; identifies the object for persistence
    pub origin: IVec2,
    /// Countdown for delayed/periodic actions
    pub timer: i32,
    /// Behavior scratch value (direction, step, lifetime)
    pub counter: i32,
    pub behavior: BehaviorKind,
    pub touch: TouchKind,
    pub param: u8,
}

impl Entity {
    pub fn new(frames: Rc<[Frame]>, position: IVec2) -> Self {
        assert!(!frames.is_empty(), "entity needs at least one frame");
        Self {
            frames,
            frame: 0,
            position,
            origin: position,
            timer: 0,
            counter: 0,
            behavior: BehaviorKind::Static,
            touch: TouchKind::None,
            param: 0,
        }
    }

    pub fn with_behavior(mut self, behavior: BehaviorKind, touch: TouchKind, param: u8) -> Self {
        self.behavior = behavior;
        self.touch = touch;
        self.param = param;
        self
    }

    #[inline]
    pub fn current_frame(&self) -> &Frame {
        &self.frames[self.frame]
    }

    /// Bounding box of the current frame in screen coordinates
    #[inline]
    pub fn bbox(&self) -> Rect {
        self.current_frame().bbox.offset(self.position)
    }

    #[inline]
    pub fn sides(&self) -> Sides {
        self.current_frame().sides
    }

    /// Top edge of the current box in screen coordinates
    #[inline]
    pub fn top(&self) -> i32 {
        self.bbox().top()
    }

    #[inline]
    pub fn flags(&self) -> SpriteFlags {
        self.current_frame().flags
    }

    pub fn is_touchable(&self) -> bool {
        self.flags().contains(SpriteFlags::TOUCHABLE)
    }

    pub fn is_shootable(&self) -> bool {
        self.flags().contains(SpriteFlags::SHOOTABLE)
    }

    pub fn is_destroyable(&self) -> bool {
        self.flags().contains(SpriteFlags::DESTROYABLE)
    }

    pub fn is_in_front(&self) -> bool {
        self.flags().contains(SpriteFlags::IN_FRONT)
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Step to the next frame, wrapping
    pub fn advance_frame(&mut self) {
        self.frame = (self.frame + 1) % self.frames.len();
    }

    /// Tile cell of the repository position, used to key per-object jitter
    pub fn cell(&self) -> usize {
        let col = self.origin.x.div_euclid(SPRITE_X);
        let row = self.origin.y.div_euclid(SPRITE_Y);
        (row * SCREEN_X + col).max(0) as usize
    }

    /// Draw now, or hand back a deferred call for front-layer objects
    pub fn draw(&self, canvas: &mut dyn Canvas) -> Option<DeferredDraw> {
        let sprite = self.current_frame().sprite;
        let position = self.position;
        if self.is_in_front() {
            return Some(Box::new(move |canvas: &mut dyn Canvas| {
                canvas.draw_sprite(sprite, position)
            }));
        }
        canvas.draw_sprite(sprite, position);
        None
    }
}
