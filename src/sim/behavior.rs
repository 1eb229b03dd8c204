//! Active-object behaviors
//!
//! Each [`BehaviorKind`] maps to one update function. Updates run once per
//! tick for every admitted active object, against the live screen with its
//! active layer detached. Anything an update spawns goes through the staging
//! queue, so it is drawn this tick but first updated next tick.

use std::rc::Rc;

use glam::IVec2;

use super::collision::{ground_distance, resolve_move};
use super::entity::{Bank, BehaviorKind, Entity, Frame, SpriteFlags, SpriteRef, TouchKind};
use super::geom::{Direction, Rect, Sides};
use super::random::ScreenRandom;
use super::screen::Screen;
use crate::consts::{MAX_X, MAX_Y, SPRITE_X, SPRITE_Y};
use crate::{SimError, Tuning};

/// What the update pass does with an object afterwards
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Keep,
    Remove,
}

/// Shared inputs for one update pass
pub struct UpdateCtx<'a> {
    /// Live screen; its active list is detached while updates run
    pub screen: &'a Screen,
    pub random: &'a ScreenRandom,
    pub tuning: &'a Tuning,
    pub player_box: Rect,
    /// Entities to stage once the pass completes
    pub spawned: Vec<Entity>,
}

pub type UpdateFn = fn(&mut Entity, &mut UpdateCtx<'_>) -> Result<Outcome, SimError>;

impl BehaviorKind {
    /// Dispatch table
    pub fn update_fn(self) -> UpdateFn {
        match self {
            BehaviorKind::Static | BehaviorKind::Debris => update_static,
            BehaviorKind::Cycle
            | BehaviorKind::Monitor
            | BehaviorKind::Display
            | BehaviorKind::KillingFloor
            | BehaviorKind::Checkpoint
            | BehaviorKind::Teleport
            | BehaviorKind::Exit => update_cycle,
            BehaviorKind::CyclePlus => update_cycle_jittered,
            BehaviorKind::Pulse | BehaviorKind::PulsePlus => update_pulse,
            BehaviorKind::Flash | BehaviorKind::FlashPlus | BehaviorKind::FlashSpecial => {
                update_flash
            }
            BehaviorKind::RocketUp | BehaviorKind::RocketDown => update_rocket,
            BehaviorKind::Enemy => update_enemy,
            BehaviorKind::Cannon(_) => update_cannon,
            BehaviorKind::Shot(_) | BehaviorKind::Bullet(_) => update_projectile,
            BehaviorKind::Explosion => update_explosion,
        }
    }
}

/// Run one entity's update
pub fn update(entity: &mut Entity, ctx: &mut UpdateCtx<'_>) -> Result<Outcome, SimError> {
    (entity.behavior.update_fn())(entity, ctx)
}

fn jitter(entity: &Entity, ctx: &UpdateCtx<'_>) -> i32 {
    ctx.random.byte(entity.cell() + entity.counter.unsigned_abs() as usize) as i32
}

fn offscreen(bbox: Rect) -> bool {
    bbox.right() <= 0 || bbox.x >= MAX_X || bbox.bottom() <= 0 || bbox.y >= MAX_Y
}

fn update_static(_entity: &mut Entity, _ctx: &mut UpdateCtx<'_>) -> Result<Outcome, SimError> {
    Ok(Outcome::Keep)
}

fn update_cycle(entity: &mut Entity, _ctx: &mut UpdateCtx<'_>) -> Result<Outcome, SimError> {
    if entity.timer > 0 {
        entity.timer -= 1;
    } else {
        entity.advance_frame();
        entity.timer = entity.param as i32;
    }
    Ok(Outcome::Keep)
}

fn update_cycle_jittered(
    entity: &mut Entity,
    ctx: &mut UpdateCtx<'_>,
) -> Result<Outcome, SimError> {
    if entity.timer > 0 {
        entity.timer -= 1;
    } else {
        entity.advance_frame();
        entity.counter = entity.counter.wrapping_add(1);
        entity.timer = entity.param as i32 + jitter(entity, ctx) % 4;
    }
    Ok(Outcome::Keep)
}

/// Ping-pong through the frames; `counter` holds the step direction
fn update_pulse(entity: &mut Entity, _ctx: &mut UpdateCtx<'_>) -> Result<Outcome, SimError> {
    if entity.timer > 0 {
        entity.timer -= 1;
        return Ok(Outcome::Keep);
    }
    entity.timer = entity.param as i32;
    let last = entity.frame_count() - 1;
    if last == 0 {
        return Ok(Outcome::Keep);
    }
    if entity.counter >= 0 {
        if entity.frame >= last {
            entity.counter = -1;
            entity.frame -= 1;
        } else {
            entity.frame += 1;
        }
    } else if entity.frame == 0 {
        entity.counter = 1;
        entity.frame = 1;
    } else {
        entity.frame -= 1;
    }
    Ok(Outcome::Keep)
}

/// Rest on frame 0, flash the next frame for one tick at jittered intervals
fn update_flash(entity: &mut Entity, ctx: &mut UpdateCtx<'_>) -> Result<Outcome, SimError> {
    if entity.frame != 0 {
        entity.frame = 0;
        return Ok(Outcome::Keep);
    }
    if entity.timer > 0 {
        entity.timer -= 1;
        return Ok(Outcome::Keep);
    }
    if entity.frame_count() > 1 {
        entity.frame = 1;
    }
    entity.counter = entity.counter.wrapping_add(1);
    entity.timer = 8 + jitter(entity, ctx) % 32;
    Ok(Outcome::Keep)
}

/// Wait until the player is in the flight path, then fly until blocked
fn update_rocket(entity: &mut Entity, ctx: &mut UpdateCtx<'_>) -> Result<Outcome, SimError> {
    let up = entity.behavior == BehaviorKind::RocketUp;
    if entity.counter == 0 {
        if entity.timer > 0 {
            entity.timer -= 1;
            return Ok(Outcome::Keep);
        }
        let bbox = entity.bbox();
        let in_column = ctx.player_box.x < bbox.right() && bbox.x < ctx.player_box.right();
        let in_path = if up {
            ctx.player_box.bottom() <= bbox.top()
        } else {
            ctx.player_box.top() >= bbox.bottom()
        };
        if in_column && in_path {
            entity.counter = 1;
        }
        return Ok(Outcome::Keep);
    }

    let speed = if up { -ctx.tuning.rocket_speed } else { ctx.tuning.rocket_speed };
    let request = IVec2::new(0, speed);
    let moved = resolve_move(entity, request, Some(ctx.screen), false)?;
    entity.position += moved.offset;
    entity.advance_frame();
    if moved.offset != request || offscreen(entity.bbox()) {
        entity.position = entity.origin;
        entity.frame = 0;
        entity.counter = 0;
        entity.timer = SPRITE_Y / 2 + jitter(entity, ctx) % 16;
    }
    Ok(Outcome::Keep)
}

/// Patrol horizontally, turning at walls, ledges and screen edges
fn update_enemy(entity: &mut Entity, ctx: &mut UpdateCtx<'_>) -> Result<Outcome, SimError> {
    if entity.counter == 0 {
        entity.counter = 1;
    }
    let request = IVec2::new(entity.counter * ctx.tuning.enemy_speed, 0);
    let grounded = ground_distance(entity, Some(ctx.screen)) <= 0;
    let moved = resolve_move(entity, request, Some(ctx.screen), false)?;
    entity.position += moved.offset;

    let lost_ground = grounded && ground_distance(entity, Some(ctx.screen)) > 0;
    let bbox = entity.bbox();
    let at_edge = bbox.x < 0 || bbox.right() > MAX_X;
    if lost_ground || at_edge {
        entity.position -= moved.offset;
    }
    if moved.offset != request || lost_ground || at_edge {
        entity.counter = -entity.counter;
    }
    entity.advance_frame();
    Ok(Outcome::Keep)
}

fn update_cannon(entity: &mut Entity, ctx: &mut UpdateCtx<'_>) -> Result<Outcome, SimError> {
    let BehaviorKind::Cannon(direction) = entity.behavior else {
        return Ok(Outcome::Keep);
    };
    if entity.timer > 0 {
        entity.timer -= 1;
        return Ok(Outcome::Keep);
    }
    ctx.spawned.push(bullet(entity.position, direction));
    entity.counter = entity.counter.wrapping_add(1);
    entity.timer = ctx.tuning.cannon_period as i32 + jitter(entity, ctx) % 16;
    Ok(Outcome::Keep)
}

/// Shots and bullets fly straight until blocked, off-screen or expired
fn update_projectile(entity: &mut Entity, ctx: &mut UpdateCtx<'_>) -> Result<Outcome, SimError> {
    let (direction, speed, expires) = match entity.behavior {
        BehaviorKind::Shot(direction) => (direction, ctx.tuning.shot_speed, true),
        BehaviorKind::Bullet(direction) => (direction, ctx.tuning.bullet_speed, false),
        _ => return Ok(Outcome::Keep),
    };
    let request = direction.unit() * speed;
    let moved = resolve_move(entity, request, Some(ctx.screen), false)?;
    entity.position += moved.offset;
    entity.advance_frame();

    if moved.offset != request {
        ctx.spawned.push(explosion(entity.position));
        return Ok(Outcome::Remove);
    }
    if offscreen(entity.bbox()) {
        return Ok(Outcome::Remove);
    }
    if expires {
        entity.timer -= 1;
        if entity.timer <= 0 {
            return Ok(Outcome::Remove);
        }
    }
    Ok(Outcome::Keep)
}

fn update_explosion(entity: &mut Entity, _ctx: &mut UpdateCtx<'_>) -> Result<Outcome, SimError> {
    if entity.frame + 1 >= entity.frame_count() {
        return Ok(Outcome::Remove);
    }
    entity.frame += 1;
    Ok(Outcome::Keep)
}

// Weapon sprite bank layout
const EXPLOSION_FRAMES: (u8, u8) = (0, 7);
const BULLET_FRAMES: (u8, u8) = (8, 15);
/// Shot frames per power level: (right, left)
const SHOT_FRAMES: [((u8, u8), (u8, u8)); 5] = [
    ((8, 15), (8, 15)),
    ((16, 19), (20, 23)),
    ((24, 26), (28, 30)),
    ((32, 33), (34, 35)),
    ((36, 37), (38, 39)),
];

const SHOT_BOX: Rect = Rect::new(0, 18, SPRITE_X, 12);
const BULLET_BOX: Rect = Rect::new(12, 18, 24, 12);
const EXPLOSION_BOX: Rect = Rect::new(0, 0, SPRITE_X, SPRITE_Y);

fn weapon_frames(range: (u8, u8), bbox: Rect, flags: SpriteFlags) -> Rc<[Frame]> {
    (range.0..=range.1)
        .map(|index| Frame {
            sprite: SpriteRef::new(Bank::Weapons, index),
            bbox,
            sides: Sides::NONE,
            flags,
        })
        .collect()
}

/// Player shot for a power level (clamped to 1..=5)
pub fn shot(position: IVec2, direction: Direction, power: u8, tuning: &Tuning) -> Entity {
    let level = power.clamp(1, SHOT_FRAMES.len() as u8);
    let (right, left) = SHOT_FRAMES[level as usize - 1];
    let range = if direction == Direction::Left { left } else { right };
    let mut entity = Entity::new(weapon_frames(range, SHOT_BOX, SpriteFlags::ACTIVE), position)
        .with_behavior(BehaviorKind::Shot(direction), TouchKind::None, level);
    entity.timer = (tuning.shot_ticks + tuning.shot_range_per_power * level as u32) as i32;
    entity
}

/// Cannon bullet; deadly to the touch
pub fn bullet(position: IVec2, direction: Direction) -> Entity {
    let flags = SpriteFlags::ACTIVE | SpriteFlags::TOUCHABLE;
    Entity::new(weapon_frames(BULLET_FRAMES, BULLET_BOX, flags), position).with_behavior(
        BehaviorKind::Bullet(direction),
        TouchKind::Killer,
        0,
    )
}

/// One-shot explosion drawn over everything
pub fn explosion(position: IVec2) -> Entity {
    let flags = SpriteFlags::ACTIVE | SpriteFlags::IN_FRONT;
    Entity::new(weapon_frames(EXPLOSION_FRAMES, EXPLOSION_BOX, flags), position)
        .with_behavior(BehaviorKind::Explosion, TouchKind::None, 0)
}

/// Inert remains of a destroyed obstacle: its last frame, no longer
/// touchable or shootable
pub fn debris(destroyed: &Entity) -> Entity {
    let last = destroyed.frames[destroyed.frame_count() - 1];
    let frame = Frame {
        flags: SpriteFlags::ACTIVE,
        sides: Sides::NONE,
        ..last
    };
    let mut entity = Entity::new(Rc::from(vec![frame]), destroyed.position)
        .with_behavior(BehaviorKind::Debris, TouchKind::None, 0);
    entity.origin = destroyed.origin;
    entity
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::entity::tests::tile;

    fn animated(frames: u8, behavior: BehaviorKind, param: u8) -> Entity {
        let frames: Rc<[Frame]> = (0..frames)
            .map(|i| Frame {
                sprite: SpriteRef::new(Bank::Level, i),
                bbox: Rect::new(0, 0, SPRITE_X, SPRITE_Y),
                sides: Sides::NONE,
                flags: SpriteFlags::ACTIVE,
            })
            .collect();
        Entity::new(frames, IVec2::new(96, 96)).with_behavior(behavior, TouchKind::None, param)
    }

    fn run(entity: &mut Entity, screen: &Screen, ticks: usize) -> (Vec<Outcome>, Vec<Entity>) {
        run_with(entity, screen, 1, Rect::new(-500, -500, 1, 1), ticks)
    }

    fn run_with(
        entity: &mut Entity,
        screen: &Screen,
        screen_index: u8,
        player_box: Rect,
        ticks: usize,
    ) -> (Vec<Outcome>, Vec<Entity>) {
        let tuning = Tuning::default();
        let random = ScreenRandom::for_screen(screen_index);
        let mut ctx = UpdateCtx {
            screen,
            random: &random,
            tuning: &tuning,
            player_box,
            spawned: Vec::new(),
        };
        let outcomes = (0..ticks).map(|_| update(entity, &mut ctx).unwrap()).collect();
        (outcomes, ctx.spawned)
    }

    /// Frame index after each of `ticks` updates on the given screen
    fn frames_on(screen_index: u8, behavior: BehaviorKind, ticks: usize) -> Vec<usize> {
        let mut e = animated(2, behavior, 2);
        let screen = Screen::default();
        (0..ticks)
            .map(|_| {
                run_with(&mut e, &screen, screen_index, Rect::new(-500, -500, 1, 1), 1);
                e.frame
            })
            .collect()
    }

    #[test]
    fn test_cycle_wraps_with_delay() {
        let mut e = animated(3, BehaviorKind::Cycle, 1);
        let screen = Screen::default();
        let mut seen = Vec::new();
        for _ in 0..6 {
            run(&mut e, &screen, 1);
            seen.push(e.frame);
        }
        assert_eq!(seen, vec![1, 1, 2, 2, 0, 0]);
    }

    #[test]
    fn test_flash_jitter_follows_screen() {
        let first = frames_on(1, BehaviorKind::Flash, 120);
        assert_eq!(first, frames_on(1, BehaviorKind::Flash, 120));
        assert_ne!(first, frames_on(2, BehaviorKind::Flash, 120));

        // One-tick flashes, 9..=40 ticks apart
        let flashes: Vec<usize> = (0..first.len()).filter(|&i| first[i] == 1).collect();
        assert!(flashes.len() >= 3);
        for pair in flashes.windows(2) {
            assert!((9..=40).contains(&(pair[1] - pair[0])), "{:?}", flashes);
        }
    }

    #[test]
    fn test_cycle_jitter_stays_in_range() {
        let mut e = animated(3, BehaviorKind::CyclePlus, 4);
        let screen = Screen::default();
        for _ in 0..40 {
            run(&mut e, &screen, 1);
            assert!((0..=4 + 3).contains(&e.timer));
        }
        assert_eq!(
            frames_on(7, BehaviorKind::CyclePlus, 60),
            frames_on(7, BehaviorKind::CyclePlus, 60)
        );
    }

    #[test]
    fn test_rocket_returns_to_origin_when_blocked() {
        let ceiling = tile(96, 48, Sides::SOLID, SpriteFlags::ACTIVE);
        let screen = Screen::new(Vec::new(), vec![ceiling], Vec::new());
        let mut rocket = animated(2, BehaviorKind::RocketUp, 0);
        rocket.position = IVec2::new(96, 240);
        rocket.origin = rocket.position;

        // Player out of the column: stays put
        run_with(&mut rocket, &screen, 1, Rect::new(300, 120, 12, 84), 5);
        assert_eq!(rocket.counter, 0);
        assert_eq!(rocket.position, rocket.origin);

        // Player above in the column arms it
        let player = Rect::new(110, 110, 12, 84);
        run_with(&mut rocket, &screen, 1, player, 1);
        assert_eq!(rocket.counter, 1);

        // 144 px to the ceiling at 6 px/tick
        run_with(&mut rocket, &screen, 1, player, 24);
        assert_eq!(rocket.position, IVec2::new(96, 96));
        assert_eq!(rocket.counter, 1);

        run_with(&mut rocket, &screen, 1, player, 1);
        assert_eq!(rocket.position, rocket.origin);
        assert_eq!(rocket.counter, 0);
        assert_eq!(rocket.frame, 0);
        assert!(rocket.timer >= SPRITE_Y / 2);
    }

    #[test]
    fn test_pulse_ping_pongs() {
        let mut e = animated(3, BehaviorKind::Pulse, 0);
        let screen = Screen::default();
        let mut seen = Vec::new();
        for _ in 0..6 {
            run(&mut e, &screen, 1);
            seen.push(e.frame);
        }
        assert_eq!(seen, vec![1, 2, 1, 0, 1, 2]);
    }

    #[test]
    fn test_explosion_removes_after_last_frame() {
        let mut e = explosion(IVec2::ZERO);
        let (outcomes, _) = run(&mut e, &Screen::default(), 8);
        assert!(outcomes[..7].iter().all(|o| *o == Outcome::Keep));
        assert_eq!(outcomes[7], Outcome::Remove);
    }

    #[test]
    fn test_cannon_fires_through_staging() {
        let mut e = animated(1, BehaviorKind::Cannon(Direction::Left), 0);
        let (_, spawned) = run(&mut e, &Screen::default(), 1);
        assert_eq!(spawned.len(), 1);
        assert_eq!(spawned[0].behavior, BehaviorKind::Bullet(Direction::Left));
        assert_eq!(spawned[0].touch, TouchKind::Killer);
        assert!(e.timer >= Tuning::default().cannon_period as i32);

        // Quiet until the timer runs out
        let (_, spawned) = run(&mut e, &Screen::default(), 10);
        assert!(spawned.is_empty());
    }

    #[test]
    fn test_projectile_removed_when_blocked() {
        let wall = tile(192, 96, Sides::SOLID, SpriteFlags::ACTIVE);
        let screen = Screen::new(Vec::new(), vec![wall], Vec::new());
        let mut b = bullet(IVec2::new(96, 96), Direction::Right);
        // Bullet box x ∈ [108, 132) → 60 px to the wall: five free ticks
        let (outcomes, spawned) = run(&mut b, &screen, 6);
        assert_eq!(outcomes[..5], [Outcome::Keep; 5]);
        assert_eq!(outcomes[5], Outcome::Remove);
        assert_eq!(b.bbox().right(), 192);
        assert_eq!(spawned.len(), 1);
        assert_eq!(spawned[0].behavior, BehaviorKind::Explosion);
    }

    #[test]
    fn test_shot_expires() {
        let tuning = Tuning::default();
        let mut s = shot(IVec2::new(0, 96), Direction::Right, 1, &tuning);
        let lifetime = s.timer as usize;
        assert_eq!(lifetime, 12);
        // 12 ticks × 16 px stays on screen
        let (outcomes, _) = run(&mut s, &Screen::default(), lifetime);
        assert_eq!(outcomes.last(), Some(&Outcome::Remove));
        assert!(outcomes[..lifetime - 1].iter().all(|o| *o == Outcome::Keep));
    }

    #[test]
    fn test_shot_frames_follow_power_and_facing() {
        let tuning = Tuning::default();
        let s = shot(IVec2::ZERO, Direction::Left, 2, &tuning);
        assert_eq!(s.frames[0].sprite, SpriteRef::new(Bank::Weapons, 20));
        assert_eq!(s.frame_count(), 4);
        let s = shot(IVec2::ZERO, Direction::Right, 9, &tuning);
        assert_eq!(s.param, 5);
        assert_eq!(s.frames[0].sprite, SpriteRef::new(Bank::Weapons, 36));
    }

    #[test]
    fn test_enemy_turns_at_wall() {
        let floor: Vec<Entity> = (0..6)
            .map(|i| tile(i * 48, 144, Sides::SOLID, SpriteFlags::ACTIVE))
            .collect();
        let mut collisions = floor;
        collisions.push(tile(192, 96, Sides::SOLID, SpriteFlags::ACTIVE));
        let screen = Screen::new(Vec::new(), collisions, Vec::new());

        let mut enemy = animated(2, BehaviorKind::Enemy, 0);
        enemy.position = IVec2::new(96, 96);
        // 48 px to the wall at 4 px per tick, then one blocked tick
        run(&mut enemy, &screen, 13);
        assert_eq!(enemy.position.x, 144);
        assert_eq!(enemy.counter, -1);
        run(&mut enemy, &screen, 2);
        assert_eq!(enemy.position.x, 136);
    }

    #[test]
    fn test_enemy_turns_at_ledge() {
        let screen = Screen::new(
            Vec::new(),
            vec![
                tile(48, 144, Sides::SOLID, SpriteFlags::ACTIVE),
                tile(96, 144, Sides::SOLID, SpriteFlags::ACTIVE),
            ],
            Vec::new(),
        );
        let mut enemy = animated(1, BehaviorKind::Enemy, 0);
        enemy.position = IVec2::new(96, 96);
        run(&mut enemy, &screen, 40);
        // Never walks off the two-tile floor (probe at box center)
        let center = enemy.bbox().center().x;
        assert!((48..144).contains(&center));
    }

    #[test]
    fn test_debris_keeps_origin_and_last_frame() {
        let mut obstacle = animated(3, BehaviorKind::Static, 0);
        obstacle.origin = IVec2::new(96, 48);
        let d = debris(&obstacle);
        assert_eq!(d.origin, IVec2::new(96, 48));
        assert_eq!(d.frames[0].sprite, SpriteRef::new(Bank::Level, 2));
        assert!(!d.is_touchable());
        assert!(!d.is_shootable());
    }
}
