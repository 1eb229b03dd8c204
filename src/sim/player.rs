//! Player finite-state machine
//!
//! The player's behavior is an explicit [`PlayerState`] plus a transition
//! table mapping each state to its entry and per-tick functions.
//!
//! - [`enter_state`] switches immediately: the new state's entry runs in the
//!   same tick.
//! - [`exit_state`] records a pending state; the next [`run_fsm`] call enters
//!   it instead of running the current state's tick.
//!
//! Touch handling goes through a second table mapping [`TouchKind`] to a
//! handler.

use std::rc::Rc;

use glam::IVec2;
use serde::{Deserialize, Serialize};

use super::behavior::{explosion, shot};
use super::collision::{ground_distance, resolve_move, touch_query};
use super::entity::{Bank, Canvas, Entity, Frame, SpriteFlags, SpriteRef, TouchKind};
use super::geom::{Direction, Rect, Sides};
use super::screen::Level;
use super::state::{Checkpoint, GameEvent, GamePhase, GameState};
use super::tick::TickInput;
use crate::consts::{LEVEL_GRID, SPRITE_X, SPRITE_Y};
use crate::{SimError, screen_up};

/// Collision box shared by every hero pose
const PLAYER_BOX: Rect = Rect::new(18, 12, 12, 84);

/// Player FSM states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlayerState {
    Init,
    Stand,
    Move,
    Jump,
    Fall,
    Land,
    Turn,
    TeleportOut,
    TeleportIn,
    Death,
}

impl PlayerState {
    pub fn can_fire(self) -> bool {
        matches!(
            self,
            PlayerState::Jump
                | PlayerState::Fall
                | PlayerState::Land
                | PlayerState::Move
                | PlayerState::Stand
        )
    }

    /// Touches are ignored while dying or teleporting
    pub fn accepts_touches(self) -> bool {
        matches!(
            self,
            PlayerState::Stand
                | PlayerState::Move
                | PlayerState::Jump
                | PlayerState::Fall
                | PlayerState::Land
                | PlayerState::Turn
        )
    }
}

type StateFn = fn(&mut GameState, &TickInput) -> Result<(), SimError>;

/// Entry and per-tick functions of one state
#[derive(Clone, Copy)]
struct Transition {
    enter: StateFn,
    tick: StateFn,
}

fn transition(state: PlayerState) -> Transition {
    let (enter, tick): (StateFn, StateFn) = match state {
        PlayerState::Init => (enter_init, tick_init),
        PlayerState::Stand => (enter_stand, tick_stand),
        PlayerState::Move => (enter_move, tick_move),
        PlayerState::Jump => (enter_jump, tick_jump),
        PlayerState::Fall => (enter_fall, tick_fall),
        PlayerState::Land => (enter_land, tick_land),
        PlayerState::Turn => (enter_turn, tick_turn),
        PlayerState::TeleportOut => (enter_teleport_out, tick_teleport_out),
        PlayerState::TeleportIn => (enter_teleport_in, tick_teleport_in),
        PlayerState::Death => (enter_death, tick_death),
    };
    Transition { enter, tick }
}

/// Current / pending state pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fsm {
    pub(crate) current: PlayerState,
    pub(crate) pending: Option<PlayerState>,
}

impl Fsm {
    pub fn new(state: PlayerState) -> Self {
        Self {
            current: state,
            pending: None,
        }
    }

    pub fn current(&self) -> PlayerState {
        self.current
    }

    pub fn pending(&self) -> Option<PlayerState> {
        self.pending
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Facing {
    Left,
    Right,
}

impl Facing {
    pub fn sign(self) -> i32 {
        match self {
            Facing::Left => -1,
            Facing::Right => 1,
        }
    }

    pub fn flipped(self) -> Self {
        match self {
            Facing::Left => Facing::Right,
            Facing::Right => Facing::Left,
        }
    }

    pub fn direction(self) -> Direction {
        match self {
            Facing::Left => Direction::Left,
            Facing::Right => Direction::Right,
        }
    }
}

/// Animation set; each frame is a (top, bottom) pair of hero sprites
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pose {
    Stand,
    Walk,
    /// Left to right; played backwards for right to left
    Turn,
    Crouch,
    /// Entering a teleport; played backwards when leaving
    Teleport,
}

const LSTAND: [(u8, u8); 1] = [(0, 1)];
const RSTAND: [(u8, u8); 1] = [(2, 3)];
const LWALK: [(u8, u8); 10] = [
    (4, 5),
    (4, 6),
    (4, 7),
    (4, 8),
    (4, 9),
    (4, 10),
    (4, 11),
    (4, 12),
    (4, 13),
    (4, 14),
];
const RWALK: [(u8, u8); 10] = [
    (15, 16),
    (15, 17),
    (15, 18),
    (15, 19),
    (15, 20),
    (15, 21),
    (15, 22),
    (15, 23),
    (15, 24),
    (15, 25),
];
const TURN: [(u8, u8); 3] = [(26, 29), (27, 30), (28, 31)];
const LCROUCH: [(u8, u8); 1] = [(32, 33)];
const RCROUCH: [(u8, u8); 1] = [(34, 35)];
const TELE: [(u8, u8); 6] = [(36, 42), (37, 43), (38, 44), (39, 45), (40, 46), (41, 47)];

impl Pose {
    fn sprites(self, facing: Facing) -> &'static [(u8, u8)] {
        match (self, facing) {
            (Pose::Stand, Facing::Left) => &LSTAND,
            (Pose::Stand, Facing::Right) => &RSTAND,
            (Pose::Walk, Facing::Left) => &LWALK,
            (Pose::Walk, Facing::Right) => &RWALK,
            (Pose::Turn, _) => &TURN,
            (Pose::Crouch, Facing::Left) => &LCROUCH,
            (Pose::Crouch, Facing::Right) => &RCROUCH,
            (Pose::Teleport, _) => &TELE,
        }
    }

    pub fn frame_count(self) -> usize {
        self.sprites(Facing::Right).len()
    }
}

/// The player: a collidable body plus FSM bookkeeping
#[derive(Debug, Clone)]
pub struct Player {
    pub body: Entity,
    pub fsm: Fsm,
    pub facing: Facing,
    pub pose: Pose,
    pub frame: usize,
    /// Countdown for Land, Turn and the teleport fades
    pub timer: u32,
    pub jump_index: usize,
    pub fall_index: usize,
    pub kill_timer: u32,
    /// Last requested movement
    pub move_vector: IVec2,
    /// Destination (screen, pad position) applied when TeleportIn starts
    pub teleport_to: Option<(u8, IVec2)>,
    /// Set by an open exit; the next completed TeleportOut ends the level
    pub level_exit: bool,
    pub visible: bool,
    touches: Vec<usize>,
    touch_generation: u64,
    exit_notified: bool,
}

impl Player {
    pub fn new(position: IVec2) -> Self {
        let frame = Frame {
            sprite: SpriteRef::new(Bank::Hero, 0),
            bbox: PLAYER_BOX,
            sides: Sides::SOLID,
            flags: SpriteFlags::empty(),
        };
        Self {
            body: Entity::new(Rc::from(vec![frame]), position),
            fsm: Fsm::new(PlayerState::Init),
            facing: Facing::Right,
            pose: Pose::Stand,
            frame: 0,
            timer: 0,
            jump_index: 0,
            fall_index: 0,
            kill_timer: 0,
            move_vector: IVec2::ZERO,
            teleport_to: None,
            level_exit: false,
            visible: true,
            touches: Vec::new(),
            touch_generation: 0,
            exit_notified: false,
        }
    }

    /// Player placed on the tile of a pad (checkpoint or teleport): the body
    /// spans the pad's tile and the one above it
    pub fn standing_on(pad: IVec2) -> Self {
        Self::new(stand_position(pad))
    }

    pub fn state(&self) -> PlayerState {
        self.fsm.current
    }

    pub fn position(&self) -> IVec2 {
        self.body.position
    }

    pub fn set_position(&mut self, position: IVec2) {
        self.body.position = position;
    }

    pub fn bbox(&self) -> Rect {
        self.body.bbox()
    }

    /// Active-list indices touched since the last touch pass
    pub fn touches(&self) -> &[usize] {
        &self.touches
    }

    /// (top, bottom) sprites of the current pose frame
    pub fn sprites(&self) -> (SpriteRef, SpriteRef) {
        let table = self.pose.sprites(self.facing);
        let (top, bottom) = table[self.frame.min(table.len() - 1)];
        (SpriteRef::new(Bank::Hero, top), SpriteRef::new(Bank::Hero, bottom))
    }

    pub fn draw(&self, canvas: &mut dyn Canvas) {
        if !self.visible {
            return;
        }
        let (top, bottom) = self.sprites();
        canvas.draw_sprite(top, self.body.position);
        canvas.draw_sprite(bottom, self.body.position + IVec2::new(0, SPRITE_Y));
    }

    fn set_pose(&mut self, pose: Pose, frame: usize) {
        self.pose = pose;
        self.frame = frame;
    }

    /// Merge touched indices; indices from an older live screen are dropped
    fn record_touches(&mut self, generation: u64, touched: &[usize]) {
        if generation != self.touch_generation {
            self.touches.clear();
            self.touch_generation = generation;
        }
        for &index in touched {
            if !self.touches.contains(&index) {
                self.touches.push(index);
            }
        }
    }
}

fn stand_position(pad: IVec2) -> IVec2 {
    pad - IVec2::new(0, SPRITE_Y)
}

/// Switch to `next` now and run its entry
pub fn enter_state(
    state: &mut GameState,
    next: PlayerState,
    input: &TickInput,
) -> Result<(), SimError> {
    let current = state.player.fsm.current;
    if current == next {
        log::debug!("Player already in {:?}", next);
        return Ok(());
    }
    log::debug!("Player {:?} -> {:?}", current, next);
    state.player.fsm.current = next;
    (transition(next).enter)(state, input)
}

/// Switch to `next` at the start of the next tick
pub fn exit_state(state: &mut GameState, next: PlayerState) {
    state.player.fsm.pending = Some(next);
}

/// Enter the pending state if there is one, otherwise run the current state
pub fn run_fsm(state: &mut GameState, input: &TickInput) -> Result<(), SimError> {
    match state.player.fsm.pending.take() {
        Some(next) => enter_state(state, next, input),
        None => (transition(state.player.fsm.current).tick)(state, input),
    }
}

fn input_direction(input: &TickInput) -> Option<Facing> {
    match (input.left, input.right) {
        (true, false) => Some(Facing::Left),
        (false, true) => Some(Facing::Right),
        _ => None,
    }
}

fn ground(state: &GameState) -> i32 {
    ground_distance(&state.player.body, state.screens.live())
}

/// Resolve a player move against the live screen, apply it and keep the
/// touches. Returns the achieved offset.
fn move_player(
    state: &mut GameState,
    offset: IVec2,
    ignore_ground: bool,
) -> Result<IVec2, SimError> {
    let result = resolve_move(&state.player.body, offset, state.screens.live(), ignore_ground)?;
    state.player.body.position += result.offset;
    state.player.move_vector = offset;
    let generation = state.screens.generation();
    state.player.record_touches(generation, &result.touched);
    Ok(result.offset)
}

/// Horizontal air control
fn steer(state: &mut GameState, input: &TickInput) -> Result<(), SimError> {
    if let Some(facing) = input_direction(input) {
        state.player.facing = facing;
        let step = IVec2::new(facing.sign() * state.tuning.walk_speed, 0);
        move_player(state, step, false)?;
    }
    Ok(())
}

fn enter_init(_state: &mut GameState, _input: &TickInput) -> Result<(), SimError> {
    Ok(())
}

fn tick_init(state: &mut GameState, input: &TickInput) -> Result<(), SimError> {
    enter_state(state, PlayerState::Stand, input)
}

fn enter_stand(state: &mut GameState, input: &TickInput) -> Result<(), SimError> {
    state.player.move_vector = IVec2::ZERO;
    state.player.set_pose(Pose::Stand, 0);
    if ground(state) > 0 {
        return enter_state(state, PlayerState::Fall, input);
    }
    Ok(())
}

fn tick_stand(state: &mut GameState, input: &TickInput) -> Result<(), SimError> {
    if ground(state) > 0 {
        return enter_state(state, PlayerState::Fall, input);
    }
    state.player.set_pose(Pose::Stand, 0);
    if input.up {
        return enter_state(state, PlayerState::Jump, input);
    }
    // Reversal is handled by Move
    if input_direction(input).is_some() {
        return enter_state(state, PlayerState::Move, input);
    }
    Ok(())
}

fn enter_move(state: &mut GameState, _input: &TickInput) -> Result<(), SimError> {
    state.player.set_pose(Pose::Walk, 0);
    Ok(())
}

fn tick_move(state: &mut GameState, input: &TickInput) -> Result<(), SimError> {
    let Some(facing) = input_direction(input) else {
        exit_state(state, PlayerState::Stand);
        return Ok(());
    };
    if facing != state.player.facing {
        return enter_state(state, PlayerState::Turn, input);
    }
    if input.up {
        return enter_state(state, PlayerState::Jump, input);
    }

    let step = IVec2::new(facing.sign() * state.tuning.walk_speed, 0);
    let moved = move_player(state, step, true)?;
    if moved.x == 0 {
        state.player.set_pose(Pose::Stand, 0);
    } else {
        let frame = match state.player.pose {
            Pose::Walk => (state.player.frame + 1) % Pose::Walk.frame_count(),
            _ => 0,
        };
        state.player.set_pose(Pose::Walk, frame);
    }

    if ground(state) > 0 {
        return enter_state(state, PlayerState::Fall, input);
    }
    Ok(())
}

fn enter_jump(state: &mut GameState, _input: &TickInput) -> Result<(), SimError> {
    state.player.jump_index = 0;
    state.player.set_pose(Pose::Stand, 0);
    Ok(())
}

fn tick_jump(state: &mut GameState, input: &TickInput) -> Result<(), SimError> {
    let speed = state.tuning.jump_speed(state.player.jump_index);
    state.player.jump_index += 1;
    if speed == 0 {
        return enter_state(state, PlayerState::Fall, input);
    }

    let rise = IVec2::new(0, -speed);
    let moved = move_player(state, rise, false)?;
    steer(state, input)?;
    state.player.set_pose(Pose::Stand, 0);
    if moved != rise {
        return enter_state(state, PlayerState::Fall, input);
    }
    Ok(())
}

fn enter_fall(state: &mut GameState, _input: &TickInput) -> Result<(), SimError> {
    state.player.fall_index = 0;
    state.player.move_vector.y = 0;
    state.player.set_pose(Pose::Stand, 0);
    Ok(())
}

fn tick_fall(state: &mut GameState, input: &TickInput) -> Result<(), SimError> {
    let to_ground = ground(state);
    if to_ground <= 0 {
        return enter_state(state, PlayerState::Land, input);
    }
    let speed = state.tuning.fall_speed(state.player.fall_index).min(to_ground) & !1;
    state.player.fall_index += 1;

    let drop = IVec2::new(0, speed);
    let moved = move_player(state, drop, false)?;
    steer(state, input)?;
    state.player.set_pose(Pose::Stand, 0);
    if moved != drop || speed == 0 || ground(state) <= 0 {
        return enter_state(state, PlayerState::Land, input);
    }
    Ok(())
}

fn enter_land(state: &mut GameState, _input: &TickInput) -> Result<(), SimError> {
    state.player.timer = state.tuning.land_ticks;
    state.player.set_pose(Pose::Crouch, 0);
    Ok(())
}

fn tick_land(state: &mut GameState, input: &TickInput) -> Result<(), SimError> {
    state.player.timer = state.player.timer.saturating_sub(1);
    if state.player.timer == 0 {
        return enter_state(state, PlayerState::Stand, input);
    }
    Ok(())
}

fn enter_turn(state: &mut GameState, _input: &TickInput) -> Result<(), SimError> {
    let facing = state.player.facing.flipped();
    state.player.facing = facing;
    state.player.timer = state.tuning.turn_ticks;
    let first = match facing {
        Facing::Right => 0,
        Facing::Left => Pose::Turn.frame_count() - 1,
    };
    state.player.set_pose(Pose::Turn, first);
    Ok(())
}

fn tick_turn(state: &mut GameState, input: &TickInput) -> Result<(), SimError> {
    let player = &mut state.player;
    player.frame = match player.facing {
        Facing::Right => (player.frame + 1).min(Pose::Turn.frame_count() - 1),
        Facing::Left => player.frame.saturating_sub(1),
    };
    player.timer = player.timer.saturating_sub(1);
    if player.timer == 0 {
        return enter_state(state, PlayerState::Move, input);
    }
    Ok(())
}

fn enter_teleport_out(state: &mut GameState, _input: &TickInput) -> Result<(), SimError> {
    state.player.timer = state.tuning.teleport_ticks;
    state.player.set_pose(Pose::Teleport, 0);
    Ok(())
}

fn tick_teleport_out(state: &mut GameState, input: &TickInput) -> Result<(), SimError> {
    let player = &mut state.player;
    player.frame = (player.frame + 1).min(Pose::Teleport.frame_count() - 1);
    player.timer = player.timer.saturating_sub(1);
    if player.timer > 0 {
        return Ok(());
    }
    if player.level_exit {
        player.visible = false;
        state.phase = GamePhase::LevelComplete;
        state.events.push(GameEvent::LevelComplete);
        log::info!("Level {} complete", state.level_id);
        return Ok(());
    }
    enter_state(state, PlayerState::TeleportIn, input)
}

fn enter_teleport_in(state: &mut GameState, _input: &TickInput) -> Result<(), SimError> {
    if let Some((screen, pad)) = state.player.teleport_to.take() {
        state.screens.change_screen(screen as usize)?;
        state.player.set_position(stand_position(pad));
        state.events.push(GameEvent::Teleported { screen });
        log::info!("Teleported to screen {} at {:?}", screen, pad);
    }
    state.player.timer = state.tuning.teleport_ticks;
    state.player.set_pose(Pose::Teleport, Pose::Teleport.frame_count() - 1);
    Ok(())
}

fn tick_teleport_in(state: &mut GameState, _input: &TickInput) -> Result<(), SimError> {
    let player = &mut state.player;
    player.frame = player.frame.saturating_sub(1);
    player.timer = player.timer.saturating_sub(1);
    if player.timer == 0 {
        exit_state(state, PlayerState::Stand);
    }
    Ok(())
}

fn enter_death(state: &mut GameState, _input: &TickInput) -> Result<(), SimError> {
    let position = state.player.position();
    state.player.kill_timer = 0;
    state.player.visible = false;
    state.player.teleport_to = None;
    state.screens.add_active(explosion(position));
    state.screens.add_active(explosion(position + IVec2::new(0, SPRITE_Y)));
    state.events.push(GameEvent::Death);
    log::info!("Player died on screen {}", state.screens.current_index());
    Ok(())
}

fn tick_death(state: &mut GameState, input: &TickInput) -> Result<(), SimError> {
    state.player.kill_timer += 1;
    let kill_timer = state.player.kill_timer;

    if kill_timer < state.tuning.death_effect_ticks && kill_timer % 3 == 0 {
        let jitter = state.screens.random().byte(kill_timer as usize) as i32;
        let offset = IVec2::new(jitter % 5 * 6 - 12, jitter / 5 % 3 * SPRITE_Y / 2);
        let position = state.player.position() + offset;
        state.screens.add_active(explosion(position));
    }

    if kill_timer > state.tuning.death_respawn_ticks {
        respawn(state)?;
        return enter_state(state, PlayerState::Stand, input);
    }
    Ok(())
}

/// Rebuild the level and put the player back on the stored checkpoint
fn respawn(state: &mut GameState) -> Result<(), SimError> {
    state.screens.reset_level()?;
    let Checkpoint { screen, position, .. } = state.checkpoint;
    state.screens.change_screen(screen as usize)?;

    let player = &mut state.player;
    player.set_position(stand_position(position));
    player.visible = true;
    player.level_exit = false;
    player.teleport_to = None;
    player.touches.clear();
    state.events.push(GameEvent::Respawn);
    log::info!("Respawned on screen {} at {:?}", screen, position);
    Ok(())
}

/// Spawn a shot on a fresh fire press in a firing state
pub fn fire(state: &mut GameState, input: &TickInput) {
    let pressed = input.fire && !state.prev_fire;
    if !pressed || !state.player.state().can_fire() {
        return;
    }
    let facing = state.player.facing;
    let level = state.power.max(1);
    let position = state.player.position() + IVec2::new(facing.sign() * SPRITE_X / 2, SPRITE_Y / 2);
    state
        .screens
        .add_active(shot(position, facing.direction(), level, &state.tuning));
    state.events.push(GameEvent::ShotFired { power: level });
}

// === Touch handling ===

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TouchOutcome {
    Keep,
    Remove,
}

type TouchFn = fn(&mut GameState, usize, &TickInput) -> Result<TouchOutcome, SimError>;

fn touch_handler(kind: TouchKind) -> TouchFn {
    match kind {
        TouchKind::None => touch_nothing,
        TouchKind::Battery => touch_battery,
        TouchKind::SpecialGood => touch_special_good,
        TouchKind::Floppy => touch_floppy,
        TouchKind::Checkpoint => touch_checkpoint,
        TouchKind::Killer | TouchKind::SpecialBad => touch_hazard,
        TouchKind::Exit => touch_exit,
        TouchKind::Teleport => touch_teleport,
    }
}

/// Run the touch handlers over everything touched this tick
///
/// The touch set is what the resolver gathered during movement plus a query
/// at the final position. Removed objects leave the live active list in
/// descending index order so the remaining indices stay valid.
pub fn handle_touches(state: &mut GameState, input: &TickInput) -> Result<(), SimError> {
    if !state.player.state().accepts_touches() {
        state.player.touches.clear();
        return Ok(());
    }
    let generation = state.screens.generation();
    let at_rest = touch_query(state.player.bbox(), state.screens.live());
    state.player.record_touches(generation, &at_rest);

    let touched = std::mem::take(&mut state.player.touches);
    let mut exit_touched = false;
    let mut removed = Vec::new();
    for index in touched {
        if !state.player.state().accepts_touches() {
            break;
        }
        let kind = state
            .screens
            .live()
            .and_then(|screen| screen.active.get(index))
            .map(|entity| entity.touch);
        let Some(kind) = kind else {
            continue;
        };
        exit_touched |= kind == TouchKind::Exit;
        if touch_handler(kind)(state, index, input)? == TouchOutcome::Remove {
            removed.push(index);
        }
    }
    if !exit_touched {
        state.player.exit_notified = false;
    }

    removed.sort_unstable();
    removed.dedup();
    if let Some(live) = state.screens.live_mut() {
        for index in removed.into_iter().rev() {
            live.active.remove(index);
        }
    }
    Ok(())
}

fn touched_origin(state: &GameState, index: usize) -> IVec2 {
    state
        .screens
        .live()
        .and_then(|screen| screen.active.get(index))
        .map_or(IVec2::ZERO, |entity| entity.origin)
}

/// Persist a pickup's removal
fn collect(state: &mut GameState, index: usize) -> Result<(), SimError> {
    let screen = state.screens.current_index();
    let origin = touched_origin(state, index);
    state.screens.record_collected(screen, origin)?;
    log::info!("Collected item at {:?} on screen {}", origin, screen);
    Ok(())
}

fn touch_nothing(
    _state: &mut GameState,
    _index: usize,
    _input: &TickInput,
) -> Result<TouchOutcome, SimError> {
    Ok(TouchOutcome::Keep)
}

fn touch_battery(
    state: &mut GameState,
    index: usize,
    _input: &TickInput,
) -> Result<TouchOutcome, SimError> {
    let power = state.power.saturating_add(1);
    state.set_power(power);
    collect(state, index)?;
    state.events.push(GameEvent::PowerUp { power: state.power });
    Ok(TouchOutcome::Remove)
}

fn touch_special_good(
    state: &mut GameState,
    index: usize,
    _input: &TickInput,
) -> Result<TouchOutcome, SimError> {
    state.set_power(state.tuning.max_power);
    collect(state, index)?;
    state.events.push(GameEvent::PowerUp { power: state.power });
    Ok(TouchOutcome::Remove)
}

fn touch_floppy(
    state: &mut GameState,
    index: usize,
    _input: &TickInput,
) -> Result<TouchOutcome, SimError> {
    state.items_collected += 1;
    collect(state, index)?;
    state.events.push(GameEvent::ItemCollected {
        total: state.items_collected,
    });
    Ok(TouchOutcome::Remove)
}

fn touch_checkpoint(
    state: &mut GameState,
    index: usize,
    _input: &TickInput,
) -> Result<TouchOutcome, SimError> {
    let checkpoint = Checkpoint {
        level: state.level_id,
        screen: state.screens.current_index(),
        position: touched_origin(state, index),
    };
    if checkpoint != state.checkpoint {
        state.set_checkpoint(checkpoint);
        state.power = 0;
        state.events.push(GameEvent::CheckpointReached(checkpoint));
        log::info!("Checkpoint: screen {} at {:?}", checkpoint.screen, checkpoint.position);
    }
    Ok(TouchOutcome::Keep)
}

fn touch_hazard(
    state: &mut GameState,
    _index: usize,
    input: &TickInput,
) -> Result<TouchOutcome, SimError> {
    enter_state(state, PlayerState::Death, input)?;
    Ok(TouchOutcome::Keep)
}

fn touch_exit(
    state: &mut GameState,
    _index: usize,
    input: &TickInput,
) -> Result<TouchOutcome, SimError> {
    let required = state.tuning.exit_required_items;
    if state.items_collected >= required {
        state.player.level_exit = true;
        enter_state(state, PlayerState::TeleportOut, input)?;
    } else if !state.player.exit_notified {
        state.player.exit_notified = true;
        log::info!("Exit locked: {}/{} items", state.items_collected, required);
        state.events.push(GameEvent::ExitLocked {
            collected: state.items_collected,
            required,
        });
    }
    Ok(TouchOutcome::Keep)
}

fn touch_teleport(
    state: &mut GameState,
    _index: usize,
    input: &TickInput,
) -> Result<TouchOutcome, SimError> {
    let grounded = matches!(state.player.state(), PlayerState::Stand | PlayerState::Move);
    if !input.down || !grounded {
        return Ok(TouchOutcome::Keep);
    }
    let current = state.screens.current_index();
    match teleport_destination(state.screens.level(), current) {
        Some(destination) => {
            state.player.teleport_to = Some(destination);
            enter_state(state, PlayerState::TeleportOut, input)?;
        }
        None => log::debug!("Teleport on screen {} has no destination", current),
    }
    Ok(TouchOutcome::Keep)
}

/// First teleport pad above `from` in the same grid column, wrapping
pub fn teleport_destination(level: &Level, from: u8) -> Option<(u8, IVec2)> {
    let mut index = from;
    for _ in 1..LEVEL_GRID {
        index = screen_up(index);
        let pad = level
            .screen(index as usize)
            .ok()
            .flatten()
            .and_then(|screen| screen.active.iter().find(|e| e.touch == TouchKind::Teleport));
        if let Some(pad) = pad {
            return Some((index, pad.origin));
        }
    }
    None
}
