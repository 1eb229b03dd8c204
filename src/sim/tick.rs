//! Fixed timestep simulation tick
//!
//! One call to [`tick`] advances the game by one logical step:
//!
//! 1. admit entities staged during the previous tick
//! 2. run the player FSM
//! 3. handle the player's touches, then firing
//! 4. update every other active object
//! 5. resolve shots against shootable objects
//! 6. follow the player across a screen edge

use glam::IVec2;

use super::behavior::{self, Outcome, UpdateCtx, debris, explosion};
use super::entity::{BehaviorKind, Canvas, DeferredDraw, Entity};
use super::player::{self, PlayerState};
use super::state::{GameEvent, GamePhase, GameState};
use crate::SimError;
use crate::consts::{MAX_X, MAX_Y};
use crate::{screen_down, screen_left, screen_right, screen_up};

/// Input intents for a single tick (already debounced and mapped)
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    pub left: bool,
    pub right: bool,
    /// Jump
    pub up: bool,
    /// Arms teleports
    pub down: bool,
    pub fire: bool,
    /// Draw collision outlines
    pub debug: bool,
}

/// Advance the game state by one fixed timestep
pub fn tick(state: &mut GameState, input: &TickInput) -> Result<(), SimError> {
    state.events.clear();
    if state.phase != GamePhase::Playing {
        return Ok(());
    }
    state.debug = input.debug;

    state.screens.admit_pending_active();
    player::run_fsm(state, input)?;
    player::handle_touches(state, input)?;
    player::fire(state, input);
    update_active(state)?;
    resolve_shots(state)?;
    follow_screen_exit(state)?;

    state.prev_fire = input.fire;
    state.time_ticks += 1;
    Ok(())
}

/// Run every admitted active object's behavior against the live screen
///
/// The active list is detached while updates run; anything spawned goes
/// through the staging queue.
fn update_active(state: &mut GameState) -> Result<(), SimError> {
    let player_box = state.player.bbox();
    let Some(live) = state.screens.live_mut() else {
        return Ok(());
    };
    let active = std::mem::take(&mut live.active);

    let mut kept = Vec::with_capacity(active.len());
    let mut spawned = Vec::new();
    let mut failure = None;
    if let Some(screen) = state.screens.live() {
        let mut ctx = UpdateCtx {
            screen,
            random: state.screens.random(),
            tuning: &state.tuning,
            player_box,
            spawned: Vec::new(),
        };
        for mut entity in active {
            if failure.is_some() {
                kept.push(entity);
                continue;
            }
            match behavior::update(&mut entity, &mut ctx) {
                Ok(Outcome::Keep) => kept.push(entity),
                Ok(Outcome::Remove) => {}
                Err(err) => {
                    failure = Some(err);
                    kept.push(entity);
                }
            }
        }
        spawned = ctx.spawned;
    }

    if let Some(live) = state.screens.live_mut() {
        live.active = kept;
    }
    if let Some(err) = failure {
        return Err(err);
    }
    for entity in spawned {
        state.screens.add_active(entity);
    }
    Ok(())
}

/// Destroy shootable objects hit by player shots
///
/// The target is removed from the live screen and from the repository, an
/// explosion is staged, and destroyable targets leave debris that persists.
fn resolve_shots(state: &mut GameState) -> Result<(), SimError> {
    let screen_index = state.screens.current_index();
    let Some(live) = state.screens.live_mut() else {
        return Ok(());
    };

    let mut hits: Vec<(usize, usize)> = Vec::new();
    for (shot_index, shot) in live.active.iter().enumerate() {
        if !matches!(shot.behavior, BehaviorKind::Shot(_)) {
            continue;
        }
        let shot_box = shot.bbox();
        let target = live.active.iter().enumerate().position(|(i, target)| {
            i != shot_index
                && target.is_shootable()
                && !hits.iter().any(|&(_, hit)| hit == i)
                && shot_box.intersects(&target.bbox())
        });
        if let Some(target) = target {
            hits.push((shot_index, target));
        }
    }
    if hits.is_empty() {
        return Ok(());
    }

    let destroyed: Vec<Entity> = hits.iter().map(|&(_, t)| live.active[t].clone()).collect();
    let mut doomed: Vec<usize> = hits.iter().flat_map(|&(s, t)| [s, t]).collect();
    doomed.sort_unstable();
    doomed.dedup();
    for index in doomed.into_iter().rev() {
        live.active.remove(index);
    }

    for target in destroyed {
        state.screens.delete_object(screen_index as usize, target.origin)?;
        state.screens.add_active(explosion(target.position));
        if target.is_destroyable() {
            let remains = debris(&target);
            state
                .screens
                .add_to_level_data(screen_index as usize, remains.clone())?;
            state.screens.add_active(remains);
        }
        log::debug!("Destroyed object at {:?} on screen {}", target.origin, screen_index);
        state.events.push(GameEvent::ObjectDestroyed {
            screen: screen_index,
            position: target.origin,
        });
    }
    Ok(())
}

/// Switch to the neighboring screen once the player's box center leaves the
/// screen area
fn follow_screen_exit(state: &mut GameState) -> Result<(), SimError> {
    if matches!(
        state.player.state(),
        PlayerState::Init | PlayerState::Death | PlayerState::TeleportOut | PlayerState::TeleportIn
    ) {
        return Ok(());
    }
    let center = state.player.bbox().center();
    let from = state.screens.current_index();
    let (to, shift) = if center.x < 0 {
        (screen_left(from), IVec2::new(MAX_X, 0))
    } else if center.x >= MAX_X {
        (screen_right(from), IVec2::new(-MAX_X, 0))
    } else if center.y < 0 {
        (screen_up(from), IVec2::new(0, MAX_Y))
    } else if center.y >= MAX_Y {
        (screen_down(from), IVec2::new(0, -MAX_Y))
    } else {
        return Ok(());
    };

    state.screens.change_screen(to as usize)?;
    let position = state.player.position() + shift;
    state.player.set_position(position);
    state.events.push(GameEvent::ScreenChanged { from, to });
    Ok(())
}

/// Draw the live screen and the player
///
/// Order: background, collisions, active (staged entities included), player,
/// then front-layer objects. Debug mode adds collision outlines.
pub fn render(state: &GameState, canvas: &mut dyn Canvas) {
    let mut deferred: Vec<DeferredDraw> = Vec::new();
    if let Some(screen) = state.screens.live() {
        let layers = screen
            .background
            .iter()
            .chain(screen.collisions.iter())
            .chain(screen.active.iter())
            .chain(state.screens.pending());
        for entity in layers {
            if let Some(draw) = entity.draw(canvas) {
                deferred.push(draw);
            }
        }
    }
    state.player.draw(canvas);
    for draw in deferred {
        draw(&mut *canvas);
    }

    if state.debug {
        if let Some(screen) = state.screens.live() {
            for entity in screen.collisions.iter().chain(screen.active.iter()) {
                canvas.draw_box(entity.bbox(), entity.sides());
            }
        }
        canvas.draw_box(state.player.bbox(), state.player.body.sides());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::entity::tests::{RecordingCanvas, tile};
    use crate::sim::entity::{Bank, SpriteFlags, SpriteRef, TouchKind};
    use crate::sim::geom::{Direction, Sides};
    use crate::sim::player::tests::{floor_screen, game, pad};

    fn right() -> TickInput {
        TickInput {
            right: true,
            ..Default::default()
        }
    }

    /// Tick until `done` holds, at most `limit` times
    fn tick_until(
        state: &mut GameState,
        input: &TickInput,
        limit: usize,
        mut done: impl FnMut(&GameState) -> bool,
    ) -> bool {
        for _ in 0..limit {
            tick(state, input).unwrap();
            if done(state) {
                return true;
            }
        }
        false
    }

    #[test]
    fn test_first_tick_stands() {
        let mut state = game(vec![(0, floor_screen(Vec::new()))]);
        state.player.fsm = player::Fsm::new(PlayerState::Init);
        tick(&mut state, &TickInput::default()).unwrap();
        assert_eq!(state.player.state(), PlayerState::Stand);
        assert_eq!(state.time_ticks, 1);
        // Standing on the start checkpoint does not re-trigger it
        assert!(state.events.is_empty());
    }

    #[test]
    fn test_staged_entity_drawn_before_first_update() {
        let cannon = tile(480, 96, Sides::NONE, SpriteFlags::ACTIVE).with_behavior(
            BehaviorKind::Cannon(Direction::Left),
            TouchKind::None,
            0,
        );
        let mut state = game(vec![(0, floor_screen(vec![cannon]))]);

        tick(&mut state, &TickInput::default()).unwrap();
        let live = state.screens.live().unwrap();
        assert!(live.active.iter().all(|e| !matches!(e.behavior, BehaviorKind::Bullet(_))));
        assert_eq!(state.screens.pending().len(), 1);

        let mut canvas = RecordingCanvas::default();
        render(&state, &mut canvas);
        assert!(canvas
            .drawn
            .contains(&(SpriteRef::new(Bank::Weapons, 8), IVec2::new(480, 96))));

        tick(&mut state, &TickInput::default()).unwrap();
        let bullet = state
            .screens
            .live()
            .unwrap()
            .active
            .iter()
            .find(|e| matches!(e.behavior, BehaviorKind::Bullet(_)))
            .cloned()
            .unwrap();
        assert_eq!(bullet.position, IVec2::new(468, 96));
    }

    #[test]
    fn test_pickup_collected_and_persisted() {
        let battery = pad(144, 288, TouchKind::Battery);
        let mut state = game(vec![(0, floor_screen(vec![battery]))]);

        assert!(tick_until(&mut state, &right(), 8, |s| s.power() == 1));
        assert!(state.events.contains(&GameEvent::PowerUp { power: 1 }));
        let live = state.screens.live().unwrap();
        assert!(live.active.iter().all(|e| e.touch != TouchKind::Battery));
        let stored = state.screens.level().screen(0).unwrap().unwrap();
        assert!(stored.active.iter().all(|e| e.touch != TouchKind::Battery));
        assert_eq!(state.screens.collected(), &[(0, IVec2::new(144, 288))]);
    }

    #[test]
    fn test_new_checkpoint_resets_power() {
        let second = pad(192, 288, TouchKind::Checkpoint);
        let mut state = game(vec![(0, floor_screen(vec![second]))]);
        state.set_power(3);

        assert!(tick_until(&mut state, &right(), 15, |s| s.checkpoint().position.x == 192));
        assert_eq!(state.power(), 0);
        assert!(matches!(state.events[..], [GameEvent::CheckpointReached(_)]));
    }

    #[test]
    fn test_hazard_kills_then_respawns_at_checkpoint() {
        let killer = pad(144, 288, TouchKind::Killer);
        let mut state = game(vec![(0, floor_screen(vec![killer]))]);

        assert!(tick_until(&mut state, &right(), 8, |s| s.player.state()
            == PlayerState::Death));
        assert!(state.events.contains(&GameEvent::Death));
        assert!(!state.player.visible);
        assert_eq!(state.screens.pending().len(), 2);

        assert!(tick_until(&mut state, &TickInput::default(), 60, |s| s
            .player
            .state()
            == PlayerState::Stand));
        assert!(state.events.contains(&GameEvent::Respawn));
        assert!(state.player.visible);
        assert_eq!(state.player.position(), IVec2::new(96, 240));
    }

    #[test]
    fn test_exit_locked_until_enough_items() {
        let exit = pad(144, 288, TouchKind::Exit);
        let mut state = game(vec![(0, floor_screen(vec![exit]))]);

        let locked = GameEvent::ExitLocked {
            collected: 0,
            required: 3,
        };
        assert!(tick_until(&mut state, &right(), 8, |s| s.events.contains(&locked)));
        // Reported once while the player stays on the exit
        tick(&mut state, &TickInput::default()).unwrap();
        assert!(!state.events.contains(&locked));

        state.set_items_collected(3);
        tick(&mut state, &TickInput::default()).unwrap();
        assert_eq!(state.player.state(), PlayerState::TeleportOut);

        assert!(tick_until(&mut state, &TickInput::default(), 10, |s| s.phase
            == GamePhase::LevelComplete));
        assert!(state.events.contains(&GameEvent::LevelComplete));

        let ticks = state.time_ticks;
        tick(&mut state, &right()).unwrap();
        assert_eq!(state.time_ticks, ticks);
    }

    #[test]
    fn test_teleport_needs_down_and_wraps_up_the_column() {
        let mut state = game(vec![
            (0x11, floor_screen(vec![pad(240, 288, TouchKind::Teleport)])),
            (0x21, floor_screen(vec![pad(384, 288, TouchKind::Teleport)])),
        ]);
        assert_eq!(state.current_screen(), 0x11);
        state.player.set_position(IVec2::new(240, 240));

        tick(&mut state, &TickInput::default()).unwrap();
        assert_eq!(state.player.state(), PlayerState::Stand);

        let down = TickInput {
            down: true,
            ..Default::default()
        };
        tick(&mut state, &down).unwrap();
        assert_eq!(state.player.state(), PlayerState::TeleportOut);

        assert!(tick_until(&mut state, &TickInput::default(), 20, |s| s.player.state()
            == PlayerState::Stand));
        assert_eq!(state.current_screen(), 0x21);
        assert_eq!(state.player.position(), IVec2::new(384, 240));
    }

    #[test]
    fn test_shot_destroys_target_and_leaves_debris() {
        let target = tile(
            288,
            240,
            Sides::SOLID,
            SpriteFlags::ACTIVE | SpriteFlags::SHOOTABLE | SpriteFlags::DESTROYABLE,
        );
        let mut state = game(vec![(0, floor_screen(vec![target]))]);
        let fire = TickInput {
            fire: true,
            ..Default::default()
        };
        tick(&mut state, &fire).unwrap();
        assert!(state.events.contains(&GameEvent::ShotFired { power: 1 }));

        let destroyed = GameEvent::ObjectDestroyed {
            screen: 0,
            position: IVec2::new(288, 240),
        };
        assert!(tick_until(&mut state, &TickInput::default(), 12, |s| s
            .events
            .contains(&destroyed)));

        let live = state.screens.live().unwrap();
        assert!(live.active.iter().all(|e| !e.is_shootable()));
        assert!(live.active.iter().all(|e| !matches!(e.behavior, BehaviorKind::Shot(_))));
        let staged: Vec<BehaviorKind> =
            state.screens.pending().iter().map(|e| e.behavior).collect();
        assert_eq!(staged, vec![BehaviorKind::Explosion, BehaviorKind::Debris]);

        // Debris replaces the target in the repository
        let stored = state.screens.level().screen(0).unwrap().unwrap();
        let at_target: Vec<&Entity> = stored
            .active
            .iter()
            .filter(|e| e.origin == IVec2::new(288, 240))
            .collect();
        assert_eq!(at_target.len(), 1);
        assert_eq!(at_target[0].behavior, BehaviorKind::Debris);
    }

    #[test]
    fn test_walking_off_the_right_edge_changes_screen() {
        let mut state = game(vec![
            (0, floor_screen(Vec::new())),
            (1, floor_screen(Vec::new())),
        ]);
        state.player.set_position(IVec2::new(592, 240));

        assert!(tick_until(&mut state, &right(), 4, |s| s.current_screen() == 1));
        assert!(state.events.contains(&GameEvent::ScreenChanged { from: 0, to: 1 }));
        assert_eq!(state.player.position(), IVec2::new(600 - 624, 240));
    }

    #[test]
    fn test_render_order_defers_front_layer() {
        let mut screen = floor_screen(vec![tile(
            480,
            288,
            Sides::NONE,
            SpriteFlags::ACTIVE | SpriteFlags::IN_FRONT,
        )]);
        screen.background = vec![tile(0, 0, Sides::NONE, SpriteFlags::empty())].into();
        let state = game(vec![(0, screen)]);

        let mut canvas = RecordingCanvas::default();
        render(&state, &mut canvas);
        // 1 background + 13 floor + checkpoint pad + 2 player halves + front object
        assert_eq!(canvas.drawn.len(), 18);
        assert_eq!(canvas.drawn[0].1, IVec2::ZERO);
        assert_eq!(canvas.drawn[15].0.bank, Bank::Hero);
        assert_eq!(canvas.drawn[16].0.bank, Bank::Hero);
        assert_eq!(canvas.drawn[17].1, IVec2::new(480, 288));
    }

    #[test]
    fn test_absent_room_is_harmless() {
        let mut state = game(vec![(0, floor_screen(Vec::new()))]);
        state.screens.change_screen(77).unwrap();
        tick(&mut state, &right()).unwrap();
        let mut canvas = RecordingCanvas::default();
        render(&state, &mut canvas);
        assert_eq!(canvas.drawn.len(), 2);
    }
}
