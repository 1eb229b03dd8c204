//! Electroman core demo
//!
//! Builds a small two-screen level in code and plays a scripted run through
//! it without a window. `RUST_LOG=debug` shows state transitions.
//!
//! Usage: `electroman-core [tuning.json]`

use electroman_core::level::{LevelDesc, SpriteSetDesc, SpriteTable, build_level};
use electroman_core::persistence::SaveData;
use electroman_core::sim::{
    Canvas, GameEvent, GamePhase, GameState, SpriteRef, TickInput, render, tick,
};
use electroman_core::{SimError, Tuning};

/// Hard stop for the scripted run
const MAX_TICKS: u64 = 400;

// First sprite set
const FLOOR: u8 = 3;
const WALL: u8 = 4;
const BATTERY: u8 = 8;
const FLOPPY: u8 = 9;
const CHECKPOINT: u8 = 10;
// Second sprite set
const CRATE: u8 = 64;
const EXIT: u8 = 64 + 6;

const START_SCREEN: usize = 17;
const END_SCREEN: usize = 18;

/// Full-tile box with every side solid
const SOLID_BOX: [u8; 4] = [0, 24, 0, 24];
/// Full-tile box that never blocks
const OPEN_BOX: [u8; 4] = [0x80, 0x98, 0x80, 0x98];

fn status(flags: u8, action: u8, touch: u8, bbox: [u8; 4]) -> [u8; 8] {
    [flags, action, 0, touch, bbox[0], bbox[1], bbox[2], bbox[3]]
}

fn sprite_sets() -> Result<(SpriteSetDesc, SpriteSetDesc), SimError> {
    let mut first = SpriteSetDesc::new();
    first.set_sprite(FLOOR as usize, status(0x80, 0, 0, SOLID_BOX))?;
    first.set_sprite(WALL as usize, status(0x80, 0, 0, SOLID_BOX))?;
    first.set_sprite(BATTERY as usize, status(0xC0, 4, 1, OPEN_BOX))?;
    first.set_sprite(FLOPPY as usize, status(0xC0, 4, 5, OPEN_BOX))?;
    first.set_sprite(CHECKPOINT as usize, status(0xC0, 12, 3, OPEN_BOX))?;

    let mut second = SpriteSetDesc::new();
    second.set_sprite(CRATE as usize - 64, status(0xA8, 4, 0, SOLID_BOX))?;
    second.set_sprite(EXIT as usize - 64, status(0xC0, 15, 6, OPEN_BOX))?;
    Ok((first, second))
}

fn demo_level() -> Result<LevelDesc, SimError> {
    let mut desc = LevelDesc::new("demo1", "demo2");

    // Start screen: walled on the left and above, open to the right
    for col in 0..13 {
        desc.set_tile(START_SCREEN, 1, col, 0, WALL)?;
        desc.set_tile(START_SCREEN, 1, col, 7, FLOOR)?;
    }
    for row in 1..7 {
        desc.set_tile(START_SCREEN, 1, 0, row, WALL)?;
    }
    desc.set_tile(START_SCREEN, 2, 1, 6, CHECKPOINT)?;
    desc.set_tile(START_SCREEN, 2, 4, 6, BATTERY)?;
    desc.set_tile(START_SCREEN, 2, 8, 6, FLOPPY)?;

    // Second screen: a crate to shoot and the exit against the right wall
    for col in 0..13 {
        desc.set_tile(END_SCREEN, 1, col, 0, WALL)?;
        desc.set_tile(END_SCREEN, 1, col, 7, FLOOR)?;
    }
    for row in 1..7 {
        desc.set_tile(END_SCREEN, 1, 12, row, WALL)?;
    }
    desc.set_tile(END_SCREEN, 2, 6, 6, CRATE)?;
    desc.set_tile(END_SCREEN, 2, 10, 6, EXIT)?;

    Ok(desc)
}

/// Scripted controls: wait, walk right, and tap fire on the second screen
fn scripted_input(state: &GameState) -> TickInput {
    let t = state.time_ticks;
    let on_end_screen = state.current_screen() as usize == END_SCREEN;
    TickInput {
        right: t >= 10,
        fire: on_end_screen && t % 8 == 0,
        ..Default::default()
    }
}

/// Counts draw calls instead of drawing
#[derive(Default)]
struct CountingCanvas {
    sprites: usize,
}

impl Canvas for CountingCanvas {
    fn draw_sprite(&mut self, _sprite: SpriteRef, _position: glam::IVec2) {
        self.sprites += 1;
    }
}

fn run() -> Result<(), SimError> {
    let tuning = match std::env::args().nth(1) {
        Some(path) => Tuning::load(path)?,
        None => Tuning {
            exit_required_items: 1,
            ..Default::default()
        },
    };

    let (first, second) = sprite_sets()?;
    let mut table = SpriteTable::new(&first, &second)?;
    let level = build_level(&demo_level()?, &mut table)?;
    let mut state = GameState::new(1, level, tuning)?;

    let mut canvas = CountingCanvas::default();
    let mut last_state = state.player.state();
    while state.phase == GamePhase::Playing && state.time_ticks < MAX_TICKS {
        let input = scripted_input(&state);
        tick(&mut state, &input)?;

        if state.player.state() != last_state {
            log::debug!(
                "t={} player {:?} -> {:?}",
                state.time_ticks,
                last_state,
                state.player.state()
            );
            last_state = state.player.state();
        }
        for event in &state.events {
            match event {
                GameEvent::ShotFired { .. } => log::debug!("t={} {:?}", state.time_ticks, event),
                _ => log::info!("t={} {:?}", state.time_ticks, event),
            }
        }
        render(&state, &mut canvas);
    }

    let save = SaveData::from_state(&state);
    println!("Electroman core demo");
    println!("  ticks run:       {}", state.time_ticks);
    println!("  phase:           {:?}", state.phase);
    println!("  screen:          {}", state.current_screen());
    println!("  player:          {:?} at {:?}", state.player.state(), state.player.position());
    println!("  items collected: {}", state.items_collected());
    println!("  power:           {}", state.power());
    println!("  sprites drawn:   {}", canvas.sprites);
    println!("  save data:       {}", save.to_json()?.replace('\n', " "));
    Ok(())
}

fn main() {
    #[cfg(not(target_arch = "wasm32"))]
    env_logger::init();

    log::info!("Electroman core demo starting...");
    if let Err(e) = run() {
        log::error!("Demo failed: {}", e);
        std::process::exit(1);
    }
}
