//! Hex Cascade headless demo
//!
//! Plays a seeded game with a naive aim bot and logs every event.
//!
//! Usage: `hex-cascade [tuning.json] [seed]`

#[cfg(not(target_arch = "wasm32"))]
use hex_cascade::{
    Tuning,
    consts::SIM_DT,
    sim::{GameEvent, GamePhase, GameState, TickInput, next_stage, start_game, tick, tick::aim_at},
};

/// Ten simulated minutes
#[cfg(not(target_arch = "wasm32"))]
const MAX_TICKS: u32 = 120 * 600;
#[cfg(not(target_arch = "wasm32"))]
const LAST_STAGE: u32 = 12;

#[cfg(not(target_arch = "wasm32"))]
fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let tuning = match args.next() {
        Some(path) => {
            log::info!("Loading tuning from {}", path);
            Tuning::from_json(&std::fs::read_to_string(path)?)?
        }
        None => Tuning::default(),
    };
    let seed = match args.next() {
        Some(s) => s.parse()?,
        None => 12345,
    };

    log::info!("Hex Cascade demo starting (seed {})", seed);
    let mut state = GameState::new(seed, tuning);
    start_game(&mut state);

    for frame in 0..MAX_TICKS {
        let input = TickInput {
            aim: Some(choose_aim(&state)),
            fire: state.projectile.is_none(),
            pause: false,
        };
        tick(&mut state, &input, SIM_DT);

        for event in state.drain_events() {
            match event {
                GameEvent::TokenPopped { .. } | GameEvent::TokenDropped { .. } => {
                    log::trace!("{:?}", event)
                }
                _ => log::debug!("{:?}", event),
            }
        }

        match state.phase() {
            GamePhase::StageCleared if state.session.stage < LAST_STAGE => next_stage(&mut state),
            GamePhase::StageCleared | GamePhase::GameOver => {
                log::info!("Stopped after {} ticks", frame + 1);
                break;
            }
            _ => {}
        }
    }

    println!(
        "stage {} | score {} | shots {} | phase {:?}",
        state.session.stage,
        state.session.score,
        state.session.shots_fired,
        state.phase()
    );
    Ok(())
}

/// Aim at the lowest resting token sharing the preview's kind, else straight up
#[cfg(not(target_arch = "wasm32"))]
fn choose_aim(state: &GameState) -> glam::Vec2 {
    let Some(kind) = state.session.preview else {
        return glam::Vec2::NEG_Y;
    };
    state
        .board()
        .tokens()
        .filter(|t| t.kind == kind)
        .max_by(|a, b| a.pos.y.total_cmp(&b.pos.y))
        .map(|t| aim_at(t.pos))
        .unwrap_or(glam::Vec2::NEG_Y)
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // Library-only on wasm; the host drives `tick` directly
}
