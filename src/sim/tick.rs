//! Fixed timestep simulation tick
//!
//! `tick` is the only per-frame entry point that mutates a game. A full
//! collision -> match -> cascade -> score pass completes inside one call.

use glam::Vec2;
use rand::distr::Distribution;
use rand::distr::weighted::WeightedIndex;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use super::board::Board;
use super::cascade::{resolve_landing, resolve_sweep};
use super::collision::{CollisionTarget, detect, integrate, launch_velocity, snap, substeps_for};
use super::generate::{generate_board, palette_size};
use super::state::{ClearResult, GameEvent, GameMode, GamePhase, GameState, SessionState};
use super::token::{Projectile, TokenKind};
use crate::consts::*;
use crate::net::attack_rows_for_drops;

/// Input commands for a single tick
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Aim direction (any length; y grows downward)
    pub aim: Option<Vec2>,
    /// Fire the queued preview token
    pub fire: bool,
    /// Pause toggle
    pub pause: bool,
}

/// Leave the menu (or a finished game) and start stage 1
pub fn start_game(state: &mut GameState) {
    let seed = state.session.seed;
    let mode = state.session.mode;
    state.session = SessionState::new(seed, mode, &state.tuning);
    state.rng = Pcg32::seed_from_u64(seed);
    state.inbox.clear();
    state.last_clear = None;
    begin_stage(state, 1);
    log::info!("Game started with seed {}", seed);
}

/// Move on from a cleared stage
pub fn next_stage(state: &mut GameState) {
    if state.session.phase != GamePhase::StageCleared {
        return;
    }
    let stage = state.session.stage + 1;
    begin_stage(state, stage);
}

fn begin_stage(state: &mut GameState, stage: u32) {
    let mut stage_rng = Pcg32::seed_from_u64(state.session.stage_seed(stage));
    state.board = generate_board(stage, &mut stage_rng, &state.tuning);
    state.projectile = None;

    let session = &mut state.session;
    session.stage = stage;
    session.reset_countdowns(&state.tuning);
    session.helper_line = false;
    session.phase = GamePhase::InGame;
    session.preview = Some(draw_preview(&state.board, stage, &mut state.rng));
}

/// Fire the queued preview along `aim`.
///
/// No-op unless in game, with no projectile in flight and a preview queued.
pub fn fire(state: &mut GameState, aim: Vec2) {
    if state.session.phase != GamePhase::InGame || state.projectile.is_some() {
        return;
    }
    let Some(kind) = state.session.preview.take() else {
        return;
    };

    let vel = launch_velocity(aim, state.tuning.projectile_speed, state.tuning.min_aim_angle);
    state.projectile = Some(Projectile::new(
        Vec2::new(LAUNCHER_X, LAUNCHER_Y),
        vel,
        state.board.radius,
        kind,
    ));
    state.session.shots_until_advance = state.session.shots_until_advance.saturating_sub(1);
    state.session.shots_fired += 1;
    state.emit(GameEvent::ShotFired { kind });
}

/// Push the whole board down one row, sweep once, and refill both countdowns
pub fn force_ceiling_advance(state: &mut GameState) -> ClearResult {
    state.board.advance_ceiling();
    let mut result = resolve_sweep(&mut state.board, &state.tuning);
    state.session.reset_countdowns(&state.tuning);
    log::info!("Ceiling advanced to {:.2}", state.board.ceiling_offset);
    state.emit(GameEvent::CeilingAdvanced {
        ceiling_offset: state.board.ceiling_offset,
    });
    apply_result(state, &mut result);
    result
}

/// Advance the game by one frame
pub fn tick(state: &mut GameState, input: &TickInput, dt: f32) {
    // Handle pause toggle
    if input.pause {
        match state.session.phase {
            GamePhase::InGame => {
                state.session.phase = GamePhase::Paused;
                // Leaving play cancels the shot in flight; its token goes back
                // to the launcher and the board stays as it was
                if let Some(projectile) = state.projectile.take() {
                    state.session.preview = Some(projectile.kind);
                    state.session.refund_shot(&state.tuning);
                }
                return;
            }
            GamePhase::Paused => {
                state.session.phase = GamePhase::InGame;
            }
            _ => {}
        }
    }

    match state.session.phase {
        GamePhase::InGame => {}
        GamePhase::StageCleared | GamePhase::GameOver => {
            // Late network messages after the match has ended are dropped
            state.inbox.clear();
            return;
        }
        GamePhase::MainMenu | GamePhase::Paused => return,
    }

    // Attacks queued since the last frame land before anything else moves
    for rows in state.inbox.drain() {
        state
            .board
            .add_garbage_rows(rows, state.tuning.garbage_mirror_chance, &mut state.rng);
        state.emit(GameEvent::GarbageReceived { rows });
        let mut result = resolve_sweep(&mut state.board, &state.tuning);
        apply_result(state, &mut result);
    }

    state.session.time_until_advance -= dt;
    if state.session.time_until_advance <= 0.0 {
        force_ceiling_advance(state);
    }

    if input.fire {
        fire(state, input.aim.unwrap_or(Vec2::NEG_Y));
    }

    step_projectile(state, dt);
    check_end_conditions(state);
}

/// Integrate the projectile and resolve a landing
fn step_projectile(state: &mut GameState, dt: f32) {
    let Some(mut projectile) = state.projectile.take() else {
        return;
    };

    let steps = substeps_for(&projectile, dt);
    let sub_dt = dt / steps as f32;
    for _ in 0..steps {
        integrate(&mut projectile, sub_dt, state.board.width);
        if let Some(target) = detect(&projectile, &state.board) {
            land(state, &projectile, target);
            return;
        }
    }

    // Anything that somehow escapes downward is discarded
    if projectile.pos.y > LAUNCHER_Y + state.board.spacing() * 4.0 {
        log::warn!("Projectile left the board at {:?}", projectile.pos);
        state.session.preview = Some(draw_preview(&state.board, state.session.stage, &mut state.rng));
        return;
    }
    state.projectile = Some(projectile);
}

fn land(state: &mut GameState, projectile: &Projectile, target: CollisionTarget) {
    let cell = snap(&state.board, projectile.pos, Some(target));
    let landed = state.board.insert(cell, projectile.kind);
    let mut result = resolve_landing(&mut state.board, landed, target, &state.tuning);

    if let GameMode::Versus { .. } = state.session.mode {
        let rows = attack_rows_for_drops(result.dropped.len(), &state.tuning);
        if rows > 0 {
            state.emit(GameEvent::AttackSent { rows });
        }
    }
    apply_result(state, &mut result);
    // A landing always replaces the previous clear, even when nothing moved
    state.last_clear = Some(result);

    state.session.preview = Some(draw_preview(&state.board, state.session.stage, &mut state.rng));
    if state.session.shots_until_advance == 0 {
        force_ceiling_advance(state);
    }
}

/// Score a pass, publish its events and keep it for presentation
fn apply_result(state: &mut GameState, result: &mut ClearResult) {
    state.tuning.scoring.finalize(result);
    if result.is_empty() {
        return;
    }

    state.session.score += result.score;
    if result.helper_line_activated && !state.session.helper_line {
        state.session.helper_line = true;
        state.emit(GameEvent::HelperLineActivated);
    }

    for center in &result.blasts {
        state.emit(GameEvent::BombDetonated { pos: *center });
    }
    for token in &result.popped {
        state.emit(GameEvent::TokenPopped {
            kind: token.kind,
            pos: token.pos,
        });
    }
    for token in &result.dropped {
        state.emit(GameEvent::TokenDropped {
            kind: token.kind,
            pos: token.pos,
        });
    }
    state.emit(GameEvent::ScoreAwarded {
        points: result.score,
        combo: result.combo,
    });
    state.last_clear = Some(result.clone());
}

fn check_end_conditions(state: &mut GameState) {
    if state.session.phase != GamePhase::InGame {
        return;
    }
    if !state.board.has_colored() {
        state.session.phase = GamePhase::StageCleared;
        state.projectile = None;
        log::info!("Stage {} cleared, score {}", state.session.stage, state.session.score);
        state.emit(GameEvent::StageCleared {
            stage: state.session.stage,
        });
    } else if state
        .board
        .lowest_edge()
        .is_some_and(|edge| edge > state.tuning.danger_line)
    {
        state.session.phase = GamePhase::GameOver;
        state.projectile = None;
        log::info!("Game over at stage {}, score {}", state.session.stage, state.session.score);
        state.emit(GameEvent::GameOver {
            score: state.session.score,
        });
    }
}

/// Next projectile kind, weighted by the colors still on the board.
/// Falls back to the stage palette when no colored token is left.
pub fn draw_preview<R: Rng>(board: &Board, stage: u32, rng: &mut R) -> TokenKind {
    let counts = board.colored_counts();
    if let Ok(dist) = WeightedIndex::new(counts) {
        return TokenKind::Colored(dist.sample(rng) as u8);
    }
    TokenKind::Colored(rng.random_range(0..palette_size(stage.max(1))))
}

/// Aim vector from the launcher toward a board point
pub fn aim_at(target: Vec2) -> Vec2 {
    target - Vec2::new(LAUNCHER_X, LAUNCHER_Y)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::token::TokenId;
    use crate::tuning::Tuning;

    const RED: TokenKind = TokenKind::Colored(0);
    const BLUE: TokenKind = TokenKind::Colored(1);

    fn running(seed: u64) -> GameState {
        let mut state = GameState::new(seed, Tuning::default());
        start_game(&mut state);
        state
    }

    /// Replace the generated board with a hand-built one
    fn custom_board(state: &mut GameState, cells: &[(u32, u32, TokenKind)]) -> Vec<TokenId> {
        state.board = Board::new(BOARD_WIDTH, 1.0);
        cells
            .iter()
            .map(|&(row, col, kind)| {
                let p = state.board.lattice_point(row, col);
                state.board.insert(p, kind)
            })
            .collect()
    }

    fn run_until_landed(state: &mut GameState) {
        for _ in 0..2000 {
            tick(state, &TickInput::default(), SIM_DT);
            if state.projectile.is_none() {
                return;
            }
        }
        panic!("projectile never landed");
    }

    #[test]
    fn test_start_game_enters_stage_one() {
        let state = running(5);
        assert_eq!(state.phase(), GamePhase::InGame);
        assert_eq!(state.session.stage, 1);
        assert!(state.session.preview.is_some());
        assert!(!state.board.is_empty());
    }

    #[test]
    fn test_fire_is_noop_when_busy_or_empty() {
        let mut state = running(5);
        fire(&mut state, Vec2::NEG_Y);
        assert!(state.projectile.is_some());
        assert_eq!(state.session.shots_until_advance, 7);

        // Already in flight
        let before = state.projectile.clone();
        fire(&mut state, Vec2::NEG_Y);
        assert_eq!(state.projectile, before);
        assert_eq!(state.session.shots_until_advance, 7);

        // No preview queued
        state.projectile = None;
        assert!(state.session.preview.is_none());
        fire(&mut state, Vec2::NEG_Y);
        assert!(state.projectile.is_none());
    }

    #[test]
    fn test_fire_clamps_flat_aim() {
        let mut state = running(5);
        fire(&mut state, Vec2::new(1.0, 0.0));
        let vel = state.projectile.as_ref().map(|p| p.vel).unwrap();
        assert!(vel.y < 0.0);
        assert!((vel.length() - state.tuning.projectile_speed).abs() < 1e-3);
    }

    #[test]
    fn test_shot_into_gap_pops_three() {
        let mut state = running(1);
        custom_board(&mut state, &[(0, 3, RED), (0, 4, RED), (0, 0, BLUE)]);
        state.session.preview = Some(RED);
        let score_before = state.session.score;

        // Gap below columns 3 and 4 is the staggered cell (1, 3)
        let target = state.board.lattice_point(1, 3);
        tick(
            &mut state,
            &TickInput {
                aim: Some(aim_at(target)),
                fire: true,
                ..Default::default()
            },
            SIM_DT,
        );
        run_until_landed(&mut state);

        let clear = state.last_clear().cloned().unwrap();
        assert_eq!(clear.popped.len(), 3);
        assert!(clear.dropped.is_empty());
        assert_eq!(clear.score, 3 * state.tuning.scoring.pop_value);
        assert_eq!(state.session.score - score_before, clear.score);
        // Only blue is left, so the next preview must be blue
        assert_eq!(state.session.preview, Some(BLUE));
        let events = state.drain_events();
        assert_eq!(
            events
                .iter()
                .filter(|e| matches!(e, GameEvent::TokenPopped { .. }))
                .count(),
            3
        );
    }

    #[test]
    fn test_quiet_landing_replaces_last_clear() {
        let mut state = running(1);
        custom_board(&mut state, &[(0, 3, RED), (0, 4, RED), (0, 0, BLUE)]);
        state.session.preview = Some(RED);
        let target = state.board.lattice_point(1, 3);
        fire(&mut state, aim_at(target));
        run_until_landed(&mut state);
        assert_eq!(state.last_clear().map(|c| c.popped.len()), Some(3));

        // Straight up into the emptied ceiling row, far from the blue token
        state.session.preview = Some(BLUE);
        fire(&mut state, Vec2::NEG_Y);
        run_until_landed(&mut state);

        let clear = state.last_clear().cloned().unwrap();
        assert!(clear.is_empty());
        assert!(clear.finalized);
        assert_eq!(clear.score, 0);
        assert_eq!(state.board.len(), 2);
    }

    #[test]
    fn test_forced_advance_geometry_and_single_sweep() {
        let mut state = running(9);
        let before: Vec<Vec2> = state.board.tokens().map(|t| t.pos).collect();
        let ceiling = state.board.ceiling_offset;
        let sweeps = state.board.sweep_count();
        state.session.shots_until_advance = 2;
        state.session.time_until_advance = 1.0;

        force_ceiling_advance(&mut state);

        let dy = state.board.row_height();
        assert!((state.board.ceiling_offset - ceiling - dy).abs() < 1e-5);
        for (old, new) in before.iter().zip(state.board.tokens().map(|t| t.pos)) {
            assert!((new.y - old.y - dy).abs() < 1e-4);
            assert_eq!(new.x, old.x);
        }
        assert_eq!(state.board.sweep_count(), sweeps + 1);
        assert_eq!(state.session.shots_until_advance, state.tuning.shots_per_advance);
        assert_eq!(state.session.time_until_advance, state.tuning.seconds_per_advance);
    }

    #[test]
    fn test_timer_forces_advance() {
        let mut state = running(2);
        let ceiling = state.board.ceiling_offset;
        state.session.time_until_advance = SIM_DT / 2.0;
        tick(&mut state, &TickInput::default(), SIM_DT);
        assert!(state.board.ceiling_offset > ceiling);
        assert!(
            state
                .drain_events()
                .iter()
                .any(|e| matches!(e, GameEvent::CeilingAdvanced { .. }))
        );
    }

    #[test]
    fn test_last_shot_forces_advance() {
        let mut state = running(2);
        custom_board(&mut state, &[(0, 0, BLUE), (0, 7, RED)]);
        state.session.shots_until_advance = 1;
        state.session.preview = Some(BLUE);
        let ceiling = state.board.ceiling_offset;

        tick(
            &mut state,
            &TickInput {
                aim: Some(Vec2::NEG_Y),
                fire: true,
                ..Default::default()
            },
            SIM_DT,
        );
        assert_eq!(state.session.shots_until_advance, 0);
        run_until_landed(&mut state);

        assert!(state.board.ceiling_offset > ceiling);
        assert_eq!(state.session.shots_until_advance, state.tuning.shots_per_advance);
    }

    #[test]
    fn test_pause_discards_projectile_and_keeps_board() {
        let mut state = running(3);
        fire(&mut state, Vec2::NEG_Y);
        let tokens = state.board.len();

        let pause = TickInput {
            pause: true,
            ..Default::default()
        };
        tick(&mut state, &pause, SIM_DT);
        assert_eq!(state.phase(), GamePhase::Paused);
        assert!(state.projectile.is_none());
        assert!(state.session.preview.is_some());
        assert_eq!(state.board.len(), tokens);

        // Paused ticks do not run timers
        let timer = state.session.time_until_advance;
        tick(&mut state, &TickInput::default(), 1.0);
        assert_eq!(state.session.time_until_advance, timer);

        tick(&mut state, &pause, SIM_DT);
        assert_eq!(state.phase(), GamePhase::InGame);
    }

    #[test]
    fn test_cancelled_shots_do_not_spend_budget() {
        let mut state = running(3);
        let budget = state.session.shots_until_advance;
        let kind = state.session.preview;
        let pause = TickInput {
            pause: true,
            ..Default::default()
        };

        for _ in 0..3 {
            fire(&mut state, Vec2::NEG_Y);
            assert_eq!(state.session.shots_until_advance, budget - 1);
            tick(&mut state, &pause, SIM_DT);
            tick(&mut state, &pause, SIM_DT);
        }

        assert_eq!(state.session.shots_until_advance, budget);
        assert_eq!(state.session.shots_fired, 0);
        assert_eq!(state.session.preview, kind);
        assert!(state.projectile.is_none());
    }

    #[test]
    fn test_clearing_last_color_ends_stage() {
        let mut state = running(4);
        custom_board(&mut state, &[(0, 3, RED), (0, 4, RED), (0, 0, TokenKind::Blocked)]);
        state.session.preview = Some(RED);
        let target = state.board.lattice_point(1, 3);
        fire(&mut state, aim_at(target));
        run_until_landed(&mut state);

        assert_eq!(state.phase(), GamePhase::StageCleared);
        next_stage(&mut state);
        assert_eq!(state.phase(), GamePhase::InGame);
        assert_eq!(state.session.stage, 2);
    }

    #[test]
    fn test_token_below_danger_line_ends_game() {
        let mut state = running(4);
        let danger = state.tuning.danger_line;
        custom_board(&mut state, &[(0, 0, RED)]);
        // Hang a column down past the danger line
        let mut row = 1;
        while state.board.lattice_point(row, 0).y + 1.0 <= danger {
            row += 1;
        }
        for r in 1..=row {
            let p = state.board.lattice_point(r, 0);
            state.board.insert(p, BLUE);
        }

        tick(&mut state, &TickInput::default(), SIM_DT);
        assert_eq!(state.phase(), GamePhase::GameOver);
        assert!(
            state
                .drain_events()
                .iter()
                .any(|e| matches!(e, GameEvent::GameOver { .. }))
        );
    }

    #[test]
    fn test_preview_only_uses_colors_on_board() {
        let mut board = Board::new(BOARD_WIDTH, 1.0);
        board.insert(board.lattice_point(0, 0), TokenKind::Colored(3));
        board.insert(board.lattice_point(0, 1), TokenKind::Blocked);
        let mut rng = Pcg32::seed_from_u64(11);
        for _ in 0..50 {
            assert_eq!(draw_preview(&board, 1, &mut rng), TokenKind::Colored(3));
        }

        // Nothing colored: any palette color for the stage
        let empty = Board::new(BOARD_WIDTH, 1.0);
        for _ in 0..50 {
            let kind = draw_preview(&empty, 1, &mut rng);
            assert!(matches!(kind, TokenKind::Colored(c) if c < palette_size(1)));
        }
    }

    #[test]
    fn test_versus_attack_applied_at_tick_start() {
        let mut state = GameState::new_versus(1, 500, Tuning::default());
        start_game(&mut state);
        let tokens = state.board.len();
        let columns = state.board.columns();

        state.receive_attack(1);
        assert_eq!(state.inbox.len(), 1);
        tick(&mut state, &TickInput::default(), SIM_DT);

        assert!(state.inbox.is_empty());
        let garbage_row = state.board.row_columns(0) as usize;
        assert!(garbage_row == columns as usize || garbage_row + 1 == columns as usize);
        assert_eq!(state.board.len(), tokens + garbage_row);
        assert!(
            state
                .board
                .tokens()
                .filter(|t| state.board.row_at(t.pos.y) == 0)
                .all(|t| matches!(t.kind, TokenKind::Garbage | TokenKind::Mirror))
        );
    }

    #[test]
    fn test_attack_after_game_over_is_ignored() {
        let mut state = GameState::new_versus(1, 500, Tuning::default());
        start_game(&mut state);
        state.inbox.push(3);
        state.session.phase = GamePhase::GameOver;

        state.receive_attack(2);
        tick(&mut state, &TickInput::default(), SIM_DT);
        assert!(state.inbox.is_empty());
    }

    #[test]
    fn test_versus_peers_share_layout() {
        let mut a = GameState::new_versus(1, 77, Tuning::default());
        let mut b = GameState::new_versus(2, 77, Tuning::default());
        start_game(&mut a);
        start_game(&mut b);
        let la: Vec<_> = a.board.tokens().map(|t| (t.pos, t.kind)).collect();
        let lb: Vec<_> = b.board.tokens().map(|t| (t.pos, t.kind)).collect();
        assert_eq!(la, lb);
    }

    #[test]
    fn test_determinism() {
        let mut state1 = running(99999);
        let mut state2 = running(99999);

        let inputs = [
            TickInput {
                aim: Some(Vec2::new(-0.4, -1.0)),
                fire: true,
                ..Default::default()
            },
            TickInput::default(),
            TickInput {
                aim: Some(Vec2::new(0.7, -1.0)),
                fire: true,
                ..Default::default()
            },
        ];

        for _ in 0..200 {
            for input in &inputs {
                tick(&mut state1, input, SIM_DT);
                tick(&mut state2, input, SIM_DT);
            }
        }

        assert_eq!(state1.session, state2.session);
        let b1: Vec<_> = state1.board.tokens().map(|t| (t.pos, t.kind)).collect();
        let b2: Vec<_> = state2.board.tokens().map(|t| (t.pos, t.kind)).collect();
        assert_eq!(b1, b2);
    }
}
