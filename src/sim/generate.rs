//! Stage board generation
//!
//! Lays out a staggered hex field of colored tokens, then converts some of
//! them to special kinds as the stage number climbs. Every conversion draws
//! from the tokens that are still colored, so no cell is converted twice.

use glam::Vec2;
use rand::Rng;

use super::board::Board;
use super::token::{PALETTE, TokenId, TokenKind};
use crate::consts::*;
use crate::tuning::Tuning;

/// Token size and field depth for a stage
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StageLayout {
    pub radius: f32,
    pub rows: u32,
}

/// Fewer, larger tokens early; more, smaller tokens later
pub fn stage_layout(stage: u32) -> StageLayout {
    match stage {
        0..=4 => StageLayout { radius: 1.0, rows: 5 },
        5..=8 => StageLayout { radius: 0.8, rows: 6 },
        _ => StageLayout { radius: 2.0 / 3.0, rows: 8 },
    }
}

/// Number of palette colors in play
pub fn palette_size(stage: u32) -> u8 {
    (4 + stage.saturating_sub(1) / 3).min(PALETTE.len() as u32) as u8
}

/// Bomb cap for a stage (zero before stage 5)
pub fn max_bombs(stage: u32) -> u32 {
    if stage < 5 {
        0
    } else {
        (1 + (stage - 5) / 2).min(4)
    }
}

/// Stars appear every other stage from stage 7
pub fn has_star(stage: u32) -> bool {
    stage >= 7 && (stage - 7) % 2 == 0
}

/// Build the opening board for a stage
pub fn generate_board<R: Rng>(stage: u32, rng: &mut R, tuning: &Tuning) -> Board {
    let layout = stage_layout(stage);
    let colors = palette_size(stage);
    let mut board = Board::new(BOARD_WIDTH, layout.radius);

    for row in 0..layout.rows {
        for col in 0..board.row_columns(row) {
            let kind = TokenKind::Colored(rng.random_range(0..colors));
            let pos = board.lattice_point(row, col);
            board.insert(pos, kind);
        }
    }

    log::info!(
        "Stage {}: radius={:.2}, rows={}, columns={}, colors={}",
        stage,
        layout.radius,
        layout.rows,
        board.columns(),
        colors
    );

    if stage >= 3 {
        place_powerup(&mut board, rng, layout.rows);
        place_blocked(&mut board, rng, tuning);
    }
    if stage >= 5 {
        convert_random(&mut board, rng, TokenKind::Bomb, max_bombs(stage));
    }
    if has_star(stage) {
        convert_random(&mut board, rng, TokenKind::Star, 1);
    }
    if stage >= 9 {
        convert_random(&mut board, rng, TokenKind::Paint, 2);
    }
    if stage >= 11 {
        convert_random(&mut board, rng, TokenKind::Mirror, 5);
    }

    board
}

fn colored_ids(board: &Board) -> Vec<TokenId> {
    board
        .tokens()
        .filter(|t| t.kind.is_colored())
        .map(|t| t.id)
        .collect()
}

fn convert(board: &mut Board, id: TokenId, kind: TokenKind) {
    if let Some(token) = board.get_mut(id) {
        token.recolor(kind);
    }
}

/// Convert `count` random colored tokens to `kind`
fn convert_random<R: Rng>(board: &mut Board, rng: &mut R, kind: TokenKind, count: u32) {
    for _ in 0..count {
        let candidates = colored_ids(board);
        if candidates.is_empty() {
            return;
        }
        let id = candidates[rng.random_range(0..candidates.len())];
        convert(board, id, kind);
    }
}

/// One PowerUp somewhere in the lower half of the field
fn place_powerup<R: Rng>(board: &mut Board, rng: &mut R, rows: u32) {
    let candidates: Vec<TokenId> = board
        .tokens()
        .filter(|t| t.kind.is_colored() && board.row_at(t.pos.y) >= rows / 2)
        .map(|t| t.id)
        .collect();
    if candidates.is_empty() {
        return;
    }
    let id = candidates[rng.random_range(0..candidates.len())];
    convert(board, id, TokenKind::PowerUp);
}

/// Scatter Blocked tokens away from the side columns and from each other.
/// A placement that runs out of attempts is skipped.
fn place_blocked<R: Rng>(board: &mut Board, rng: &mut R, tuning: &Tuning) {
    let colored = colored_ids(board).len();
    let target = (colored as f32 * tuning.blocked_ratio).round() as u32;
    let min_dist = tuning.blocked_min_spacing * board.spacing() - LATTICE_EPSILON;

    let mut blocked: Vec<Vec2> = Vec::new();
    let mut skipped = 0;
    for _ in 0..target {
        let mut placed = false;
        for _ in 0..tuning.placement_retries {
            let candidates = colored_ids(board);
            if candidates.is_empty() {
                break;
            }
            let id = candidates[rng.random_range(0..candidates.len())];
            let Some(pos) = board.get(id).map(|t| t.pos) else {
                continue;
            };

            let row = board.row_at(pos.y);
            let col = board.column_at(row, pos.x);
            if col == 0 || col + 1 >= board.row_columns(row) {
                continue;
            }
            if blocked.iter().any(|b| b.distance(pos) < min_dist) {
                continue;
            }

            convert(board, id, TokenKind::Blocked);
            blocked.push(pos);
            placed = true;
            break;
        }
        if !placed {
            skipped += 1;
        }
    }

    if skipped > 0 {
        log::debug!("Blocked placement: {} of {} skipped", skipped, target);
    }
}
