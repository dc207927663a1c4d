//! Save/load persistence
//!
//! A snapshot is a versioned JSON envelope holding the session counters, the
//! ceiling geometry and every resting token as (position, type byte). Display
//! colors are not stored; they are derived from the kind on restore. The RNG
//! state is not stored either: a restored game reseeds from the run seed and
//! shot count.

use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::sim::board::Board;
use crate::sim::state::{GameMode, GamePhase, GameState};
use crate::sim::token::TokenKind;
use crate::tuning::Tuning;

pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("malformed snapshot: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unsupported snapshot version {0} (expected {SNAPSHOT_VERSION})")]
    UnsupportedVersion(u32),
    #[error("unknown token type byte {0:#04x}")]
    UnknownType(u8),
}

/// One resting token
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TokenRecord {
    pub x: f32,
    pub y: f32,
    pub kind: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: u32,
    pub seed: u64,
    pub mode: GameMode,
    pub stage: u32,
    pub score: u64,
    pub shots_until_advance: u32,
    pub time_until_advance: f32,
    pub shots_fired: u64,
    pub helper_line: bool,
    /// Queued projectile kind as a type byte
    pub preview: Option<u8>,
    pub ceiling_offset: f32,
    pub width: f32,
    pub radius: f32,
    pub top_row_offset: bool,
    pub tokens: Vec<TokenRecord>,
}

impl Snapshot {
    /// Record a game. A projectile in flight is not saved; its kind goes
    /// back into the preview slot and the shot is refunded.
    pub fn capture(state: &GameState) -> Self {
        let mut session = state.session.clone();
        if state.projectile.is_some() {
            session.refund_shot(&state.tuning);
        }
        let board = state.board();
        let preview = state
            .projectile
            .as_ref()
            .map(|p| p.kind)
            .or(session.preview)
            .map(|k| k.type_byte());

        Self {
            version: SNAPSHOT_VERSION,
            seed: session.seed,
            mode: session.mode,
            stage: session.stage,
            score: session.score,
            shots_until_advance: session.shots_until_advance,
            time_until_advance: session.time_until_advance,
            shots_fired: session.shots_fired,
            helper_line: session.helper_line,
            preview,
            ceiling_offset: board.ceiling_offset,
            width: board.width,
            radius: board.radius,
            top_row_offset: board.top_row_offset(),
            tokens: board
                .tokens()
                .map(|t| TokenRecord {
                    x: t.pos.x,
                    y: t.pos.y,
                    kind: t.kind.type_byte(),
                })
                .collect(),
        }
    }

    pub fn to_json(&self) -> Result<String, PersistenceError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, PersistenceError> {
        let snapshot: Self = serde_json::from_str(json)?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(PersistenceError::UnsupportedVersion(snapshot.version));
        }
        Ok(snapshot)
    }

    /// Rebuild a paused game from this snapshot
    pub fn restore(&self, tuning: Tuning) -> Result<GameState, PersistenceError> {
        if self.version != SNAPSHOT_VERSION {
            return Err(PersistenceError::UnsupportedVersion(self.version));
        }

        let mut board = Board::with_geometry(
            self.width,
            self.radius,
            self.ceiling_offset,
            self.top_row_offset,
        );
        for record in &self.tokens {
            let kind = decode_kind(record.kind)?;
            board.insert(glam::Vec2::new(record.x, record.y), kind);
        }
        let preview = self.preview.map(decode_kind).transpose()?;

        let mut state = match self.mode {
            GameMode::Solo => GameState::new(self.seed, tuning),
            GameMode::Versus { shared_seed } => GameState::new_versus(self.seed, shared_seed, tuning),
        };
        state.board = board;
        state.rng = Pcg32::seed_from_u64(self.seed.wrapping_add(self.shots_fired));

        let session = &mut state.session;
        session.stage = self.stage;
        session.score = self.score;
        session.shots_until_advance = self.shots_until_advance;
        session.time_until_advance = self.time_until_advance;
        session.shots_fired = self.shots_fired;
        session.helper_line = self.helper_line;
        session.preview = preview;
        session.phase = GamePhase::Paused;

        log::info!(
            "Restored stage {} with {} tokens, score {}",
            self.stage,
            self.tokens.len(),
            self.score
        );
        Ok(state)
    }
}

fn decode_kind(byte: u8) -> Result<TokenKind, PersistenceError> {
    TokenKind::from_type_byte(byte).ok_or(PersistenceError::UnknownType(byte))
}
