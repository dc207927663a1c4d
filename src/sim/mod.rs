//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (by token ID)
//! - No rendering or platform dependencies

pub mod board;
pub mod cascade;
pub mod collision;
pub mod connectivity;
pub mod generate;
pub mod scoring;
pub mod state;
pub mod tick;
pub mod token;

pub use board::Board;
pub use cascade::{resolve_landing, resolve_sweep};
pub use collision::{CollisionTarget, detect, snap};
pub use connectivity::{MATCH_THRESHOLD, count_clusters, find_match, sweep_unanchored};
pub use generate::{StageLayout, generate_board, palette_size, stage_layout};
pub use scoring::{ComboTier, ScoreTable};
pub use state::{ClearResult, GameEvent, GameMode, GamePhase, GameState, SessionState};
pub use tick::{TickInput, fire, force_ceiling_advance, next_stage, start_game, tick};
pub use token::{PALETTE, Projectile, Token, TokenId, TokenKind};
