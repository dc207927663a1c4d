//! Game state and core simulation types
//!
//! `SessionState` holds the per-stage counters and is passed explicitly to
//! every orchestrator function; `GameState` bundles it with the board, the
//! active projectile and the seeded RNG so a whole game can run headless.

use glam::Vec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::board::Board;
use super::token::{Projectile, Token, TokenKind};
use crate::consts::*;
use crate::net::AttackInbox;
use crate::tuning::Tuning;

/// Current phase of play
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    MainMenu,
    /// Active gameplay
    InGame,
    Paused,
    /// No colored tokens left; waiting for `next_stage`
    StageCleared,
    /// A token crossed the danger line
    GameOver,
}

/// Solo play or seeded head-to-head
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameMode {
    Solo,
    /// Both peers build their boards from `shared_seed`
    Versus { shared_seed: u64 },
}

/// Per-stage mutable counters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    /// Run seed for reproducibility
    pub seed: u64,
    pub mode: GameMode,
    /// Stage number (1-based, 0 before the first stage)
    pub stage: u32,
    pub score: u64,
    /// Shots left before the ceiling is forced down
    pub shots_until_advance: u32,
    /// Seconds left before the ceiling is forced down
    pub time_until_advance: f32,
    /// Queued next projectile kind
    pub preview: Option<TokenKind>,
    /// Aiming helper line unlocked by a popped PowerUp
    pub helper_line: bool,
    pub phase: GamePhase,
    /// Shots fired this game
    pub shots_fired: u64,
}

impl SessionState {
    pub fn new(seed: u64, mode: GameMode, tuning: &Tuning) -> Self {
        Self {
            seed,
            mode,
            stage: 0,
            score: 0,
            shots_until_advance: tuning.shots_per_advance,
            time_until_advance: tuning.seconds_per_advance,
            preview: None,
            helper_line: false,
            phase: GamePhase::MainMenu,
            shots_fired: 0,
        }
    }

    /// Refill both ceiling countdowns
    pub fn reset_countdowns(&mut self, tuning: &Tuning) {
        self.shots_until_advance = tuning.shots_per_advance;
        self.time_until_advance = tuning.seconds_per_advance;
    }

    /// Undo the charge for a shot that never landed
    pub fn refund_shot(&mut self, tuning: &Tuning) {
        self.shots_until_advance = (self.shots_until_advance + 1).min(tuning.shots_per_advance);
        self.shots_fired = self.shots_fired.saturating_sub(1);
    }

    /// Seed used to build the board for a stage
    pub fn stage_seed(&self, stage: u32) -> u64 {
        let base = match self.mode {
            GameMode::Solo => self.seed,
            GameMode::Versus { shared_seed } => shared_seed,
        };
        base.wrapping_add((stage as u64).wrapping_mul(2654435761))
    }
}

/// Output of one resolution pass; consumed by the orchestrator, never persisted
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClearResult {
    /// Removed by match or effect
    pub popped: Vec<Token>,
    /// Removed because they lost their path to the ceiling
    pub dropped: Vec<Token>,
    /// Bomb detonation centers, in trigger order
    pub blasts: Vec<Vec2>,
    /// Connected components among the dropped tokens
    pub drop_clusters: u32,
    pub helper_line_activated: bool,
    /// Filled by the scoring engine
    pub score: u64,
    pub combo: u32,
    pub finalized: bool,
}

impl ClearResult {
    /// Independent events used for the combo tier
    pub fn events(&self) -> u32 {
        self.drop_clusters + self.blasts.len() as u32
    }

    pub fn is_empty(&self) -> bool {
        self.popped.is_empty() && self.dropped.is_empty()
    }
}

/// Fire-and-forget notifications for audio / score UI collaborators
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    ShotFired { kind: TokenKind },
    TokenPopped { kind: TokenKind, pos: Vec2 },
    TokenDropped { kind: TokenKind, pos: Vec2 },
    BombDetonated { pos: Vec2 },
    HelperLineActivated,
    ScoreAwarded { points: u64, combo: u32 },
    CeilingAdvanced { ceiling_offset: f32 },
    GarbageReceived { rows: u32 },
    /// Outgoing attack for the network collaborator
    AttackSent { rows: u32 },
    StageCleared { stage: u32 },
    GameOver { score: u64 },
}

/// Complete simulation state for one player
#[derive(Debug, Clone)]
pub struct GameState {
    pub session: SessionState,
    pub board: Board,
    /// The single moving token, if any
    pub projectile: Option<Projectile>,
    pub tuning: Tuning,
    /// Inbound attacks, applied at the start of the next in-game tick
    pub inbox: AttackInbox,
    pub(crate) rng: Pcg32,
    pub(crate) events: Vec<GameEvent>,
    pub(crate) last_clear: Option<ClearResult>,
}

impl GameState {
    /// Create a solo game sitting in the main menu
    pub fn new(seed: u64, tuning: Tuning) -> Self {
        Self::with_mode(seed, GameMode::Solo, tuning)
    }

    /// Create a head-to-head game; the board layout follows `shared_seed`
    pub fn new_versus(seed: u64, shared_seed: u64, tuning: Tuning) -> Self {
        Self::with_mode(seed, GameMode::Versus { shared_seed }, tuning)
    }

    fn with_mode(seed: u64, mode: GameMode, tuning: Tuning) -> Self {
        Self {
            session: SessionState::new(seed, mode, &tuning),
            board: Board::new(BOARD_WIDTH, 1.0),
            projectile: None,
            inbox: AttackInbox::default(),
            rng: Pcg32::seed_from_u64(seed),
            events: Vec::new(),
            last_clear: None,
            tuning,
        }
    }

    pub fn phase(&self) -> GamePhase {
        self.session.phase
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Latest finalized resolution, for popped/dropped animation
    pub fn last_clear(&self) -> Option<&ClearResult> {
        self.last_clear.as_ref()
    }

    /// Take queued events
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    /// Queue an attack from the opponent; ignored once the match has ended
    pub fn receive_attack(&mut self, rows: u32) {
        if matches!(self.session.mode, GameMode::Solo) {
            return;
        }
        match self.session.phase {
            GamePhase::StageCleared | GamePhase::GameOver => {
                log::debug!("Ignoring attack of {} rows after match end", rows);
            }
            _ => self.inbox.push(rows),
        }
    }

    pub(crate) fn emit(&mut self, event: GameEvent) {
        self.events.push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_game_starts_in_menu() {
        let state = GameState::new(42, Tuning::default());
        assert_eq!(state.phase(), GamePhase::MainMenu);
        assert_eq!(state.session.shots_until_advance, 8);
        assert!(state.board().is_empty());
        assert!(state.projectile.is_none());
    }

    #[test]
    fn test_versus_stage_seed_ignores_local_seed() {
        let a = SessionState::new(1, GameMode::Versus { shared_seed: 99 }, &Tuning::default());
        let b = SessionState::new(2, GameMode::Versus { shared_seed: 99 }, &Tuning::default());
        assert_eq!(a.stage_seed(3), b.stage_seed(3));
        assert_ne!(a.stage_seed(3), a.stage_seed(4));
    }

    #[test]
    fn test_refund_shot_is_capped() {
        let tuning = Tuning::default();
        let mut session = SessionState::new(1, GameMode::Solo, &tuning);
        session.refund_shot(&tuning);
        assert_eq!(session.shots_until_advance, tuning.shots_per_advance);
        assert_eq!(session.shots_fired, 0);

        session.shots_until_advance = 3;
        session.shots_fired = 5;
        session.refund_shot(&tuning);
        assert_eq!(session.shots_until_advance, 4);
        assert_eq!(session.shots_fired, 4);
    }

    #[test]
    fn test_solo_ignores_attacks() {
        let mut state = GameState::new(1, Tuning::default());
        state.receive_attack(2);
        assert!(state.inbox.is_empty());
    }

    #[test]
    fn test_clear_result_events() {
        let result = ClearResult {
            blasts: vec![Vec2::ZERO, Vec2::ONE],
            drop_clusters: 1,
            ..Default::default()
        };
        assert_eq!(result.events(), 3);
        assert!(result.is_empty());
    }
}
