//! Data-driven game balance
//!
//! Every gameplay constant that is a design choice rather than geometry lives
//! here. Loaded from JSON; missing fields keep their defaults.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::sim::scoring::ScoreTable;

#[derive(Debug, Error)]
pub enum TuningError {
    #[error("invalid tuning json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid tuning: {0}")]
    Invalid(&'static str),
}

/// Game balance parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    /// Point values and combo tiers
    pub scoring: ScoreTable,

    // === Ceiling pressure ===
    /// Shots before the ceiling is forced down
    pub shots_per_advance: u32,
    /// Seconds before the ceiling is forced down
    pub seconds_per_advance: f32,
    /// Any token edge below this line ends the game
    pub danger_line: f32,

    // === Projectile ===
    /// Launch speed in lattice units per second
    pub projectile_speed: f32,
    /// Minimum aim elevation above horizontal (radians)
    pub min_aim_angle: f32,

    // === Resolution ===
    /// Anchoring tolerance in lattice spacings
    pub anchor_tolerance: f32,
    /// Bomb blast radius in lattice spacings
    pub blast_radius: f32,

    // === Generation ===
    /// Attempts per constrained special placement
    pub placement_retries: u32,
    /// Share of remaining colored tokens turned Blocked
    pub blocked_ratio: f32,
    /// Minimum distance between Blocked tokens in lattice spacings
    pub blocked_min_spacing: f32,

    // === Versus ===
    /// Dropped tokens needed per garbage row sent
    pub drops_per_attack_row: u32,
    /// Chance a garbage cell is a Mirror
    pub garbage_mirror_chance: f64,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            scoring: ScoreTable::default(),

            shots_per_advance: 8,
            seconds_per_advance: 30.0,
            danger_line: 20.0,

            projectile_speed: 40.0,
            min_aim_angle: 0.15,

            anchor_tolerance: 0.1,
            blast_radius: 2.0,

            placement_retries: 20,
            blocked_ratio: 0.15,
            blocked_min_spacing: 2.0,

            drops_per_attack_row: 4,
            garbage_mirror_chance: 0.2,
        }
    }
}

impl Tuning {
    /// Parse tuning JSON, keeping defaults for absent fields
    pub fn from_json(json: &str) -> Result<Self, TuningError> {
        let tuning: Tuning = serde_json::from_str(json)?;
        tuning.validate()?;
        Ok(tuning)
    }

    pub fn to_json(&self) -> Result<String, TuningError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    fn validate(&self) -> Result<(), TuningError> {
        if self.shots_per_advance == 0 {
            return Err(TuningError::Invalid("shots_per_advance must be positive"));
        }
        if self.seconds_per_advance <= 0.0 {
            return Err(TuningError::Invalid("seconds_per_advance must be positive"));
        }
        if self.projectile_speed <= 0.0 {
            return Err(TuningError::Invalid("projectile_speed must be positive"));
        }
        if self.drops_per_attack_row == 0 {
            return Err(TuningError::Invalid("drops_per_attack_row must be positive"));
        }
        Ok(())
    }
}
