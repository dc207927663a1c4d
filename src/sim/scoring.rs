//! Scoring engine
//!
//! Prices a resolution pass: popped and dropped tokens have fixed values, and
//! a combo multiplier is picked from a tier table keyed on the number of
//! independent events (drop clusters + detonations) in the pass.

use serde::{Deserialize, Serialize};

use super::state::ClearResult;

/// One row of the combo table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComboTier {
    /// Events needed to reach this tier
    pub min_events: u32,
    pub multiplier: u32,
}

/// Point values and combo tiers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreTable {
    /// Points per popped token
    pub pop_value: u64,
    /// Points per dropped token
    pub drop_value: u64,
    /// Combo tiers; the highest tier reached wins
    pub combo_tiers: Vec<ComboTier>,
}

impl Default for ScoreTable {
    fn default() -> Self {
        Self {
            pop_value: 10,
            drop_value: 20,
            combo_tiers: vec![
                ComboTier { min_events: 0, multiplier: 1 },
                ComboTier { min_events: 2, multiplier: 2 },
                ComboTier { min_events: 4, multiplier: 3 },
                ComboTier { min_events: 6, multiplier: 4 },
            ],
        }
    }
}

impl ScoreTable {
    /// Multiplier for a number of independent events (never below 1)
    pub fn combo_for(&self, events: u32) -> u32 {
        self.combo_tiers
            .iter()
            .filter(|tier| tier.min_events <= events)
            .max_by_key(|tier| tier.min_events)
            .map(|tier| tier.multiplier.max(1))
            .unwrap_or(1)
    }

    /// Fill in score and combo; finalizing twice is a no-op
    pub fn finalize(&self, result: &mut ClearResult) {
        if result.finalized {
            return;
        }
        let base = result.popped.len() as u64 * self.pop_value
            + result.dropped.len() as u64 * self.drop_value;
        result.combo = self.combo_for(result.events());
        result.score = base * result.combo as u64;
        result.finalized = true;
    }
}
