use std::fmt;

use serde::{Deserialize, Serialize};

use super::score::TierCounts;

/// Letter grade derived from accuracy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Rank {
    S,
    A,
    B,
    C,
    D,
    F,
}

impl Rank {
    /// Thresholds are inclusive: exactly 0.95 is an S.
    pub fn from_accuracy(accuracy: f64) -> Self {
        if accuracy >= 0.95 {
            Rank::S
        } else if accuracy >= 0.90 {
            Rank::A
        } else if accuracy >= 0.80 {
            Rank::B
        } else if accuracy >= 0.70 {
            Rank::C
        } else if accuracy >= 0.60 {
            Rank::D
        } else {
            Rank::F
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Rank::S => "S",
            Rank::A => "A",
            Rank::B => "B",
            Rank::C => "C",
            Rank::D => "D",
            Rank::F => "F",
        }
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Summary of a finished session.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FinalResult {
    pub score: u32,
    pub rank: Rank,
    /// In `[0, 1]`.
    pub accuracy: f64,
    pub max_combo: u32,
    pub tier_counts: TierCounts,
}

impl FinalResult {
    pub fn accuracy_percent(&self) -> f64 {
        self.accuracy * 100.0
    }

    pub fn total_notes(&self) -> u32 {
        self.tier_counts.total()
    }

    /// No note was missed.
    pub fn is_full_combo(&self) -> bool {
        self.total_notes() > 0 && self.tier_counts.miss == 0
    }
}
