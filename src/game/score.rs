use serde::{Deserialize, Serialize};

use super::judge::{JudgeTier, JudgmentEvent};
use super::result::{FinalResult, Rank};

/// Per-tier judgment counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierCounts {
    pub perfect: u32,
    pub great: u32,
    pub good: u32,
    pub miss: u32,
}

impl TierCounts {
    pub fn get(&self, tier: JudgeTier) -> u32 {
        match tier {
            JudgeTier::Perfect => self.perfect,
            JudgeTier::Great => self.great,
            JudgeTier::Good => self.good,
            JudgeTier::Miss => self.miss,
        }
    }

    fn increment(&mut self, tier: JudgeTier) {
        match tier {
            JudgeTier::Perfect => self.perfect += 1,
            JudgeTier::Great => self.great += 1,
            JudgeTier::Good => self.good += 1,
            JudgeTier::Miss => self.miss += 1,
        }
    }

    pub fn total(&self) -> u32 {
        self.perfect + self.great + self.good + self.miss
    }
}

/// Live score state of a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStats {
    pub score: u32,
    pub combo: u32,
    pub max_combo: u32,
    pub tier_counts: TierCounts,
}

/// Accumulates judgments into [`SessionStats`].
#[derive(Debug, Clone, Default)]
pub struct ScoreKeeper {
    stats: SessionStats,
}

impl ScoreKeeper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, event: &JudgmentEvent) {
        self.add_judgment(event.tier);
    }

    pub fn add_judgment(&mut self, tier: JudgeTier) {
        let stats = &mut self.stats;
        stats.tier_counts.increment(tier);
        stats.score += tier.points();
        if tier.continues_combo() {
            stats.combo += 1;
        } else {
            stats.combo = 0;
        }
        stats.max_combo = stats.max_combo.max(stats.combo);
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    pub fn total_judged(&self) -> u32 {
        self.stats.tier_counts.total()
    }

    /// Weighted accuracy in `[0, 1]`; 0 when nothing was judged.
    pub fn accuracy(&self) -> f64 {
        let counts = &self.stats.tier_counts;
        let total = counts.total();
        if total == 0 {
            return 0.0;
        }
        let earned = counts.perfect * 100 + counts.great * 80 + counts.good * 50;
        f64::from(earned) / (f64::from(total) * 100.0)
    }

    pub fn finalize(&self) -> FinalResult {
        let accuracy = self.accuracy();
        FinalResult {
            score: self.stats.score,
            rank: Rank::from_accuracy(accuracy),
            accuracy,
            max_combo: self.stats.max_combo,
            tier_counts: self.stats.tier_counts,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
