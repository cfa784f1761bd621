use tracing::debug;

use crate::model::Chart;

use super::judge::{JudgeSystem, JudgmentEvent};
use super::state::ResolvedSet;
use super::JudgeTier;

/// Resolves notes whose admission window elapsed without input.
#[derive(Debug, Clone, Copy, Default)]
pub struct MissSweeper;

impl MissSweeper {
    pub fn new() -> Self {
        Self
    }

    /// Mark every unresolved note older than the miss threshold as a timeout
    /// miss, in chart order.
    pub fn sweep(
        &self,
        chart: &Chart,
        judge: &JudgeSystem,
        resolved: &mut ResolvedSet,
        now: f64,
    ) -> Vec<JudgmentEvent> {
        if !now.is_finite() {
            return Vec::new();
        }
        let mut missed = Vec::new();
        for note in chart.notes() {
            if resolved.is_resolved(note.id) || !judge.is_expired(note.time, now) {
                continue;
            }
            if resolved.resolve(note.id, JudgeTier::Miss) {
                debug!("timeout miss {} on lane {}", note.id, note.lane);
                missed.push(JudgmentEvent::timeout(note.id));
            }
        }
        missed
    }
}
