use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::model::{Chart, NoteId};

use super::state::ResolvedSet;
use super::window::NoteWindow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JudgeTier {
    Perfect,
    Great,
    Good,
    Miss,
}

impl JudgeTier {
    pub const ALL: [Self; 4] = [Self::Perfect, Self::Great, Self::Good, Self::Miss];

    /// Points added to the score.
    pub fn points(self) -> u32 {
        match self {
            Self::Perfect => 100,
            Self::Great => 80,
            Self::Good => 50,
            Self::Miss => 0,
        }
    }

    pub fn continues_combo(self) -> bool {
        !self.is_combo_break()
    }

    pub fn is_combo_break(self) -> bool {
        matches!(self, Self::Miss)
    }
}

impl fmt::Display for JudgeTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Perfect => "PERFECT",
            Self::Great => "GREAT",
            Self::Good => "GOOD",
            Self::Miss => "MISS",
        };
        f.write_str(name)
    }
}

/// Where a judgment came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JudgmentSource {
    /// The player pressed the lane.
    Input,
    /// The admission window elapsed with no press.
    Timeout,
}

/// One resolved note. Exactly one is emitted per note per session.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JudgmentEvent {
    pub note: NoteId,
    pub tier: JudgeTier,
    /// Absolute timing error in seconds; `None` for timeout misses.
    pub diff: Option<f64>,
    pub source: JudgmentSource,
}

impl JudgmentEvent {
    pub fn input(note: NoteId, tier: JudgeTier, diff: f64) -> Self {
        Self {
            note,
            tier,
            diff: Some(diff),
            source: JudgmentSource::Input,
        }
    }

    pub fn timeout(note: NoteId) -> Self {
        Self {
            note,
            tier: JudgeTier::Miss,
            diff: None,
            source: JudgmentSource::Timeout,
        }
    }
}

/// Timing windows in seconds. Each bound is inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JudgeConfig {
    pub perfect_window: f64,
    pub great_window: f64,
    pub good_window: f64,
    /// Largest error at which an input matches a note at all. Errors between
    /// the good window and this bound are input misses.
    pub admission_window: f64,
    /// How long after its judgment instant an untouched note is swept as a
    /// timeout miss.
    pub miss_threshold: f64,
}

impl JudgeConfig {
    pub fn normal() -> Self {
        Self {
            perfect_window: 0.05,
            great_window: 0.10,
            good_window: 0.15,
            admission_window: 0.20,
            miss_threshold: 0.20,
        }
    }

    pub fn builder() -> JudgeConfigBuilder {
        JudgeConfigBuilder::default()
    }

    /// Windows must be positive and ascending, and a note may not be swept
    /// while a press could still reach it.
    pub fn is_valid(&self) -> bool {
        let windows = [
            self.perfect_window,
            self.great_window,
            self.good_window,
            self.admission_window,
        ];
        windows.iter().all(|w| w.is_finite() && *w > 0.0)
            && windows.windows(2).all(|pair| pair[0] <= pair[1])
            && self.miss_threshold.is_finite()
            && self.miss_threshold >= self.admission_window
    }
}

impl Default for JudgeConfig {
    fn default() -> Self {
        Self::normal()
    }
}

#[derive(Debug, Default)]
pub struct JudgeConfigBuilder {
    perfect_window: Option<f64>,
    great_window: Option<f64>,
    good_window: Option<f64>,
    admission_window: Option<f64>,
    miss_threshold: Option<f64>,
}

impl JudgeConfigBuilder {
    pub fn perfect_window(mut self, secs: f64) -> Self {
        self.perfect_window = Some(secs);
        self
    }

    pub fn great_window(mut self, secs: f64) -> Self {
        self.great_window = Some(secs);
        self
    }

    pub fn good_window(mut self, secs: f64) -> Self {
        self.good_window = Some(secs);
        self
    }

    pub fn admission_window(mut self, secs: f64) -> Self {
        self.admission_window = Some(secs);
        self
    }

    pub fn miss_threshold(mut self, secs: f64) -> Self {
        self.miss_threshold = Some(secs);
        self
    }

    pub fn build(self) -> JudgeConfig {
        let default = JudgeConfig::normal();
        JudgeConfig {
            perfect_window: self.perfect_window.unwrap_or(default.perfect_window),
            great_window: self.great_window.unwrap_or(default.great_window),
            good_window: self.good_window.unwrap_or(default.good_window),
            admission_window: self.admission_window.unwrap_or(default.admission_window),
            miss_threshold: self.miss_threshold.unwrap_or(default.miss_threshold),
        }
    }
}

/// Matches inputs to notes and classifies the timing error.
#[derive(Debug, Clone)]
pub struct JudgeSystem {
    config: JudgeConfig,
    /// Added to every input time, in seconds.
    input_offset: f64,
}

impl JudgeSystem {
    pub fn new(config: JudgeConfig) -> Self {
        Self {
            config,
            input_offset: 0.0,
        }
    }

    pub fn with_input_offset(mut self, secs: f64) -> Self {
        self.input_offset = secs;
        self
    }

    pub fn config(&self) -> &JudgeConfig {
        &self.config
    }

    pub fn input_offset(&self) -> f64 {
        self.input_offset
    }

    /// Tier for an absolute timing error, or `None` outside the admission
    /// window.
    pub fn classify(&self, abs_diff: f64) -> Option<JudgeTier> {
        if abs_diff <= self.config.perfect_window {
            Some(JudgeTier::Perfect)
        } else if abs_diff <= self.config.great_window {
            Some(JudgeTier::Great)
        } else if abs_diff <= self.config.good_window {
            Some(JudgeTier::Good)
        } else if abs_diff <= self.config.admission_window {
            Some(JudgeTier::Miss)
        } else {
            None
        }
    }

    /// Whether an untouched note at `note_time` has run out of time at `now`.
    pub fn is_expired(&self, note_time: f64, now: f64) -> bool {
        now - note_time > self.config.miss_threshold
    }

    /// Closest active, unresolved note in `lane` to `at`, with its absolute
    /// error.
    ///
    /// Notes are scanned in chart order and a later candidate only replaces
    /// the current one when strictly closer, so ties keep the earliest note
    /// in the chart.
    pub fn select_note(
        &self,
        chart: &Chart,
        window: &NoteWindow,
        resolved: &ResolvedSet,
        lane: usize,
        at: f64,
    ) -> Option<(NoteId, f64)> {
        let mut best: Option<(NoteId, f64)> = None;
        for &i in chart.lane_notes(lane) {
            let Some(note) = chart.note(NoteId(i)) else {
                continue;
            };
            if resolved.is_resolved(note.id) || !window.is_active(note, at) {
                continue;
            }
            let diff = (note.time - at).abs();
            if best.is_none_or(|(_, min)| diff < min) {
                best = Some((note.id, diff));
            }
        }
        best
    }

    /// Judge a press on `lane` at `input_time`.
    ///
    /// Returns `None` without side effects when no candidate is within the
    /// admission window. Otherwise the note is marked resolved, whatever its
    /// tier.
    pub fn judge(
        &self,
        chart: &Chart,
        window: &NoteWindow,
        resolved: &mut ResolvedSet,
        lane: usize,
        input_time: f64,
    ) -> Option<JudgmentEvent> {
        let at = input_time + self.input_offset;
        if !at.is_finite() {
            return None;
        }
        let (id, diff) = self.select_note(chart, window, resolved, lane, at)?;
        let tier = self.classify(diff)?;
        if !resolved.resolve(id, tier) {
            return None;
        }
        debug!("judged {id} on lane {lane}: {tier} (diff {diff:.3}s)");
        Some(JudgmentEvent::input(id, tier, diff))
    }
}

impl Default for JudgeSystem {
    fn default() -> Self {
        Self::new(JudgeConfig::default())
    }
}
