//! Chart generation from detected audio features.
//!
//! Works on already-extracted onset times, beat times and onset intensities;
//! decoding and analysing audio happens upstream.

use std::fmt;
use std::str::FromStr;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::chart::{Chart, ChartData, ChartError, NoteData};
use super::note::{DEFAULT_INTENSITY, NoteType};

/// Onsets closer than this share lanes reluctantly.
const RECENT_LANE_WINDOW: f64 = 0.3;

/// A tail reaches at least this far before it can end on a beat.
const MIN_TAIL: f64 = 0.1;

/// Slides end earlier than holds.
const SLIDE_TAIL_SCALE: f64 = 0.8;

/// Fraction of intensity that goes to multi-note chords.
const CHORD_WEIGHT: f64 = 0.7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Normal,
    Hard,
}

impl Difficulty {
    pub const ALL: [Self; 3] = [Self::Easy, Self::Normal, Self::Hard];

    pub fn preset(self) -> DifficultyPreset {
        match self {
            Self::Easy => DifficultyPreset {
                max_notes_per_beat: 2,
                hold_note_prob: 0.1,
                slide_note_prob: 0.05,
            },
            Self::Normal => DifficultyPreset {
                max_notes_per_beat: 3,
                hold_note_prob: 0.2,
                slide_note_prob: 0.1,
            },
            Self::Hard => DifficultyPreset {
                max_notes_per_beat: 4,
                hold_note_prob: 0.3,
                slide_note_prob: 0.2,
            },
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Easy => "easy",
            Self::Normal => "normal",
            Self::Hard => "hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = ChartError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|d| d.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ChartError::UnknownDifficulty(s.to_string()))
    }
}

/// Note density and type mix of a difficulty.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DifficultyPreset {
    /// Largest chord placed on one onset.
    pub max_notes_per_beat: usize,
    pub hold_note_prob: f64,
    pub slide_note_prob: f64,
}

/// Detected features of a song, as produced by the audio analyser.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioFeatures {
    pub tempo: f64,
    pub duration: f64,
    pub onset_times: Vec<f64>,
    pub beat_times: Vec<f64>,
    /// Per-onset strength in `[0, 1]`. Missing entries default to 0.5.
    pub note_intensities: Vec<f64>,
}

/// Places notes on onsets.
///
/// Every random choice goes through the generator's own RNG, so a seeded
/// generator always produces the same chart for the same features.
pub struct ChartGenerator<R: Rng = StdRng> {
    difficulty: Difficulty,
    preset: DifficultyPreset,
    lanes: usize,
    rng: R,
}

impl ChartGenerator<StdRng> {
    pub fn seeded(difficulty: Difficulty, lanes: usize, seed: u64) -> Self {
        Self::with_rng(difficulty, lanes, StdRng::seed_from_u64(seed))
    }

    pub fn from_entropy(difficulty: Difficulty, lanes: usize) -> Self {
        Self::with_rng(difficulty, lanes, StdRng::from_entropy())
    }
}

impl<R: Rng> ChartGenerator<R> {
    pub fn with_rng(difficulty: Difficulty, lanes: usize, rng: R) -> Self {
        Self {
            difficulty,
            preset: difficulty.preset(),
            lanes,
            rng,
        }
    }

    /// Replace the difficulty's note mix. The chart still records the
    /// difficulty name.
    pub fn with_preset(mut self, preset: DifficultyPreset) -> Self {
        self.preset = preset;
        self
    }

    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    pub fn preset(&self) -> &DifficultyPreset {
        &self.preset
    }

    /// Generate a chart. Onsets are processed in the given order; onsets
    /// with a negative or non-finite time are skipped.
    pub fn generate(&mut self, features: &AudioFeatures) -> Result<Chart, ChartError> {
        if self.lanes == 0 {
            return Err(ChartError::InvalidLaneCount(self.lanes));
        }

        let mut placed: Vec<(f64, usize)> = Vec::new();
        let mut notes = Vec::new();
        for (i, &time) in features.onset_times.iter().enumerate() {
            if !(time.is_finite() && time >= 0.0) {
                warn!("skipping onset {i} at invalid time {time}");
                continue;
            }
            let intensity = features
                .note_intensities
                .get(i)
                .copied()
                .filter(|v| v.is_finite())
                .unwrap_or(DEFAULT_INTENSITY)
                .clamp(0.0, 1.0);

            let count = self.note_count(intensity);
            for lane in self.select_lanes(count, time, &placed) {
                let note_type = self.note_type(intensity);
                let duration = self.tail_duration(note_type, time, &features.beat_times);
                placed.push((time, lane));
                notes.push(NoteData {
                    time: Some(time),
                    lane: i64::try_from(lane).ok(),
                    note_type: Some(note_type.as_str().to_string()),
                    duration: Some(duration),
                    intensity: Some(intensity),
                });
            }
        }

        debug!(
            "generated {} notes from {} onsets ({})",
            notes.len(),
            features.onset_times.len(),
            self.difficulty
        );
        Chart::from_data(
            ChartData {
                tempo: Some(features.tempo),
                duration: Some(features.duration),
                difficulty: Some(self.difficulty.as_str().to_string()),
                notes,
            },
            self.lanes,
        )
    }

    /// One note is most likely; stronger onsets shift weight to chords.
    fn note_count(&mut self, intensity: f64) -> usize {
        let max = self.preset.max_notes_per_beat.clamp(1, self.lanes);
        if max == 1 {
            return 1;
        }
        let single = 1.0 - intensity * CHORD_WEIGHT;
        let roll: f64 = self.rng.r#gen();
        if roll < single {
            return 1;
        }
        let chord = intensity * CHORD_WEIGHT / (max - 1) as f64;
        let extra = ((roll - single) / chord) as usize;
        (2 + extra).min(max)
    }

    /// Prefer lanes without a note in the last few hundred milliseconds;
    /// fall back to any lane when too few are free.
    fn select_lanes(&mut self, count: usize, time: f64, placed: &[(f64, usize)]) -> Vec<usize> {
        let all: Vec<usize> = (0..self.lanes).collect();
        let free: Vec<usize> = all
            .iter()
            .copied()
            .filter(|&lane| {
                !placed
                    .iter()
                    .any(|&(t, l)| l == lane && (t - time).abs() < RECENT_LANE_WINDOW)
            })
            .collect();
        let pool = if free.len() >= count { &free } else { &all };
        pool.choose_multiple(&mut self.rng, count).copied().collect()
    }

    fn note_type(&mut self, intensity: f64) -> NoteType {
        let mut hold = self.preset.hold_note_prob;
        let mut slide = self.preset.slide_note_prob;
        let mut tap = (1.0 - hold - slide).max(0.0);
        if intensity > 0.8 {
            hold *= 1.5;
            slide *= 1.5;
        } else if intensity < 0.3 {
            tap *= 1.5;
        }
        let total = tap + hold + slide;
        if total <= 0.0 {
            return NoteType::Tap;
        }

        let roll = self.rng.r#gen::<f64>() * total;
        if roll < tap {
            NoteType::Tap
        } else if roll < tap + hold {
            NoteType::Hold
        } else {
            NoteType::Slide
        }
    }

    /// Holds run to the next beat at least [`MIN_TAIL`] ahead, slides to
    /// 80% of that. Without such a beat the tail is random in 0.2..0.5 s.
    fn tail_duration(&mut self, note_type: NoteType, start: f64, beats: &[f64]) -> f64 {
        if !note_type.has_tail() {
            return 0.0;
        }
        let Some(next) = beats.iter().copied().find(|&b| b > start + MIN_TAIL) else {
            return self.rng.gen_range(0.2..0.5);
        };
        let span = next - start;
        match note_type {
            NoteType::Slide => span * SLIDE_TAIL_SCALE,
            _ => span,
        }
    }
}
