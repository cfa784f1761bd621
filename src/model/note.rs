use std::fmt;

use serde::{Deserialize, Serialize};

/// Default lane count of the four-key layout.
pub const DEFAULT_LANE_COUNT: usize = 4;

/// Intensity assumed when a chart entry does not carry one.
pub const DEFAULT_INTENSITY: f64 = 0.5;

/// Stable note identifier: the note's index in chart order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NoteId(pub usize);

impl NoteId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Type of note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoteType {
    #[default]
    Tap,
    Hold,
    Slide,
}

impl NoteType {
    /// Returns true for notes with a tail (hold and slide).
    pub fn has_tail(self) -> bool {
        matches!(self, NoteType::Hold | NoteType::Slide)
    }

    /// Name used in chart files.
    pub fn as_str(self) -> &'static str {
        match self {
            NoteType::Tap => "tap",
            NoteType::Hold => "hold",
            NoteType::Slide => "slide",
        }
    }
}

/// A single normalized note of a chart.
///
/// Notes are immutable once the chart is built. Resolution state lives in
/// the session, never on the note.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Note {
    pub id: NoteId,
    /// Judgment instant in seconds.
    pub time: f64,
    pub lane: usize,
    pub note_type: NoteType,
    /// Tail length in seconds. Always 0 for taps.
    pub duration: f64,
    /// Visual weight hint. Carried through, never read by judging.
    pub intensity: f64,
}

impl Note {
    /// Create a new tap note.
    pub fn tap(id: NoteId, time: f64, lane: usize) -> Self {
        Self {
            id,
            time,
            lane,
            note_type: NoteType::Tap,
            duration: 0.0,
            intensity: DEFAULT_INTENSITY,
        }
    }

    /// Create a new hold note.
    pub fn hold(id: NoteId, time: f64, lane: usize, duration: f64) -> Self {
        Self {
            id,
            time,
            lane,
            note_type: NoteType::Hold,
            duration,
            intensity: DEFAULT_INTENSITY,
        }
    }

    /// Returns true if the note has a visible tail.
    pub fn is_long(&self) -> bool {
        self.note_type.has_tail() && self.duration > 0.0
    }

    /// Composite `time-lane` label, e.g. `10.5-2`.
    ///
    /// Two notes sharing time and lane get the same label, so this is only
    /// used for display and logging; identity is [`NoteId`].
    pub fn label(&self) -> String {
        format!("{}-{}", self.time, self.lane)
    }
}
