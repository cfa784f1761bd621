use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize, Serializer};
use thiserror::Error;
use tracing::{debug, warn};

use super::note::{DEFAULT_INTENSITY, Note, NoteId, NoteType};

/// Tempo assumed when the chart carries none (or a non-positive one).
pub const DEFAULT_TEMPO: f64 = 120.0;

const DEFAULT_DIFFICULTY: &str = "normal";

#[derive(Debug, Error)]
pub enum ChartError {
    #[error("Failed to read chart file: {path}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write chart file: {path}")]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse chart: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Unknown difficulty: {0}")]
    UnknownDifficulty(String),

    #[error("Invalid lane count: {0}")]
    InvalidLaneCount(usize),
}

/// Chart mapping as delivered by the chart provider.
///
/// Every field is optional so a partially broken chart still loads; entries
/// that cannot be normalized are dropped in [`Chart::from_data`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChartData {
    #[serde(default)]
    pub tempo: Option<f64>,
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub difficulty: Option<String>,
    #[serde(default)]
    pub notes: Vec<NoteData>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NoteData {
    #[serde(default)]
    pub time: Option<f64>,
    #[serde(default)]
    pub lane: Option<i64>,
    #[serde(default, rename = "type")]
    pub note_type: Option<String>,
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub intensity: Option<f64>,
}

/// Immutable, normalized note sequence plus tempo metadata.
///
/// Notes keep chart order (insertion order), which is not necessarily time
/// order. Judging relies on this order only for tie-breaking.
#[derive(Debug, Clone)]
pub struct Chart {
    tempo: f64,
    duration: f64,
    difficulty: String,
    lane_count: usize,
    notes: Vec<Note>,
    lane_index: Vec<Vec<usize>>,
}

impl Chart {
    /// Build a chart from notes. Ids are reassigned in order and each note
    /// goes through the same normalization as [`Chart::from_data`].
    pub fn new(tempo: f64, lane_count: usize, notes: Vec<Note>) -> Result<Self, ChartError> {
        if lane_count == 0 {
            return Err(ChartError::InvalidLaneCount(lane_count));
        }
        let mut kept = Vec::with_capacity(notes.len());
        for (index, note) in notes.into_iter().enumerate() {
            match normalize(note, NoteId(kept.len()), lane_count) {
                Some(note) => kept.push(note),
                None => warn!("skipping invalid note at index {index}: {note:?}"),
            }
        }
        Ok(Self::assemble(
            normalize_tempo(Some(tempo)),
            0.0,
            DEFAULT_DIFFICULTY.to_string(),
            lane_count,
            kept,
        ))
    }

    /// Normalize raw chart data.
    ///
    /// Tempo defaults to 120 when absent or not positive. Notes without a
    /// time or lane, with a negative or non-finite time, an unknown type, or
    /// a lane outside `0..lane_count` are skipped with a warning.
    pub fn from_data(data: ChartData, lane_count: usize) -> Result<Self, ChartError> {
        if lane_count == 0 {
            return Err(ChartError::InvalidLaneCount(lane_count));
        }

        let mut notes = Vec::with_capacity(data.notes.len());
        for (index, raw) in data.notes.into_iter().enumerate() {
            match normalize_note(&raw, NoteId(notes.len()), lane_count) {
                Some(note) => notes.push(note),
                None => warn!("skipping malformed chart note at index {index}: {raw:?}"),
            }
        }

        let duration = data
            .duration
            .filter(|d| d.is_finite() && *d > 0.0)
            .unwrap_or(0.0);
        let difficulty = data
            .difficulty
            .unwrap_or_else(|| DEFAULT_DIFFICULTY.to_string());

        let chart = Self::assemble(
            normalize_tempo(data.tempo),
            duration,
            difficulty,
            lane_count,
            notes,
        );
        debug!(
            "chart normalized: tempo={} notes={} lanes={}",
            chart.tempo,
            chart.notes.len(),
            lane_count
        );
        Ok(chart)
    }

    pub fn from_json_str(json: &str, lane_count: usize) -> Result<Self, ChartError> {
        let data: ChartData = serde_json::from_str(json)?;
        Self::from_data(data, lane_count)
    }

    pub fn load(path: &Path, lane_count: usize) -> Result<Self, ChartError> {
        let content = fs::read_to_string(path).map_err(|source| ChartError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&content, lane_count)
    }

    /// Write the chart as JSON in the same shape [`Chart::load`] reads.
    pub fn save(&self, path: &Path) -> Result<(), ChartError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).map_err(|source| ChartError::FileWrite {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Raw mapping of this chart, every field filled in.
    pub fn to_data(&self) -> ChartData {
        ChartData {
            tempo: Some(self.tempo),
            duration: Some(self.duration),
            difficulty: Some(self.difficulty.clone()),
            notes: self
                .notes
                .iter()
                .map(|n| NoteData {
                    time: Some(n.time),
                    lane: i64::try_from(n.lane).ok(),
                    note_type: Some(n.note_type.as_str().to_string()),
                    duration: Some(n.duration),
                    intensity: Some(n.intensity),
                })
                .collect(),
        }
    }

    fn assemble(
        tempo: f64,
        duration: f64,
        difficulty: String,
        lane_count: usize,
        notes: Vec<Note>,
    ) -> Self {
        let mut lane_index = vec![Vec::new(); lane_count];
        for (i, note) in notes.iter().enumerate() {
            lane_index[note.lane].push(i);
        }
        Self {
            tempo,
            duration,
            difficulty,
            lane_count,
            notes,
            lane_index,
        }
    }

    /// Tempo in BPM, always positive.
    pub fn tempo(&self) -> f64 {
        self.tempo
    }

    /// Song length in seconds as declared by the chart, 0 if unknown.
    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn difficulty(&self) -> &str {
        &self.difficulty
    }

    pub fn lane_count(&self) -> usize {
        self.lane_count
    }

    /// All notes in chart order.
    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn note(&self, id: NoteId) -> Option<&Note> {
        self.notes.get(id.index())
    }

    /// Indices of the notes in `lane`, in chart order.
    pub fn lane_notes(&self, lane: usize) -> &[usize] {
        self.lane_index.get(lane).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    /// Time of the latest note, including hold tails.
    pub fn last_note_time(&self) -> f64 {
        self.notes
            .iter()
            .map(|n| n.time + n.duration)
            .fold(0.0, f64::max)
    }
}

impl Serialize for Chart {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_data().serialize(serializer)
    }
}

fn normalize_tempo(tempo: Option<f64>) -> f64 {
    match tempo {
        Some(t) if t.is_finite() && t > 0.0 => t,
        _ => DEFAULT_TEMPO,
    }
}

fn normalize_note(raw: &NoteData, id: NoteId, lane_count: usize) -> Option<Note> {
    let note_type = match raw.note_type.as_deref() {
        None | Some("tap") => NoteType::Tap,
        Some("hold") => NoteType::Hold,
        Some("slide") => NoteType::Slide,
        Some(_) => return None,
    };
    let note = Note {
        id,
        time: raw.time?,
        lane: usize::try_from(raw.lane?).ok()?,
        note_type,
        duration: raw.duration.unwrap_or(0.0),
        intensity: raw.intensity.unwrap_or(DEFAULT_INTENSITY),
    };
    normalize(note, id, lane_count)
}

/// Drop notes with a bad time or lane; zero the tail of taps and of broken
/// durations; default a broken intensity.
fn normalize(mut note: Note, id: NoteId, lane_count: usize) -> Option<Note> {
    if !(note.time.is_finite() && note.time >= 0.0) || note.lane >= lane_count {
        return None;
    }
    note.id = id;
    if !(note.note_type.has_tail() && note.duration.is_finite() && note.duration > 0.0) {
        note.duration = 0.0;
    }
    if !(note.intensity.is_finite() && note.intensity >= 0.0) {
        note.intensity = DEFAULT_INTENSITY;
    }
    Some(note)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tempo_defaults_when_missing_or_invalid() {
        let chart = Chart::from_json_str(r#"{"notes": []}"#, 4).unwrap();
        assert_eq!(chart.tempo(), DEFAULT_TEMPO);

        let chart = Chart::from_json_str(r#"{"tempo": 0, "notes": []}"#, 4).unwrap();
        assert_eq!(chart.tempo(), DEFAULT_TEMPO);

        let chart = Chart::from_json_str(r#"{"tempo": -90.0, "notes": []}"#, 4).unwrap();
        assert_eq!(chart.tempo(), DEFAULT_TEMPO);

        let chart = Chart::from_json_str(r#"{"tempo": 174.0, "notes": []}"#, 4).unwrap();
        assert_eq!(chart.tempo(), 174.0);
    }

    #[test]
    fn ids_follow_chart_order_not_time_order() {
        let json = r#"{
            "tempo": 120,
            "notes": [
                {"time": 2.0, "lane": 0, "type": "tap"},
                {"time": 1.0, "lane": 1, "type": "tap"}
            ]
        }"#;
        let chart = Chart::from_json_str(json, 4).unwrap();
        assert_eq!(chart.notes()[0].id, NoteId(0));
        assert_eq!(chart.notes()[0].time, 2.0);
        assert_eq!(chart.notes()[1].id, NoteId(1));
        assert_eq!(chart.notes()[1].time, 1.0);
    }

    #[test]
    fn duplicate_time_and_lane_get_distinct_ids() {
        let json = r#"{"notes": [
            {"time": 1.0, "lane": 2},
            {"time": 1.0, "lane": 2}
        ]}"#;
        let chart = Chart::from_json_str(json, 4).unwrap();
        assert_eq!(chart.len(), 2);
        assert_ne!(chart.notes()[0].id, chart.notes()[1].id);
        assert_eq!(chart.notes()[0].label(), chart.notes()[1].label());
    }

    #[test]
    fn malformed_notes_are_skipped() {
        let json = r#"{"notes": [
            {"time": 1.0, "lane": 0},
            {"lane": 1},
            {"time": 2.0},
            {"time": -1.0, "lane": 0},
            {"time": 3.0, "lane": 4},
            {"time": 3.0, "lane": -1},
            {"time": 4.0, "lane": 1, "type": "mine"},
            {"time": 5.0, "lane": 3, "type": "hold", "duration": 0.5}
        ]}"#;
        let chart = Chart::from_json_str(json, 4).unwrap();
        assert_eq!(chart.len(), 2);
        assert_eq!(chart.notes()[1].id, NoteId(1));
        assert_eq!(chart.notes()[1].note_type, NoteType::Hold);
    }

    #[test]
    fn tap_duration_forced_to_zero() {
        let json = r#"{"notes": [{"time": 1.0, "lane": 0, "type": "tap", "duration": 3.0}]}"#;
        let chart = Chart::from_json_str(json, 4).unwrap();
        assert_eq!(chart.notes()[0].duration, 0.0);
    }

    #[test]
    fn intensity_passes_through() {
        let json = r#"{"notes": [
            {"time": 1.0, "lane": 0, "intensity": 0.9},
            {"time": 2.0, "lane": 0}
        ]}"#;
        let chart = Chart::from_json_str(json, 4).unwrap();
        assert_eq!(chart.notes()[0].intensity, 0.9);
        assert_eq!(chart.notes()[1].intensity, DEFAULT_INTENSITY);
    }

    #[test]
    fn lane_index_keeps_chart_order() {
        let json = r#"{"notes": [
            {"time": 3.0, "lane": 1},
            {"time": 1.0, "lane": 0},
            {"time": 2.0, "lane": 1}
        ]}"#;
        let chart = Chart::from_json_str(json, 4).unwrap();
        assert_eq!(chart.lane_notes(1), &[0, 2]);
        assert_eq!(chart.lane_notes(0), &[1]);
        assert!(chart.lane_notes(3).is_empty());
        assert!(chart.lane_notes(9).is_empty());
    }

    #[test]
    fn new_normalizes_like_from_data() {
        let mut tap = Note::tap(NoteId(7), 1.0, 0);
        tap.duration = 3.0;
        let mut hold = Note::hold(NoteId(7), 2.0, 1, f64::NAN);
        hold.intensity = -1.0;
        let chart = Chart::new(
            120.0,
            4,
            vec![tap, Note::tap(NoteId(0), f64::INFINITY, 0), hold],
        )
        .unwrap();

        assert_eq!(chart.len(), 2);
        assert_eq!(chart.notes()[0].duration, 0.0);
        assert_eq!(chart.notes()[1].id, NoteId(1));
        assert_eq!(chart.notes()[1].duration, 0.0);
        assert_eq!(chart.notes()[1].intensity, DEFAULT_INTENSITY);
        assert_eq!(chart.last_note_time(), 2.0);
    }

    #[test]
    fn serializes_back_to_chart_shape() {
        let json = r#"{"tempo": 140, "duration": 12.0, "difficulty": "easy", "notes": [
            {"time": 1.0, "lane": 2, "type": "slide", "duration": 0.4, "intensity": 0.7}
        ]}"#;
        let chart = Chart::from_json_str(json, 4).unwrap();
        let value = serde_json::to_value(&chart).unwrap();
        assert_eq!(value["tempo"], 140.0);
        assert_eq!(value["difficulty"], "easy");
        assert_eq!(value["notes"][0]["type"], "slide");
        assert_eq!(value["notes"][0]["lane"], 2);

        let reloaded = Chart::from_json_str(&value.to_string(), 4).unwrap();
        assert_eq!(reloaded.notes(), chart.notes());
        assert_eq!(reloaded.duration(), 12.0);
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chart.json");
        let chart = Chart::new(
            90.0,
            4,
            vec![Note::tap(NoteId(0), 0.5, 3), Note::hold(NoteId(0), 1.0, 0, 0.25)],
        )
        .unwrap();
        chart.save(&path).unwrap();

        let loaded = Chart::load(&path, 4).unwrap();
        assert_eq!(loaded.tempo(), 90.0);
        assert_eq!(loaded.notes(), chart.notes());
    }

    #[test]
    fn zero_lanes_rejected() {
        let err = Chart::from_json_str(r#"{"notes": []}"#, 0).unwrap_err();
        assert!(matches!(err, ChartError::InvalidLaneCount(0)));
    }

    #[test]
    fn invalid_json_is_parse_error() {
        let err = Chart::from_json_str("{not json", 4).unwrap_err();
        assert!(matches!(err, ChartError::Parse(_)));
    }

    #[test]
    fn metadata_carried_through() {
        let json = r#"{"tempo": 128, "duration": 95.5, "difficulty": "hard", "notes": []}"#;
        let chart = Chart::from_json_str(json, 4).unwrap();
        assert_eq!(chart.duration(), 95.5);
        assert_eq!(chart.difficulty(), "hard");
    }
}
