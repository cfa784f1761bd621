// Chart and note data models.

pub mod chart;
pub mod generator;
pub mod note;

pub use chart::{Chart, ChartData, ChartError, DEFAULT_TEMPO, NoteData};
pub use generator::{AudioFeatures, ChartGenerator, Difficulty, DifficultyPreset};
pub use note::{DEFAULT_INTENSITY, DEFAULT_LANE_COUNT, Note, NoteId, NoteType};
