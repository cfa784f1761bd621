use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::game::{JudgeConfig, Layout};
use crate::model::DEFAULT_LANE_COUNT;

/// User settings for a play session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameSettings {
    /// Number of lanes
    pub lanes: usize,
    /// Fall speed at 120 BPM, in layout units (pixels) per second
    pub base_note_speed: f64,
    /// Distance from the bottom of the viewport to the judge line
    pub judge_line_offset: f64,
    /// Height of the note field
    pub viewport_length: f64,
    /// Added to every input time before matching (milliseconds)
    pub input_offset_ms: f64,
    /// Timing windows
    pub judge: JudgeConfig,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            lanes: DEFAULT_LANE_COUNT,
            base_note_speed: 600.0,
            judge_line_offset: 100.0,
            viewport_length: 800.0,
            input_offset_ms: 0.0,
            judge: JudgeConfig::default(),
        }
    }
}

impl GameSettings {
    /// Load settings from the platform config directory, falling back to
    /// defaults when the file is missing or unreadable.
    pub fn load() -> Self {
        match Self::settings_path().and_then(|path| Self::load_from(&path)) {
            Ok(settings) => settings,
            Err(e) => {
                warn!("using default settings: {e:#}");
                Self::default()
            }
        }
    }

    /// Load settings from `path`. A missing file yields defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading settings {}", path.display()))?;
        let settings: Self = serde_json::from_str(&content)
            .with_context(|| format!("parsing settings {}", path.display()))?;
        Ok(settings.sanitized())
    }

    /// Save settings to disk
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::settings_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    fn settings_path() -> Result<PathBuf> {
        if let Some(proj_dirs) = ProjectDirs::from("com", "rhythm-judge", "rhythm-judge") {
            Ok(proj_dirs.config_dir().join("settings.json"))
        } else {
            Ok(PathBuf::from(".rhythm-judge-settings.json"))
        }
    }

    /// Replace values that would break the note window with defaults.
    pub fn sanitized(mut self) -> Self {
        let defaults = Self::default();
        if self.lanes == 0 {
            warn!("lane count must be positive, using {}", defaults.lanes);
            self.lanes = defaults.lanes;
        }
        if !(self.base_note_speed.is_finite() && self.base_note_speed > 0.0) {
            warn!(
                "invalid base note speed {}, using {}",
                self.base_note_speed, defaults.base_note_speed
            );
            self.base_note_speed = defaults.base_note_speed;
        }
        if !(self.judge_line_offset.is_finite() && self.judge_line_offset >= 0.0) {
            self.judge_line_offset = defaults.judge_line_offset;
        }
        if !self.viewport_length.is_finite() || self.viewport_length < self.judge_line_offset {
            warn!(
                "viewport length {} below judge line, using {}",
                self.viewport_length, defaults.viewport_length
            );
            self.viewport_length = defaults.viewport_length.max(self.judge_line_offset);
        }
        if !self.input_offset_ms.is_finite() {
            self.input_offset_ms = 0.0;
        }
        if !self.judge.is_valid() {
            warn!("judge windows are invalid, using defaults");
            self.judge = JudgeConfig::default();
        }
        self
    }

    pub fn layout(&self) -> Layout {
        Layout {
            base_speed: self.base_note_speed,
            judge_line_offset: self.judge_line_offset,
            viewport_length: self.viewport_length,
        }
    }

    /// Input offset in seconds.
    pub fn input_offset(&self) -> f64 {
        self.input_offset_ms / 1000.0
    }
}
