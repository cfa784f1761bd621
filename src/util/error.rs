use thiserror::Error;

use crate::traits::time::PlaybackError;

/// Errors reported by the session controller.
///
/// None of these are fatal: the caller may always restart the session.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SessionError {
    /// Chart or time source missing, or media not ready. The session stays
    /// idle.
    #[error("Session not configured: {0}")]
    Configuration(String),

    /// Media failed to load or play. The session ends.
    #[error("Playback failed: {0}")]
    Playback(#[from] PlaybackError),

    /// Input on a lane the chart does not have. Ignored; no state change.
    #[error("Lane {lane} out of range (lane count {lane_count})")]
    InputOutOfRange { lane: usize, lane_count: usize },
}

impl SessionError {
    pub fn missing_chart() -> Self {
        Self::Configuration("no chart loaded".to_string())
    }

    pub fn missing_time_source() -> Self {
        Self::Configuration("no time source attached".to_string())
    }

    pub fn media_not_ready() -> Self {
        Self::Configuration("media is not ready".to_string())
    }

    /// Whether the session transitions to `Ended` on this error.
    pub fn ends_session(&self) -> bool {
        matches!(self, Self::Playback(_))
    }
}
