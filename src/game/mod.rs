mod judge;
mod result;
mod score;
mod session;
mod state;
mod sweep;
mod ticker;
mod window;

pub use judge::{
    JudgeConfig, JudgeConfigBuilder, JudgeSystem, JudgeTier, JudgmentEvent, JudgmentSource,
};
pub use result::{FinalResult, Rank};
pub use score::{ScoreKeeper, SessionStats, TierCounts};
pub use session::{SessionController, SessionState, TickReport};
pub use state::{NoteState, ResolvedSet};
pub use sweep::MissSweeper;
pub use ticker::{TickTask, TickToken};
pub use window::{
    ActiveNote, DISAPPEAR_GRACE, Layout, NoteWindow, PREVIEW_CAP, REFERENCE_TEMPO, active_notes,
    note_speed,
};
