// Seams to the host: media clock and input.

pub mod input;
pub mod time;

pub use input::{InputEvent, InputProvider, ScriptedInput};
pub use time::{
    MediaClock, MockTimeProvider, PlaybackError, PlaybackEvent, SystemTimeProvider, TimeProvider,
    TimeSource,
};
