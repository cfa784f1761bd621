//! Test utilities for building charts, sessions, and simulated inputs.
//!
//! This module provides helpers for creating test fixtures in a fluent manner.

pub mod builders {
    use crate::config::GameSettings;
    use crate::game::SessionController;
    use crate::model::{Chart, DEFAULT_INTENSITY, DEFAULT_LANE_COUNT, Note, NoteId, NoteType};
    use crate::traits::time::{MediaClock, MockTimeProvider};

    /// Builder for creating test notes.
    #[derive(Debug, Clone)]
    pub struct NoteBuilder {
        time: f64,
        lane: usize,
        note_type: NoteType,
        duration: f64,
        intensity: f64,
    }

    impl NoteBuilder {
        pub fn tap(lane: usize, time: f64) -> Self {
            Self {
                time,
                lane,
                note_type: NoteType::Tap,
                duration: 0.0,
                intensity: DEFAULT_INTENSITY,
            }
        }

        pub fn hold(lane: usize, time: f64, duration: f64) -> Self {
            Self {
                note_type: NoteType::Hold,
                duration,
                ..Self::tap(lane, time)
            }
        }

        pub fn slide(lane: usize, time: f64, duration: f64) -> Self {
            Self {
                note_type: NoteType::Slide,
                ..Self::hold(lane, time, duration)
            }
        }

        pub fn intensity(mut self, intensity: f64) -> Self {
            self.intensity = intensity;
            self
        }

        /// Build the Note. The id is reassigned when the chart is built.
        pub fn build(self) -> Note {
            Note {
                id: NoteId(0),
                time: self.time,
                lane: self.lane,
                note_type: self.note_type,
                duration: self.duration,
                intensity: self.intensity,
            }
        }
    }

    /// Builder for a chart in insertion order.
    #[derive(Debug, Clone)]
    pub struct ChartBuilder {
        tempo: f64,
        lanes: usize,
        notes: Vec<Note>,
    }

    impl Default for ChartBuilder {
        fn default() -> Self {
            Self {
                tempo: 120.0,
                lanes: DEFAULT_LANE_COUNT,
                notes: Vec::new(),
            }
        }
    }

    impl ChartBuilder {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn tempo(mut self, tempo: f64) -> Self {
            self.tempo = tempo;
            self
        }

        pub fn lanes(mut self, lanes: usize) -> Self {
            self.lanes = lanes;
            self
        }

        pub fn add(mut self, note: Note) -> Self {
            self.notes.push(note);
            self
        }

        pub fn tap(self, lane: usize, time: f64) -> Self {
            self.add(NoteBuilder::tap(lane, time).build())
        }

        pub fn build(self) -> Chart {
            Chart::new(self.tempo, self.lanes, self.notes).expect("test chart has lanes")
        }
    }

    /// Create a chart with `count` taps on `lane`, `interval` seconds apart,
    /// starting at `start`.
    pub fn create_simple_chart(count: usize, lane: usize, start: f64, interval: f64) -> Chart {
        (0..count)
            .fold(ChartBuilder::new(), |builder, i| {
                builder.tap(lane, start + i as f64 * interval)
            })
            .build()
    }

    pub type MockSession = SessionController<MediaClock<MockTimeProvider>>;

    /// A session over `chart` driven by a manual clock. The returned provider
    /// shares its time with the session's clock.
    pub fn mock_session(chart: Chart) -> (MockSession, MockTimeProvider) {
        mock_session_with(chart, GameSettings::default(), None)
    }

    pub fn mock_session_with(
        chart: Chart,
        settings: GameSettings,
        duration: Option<f64>,
    ) -> (MockSession, MockTimeProvider) {
        let host = MockTimeProvider::new();
        let mut clock = MediaClock::new(host.clone());
        if let Some(duration) = duration {
            clock = clock.with_duration(duration);
        }
        let session = SessionController::new(settings)
            .with_chart(chart)
            .with_time_source(clock);
        (session, host)
    }
}

pub mod input_sim {
    use crate::traits::input::{InputEvent, ScriptedInput};

    /// Builds a scripted press sequence.
    #[derive(Debug, Clone, Default)]
    pub struct InputSimulator {
        events: Vec<InputEvent>,
    }

    impl InputSimulator {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn press(mut self, lane: usize, time: f64) -> Self {
            self.events.push(InputEvent::new(lane, time));
            self
        }

        /// Get the events sorted by time.
        pub fn events(self) -> Vec<InputEvent> {
            let mut events = self.events;
            events.sort_by(|a, b| a.time.total_cmp(&b.time));
            events
        }

        pub fn into_provider(self) -> ScriptedInput {
            ScriptedInput::new(self.events)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::builders::*;
    use super::input_sim::*;
    use crate::model::NoteType;

    #[test]
    fn test_create_simple_chart() {
        let chart = create_simple_chart(5, 2, 1.0, 0.5);
        assert_eq!(chart.len(), 5);
        assert_eq!(chart.notes()[4].time, 3.0);
        assert!(chart.notes().iter().all(|n| n.lane == 2));
    }

    #[test]
    fn test_hold_builder() {
        let note = NoteBuilder::hold(1, 2.0, 0.75).intensity(0.9).build();
        assert_eq!(note.note_type, NoteType::Hold);
        assert_eq!(note.duration, 0.75);
        assert_eq!(note.intensity, 0.9);
    }

    #[test]
    fn test_input_simulator_sorts() {
        let events = InputSimulator::new().press(0, 2.0).press(1, 1.0).events();
        assert_eq!(events[0].lane, 1);
        assert_eq!(events[1].lane, 0);
    }
}
