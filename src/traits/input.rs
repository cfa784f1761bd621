use serde::{Deserialize, Serialize};

/// A key press already resolved to a lane.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InputEvent {
    /// Lane index (0-indexed).
    pub lane: usize,
    /// Media time of the press in seconds.
    pub time: f64,
}

impl InputEvent {
    pub fn new(lane: usize, time: f64) -> Self {
        Self { lane, time }
    }
}

/// Abstraction over input sources.
/// Implementations: host key handlers (external), ScriptedInput (replay, simulation).
pub trait InputProvider {
    /// Events that happened at or before `now`, not yet returned.
    fn poll_events(&mut self, now: f64) -> Vec<InputEvent>;
}

/// Replays a recorded list of inputs in time order.
#[derive(Debug, Clone, Default)]
pub struct ScriptedInput {
    events: Vec<InputEvent>,
    cursor: usize,
}

impl ScriptedInput {
    pub fn new(mut events: Vec<InputEvent>) -> Self {
        events.retain(|e| e.time.is_finite());
        events.sort_by(|a, b| a.time.total_cmp(&b.time));
        Self { events, cursor: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.events.len() - self.cursor
    }

    pub fn rewind(&mut self) {
        self.cursor = 0;
    }
}

impl InputProvider for ScriptedInput {
    fn poll_events(&mut self, now: f64) -> Vec<InputEvent> {
        let start = self.cursor;
        while self.cursor < self.events.len() && self.events[self.cursor].time <= now {
            self.cursor += 1;
        }
        self.events[start..self.cursor].to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scripted_input_releases_events_in_order() {
        let mut input = ScriptedInput::new(vec![
            InputEvent::new(1, 2.0),
            InputEvent::new(0, 1.0),
            InputEvent::new(2, 3.0),
        ]);
        assert!(input.poll_events(0.5).is_empty());
        assert_eq!(input.poll_events(2.0), vec![InputEvent::new(0, 1.0), InputEvent::new(1, 2.0)]);
        assert_eq!(input.remaining(), 1);
        assert_eq!(input.poll_events(10.0), vec![InputEvent::new(2, 3.0)]);
        assert!(input.poll_events(20.0).is_empty());
    }

    #[test]
    fn rewind_replays_from_start() {
        let mut input = ScriptedInput::new(vec![InputEvent::new(0, 1.0)]);
        assert_eq!(input.poll_events(5.0).len(), 1);
        input.rewind();
        assert_eq!(input.poll_events(5.0).len(), 1);
    }

    #[test]
    fn parses_from_json() {
        let events: Vec<InputEvent> =
            serde_json::from_str(r#"[{"lane": 1, "time": 10.03}]"#).unwrap();
        assert_eq!(events, vec![InputEvent::new(1, 10.03)]);
    }
}
