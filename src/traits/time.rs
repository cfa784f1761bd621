use std::cell::Cell;
use std::rc::Rc;

use thiserror::Error;

/// Abstraction over host time.
/// Implementations: SystemTimeProvider (production), MockTimeProvider (testing, simulation).
pub trait TimeProvider {
    /// Current time in microseconds from an arbitrary epoch.
    fn now_us(&self) -> i64;
}

/// System time provider using std::time::Instant.
pub struct SystemTimeProvider {
    start: std::time::Instant,
}

impl SystemTimeProvider {
    pub fn new() -> Self {
        Self {
            start: std::time::Instant::now(),
        }
    }
}

impl Default for SystemTimeProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeProvider for SystemTimeProvider {
    fn now_us(&self) -> i64 {
        self.start.elapsed().as_micros() as i64
    }
}

/// Manually driven time provider.
///
/// Clones share the same underlying time, so a test can keep one handle and
/// advance it while a session owns the clock built on the other.
#[derive(Clone, Default)]
pub struct MockTimeProvider {
    current_us: Rc<Cell<i64>>,
}

impl MockTimeProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_time(&self, us: i64) {
        self.current_us.set(us);
    }

    pub fn advance(&self, delta_us: i64) {
        self.current_us.set(self.current_us.get() + delta_us);
    }

    /// Advance by a duration in seconds.
    pub fn advance_secs(&self, secs: f64) {
        self.advance((secs * 1_000_000.0).round() as i64);
    }
}

impl TimeProvider for MockTimeProvider {
    fn now_us(&self) -> i64 {
        self.current_us.get()
    }
}

/// The media refused to load or play.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct PlaybackError(pub String);

/// Out-of-band signal raised by the media behind a [`TimeSource`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackEvent {
    /// Playback reached the end of the media.
    Ended,
    /// The media clock broke down and can no longer be trusted.
    Failed(String),
}

/// Current playback position of the media timeline, in seconds.
///
/// `now()` must stay continuous across `pause()`/`resume()`: after a pause
/// it resumes from the frozen value, not from wall time.
pub trait TimeSource {
    /// Whether the media is loaded and [`play`](Self::play) may be called.
    fn is_ready(&self) -> bool;

    /// Rewind to 0 and start advancing.
    fn play(&mut self) -> Result<(), PlaybackError>;

    fn now(&self) -> f64;

    /// Freeze `now()` at its current value.
    fn pause(&mut self);

    /// Continue advancing from the frozen value.
    fn resume(&mut self) -> Result<(), PlaybackError>;

    /// Set `now()` to 0 without changing whether the clock runs.
    fn reset(&mut self);

    /// Halt playback. `now()` keeps its last value.
    fn stop(&mut self);

    /// Take the pending media signal, if any. Each signal is reported once.
    fn poll_event(&mut self) -> Option<PlaybackEvent>;
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum ClockState {
    Stopped,
    Running { anchor_host_us: i64, anchor_media: f64 },
    Paused,
}

/// Media clock re-based on a host [`TimeProvider`].
///
/// While running, media time is `anchor_media + (host - anchor_host)`. Pausing
/// freezes the value; resuming re-anchors it against the host clock so the
/// pause duration never shows up in media time.
pub struct MediaClock<P: TimeProvider> {
    provider: P,
    state: ClockState,
    frozen: f64,
    duration: Option<f64>,
    ready: bool,
    ended_reported: bool,
}

impl MediaClock<SystemTimeProvider> {
    pub fn system() -> Self {
        Self::new(SystemTimeProvider::new())
    }
}

impl<P: TimeProvider> MediaClock<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            state: ClockState::Stopped,
            frozen: 0.0,
            duration: None,
            ready: true,
            ended_reported: false,
        }
    }

    /// Raise [`PlaybackEvent::Ended`] once `now()` reaches `secs`.
    pub fn with_duration(mut self, secs: f64) -> Self {
        self.duration = (secs.is_finite() && secs > 0.0).then_some(secs);
        self
    }

    pub fn set_ready(&mut self, ready: bool) {
        self.ready = ready;
    }

    pub fn duration(&self) -> Option<f64> {
        self.duration
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, ClockState::Running { .. })
    }

    fn anchor_now(&mut self, media: f64) {
        self.state = ClockState::Running {
            anchor_host_us: self.provider.now_us(),
            anchor_media: media,
        };
    }
}

impl<P: TimeProvider> TimeSource for MediaClock<P> {
    fn is_ready(&self) -> bool {
        self.ready
    }

    fn play(&mut self) -> Result<(), PlaybackError> {
        if !self.ready {
            return Err(PlaybackError("media is not loaded".to_string()));
        }
        self.frozen = 0.0;
        self.ended_reported = false;
        self.anchor_now(0.0);
        Ok(())
    }

    fn now(&self) -> f64 {
        match self.state {
            ClockState::Running {
                anchor_host_us,
                anchor_media,
            } => {
                let elapsed_us = (self.provider.now_us() - anchor_host_us).max(0);
                anchor_media + elapsed_us as f64 / 1_000_000.0
            }
            ClockState::Stopped | ClockState::Paused => self.frozen,
        }
    }

    fn pause(&mut self) {
        if self.is_running() {
            self.frozen = self.now();
            self.state = ClockState::Paused;
        }
    }

    fn resume(&mut self) -> Result<(), PlaybackError> {
        match self.state {
            ClockState::Paused => {
                self.anchor_now(self.frozen);
                Ok(())
            }
            ClockState::Running { .. } => Ok(()),
            ClockState::Stopped => Err(PlaybackError("cannot resume stopped media".to_string())),
        }
    }

    fn reset(&mut self) {
        self.frozen = 0.0;
        self.ended_reported = false;
        if self.is_running() {
            self.anchor_now(0.0);
        }
    }

    fn stop(&mut self) {
        self.frozen = self.now();
        self.state = ClockState::Stopped;
    }

    fn poll_event(&mut self) -> Option<PlaybackEvent> {
        let now = self.now();
        if !now.is_finite() {
            return Some(PlaybackEvent::Failed(
                "media clock reported a non-finite position".to_string(),
            ));
        }
        match self.duration {
            Some(end) if self.is_running() && !self.ended_reported && now >= end => {
                self.ended_reported = true;
                Some(PlaybackEvent::Ended)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_time_provider_advance() {
        let tp = MockTimeProvider::new();
        assert_eq!(tp.now_us(), 0);
        tp.advance(1_000_000);
        assert_eq!(tp.now_us(), 1_000_000);
        tp.advance(500_000);
        assert_eq!(tp.now_us(), 1_500_000);
    }

    #[test]
    fn mock_time_provider_clones_share_time() {
        let tp = MockTimeProvider::new();
        let other = tp.clone();
        tp.set_time(5_000_000);
        assert_eq!(other.now_us(), 5_000_000);
    }

    #[test]
    fn system_time_provider_monotonic() {
        let tp = SystemTimeProvider::new();
        let t1 = tp.now_us();
        let t2 = tp.now_us();
        assert!(t2 >= t1);
    }

    #[test]
    fn clock_starts_at_zero_and_advances() {
        let host = MockTimeProvider::new();
        host.set_time(42_000_000);
        let mut clock = MediaClock::new(host.clone());
        assert_eq!(clock.now(), 0.0);

        clock.play().unwrap();
        assert_eq!(clock.now(), 0.0);
        host.advance(1_500_000);
        assert!((clock.now() - 1.5).abs() < 1e-9);
    }

    #[test]
    fn pause_freezes_and_resume_rebases() {
        let host = MockTimeProvider::new();
        let mut clock = MediaClock::new(host.clone());
        clock.play().unwrap();
        host.advance(2_000_000);

        clock.pause();
        host.advance(10_000_000);
        assert!((clock.now() - 2.0).abs() < 1e-9);

        clock.resume().unwrap();
        assert!((clock.now() - 2.0).abs() < 1e-9);
        host.advance(250_000);
        assert!((clock.now() - 2.25).abs() < 1e-9);
    }

    #[test]
    fn reset_returns_to_zero_while_running() {
        let host = MockTimeProvider::new();
        let mut clock = MediaClock::new(host.clone());
        clock.play().unwrap();
        host.advance(3_000_000);
        clock.reset();
        assert_eq!(clock.now(), 0.0);
        host.advance(1_000_000);
        assert!((clock.now() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn stop_holds_last_value() {
        let host = MockTimeProvider::new();
        let mut clock = MediaClock::new(host.clone());
        clock.play().unwrap();
        host.advance(1_000_000);
        clock.stop();
        host.advance(1_000_000);
        assert!((clock.now() - 1.0).abs() < 1e-9);
        assert!(clock.resume().is_err());
    }

    #[test]
    fn not_ready_rejects_play() {
        let mut clock = MediaClock::new(MockTimeProvider::new());
        clock.set_ready(false);
        assert!(!clock.is_ready());
        assert!(clock.play().is_err());
    }

    #[test]
    fn ended_is_reported_once() {
        let host = MockTimeProvider::new();
        let mut clock = MediaClock::new(host.clone()).with_duration(5.0);
        clock.play().unwrap();
        host.advance(4_999_000);
        assert_eq!(clock.poll_event(), None);
        host.advance(1_000);
        assert_eq!(clock.poll_event(), Some(PlaybackEvent::Ended));
        host.advance(1_000_000);
        assert_eq!(clock.poll_event(), None);
    }
}
