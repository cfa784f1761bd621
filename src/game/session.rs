//! Session state machine.
//!
//! The controller is the single owner of the mutable play state (resolution
//! set, score, judgment history). Both call sites that mutate it, the
//! frame-driven [`tick`](SessionController::tick) and the input-driven
//! [`judge`](SessionController::judge), go through `&mut self`, so on a
//! multi-threaded host one mutex around the controller is enough.

use tracing::{debug, info, warn};

use crate::config::GameSettings;
use crate::model::Chart;
use crate::traits::time::{PlaybackError, PlaybackEvent, TimeSource};
use crate::util::SessionError;

use super::judge::{JudgeSystem, JudgmentEvent};
use super::result::FinalResult;
use super::score::{ScoreKeeper, SessionStats};
use super::state::ResolvedSet;
use super::sweep::MissSweeper;
use super::ticker::{TickTask, TickToken};
use super::window::{ActiveNote, NoteWindow};

/// Session phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    Playing,
    Paused,
    Ended,
}

impl SessionState {
    /// Playing or paused.
    pub fn is_active(self) -> bool {
        matches!(self, Self::Playing | Self::Paused)
    }
}

/// What one tick observed, for the presentation layer.
#[derive(Debug, Clone)]
pub struct TickReport {
    /// Media time the tick ran at.
    pub now: f64,
    /// Visible notes not yet judged.
    pub active: Vec<ActiveNote>,
    /// Timeout misses declared by this tick.
    pub missed: Vec<JudgmentEvent>,
    pub stats: SessionStats,
    /// The media ended during this tick and the session was finalized.
    pub ended: bool,
}

pub struct SessionController<T: TimeSource> {
    settings: GameSettings,
    chart: Option<Chart>,
    time: Option<T>,
    state: SessionState,
    window: Option<NoteWindow>,
    judge: JudgeSystem,
    sweeper: MissSweeper,
    resolved: ResolvedSet,
    score: ScoreKeeper,
    ticker: TickTask,
    history: Vec<JudgmentEvent>,
    result: Option<FinalResult>,
    last_error: Option<SessionError>,
}

impl<T: TimeSource> SessionController<T> {
    pub fn new(settings: GameSettings) -> Self {
        let settings = settings.sanitized();
        let judge = JudgeSystem::new(settings.judge).with_input_offset(settings.input_offset());
        Self {
            settings,
            chart: None,
            time: None,
            state: SessionState::Idle,
            window: None,
            judge,
            sweeper: MissSweeper::new(),
            resolved: ResolvedSet::default(),
            score: ScoreKeeper::new(),
            ticker: TickTask::new(),
            history: Vec::new(),
            result: None,
            last_error: None,
        }
    }

    pub fn with_chart(mut self, chart: Chart) -> Self {
        self.load_chart(chart);
        self
    }

    pub fn with_time_source(mut self, time: T) -> Self {
        self.attach_time_source(time);
        self
    }

    /// Replace the chart. A running session is stopped and the controller
    /// returns to idle.
    pub fn load_chart(&mut self, chart: Chart) {
        self.halt();
        info!(
            "chart loaded: {} notes, tempo {}, difficulty {}",
            chart.len(),
            chart.tempo(),
            chart.difficulty()
        );
        self.window = Some(NoteWindow::for_chart(self.settings.layout(), &chart));
        self.resolved = ResolvedSet::new(chart.len());
        self.chart = Some(chart);
        self.clear_session();
        self.state = SessionState::Idle;
    }

    /// Replace the time source. A running session is stopped and the
    /// controller returns to idle.
    pub fn attach_time_source(&mut self, time: T) {
        self.halt();
        self.time = Some(time);
        self.state = SessionState::Idle;
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn settings(&self) -> &GameSettings {
        &self.settings
    }

    pub fn chart(&self) -> Option<&Chart> {
        self.chart.as_ref()
    }

    pub fn time_source(&self) -> Option<&T> {
        self.time.as_ref()
    }

    pub fn time_source_mut(&mut self) -> Option<&mut T> {
        self.time.as_mut()
    }

    /// Tempo-normalized fall speed of the loaded chart, 0 without one.
    pub fn note_speed(&self) -> f64 {
        self.window.map_or(0.0, |w| w.note_speed())
    }

    /// Current media time, 0 without a time source.
    pub fn now(&self) -> f64 {
        self.time.as_ref().map_or(0.0, |t| t.now())
    }

    /// Begin a fresh session from media time 0.
    ///
    /// Fails without changing state if the chart or time source is missing
    /// or the media is not ready. If the media refuses to play, the session
    /// ends and the playback error is returned.
    pub fn start(&mut self) -> Result<(), SessionError> {
        let (window, note_count) = match self.chart.as_ref() {
            Some(chart) => (
                NoteWindow::for_chart(self.settings.layout(), chart),
                chart.len(),
            ),
            None => return Err(self.report(SessionError::missing_chart())),
        };
        match self.time.as_ref() {
            None => return Err(self.report(SessionError::missing_time_source())),
            Some(time) if !time.is_ready() => {
                return Err(self.report(SessionError::media_not_ready()));
            }
            Some(_) => {}
        }

        self.ticker.cancel();
        self.clear_session();
        self.window = Some(window);
        self.resolved = ResolvedSet::new(note_count);

        let played = self.time.as_mut().map(|t| t.play());
        if let Some(Err(e)) = played {
            return Err(self.report(e.into()));
        }

        self.state = SessionState::Playing;
        self.ticker.schedule();
        info!(
            "session started: note speed {:.1}, preview {:.3}s",
            window.note_speed(),
            window.preview_time()
        );
        Ok(())
    }

    /// Playing ⇄ Paused. No-op in any other state.
    pub fn toggle_pause(&mut self) -> Result<SessionState, SessionError> {
        match self.state {
            SessionState::Playing => {
                if let Some(time) = self.time.as_mut() {
                    time.pause();
                }
                self.ticker.cancel();
                self.state = SessionState::Paused;
                info!("session paused at {:.3}s", self.now());
            }
            SessionState::Paused => {
                let resumed = self.time.as_mut().map(|t| t.resume());
                if let Some(Err(e)) = resumed {
                    return Err(self.report(e.into()));
                }
                self.state = SessionState::Playing;
                self.ticker.schedule();
                info!("session resumed at {:.3}s", self.now());
            }
            SessionState::Idle | SessionState::Ended => {}
        }
        Ok(self.state)
    }

    /// Halt the tick loop and the media. An active session ends and its
    /// result is finalized; otherwise the state is unchanged.
    pub fn stop(&mut self) {
        self.halt();
        if self.state.is_active() {
            self.finish();
        }
    }

    /// Discard the current session and start over.
    pub fn restart(&mut self) -> Result<(), SessionError> {
        self.halt();
        self.clear_session();
        self.state = SessionState::Idle;
        self.start()
    }

    /// Token of the tick the host should run next, if the loop is live.
    pub fn pending_tick(&self) -> Option<TickToken> {
        self.ticker.pending()
    }

    /// Run the pending tick, if any. Convenience for frame callbacks.
    pub fn frame(&mut self) -> Result<Option<TickReport>, SessionError> {
        match self.pending_tick() {
            Some(token) => self.tick(token),
            None => Ok(None),
        }
    }

    /// Run the tick scheduled as `token`.
    ///
    /// A cancelled or already-consumed token is a no-op returning `None`.
    /// Otherwise: read the media time, sweep expired notes, collect the
    /// visible notes and handle media signals. The next tick is scheduled
    /// unless the session left `Playing`.
    pub fn tick(&mut self, token: TickToken) -> Result<Option<TickReport>, SessionError> {
        if !self.ticker.take(token) || self.state != SessionState::Playing {
            return Ok(None);
        }
        let (Some(chart), Some(time), Some(window)) =
            (self.chart.as_ref(), self.time.as_mut(), self.window.as_ref())
        else {
            return Ok(None);
        };

        let now = time.now();
        if !now.is_finite() {
            let err = PlaybackError("media clock reported a non-finite position".to_string());
            return Err(self.report(err.into()));
        }

        let missed = self.sweeper.sweep(chart, &self.judge, &mut self.resolved, now);
        for event in &missed {
            self.score.apply(event);
        }
        self.history.extend_from_slice(&missed);

        let resolved = &self.resolved;
        let active: Vec<ActiveNote> = window
            .active_notes(chart, now)
            .into_iter()
            .filter(|a| !resolved.is_resolved(a.note.id))
            .collect();

        let mut ended = false;
        match time.poll_event() {
            Some(PlaybackEvent::Failed(reason)) => {
                return Err(self.report(PlaybackError(reason).into()));
            }
            Some(PlaybackEvent::Ended) => {
                info!("media ended at {now:.3}s");
                self.stop();
                ended = true;
            }
            None => {
                self.ticker.schedule();
            }
        }

        Ok(Some(TickReport {
            now,
            active,
            missed,
            stats: self.score.stats(),
            ended,
        }))
    }

    /// Judge a press on `lane` at media time `input_time`.
    ///
    /// Ignored (`Ok(None)`) unless playing. A lane outside the chart is
    /// reported as [`SessionError::InputOutOfRange`] and changes nothing.
    pub fn judge(
        &mut self,
        lane: usize,
        input_time: f64,
    ) -> Result<Option<JudgmentEvent>, SessionError> {
        if self.state != SessionState::Playing {
            debug!("input on lane {lane} ignored in state {:?}", self.state);
            return Ok(None);
        }
        let (Some(chart), Some(window)) = (self.chart.as_ref(), self.window.as_ref()) else {
            return Ok(None);
        };
        if lane >= chart.lane_count() {
            let lane_count = chart.lane_count();
            debug!("input on lane {lane} ignored: chart has {lane_count} lanes");
            return Err(SessionError::InputOutOfRange { lane, lane_count });
        }

        let event = self
            .judge
            .judge(chart, window, &mut self.resolved, lane, input_time);
        if let Some(event) = &event {
            self.score.apply(event);
            self.history.push(*event);
        }
        Ok(event)
    }

    /// Visible, not yet judged notes at the current media time.
    pub fn active_notes(&self) -> Vec<ActiveNote> {
        let (Some(chart), Some(window)) = (self.chart.as_ref(), self.window.as_ref()) else {
            return Vec::new();
        };
        window
            .active_notes(chart, self.now())
            .into_iter()
            .filter(|a| !self.resolved.is_resolved(a.note.id))
            .collect()
    }

    pub fn stats(&self) -> SessionStats {
        self.score.stats()
    }

    /// Summary of the session, available once it has ended.
    pub fn final_result(&self) -> Option<FinalResult> {
        self.result
    }

    /// Every judgment of the current session, in emission order.
    pub fn history(&self) -> &[JudgmentEvent] {
        &self.history
    }

    pub fn resolved(&self) -> &ResolvedSet {
        &self.resolved
    }

    /// The most recent configuration or playback error.
    pub fn last_error(&self) -> Option<&SessionError> {
        self.last_error.as_ref()
    }

    fn halt(&mut self) {
        self.ticker.cancel();
        if let Some(time) = self.time.as_mut() {
            time.stop();
        }
    }

    fn clear_session(&mut self) {
        self.resolved.reset();
        self.score.reset();
        self.history.clear();
        self.result = None;
        self.last_error = None;
    }

    fn finish(&mut self) {
        let result = self.score.finalize();
        info!(
            "session ended: score {} rank {} accuracy {:.2}% max combo {}",
            result.score,
            result.rank,
            result.accuracy_percent(),
            result.max_combo
        );
        self.result = Some(result);
        self.state = SessionState::Ended;
    }

    /// Record `err`; errors that end the session halt it and finalize the
    /// result first.
    fn report(&mut self, err: SessionError) -> SessionError {
        warn!("{err}");
        if err.ends_session() {
            self.halt();
            self.finish();
        }
        self.last_error = Some(err.clone());
        err
    }
}
