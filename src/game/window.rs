//! Visibility window of the note field.
//!
//! This is pure time geometry: a note is active when its time-to-hit falls
//! between its disappear time and the preview time. Whether the note was
//! already judged is not known here; callers that render or judge filter
//! resolved notes themselves.

use serde::{Deserialize, Serialize};

use crate::model::{Chart, Note};

/// Upper bound on how early a note appears, in seconds.
pub const PREVIEW_CAP: f64 = 4.0;

/// How long a note stays after its judgment instant, in seconds.
pub const DISAPPEAR_GRACE: f64 = 0.5;

/// Tempo at which notes fall at exactly the base speed.
pub const REFERENCE_TEMPO: f64 = 120.0;

/// Note field geometry, in layout units (pixels for a DOM/canvas host).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Layout {
    /// Fall speed at the reference tempo, units per second.
    pub base_speed: f64,
    /// Distance from the bottom of the field to the judge line.
    pub judge_line_offset: f64,
    /// Height of the field.
    pub viewport_length: f64,
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            base_speed: 600.0,
            judge_line_offset: 100.0,
            viewport_length: 800.0,
        }
    }
}

/// A note inside the visibility window at some instant.
///
/// Values are computed per query and are never kept across ticks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActiveNote {
    pub note: Note,
    /// `note.time - now`; negative once the judgment instant has passed.
    pub time_to_hit: f64,
    /// Distance above the judge line, `time_to_hit * note_speed`.
    pub fall_distance: f64,
}

/// Tempo-normalized fall speed: `base_speed * tempo / 120`.
pub fn note_speed(base_speed: f64, tempo: f64) -> f64 {
    base_speed * (tempo / REFERENCE_TEMPO)
}

/// Visibility window bound to one chart tempo and layout.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoteWindow {
    layout: Layout,
    note_speed: f64,
}

impl NoteWindow {
    pub fn new(layout: Layout, tempo: f64) -> Self {
        Self {
            layout,
            note_speed: note_speed(layout.base_speed, tempo),
        }
    }

    pub fn for_chart(layout: Layout, chart: &Chart) -> Self {
        Self::new(layout, chart.tempo())
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    pub fn note_speed(&self) -> f64 {
        self.note_speed
    }

    /// How far ahead of its judgment instant a note becomes visible.
    pub fn preview_time(&self) -> f64 {
        let travel = self.layout.viewport_length - self.layout.judge_line_offset;
        PREVIEW_CAP.min(travel / self.note_speed)
    }

    /// Time-to-hit at which `note` leaves the window. Hold and slide notes
    /// stay until their tail has cleared the judge line.
    pub fn disappear_time(&self, note: &Note) -> f64 {
        let mut disappear = -DISAPPEAR_GRACE;
        if note.is_long() {
            disappear -= note.duration + self.layout.judge_line_offset / self.note_speed;
        }
        disappear
    }

    pub fn is_active(&self, note: &Note, now: f64) -> bool {
        let time_to_hit = note.time - now;
        self.disappear_time(note) <= time_to_hit && time_to_hit <= self.preview_time()
    }

    pub fn fall_distance(&self, note: &Note, now: f64) -> f64 {
        (note.time - now) * self.note_speed
    }

    /// Project `note` at `now`, or `None` if it is outside the window.
    pub fn project(&self, note: &Note, now: f64) -> Option<ActiveNote> {
        if !self.is_active(note, now) {
            return None;
        }
        let time_to_hit = note.time - now;
        Some(ActiveNote {
            note: *note,
            time_to_hit,
            fall_distance: time_to_hit * self.note_speed,
        })
    }

    /// All notes of `chart` visible at `now`, in chart order.
    pub fn active_notes(&self, chart: &Chart, now: f64) -> Vec<ActiveNote> {
        if !now.is_finite() {
            return Vec::new();
        }
        chart
            .notes()
            .iter()
            .filter_map(|note| self.project(note, now))
            .collect()
    }
}

/// Notes of `chart` visible at `now` under `layout`.
pub fn active_notes(chart: &Chart, now: f64, layout: &Layout) -> Vec<ActiveNote> {
    NoteWindow::for_chart(*layout, chart).active_notes(chart, now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{NoteId, NoteType};

    fn window(tempo: f64) -> NoteWindow {
        NoteWindow::new(Layout::default(), tempo)
    }

    #[test]
    fn speed_scales_with_tempo() {
        assert_eq!(window(120.0).note_speed(), 600.0);
        assert_eq!(window(240.0).note_speed(), 1200.0);
        assert_eq!(window(60.0).note_speed(), 300.0);
    }

    #[test]
    fn preview_time_is_capped() {
        // (800 - 100) / 600 = 1.1666..
        assert!((window(120.0).preview_time() - 700.0 / 600.0).abs() < 1e-12);
        // Slow chart: 700 / 75 = 9.33 -> capped
        assert_eq!(window(15.0).preview_time(), PREVIEW_CAP);
    }

    #[test]
    fn preview_time_halves_at_double_tempo() {
        let normal = window(120.0).preview_time();
        let fast = window(240.0).preview_time();
        assert!((fast - normal / 2.0).abs() < 1e-12);
    }

    #[test]
    fn tap_visibility_bounds_are_inclusive() {
        let w = window(120.0);
        let note = Note::tap(NoteId(0), 10.0, 0);
        let preview = w.preview_time();

        assert!(w.is_active(&note, 10.0 - preview + 1e-9));
        assert!(!w.is_active(&note, 10.0 - preview - 0.001));
        assert!(w.is_active(&note, 10.5));
        assert!(!w.is_active(&note, 10.501));
    }

    #[test]
    fn hold_tail_extends_disappear_time() {
        let w = window(120.0);
        let hold = Note::hold(NoteId(0), 10.0, 0, 1.0);
        // -0.5 - (1.0 + 100 / 600)
        let expected = -0.5 - (1.0 + 100.0 / 600.0);
        assert!((w.disappear_time(&hold) - expected).abs() < 1e-12);
        assert!(w.is_active(&hold, 11.6));
        assert!(!w.is_active(&hold, 11.7));
    }

    #[test]
    fn slide_tail_extends_disappear_time() {
        let w = window(120.0);
        let hold = Note::hold(NoteId(0), 10.0, 0, 1.0);
        let slide = Note {
            note_type: NoteType::Slide,
            ..hold
        };
        assert_eq!(w.disappear_time(&slide), w.disappear_time(&hold));
        assert!(w.is_active(&slide, 11.6));
        assert!(!w.is_active(&slide, 11.7));
        // The same note as a tap is gone after the grace period.
        assert!(!w.is_active(&Note::tap(NoteId(0), 10.0, 0), 11.6));
    }

    #[test]
    fn zero_length_hold_behaves_like_tap() {
        let w = window(120.0);
        let hold = Note::hold(NoteId(0), 10.0, 0, 0.0);
        assert_eq!(w.disappear_time(&hold), -DISAPPEAR_GRACE);
    }

    #[test]
    fn fall_distance_is_time_times_speed() {
        let w = window(120.0);
        let note = Note::tap(NoteId(0), 10.0, 0);
        let active = w.project(&note, 9.5).unwrap();
        assert!((active.time_to_hit - 0.5).abs() < 1e-12);
        assert!((active.fall_distance - 300.0).abs() < 1e-9);

        let past = w.project(&note, 10.25).unwrap();
        assert!(past.fall_distance < 0.0);
    }

    #[test]
    fn non_finite_now_yields_nothing() {
        let chart = Chart::new(120.0, 4, vec![Note::tap(NoteId(0), 1.0, 0)]).unwrap();
        assert!(active_notes(&chart, f64::NAN, &Layout::default()).is_empty());
    }
}
