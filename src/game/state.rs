use crate::model::NoteId;

use super::JudgeTier;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteState {
    Pending,
    Judged(JudgeTier),
}

impl NoteState {
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }
}

/// Resolution state of every note in a chart, indexed by [`NoteId`].
///
/// A note moves from pending to judged at most once; only [`reset`](Self::reset)
/// brings it back.
#[derive(Debug, Clone, Default)]
pub struct ResolvedSet {
    note_states: Vec<NoteState>,
    resolved: usize,
}

impl ResolvedSet {
    pub fn new(note_count: usize) -> Self {
        Self {
            note_states: vec![NoteState::Pending; note_count],
            resolved: 0,
        }
    }

    pub fn reset(&mut self) {
        for state in &mut self.note_states {
            *state = NoteState::Pending;
        }
        self.resolved = 0;
    }

    /// Mark `id` as judged. Returns false if it was already resolved or does
    /// not exist.
    pub fn resolve(&mut self, id: NoteId, tier: JudgeTier) -> bool {
        match self.note_states.get_mut(id.index()) {
            Some(state) if state.is_pending() => {
                *state = NoteState::Judged(tier);
                self.resolved += 1;
                true
            }
            _ => false,
        }
    }

    pub fn is_resolved(&self, id: NoteId) -> bool {
        self.get_state(id).is_some_and(|s| !s.is_pending())
    }

    pub fn get_state(&self, id: NoteId) -> Option<NoteState> {
        self.note_states.get(id.index()).copied()
    }

    pub fn resolved_count(&self) -> usize {
        self.resolved
    }

    pub fn len(&self) -> usize {
        self.note_states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.note_states.is_empty()
    }

    pub fn all_resolved(&self) -> bool {
        self.resolved == self.note_states.len()
    }
}
