/// Handle to one scheduled tick.
///
/// Tokens are never reused, so a token kept by the host across a
/// stop/start cannot run against the new session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TickToken(u64);

/// Explicit, cancellable repeating task.
///
/// At most one tick is pending at a time. Running a tick consumes the token;
/// the owner re-schedules at the end of the tick if the loop should continue.
#[derive(Debug, Clone, Default)]
pub struct TickTask {
    generation: u64,
    pending: Option<TickToken>,
}

impl TickTask {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule the next tick, replacing any pending one.
    pub fn schedule(&mut self) -> TickToken {
        self.generation += 1;
        let token = TickToken(self.generation);
        self.pending = Some(token);
        token
    }

    /// Drop the pending tick. No-op if nothing is scheduled.
    pub fn cancel(&mut self) {
        self.pending = None;
    }

    pub fn pending(&self) -> Option<TickToken> {
        self.pending
    }

    /// Consume the pending tick if `token` is it.
    pub fn take(&mut self, token: TickToken) -> bool {
        if self.pending == Some(token) {
            self.pending = None;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn take_consumes_once() {
        let mut task = TickTask::new();
        let token = task.schedule();
        assert!(task.take(token));
        assert!(!task.take(token));
        assert_eq!(task.pending(), None);
    }

    #[test]
    fn cancelled_token_does_not_run() {
        let mut task = TickTask::new();
        let token = task.schedule();
        task.cancel();
        assert!(!task.take(token));
        task.cancel();
        assert_eq!(task.pending(), None);
    }

    #[test]
    fn stale_token_rejected_after_reschedule() {
        let mut task = TickTask::new();
        let old = task.schedule();
        task.cancel();
        let new = task.schedule();
        assert_ne!(old, new);
        assert!(!task.take(old));
        assert!(task.take(new));
    }
}
