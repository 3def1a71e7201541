// In-process throttle guard for passive trigger paths

use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Why a passive invocation was skipped without touching the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    AlreadyRunning,
    Cooldown,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::AlreadyRunning => "already_running",
            SkipReason::Cooldown => "cooldown",
        }
    }
}

/// Result of a guard-throttled passive invocation.
#[derive(Debug, Clone)]
pub enum PassiveOutcome<T> {
    Skipped { reason: SkipReason },
    Ran { summary: T },
}

impl<T> PassiveOutcome<T> {
    pub fn was_skipped(&self) -> bool {
        matches!(self, PassiveOutcome::Skipped { .. })
    }
}

struct GuardState {
    running: bool,
    last_completed: Option<Instant>,
}

/// Best-effort, single-process guard against re-entrant runs and
/// too-frequent passive invocations.
///
/// This is NOT a distributed lock: two separate processes can both acquire
/// their own guard at the same instant. Cross-instance safety rests entirely
/// on the store's conditional transition, not on this object.
pub struct RunGuard {
    name: &'static str,
    cooldown: Duration,
    state: Mutex<GuardState>,
}

impl RunGuard {
    pub fn new(name: &'static str, cooldown: Duration) -> Self {
        Self {
            name,
            cooldown,
            state: Mutex::new(GuardState {
                running: false,
                last_completed: None,
            }),
        }
    }

    /// Try to claim the guard for one run within this process.
    ///
    /// Returns a permit, or the reason the caller should no-op: a run is
    /// already in flight, or the last completed run is within the cooldown.
    pub fn try_acquire_local(&self) -> Result<RunPermit<'_>, SkipReason> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);

        if state.running {
            debug!(guard = self.name, "skipping: run already in flight");
            return Err(SkipReason::AlreadyRunning);
        }
        if let Some(last) = state.last_completed {
            if last.elapsed() < self.cooldown {
                debug!(guard = self.name, "skipping: within cooldown");
                return Err(SkipReason::Cooldown);
            }
        }

        state.running = true;
        Ok(RunPermit {
            guard: self,
            completed: false,
        })
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    fn finish(&self, completed: bool) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.running = false;
        if completed {
            // Only a completed run starts a cooldown; a failed run may be
            // retried by the next passive tick immediately.
            state.last_completed = Some(Instant::now());
        }
    }
}

impl std::fmt::Debug for RunGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunGuard")
            .field("name", &self.name)
            .field("cooldown", &self.cooldown)
            .finish()
    }
}

/// Claim on the guard for the duration of one run. Dropping the permit
/// without calling [`RunPermit::complete`] releases the guard without
/// starting a cooldown.
pub struct RunPermit<'a> {
    guard: &'a RunGuard,
    completed: bool,
}

impl RunPermit<'_> {
    /// Mark the run completed, starting the cooldown window.
    pub fn complete(mut self) {
        self.completed = true;
        self.guard.finish(true);
        debug!(guard = self.guard.name, "run completed, cooldown started");
    }
}

impl Drop for RunPermit<'_> {
    fn drop(&mut self) {
        if !self.completed {
            self.guard.finish(false);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_second_acquire_while_running_skips() {
        let guard = RunGuard::new("test", Duration::from_secs(300));
        let permit = guard.try_acquire_local().unwrap();

        assert_eq!(
            guard.try_acquire_local().err(),
            Some(SkipReason::AlreadyRunning)
        );
        permit.complete();
    }

    #[tokio::test(start_paused = true)]
    async fn test_cooldown_after_completion() {
        let guard = RunGuard::new("test", Duration::from_secs(300));
        guard.try_acquire_local().unwrap().complete();

        // 10 seconds later: still inside the 5-minute cooldown.
        tokio::time::advance(Duration::from_secs(10)).await;
        assert_eq!(guard.try_acquire_local().err(), Some(SkipReason::Cooldown));

        // Past the cooldown the guard opens again.
        tokio::time::advance(Duration::from_secs(300)).await;
        assert!(guard.try_acquire_local().is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandoned_permit_starts_no_cooldown() {
        let guard = RunGuard::new("test", Duration::from_secs(300));
        drop(guard.try_acquire_local().unwrap());

        // A failed run does not count as completed; retry is allowed at once.
        assert!(guard.try_acquire_local().is_ok());
    }

    #[tokio::test]
    async fn test_first_acquire_succeeds_without_history() {
        let guard = RunGuard::new("test", Duration::from_secs(1));
        assert!(guard.try_acquire_local().is_ok());
    }
}
