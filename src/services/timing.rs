//! Timing Harness.
//!
//! Records when the current trial became visible or audible and computes the
//! elapsed reaction time at response. Marks carry a trial epoch so a timer
//! firing after the trial has changed cannot stamp a stale presentation
//! instant.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::debug;

/// Identity of one presented trial within a session. Bumped on every trial
/// change; marks and timers from older epochs are ignored.
pub type TrialEpoch = u64;

/// Presentation-to-response stopwatch for one session.
#[derive(Debug, Default)]
pub struct TimingHarness {
    current_epoch: TrialEpoch,
    presented_at: Option<Instant>,
}

impl TimingHarness {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin timing a new trial: invalidates any pending mark and returns
    /// the epoch the new trial's timers must carry.
    pub fn begin_trial(&mut self) -> TrialEpoch {
        self.current_epoch += 1;
        self.presented_at = None;
        self.current_epoch
    }

    /// Stamp the presentation instant. Returns false (and stamps nothing)
    /// when `epoch` is not the current trial's.
    pub fn mark_presented(&mut self, epoch: TrialEpoch) -> bool {
        if epoch != self.current_epoch {
            debug!(epoch, current = self.current_epoch, "stale presentation mark ignored");
            return false;
        }
        self.presented_at = Some(Instant::now());
        true
    }

    /// Seconds since the presentation mark, or `None` if the current trial
    /// was never marked (settle delay still pending, or timer cancelled).
    pub fn reaction_seconds(&self) -> Option<f64> {
        self.presented_at.map(|at| at.elapsed().as_secs_f64())
    }

    #[cfg(test)]
    pub fn backdate(&mut self, by: Duration) {
        if let Some(at) = self.presented_at.as_mut() {
            *at -= by;
        }
    }
}

/// Explicit cancellable task that arms the harness after the audio settle
/// delay. Dropping the timer (trial change, session teardown) aborts it.
#[derive(Debug)]
pub struct SettleTimer {
    handle: JoinHandle<()>,
}

impl SettleTimer {
    /// Schedule a presentation mark for `epoch` after `delay`.
    pub fn schedule(
        harness: Arc<Mutex<TimingHarness>>,
        epoch: TrialEpoch,
        delay: Duration,
    ) -> Self {
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            harness.lock().await.mark_presented(epoch);
        });
        Self { handle }
    }

    pub fn cancel(&self) {
        self.handle.abort();
    }
}

impl Drop for SettleTimer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reaction_requires_a_mark() {
        let mut harness = TimingHarness::new();
        let epoch = harness.begin_trial();
        assert!(harness.reaction_seconds().is_none());

        assert!(harness.mark_presented(epoch));
        let rt = harness.reaction_seconds().unwrap();
        assert!(rt >= 0.0);
    }

    #[test]
    fn test_stale_epoch_mark_is_ignored() {
        let mut harness = TimingHarness::new();
        let old = harness.begin_trial();
        let _new = harness.begin_trial();

        assert!(!harness.mark_presented(old));
        assert!(harness.reaction_seconds().is_none());
    }

    #[test]
    fn test_begin_trial_clears_previous_mark() {
        let mut harness = TimingHarness::new();
        let epoch = harness.begin_trial();
        harness.mark_presented(epoch);
        assert!(harness.reaction_seconds().is_some());

        harness.begin_trial();
        assert!(harness.reaction_seconds().is_none());
    }

    #[test]
    fn test_backdated_mark_measures_elapsed() {
        let mut harness = TimingHarness::new();
        let epoch = harness.begin_trial();
        harness.mark_presented(epoch);
        harness.backdate(Duration::from_millis(1500));

        let rt = harness.reaction_seconds().unwrap();
        assert!(rt >= 1.5);
    }

    #[tokio::test]
    async fn test_settle_timer_marks_after_delay() {
        let harness = Arc::new(Mutex::new(TimingHarness::new()));
        let epoch = harness.lock().await.begin_trial();

        let _timer = SettleTimer::schedule(
            Arc::clone(&harness),
            epoch,
            Duration::from_millis(10),
        );

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(harness.lock().await.reaction_seconds().is_some());
    }

    #[tokio::test]
    async fn test_cancelled_settle_timer_never_marks() {
        let harness = Arc::new(Mutex::new(TimingHarness::new()));
        let epoch = harness.lock().await.begin_trial();

        let timer = SettleTimer::schedule(
            Arc::clone(&harness),
            epoch,
            Duration::from_millis(20),
        );
        timer.cancel();

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(harness.lock().await.reaction_seconds().is_none());
    }

    #[tokio::test]
    async fn test_settle_timer_from_previous_trial_is_stale() {
        let harness = Arc::new(Mutex::new(TimingHarness::new()));
        let epoch = harness.lock().await.begin_trial();

        let _timer = SettleTimer::schedule(
            Arc::clone(&harness),
            epoch,
            Duration::from_millis(10),
        );

        // Trial changes before the timer fires.
        harness.lock().await.begin_trial();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(harness.lock().await.reaction_seconds().is_none());
    }
}
