//! Trial Session: the per-test state machine.
//!
//! Drives one subject through a test's trial sequence: a fixed baseline
//! batch fetched at start, then backend-selected adaptive trials, until the
//! trial cap is reached or the adaptive policy concludes early. Responses
//! are timed through the [`TimingHarness`] and appended strictly in
//! completion order; at most one fetch is ever in flight.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::domain::errors::{SessionError, SessionResult};
use crate::domain::models::{Phase, ResponseItem, TestId, Trial, TrialLimits};
use crate::domain::ports::TrialApi;
use crate::services::aggregator::SlotWriter;
use crate::services::timing::{SettleTimer, TimingHarness, TrialEpoch};

/// What became of a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The response was graded and appended.
    Recorded { correct: bool, phase: Phase },
    /// A fetch was in flight or no trial was current; nothing changed.
    Ignored,
}

/// State machine for one test's trial sequence within one subject run.
pub struct TrialSession {
    test: TestId,
    limits: TrialLimits,
    api: Arc<dyn TrialApi>,
    writer: SlotWriter,
    timing: Arc<Mutex<TimingHarness>>,
    settle_delay: Duration,
    settle_timer: Option<SettleTimer>,

    phase: Phase,
    pending_baseline: VecDeque<Trial>,
    current_trial: Option<Trial>,
    current_epoch: TrialEpoch,
    responses: Vec<ResponseItem>,
    loading: bool,
}

impl TrialSession {
    /// INIT: fetch the baseline batch and present its first trial.
    ///
    /// An empty batch is an immediate error; a batch smaller than the
    /// baseline window is a backend protocol anomaly, logged and degraded
    /// to an early adaptive fetch when the queue runs dry.
    pub async fn start(
        test: TestId,
        api: Arc<dyn TrialApi>,
        writer: SlotWriter,
        settle_delay: Duration,
    ) -> SessionResult<Self> {
        let limits = TrialLimits::for_test(test);
        let mut session = Self {
            test,
            limits,
            api,
            writer,
            timing: Arc::new(Mutex::new(TimingHarness::new())),
            settle_delay,
            settle_timer: None,
            phase: Phase::Baseline,
            pending_baseline: VecDeque::new(),
            current_trial: None,
            current_epoch: 0,
            responses: Vec::new(),
            loading: false,
        };
        session.init().await?;
        Ok(session)
    }

    async fn init(&mut self) -> SessionResult<()> {
        self.loading = true;
        let fetched = self.api.fetch_baseline(self.test).await;
        self.loading = false;

        let trials = fetched?;
        if trials.is_empty() {
            warn!(test = %self.test, "backend returned an empty baseline batch");
            return Err(SessionError::EmptyBaseline);
        }
        if trials.len() < self.limits.baseline_trials {
            warn!(
                test = %self.test,
                got = trials.len(),
                expected = self.limits.baseline_trials,
                "baseline batch smaller than expected; will fall back to adaptive fetch early"
            );
        }

        info!(test = %self.test, batch = trials.len(), "trial session started");
        self.pending_baseline = trials.into();
        let first = self
            .pending_baseline
            .pop_front()
            .ok_or(SessionError::EmptyBaseline)?;
        self.present(first).await;
        Ok(())
    }

    /// Explicit user retry after a fetch failure: re-run INIT from scratch,
    /// discarding any recorded responses.
    pub async fn restart(&mut self) -> SessionResult<()> {
        info!(test = %self.test, "restarting trial session");
        self.settle_timer = None;
        self.phase = Phase::Baseline;
        self.pending_baseline.clear();
        self.current_trial = None;
        self.responses.clear();
        self.init().await
    }

    /// Make `trial` current and start its reaction clock. Choice trials get
    /// the audio settle delay before the clock arms; speech trials are
    /// visible immediately.
    async fn present(&mut self, trial: Trial) {
        let epoch = self.timing.lock().await.begin_trial();
        self.current_epoch = epoch;
        self.settle_timer = None;

        match &trial {
            Trial::Choice(_) if !self.settle_delay.is_zero() => {
                self.settle_timer = Some(SettleTimer::schedule(
                    Arc::clone(&self.timing),
                    epoch,
                    self.settle_delay,
                ));
            }
            _ => {
                self.timing.lock().await.mark_presented(epoch);
            }
        }

        debug!(test = %self.test, stimulus = trial.stimulus_key(), phase = %self.phase, "trial presented");
        self.current_trial = Some(trial);
    }

    /// SUBMIT_RESPONSE for a choice trial: the selected option is graded
    /// against the trial's correct option.
    pub async fn submit_choice(&mut self, selected: &str) -> SessionResult<SubmitOutcome> {
        let Some(correct) = self.current_trial.as_ref().map(|t| t.grade(selected)) else {
            return Ok(self.ignore("no current trial"));
        };
        self.record(selected.to_string(), correct).await
    }

    /// SUBMIT_RESPONSE for a speech trial: the final transcript is compared
    /// to the target word, case-insensitively and whitespace-normalized.
    pub async fn submit_transcript(&mut self, transcript: &str) -> SessionResult<SubmitOutcome> {
        let Some(correct) = self.current_trial.as_ref().map(|t| t.grade(transcript)) else {
            return Ok(self.ignore("no current trial"));
        };
        self.record(transcript.to_string(), correct).await
    }

    /// Manual override after a recoverable speech failure: the examiner
    /// marks the trial directly, bypassing transcript comparison.
    pub async fn submit_manual(&mut self, correct: bool) -> SessionResult<SubmitOutcome> {
        let selected = if correct { "manual:correct" } else { "manual:incorrect" };
        self.record(selected.to_string(), correct).await
    }

    fn ignore(&self, reason: &str) -> SubmitOutcome {
        debug!(test = %self.test, reason, "submission ignored");
        SubmitOutcome::Ignored
    }

    /// Append the graded response and advance the state machine.
    async fn record(&mut self, selected: String, correct: bool) -> SessionResult<SubmitOutcome> {
        if self.loading {
            return Ok(self.ignore("fetch in flight"));
        }
        let Some(trial) = self.current_trial.take() else {
            return Ok(self.ignore("no current trial"));
        };

        let reaction = self.timing.lock().await.reaction_seconds().unwrap_or_else(|| {
            warn!(test = %self.test, stimulus = trial.stimulus_key(), "response before presentation mark; recording zero reaction time");
            0.0
        });
        self.settle_timer = None;

        let item = ResponseItem::new(trial.stimulus_key(), selected, correct, reaction);
        debug!(
            test = %self.test,
            stimulus = %item.stimulus_key,
            correct = item.correct,
            reaction_seconds = item.reaction_time_seconds,
            "response recorded"
        );
        self.responses.push(item);

        self.advance().await?;
        Ok(SubmitOutcome::Recorded {
            correct,
            phase: self.phase,
        })
    }

    /// Pick the next trial source: cap check, then the local baseline
    /// queue, then the adaptive endpoint.
    async fn advance(&mut self) -> SessionResult<()> {
        if self.completed_count() >= self.limits.max_total {
            self.finish().await;
            return Ok(());
        }

        if self.completed_count() < self.limits.baseline_trials {
            if let Some(next) = self.pending_baseline.pop_front() {
                self.present(next).await;
                return Ok(());
            }
            // Backend under-delivered at INIT; degrade instead of failing.
            warn!(
                test = %self.test,
                completed = self.completed_count(),
                "baseline queue exhausted before the baseline window closed; requesting adaptive trial"
            );
        }

        self.fetch_adaptive().await
    }

    async fn fetch_adaptive(&mut self) -> SessionResult<()> {
        self.loading = true;
        let fetched = self.api.fetch_next_trial(self.test, &self.responses).await;
        self.loading = false;

        match fetched {
            Ok(Some(trial)) => {
                // Phase tracks the completed-count window, so a degraded
                // early adaptive fetch does not leave Baseline prematurely.
                if self.completed_count() >= self.limits.baseline_trials {
                    self.transition(Phase::Adaptive);
                }
                self.present(trial).await;
                Ok(())
            }
            Ok(None) => {
                info!(test = %self.test, completed = self.completed_count(), "adaptive policy concluded early");
                self.finish().await;
                Ok(())
            }
            Err(err) => {
                // No partial mutation: the recorded responses stand, no
                // trial is current, and the caller decides whether to
                // restart the whole session.
                warn!(test = %self.test, error = %err, "adaptive fetch failed");
                Err(err.into())
            }
        }
    }

    fn transition(&mut self, next: Phase) {
        if self.phase == next {
            return;
        }
        debug_assert!(self.phase.can_transition_to(next));
        info!(test = %self.test, from = %self.phase, to = %next, "phase transition");
        self.phase = next;
    }

    async fn finish(&mut self) {
        self.transition(Phase::Finished);
        self.current_trial = None;
        self.settle_timer = None;
        self.writer.record(self.responses.clone()).await;
        info!(test = %self.test, completed = self.completed_count(), "trial session finished");
    }

    pub fn test(&self) -> TestId {
        self.test
    }

    pub fn limits(&self) -> TrialLimits {
        self.limits
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn current_trial(&self) -> Option<&Trial> {
        self.current_trial.as_ref()
    }

    pub fn pending_baseline(&self) -> &VecDeque<Trial> {
        &self.pending_baseline
    }

    pub fn responses(&self) -> &[ResponseItem] {
        &self.responses
    }

    pub fn completed_count(&self) -> usize {
        self.responses.len()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{ChoiceTrial, SpeechTrial};
    use crate::domain::ports::{GatewayError, GatewayResult};
    use crate::services::aggregator::ResultsAggregator;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn speech(word: &str) -> Trial {
        Trial::Speech(SpeechTrial {
            stimulus_key: word.to_string(),
            display_text: None,
        })
    }

    fn choice(word: &str) -> Trial {
        Trial::Choice(ChoiceTrial {
            stimulus_key: word.to_string(),
            stimulus_url: None,
            options: vec![word.to_string(), "Decoy".to_string()],
            correct_index: 0,
        })
    }

    /// Scripted backend: a fixed baseline batch and a queue of adaptive
    /// replies consumed in order.
    struct ScriptedApi {
        baseline: Vec<Trial>,
        adaptive: std::sync::Mutex<VecDeque<GatewayResult<Option<Trial>>>>,
        adaptive_calls: AtomicUsize,
    }

    impl ScriptedApi {
        fn new(baseline: Vec<Trial>, adaptive: Vec<GatewayResult<Option<Trial>>>) -> Arc<Self> {
            Arc::new(Self {
                baseline,
                adaptive: std::sync::Mutex::new(adaptive.into()),
                adaptive_calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl TrialApi for ScriptedApi {
        async fn fetch_baseline(&self, _test: TestId) -> GatewayResult<Vec<Trial>> {
            Ok(self.baseline.clone())
        }

        async fn fetch_next_trial(
            &self,
            _test: TestId,
            _responses: &[ResponseItem],
        ) -> GatewayResult<Option<Trial>> {
            self.adaptive_calls.fetch_add(1, Ordering::SeqCst);
            self.adaptive
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Ok(None))
        }

        async fn submit_evaluation(
            &self,
            _audio: &[ResponseItem],
            _reading: &[ResponseItem],
        ) -> GatewayResult<crate::domain::models::EvaluationResult> {
            unimplemented!("not exercised by session tests")
        }

        async fn analyze_handwriting(
            &self,
            _image: Vec<u8>,
            _filename: &str,
        ) -> GatewayResult<crate::domain::models::HandwritingReport> {
            unimplemented!("not exercised by session tests")
        }
    }

    async fn start_reading(api: Arc<ScriptedApi>) -> SessionResult<TrialSession> {
        let aggregator = ResultsAggregator::new();
        TrialSession::start(
            TestId::Reading,
            api,
            aggregator.writer(TestId::Reading),
            Duration::ZERO,
        )
        .await
    }

    fn words(n: usize) -> Vec<Trial> {
        ["Galaxy", "Rocket", "Star", "Planet", "Meteor", "Comet"]
            .iter()
            .take(n)
            .map(|w| speech(w))
            .collect()
    }

    #[tokio::test]
    async fn test_init_presents_first_and_queues_rest() {
        let api = ScriptedApi::new(words(4), vec![]);
        let session = start_reading(api).await.unwrap();

        assert_eq!(session.phase(), Phase::Baseline);
        assert_eq!(session.current_trial().unwrap().stimulus_key(), "Galaxy");
        let queued: Vec<_> = session
            .pending_baseline()
            .iter()
            .map(Trial::stimulus_key)
            .collect();
        assert_eq!(queued, vec!["Rocket", "Star", "Planet"]);
    }

    #[tokio::test]
    async fn test_empty_baseline_is_an_error() {
        let api = ScriptedApi::new(vec![], vec![]);
        let result = start_reading(api).await;
        assert!(matches!(result, Err(SessionError::EmptyBaseline)));
    }

    #[tokio::test]
    async fn test_baseline_popped_without_network() {
        let api = ScriptedApi::new(words(4), vec![]);
        let mut session = start_reading(Arc::clone(&api)).await.unwrap();

        session.submit_transcript("galaxy").await.unwrap();
        assert_eq!(session.current_trial().unwrap().stimulus_key(), "Rocket");
        assert_eq!(api.adaptive_calls.load(Ordering::SeqCst), 0);
        assert_eq!(session.completed_count(), 1);
        assert_eq!(session.phase(), Phase::Baseline);
    }

    #[tokio::test]
    async fn test_fifth_trial_enters_adaptive() {
        let api = ScriptedApi::new(words(4), vec![Ok(Some(speech("Nebula")))]);
        let mut session = start_reading(api).await.unwrap();

        for word in ["galaxy", "rocket", "star", "planet"] {
            session.submit_transcript(word).await.unwrap();
        }

        assert_eq!(session.phase(), Phase::Adaptive);
        assert_eq!(session.current_trial().unwrap().stimulus_key(), "Nebula");
        assert_eq!(session.completed_count(), 4);
    }

    #[tokio::test]
    async fn test_null_adaptive_reply_finishes_early() {
        let api = ScriptedApi::new(words(4), vec![Ok(None)]);
        let mut session = start_reading(api).await.unwrap();

        for word in ["galaxy", "rocket", "star", "planet"] {
            session.submit_transcript(word).await.unwrap();
        }

        assert_eq!(session.phase(), Phase::Finished);
        assert!(session.current_trial().is_none());
        assert_eq!(session.completed_count(), 4);
    }

    #[tokio::test]
    async fn test_cap_finishes_session() {
        let adaptive = (0..6).map(|i| Ok(Some(speech(&format!("A{i}"))))).collect();
        let api = ScriptedApi::new(words(4), adaptive);
        let mut session = start_reading(api).await.unwrap();

        let mut guesses = 0;
        while session.phase() != Phase::Finished {
            session.submit_transcript("wrong").await.unwrap();
            guesses += 1;
            assert!(guesses <= 10, "session failed to terminate");
        }

        assert_eq!(session.completed_count(), session.limits().max_total);
        assert!(session.current_trial().is_none());
    }

    #[tokio::test]
    async fn test_short_baseline_degrades_to_adaptive() {
        // Two baseline items instead of four: protocol anomaly.
        let api = ScriptedApi::new(
            words(2),
            vec![Ok(Some(speech("Extra1"))), Ok(Some(speech("Extra2")))],
        );
        let mut session = start_reading(Arc::clone(&api)).await.unwrap();

        session.submit_transcript("galaxy").await.unwrap();
        session.submit_transcript("rocket").await.unwrap();

        // Queue dry at completed_count == 2: adaptive fetch, still Baseline.
        assert_eq!(api.adaptive_calls.load(Ordering::SeqCst), 1);
        assert_eq!(session.phase(), Phase::Baseline);
        assert_eq!(session.current_trial().unwrap().stimulus_key(), "Extra1");

        session.submit_transcript("extra1").await.unwrap();
        session.submit_transcript("extra2").await.unwrap();
        assert_eq!(session.phase(), Phase::Adaptive);
    }

    #[tokio::test]
    async fn test_fetch_failure_preserves_recorded_responses() {
        let api = ScriptedApi::new(
            words(4),
            vec![Err(GatewayError::Status {
                status: 503,
                body: "unavailable".to_string(),
            })],
        );
        let mut session = start_reading(api).await.unwrap();

        for word in ["galaxy", "rocket", "star"] {
            session.submit_transcript(word).await.unwrap();
        }
        let result = session.submit_transcript("planet").await;

        assert!(matches!(result, Err(SessionError::Network(_))));
        assert_eq!(session.completed_count(), 4);
        assert_eq!(session.responses().len(), 4);
        assert!(!session.is_loading());
    }

    #[tokio::test]
    async fn test_restart_reruns_init() {
        let api = ScriptedApi::new(
            words(4),
            vec![Err(GatewayError::Transport("refused".to_string()))],
        );
        let mut session = start_reading(api).await.unwrap();

        for word in ["galaxy", "rocket", "star", "planet"] {
            let _ = session.submit_transcript(word).await;
        }
        assert!(session.current_trial().is_none());

        session.restart().await.unwrap();
        assert_eq!(session.phase(), Phase::Baseline);
        assert_eq!(session.completed_count(), 0);
        assert_eq!(session.current_trial().unwrap().stimulus_key(), "Galaxy");
    }

    #[tokio::test]
    async fn test_submission_without_current_trial_is_noop() {
        let api = ScriptedApi::new(words(4), vec![Ok(None)]);
        let mut session = start_reading(api).await.unwrap();

        for word in ["galaxy", "rocket", "star", "planet"] {
            session.submit_transcript(word).await.unwrap();
        }
        assert_eq!(session.phase(), Phase::Finished);

        let outcome = session.submit_transcript("ghost").await.unwrap();
        assert_eq!(outcome, SubmitOutcome::Ignored);
        assert_eq!(session.completed_count(), 4);
    }

    #[tokio::test]
    async fn test_manual_override_bypasses_grading() {
        let api = ScriptedApi::new(words(4), vec![]);
        let mut session = start_reading(api).await.unwrap();

        let outcome = session.submit_manual(true).await.unwrap();
        assert!(matches!(outcome, SubmitOutcome::Recorded { correct: true, .. }));
        assert_eq!(session.responses()[0].selected, "manual:correct");
    }

    #[tokio::test]
    async fn test_transcript_grading_is_normalized() {
        let api = ScriptedApi::new(words(4), vec![]);
        let mut session = start_reading(api).await.unwrap();

        session.submit_transcript("  GALAXY ").await.unwrap();
        session.submit_transcript("rockets").await.unwrap();

        assert!(session.responses()[0].correct);
        assert!(!session.responses()[1].correct);
    }

    #[tokio::test]
    async fn test_choice_session_grades_by_option() {
        let api = ScriptedApi::new(vec![choice("Robot"), choice("Apple")], vec![Ok(None)]);
        let aggregator = ResultsAggregator::new();
        let mut session = TrialSession::start(
            TestId::Audio,
            api,
            aggregator.writer(TestId::Audio),
            Duration::ZERO,
        )
        .await
        .unwrap();

        session.submit_choice("Robot").await.unwrap();
        session.submit_choice("Decoy").await.unwrap();

        assert!(session.responses()[0].correct);
        assert!(!session.responses()[1].correct);
    }

    #[tokio::test]
    async fn test_finish_writes_aggregator_slot() {
        let api = ScriptedApi::new(words(4), vec![Ok(None)]);
        let aggregator = ResultsAggregator::new();
        let mut session = TrialSession::start(
            TestId::Reading,
            api,
            aggregator.writer(TestId::Reading),
            Duration::ZERO,
        )
        .await
        .unwrap();

        for word in ["galaxy", "rocket", "star", "planet"] {
            session.submit_transcript(word).await.unwrap();
        }

        assert_eq!(session.phase(), Phase::Finished);
        assert_eq!(aggregator.responses(TestId::Reading).await.len(), 4);
    }

    #[tokio::test]
    async fn test_reaction_times_are_non_negative() {
        let api = ScriptedApi::new(words(4), vec![Ok(None)]);
        let mut session = start_reading(api).await.unwrap();

        for word in ["galaxy", "rocket", "star", "planet"] {
            session.submit_transcript(word).await.unwrap();
        }

        for item in session.responses() {
            assert!(item.reaction_time_seconds >= 0.0);
        }
    }
}
