//! Screening run controller.
//!
//! Owns the gateway and the aggregator for one subject's run and hands each
//! test stage its session and slot writer. Replaces cross-page shared
//! mutable state with one explicitly-owned object passed to each stage.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::domain::errors::SessionResult;
use crate::domain::models::{Config, EvaluationResult, HandwritingReport, TestId};
use crate::domain::ports::TrialApi;
use crate::infrastructure::api::ApiGateway;
use crate::services::aggregator::ResultsAggregator;
use crate::services::trial_session::TrialSession;

/// One subject's pass through the screening stages.
pub struct ScreeningRun {
    config: Config,
    api: Arc<dyn TrialApi>,
    aggregator: Arc<ResultsAggregator>,
}

impl ScreeningRun {
    /// Build a run against the configured backend.
    pub fn new(config: Config) -> SessionResult<Self> {
        let gateway = ApiGateway::new(&config.api)?;
        Ok(Self::with_api(config, Arc::new(gateway)))
    }

    /// Build a run over any [`TrialApi`] implementation.
    pub fn with_api(config: Config, api: Arc<dyn TrialApi>) -> Self {
        Self {
            config,
            api,
            aggregator: ResultsAggregator::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn aggregator(&self) -> &Arc<ResultsAggregator> {
        &self.aggregator
    }

    pub fn api(&self) -> Arc<dyn TrialApi> {
        Arc::clone(&self.api)
    }

    /// Start one test stage's trial session, scoped to its own slot.
    pub async fn begin_test(&self, test: TestId) -> SessionResult<TrialSession> {
        let settle = match test {
            // Audio stimuli auto-play after a settle delay; the reaction
            // clock arms when playback actually starts.
            TestId::Audio => Duration::from_millis(self.config.timing.audio_settle_ms),
            TestId::Reading => Duration::ZERO,
        };
        TrialSession::start(test, Arc::clone(&self.api), self.aggregator.writer(test), settle)
            .await
    }

    /// Send a handwriting sample for analysis and keep the report with the
    /// run's artifacts.
    pub async fn submit_handwriting(
        &self,
        image: Vec<u8>,
        filename: &str,
    ) -> SessionResult<HandwritingReport> {
        let report = self.api.analyze_handwriting(image, filename).await?;
        self.aggregator.record_handwriting(report.clone()).await;
        Ok(report)
    }

    /// Submit the aggregated logs for final scoring. Empty logs for skipped
    /// stages are sent as-is. Idempotent: a second call returns the stored
    /// result without re-submitting.
    pub async fn evaluate(&self) -> SessionResult<EvaluationResult> {
        if let Some(existing) = self.aggregator.evaluation().await {
            info!(run_id = %self.aggregator.run_id(), "evaluation already available");
            return Ok(existing);
        }

        let (audio, reading) = self.aggregator.snapshot().await;
        let result = self.api.submit_evaluation(&audio, &reading).await?;
        self.aggregator.set_evaluation(result.clone()).await;
        Ok(result)
    }

    /// Tear the run down (subject returned to the entry point).
    pub async fn reset(&self) {
        self.aggregator.reset().await;
    }
}
