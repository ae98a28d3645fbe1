//! Results Aggregator.
//!
//! One per screening run: holds each test's finished response log, the
//! out-of-band handwriting report, and the once-only evaluation result.
//! Sessions write through a [`SlotWriter`] scoped to their own test; no
//! cross-test mutation is possible.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::models::{EvaluationResult, HandwritingReport, ResponseItem, TestId};

#[derive(Debug, Default)]
struct AggregateState {
    responses: HashMap<TestId, Vec<ResponseItem>>,
    handwriting: Option<HandwritingReport>,
    evaluation: Option<EvaluationResult>,
}

/// Shared store for one screening run's artifacts.
#[derive(Debug)]
pub struct ResultsAggregator {
    run_id: Uuid,
    started_at: DateTime<Utc>,
    state: RwLock<AggregateState>,
}

impl ResultsAggregator {
    pub fn new() -> Arc<Self> {
        let run_id = Uuid::new_v4();
        info!(%run_id, "screening run started");
        Arc::new(Self {
            run_id,
            started_at: Utc::now(),
            state: RwLock::new(AggregateState::default()),
        })
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Hand out write access to a single test's slot.
    pub fn writer(self: &Arc<Self>, test: TestId) -> SlotWriter {
        SlotWriter {
            aggregator: Arc::clone(self),
            test,
        }
    }

    /// Finished response log for a test; empty when the stage was skipped.
    pub async fn responses(&self, test: TestId) -> Vec<ResponseItem> {
        self.state
            .read()
            .await
            .responses
            .get(&test)
            .cloned()
            .unwrap_or_default()
    }

    /// Both logs at once, for the evaluation request.
    pub async fn snapshot(&self) -> (Vec<ResponseItem>, Vec<ResponseItem>) {
        let state = self.state.read().await;
        let get = |test| state.responses.get(&test).cloned().unwrap_or_default();
        (get(TestId::Audio), get(TestId::Reading))
    }

    pub async fn record_handwriting(&self, report: HandwritingReport) {
        info!(run_id = %self.run_id, verdict = %report.verdict, "handwriting report recorded");
        self.state.write().await.handwriting = Some(report);
    }

    pub async fn handwriting(&self) -> Option<HandwritingReport> {
        self.state.read().await.handwriting.clone()
    }

    /// Store the final evaluation. Produced once per run; a second write is
    /// rejected and the original kept.
    pub async fn set_evaluation(&self, result: EvaluationResult) -> bool {
        let mut state = self.state.write().await;
        if state.evaluation.is_some() {
            warn!(run_id = %self.run_id, "evaluation already recorded; ignoring");
            return false;
        }
        info!(run_id = %self.run_id, risk_level = %result.risk_level, "evaluation recorded");
        state.evaluation = Some(result);
        true
    }

    pub async fn evaluation(&self) -> Option<EvaluationResult> {
        self.state.read().await.evaluation.clone()
    }

    /// Tear the run down (subject returned to the entry point).
    pub async fn reset(&self) {
        info!(run_id = %self.run_id, "screening run reset");
        *self.state.write().await = AggregateState::default();
    }
}

/// Write capability for exactly one test's slot.
#[derive(Debug, Clone)]
pub struct SlotWriter {
    aggregator: Arc<ResultsAggregator>,
    test: TestId,
}

impl SlotWriter {
    pub fn test(&self) -> TestId {
        self.test
    }

    /// Replace this test's finished response log.
    pub async fn record(&self, responses: Vec<ResponseItem>) {
        info!(
            run_id = %self.aggregator.run_id,
            test = %self.test,
            count = responses.len(),
            "test responses recorded"
        );
        self.aggregator
            .state
            .write()
            .await
            .responses
            .insert(self.test, responses);
    }
}
