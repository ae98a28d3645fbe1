//! Port for the remote scoring backend.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::models::{EvaluationResult, HandwritingReport, ResponseItem, TestId, Trial};

/// Errors from backend operations. The gateway performs no retries; retry
/// policy belongs to the caller.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Transport-level failure (connection refused, timeout, TLS, ...).
    #[error("transport error: {0}")]
    Transport(String),

    /// Backend answered with a non-2xx status.
    #[error("backend returned {status}: {body}")]
    Status { status: u16, body: String },

    /// Response body did not match the expected wire shape.
    #[error("failed to decode backend response: {0}")]
    Decode(String),
}

pub type GatewayResult<T> = Result<T, GatewayError>;

/// Network operations the trial engine needs from the backend. All are
/// side-effect-free from the caller's perspective beyond the request itself.
#[async_trait]
pub trait TrialApi: Send + Sync {
    /// Fetch the fixed initial batch for a test.
    async fn fetch_baseline(&self, test: TestId) -> GatewayResult<Vec<Trial>>;

    /// Ask the adaptive policy for the next trial given the response history.
    /// `None` signals the policy has concluded early.
    async fn fetch_next_trial(
        &self,
        test: TestId,
        responses: &[ResponseItem],
    ) -> GatewayResult<Option<Trial>>;

    /// Submit the aggregated per-test logs for final scoring. Empty response
    /// sequences are legal for any test (the subject skipped a stage).
    async fn submit_evaluation(
        &self,
        audio: &[ResponseItem],
        reading: &[ResponseItem],
    ) -> GatewayResult<EvaluationResult>;

    /// Submit a handwriting sample image for out-of-band analysis.
    async fn analyze_handwriting(
        &self,
        image: Vec<u8>,
        filename: &str,
    ) -> GatewayResult<HandwritingReport>;
}
