//! Session-level errors.
//!
//! Trial-level speech failures are not here: they live on the speech port
//! (`SpeechErrorKind`) and are recovered per-trial via manual override.

use thiserror::Error;

use super::ports::GatewayError;

/// Errors that abort a trial session's forward progress. Recovery is an
/// explicit restart of the session, never an automatic retry.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Baseline, adaptive, or evaluation fetch failed.
    #[error("network failure: {0}")]
    Network(#[from] GatewayError),

    /// Backend returned an empty baseline batch; the session cannot start.
    #[error("baseline batch was empty")]
    EmptyBaseline,

    /// The platform lacks a required facility; the test cannot run at all.
    #[error("missing platform capability: {0}")]
    Capability(String),
}

pub type SessionResult<T> = Result<T, SessionError>;
