//! Port for the platform's continuous speech-to-text facility.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Recoverable per-trial speech failures. Each offers the subject a manual
/// override for the current trial instead of aborting the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SpeechErrorKind {
    /// The recognizer's own network path failed.
    Network,
    /// Microphone permission was denied.
    PermissionDenied,
    /// Nothing intelligible was heard before the recognizer gave up.
    NoSpeech,
    /// Anything else the platform reports.
    Other(String),
}

impl std::fmt::Display for SpeechErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Network => write!(f, "network"),
            Self::PermissionDenied => write!(f, "permission-denied"),
            Self::NoSpeech => write!(f, "no-speech"),
            Self::Other(detail) => write!(f, "other: {detail}"),
        }
    }
}

/// Terminal events of one listening session, delivered over a channel.
///
/// Exactly one `Result` or `Error` is emitted per session, then always `End`.
#[derive(Debug, Clone, PartialEq)]
pub enum SpeechEvent {
    /// The single final transcript (no interim results).
    Result(String),
    /// The session failed; the subject may override manually.
    Error(SpeechErrorKind),
    /// The session is over. Always the last event.
    End,
}

/// The raw platform recognizer the adapter wraps.
#[async_trait]
pub trait SpeechBackend: Send + Sync {
    /// Whether the platform offers speech recognition at all. Checked once
    /// at mount; an unavailable backend makes the test unusable.
    fn is_available(&self) -> bool;

    /// Listen once and produce a single final transcript, or fail with a
    /// classified error. Natural recognizer timeouts surface as `NoSpeech`.
    async fn recognize(&self) -> Result<String, SpeechErrorKind>;
}
