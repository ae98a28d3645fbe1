//! Typed-transcript backend for terminal runs.
//!
//! Stands in for a platform recognizer when the engine is driven from a
//! terminal: the "transcript" is whatever line the operator types.

use async_trait::async_trait;
use console::Term;

use crate::domain::ports::{SpeechBackend, SpeechErrorKind};

/// Reads one line from the terminal as the final transcript.
#[derive(Debug, Default)]
pub struct StdinSpeechBackend;

impl StdinSpeechBackend {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SpeechBackend for StdinSpeechBackend {
    fn is_available(&self) -> bool {
        Term::stdout().is_term()
    }

    async fn recognize(&self) -> Result<String, SpeechErrorKind> {
        let line = tokio::task::spawn_blocking(|| Term::stdout().read_line())
            .await
            .map_err(|e| SpeechErrorKind::Other(e.to_string()))?
            .map_err(|e| SpeechErrorKind::Other(e.to_string()))?;

        let transcript = line.trim().to_string();
        if transcript.is_empty() {
            return Err(SpeechErrorKind::NoSpeech);
        }
        Ok(transcript)
    }
}
