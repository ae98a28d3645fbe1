//! Speech Capture Adapter.
//!
//! Wraps a raw [`SpeechBackend`] into the terminal-event contract the trial
//! session consumes: `start()` begins one listening session whose events
//! arrive on a channel as exactly one `Result` or `Error`, always followed
//! by `End`. Only one session may listen at a time; a second `start()`
//! while active is a no-op.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::domain::errors::{SessionError, SessionResult};
use crate::domain::models::SpeechConfig;
use crate::domain::ports::{SpeechBackend, SpeechErrorKind, SpeechEvent};

/// Outcome of a `start()` call.
#[derive(Debug)]
pub enum StartOutcome {
    /// A listening session began; terminal events arrive on this channel.
    Listening(mpsc::Receiver<SpeechEvent>),
    /// Another session is still active; nothing was started.
    AlreadyListening,
}

/// Adapter enforcing the one-session-at-a-time, one-terminal-event contract
/// over any [`SpeechBackend`].
pub struct SpeechCaptureAdapter {
    backend: Arc<dyn SpeechBackend>,
    fallback_timeout: Duration,
    active: Arc<AtomicBool>,
}

impl SpeechCaptureAdapter {
    /// Probe the backend and build the adapter. An unavailable backend is a
    /// fatal capability error surfaced at mount time, not per-trial.
    pub fn new(backend: Arc<dyn SpeechBackend>, config: &SpeechConfig) -> SessionResult<Self> {
        if !backend.is_available() {
            return Err(SessionError::Capability(
                "speech recognition is not available on this platform".to_string(),
            ));
        }
        Ok(Self {
            backend,
            fallback_timeout: Duration::from_millis(config.fallback_timeout_ms),
            active: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Begin listening. The spawned task delivers the terminal event and
    /// `End`, then clears the active flag; a dropped receiver (view torn
    /// down mid-listen) discards the events without blocking the task.
    pub fn start(&self) -> StartOutcome {
        if self.active.swap(true, Ordering::SeqCst) {
            debug!("start() while listening session active; ignoring");
            return StartOutcome::AlreadyListening;
        }

        let (tx, rx) = mpsc::channel(2);
        let backend = Arc::clone(&self.backend);
        let active = Arc::clone(&self.active);
        let fallback = self.fallback_timeout;

        tokio::spawn(async move {
            let terminal = match tokio::time::timeout(fallback, backend.recognize()).await {
                Ok(Ok(transcript)) => SpeechEvent::Result(transcript),
                Ok(Err(kind)) => {
                    warn!(kind = %kind, "speech recognition failed");
                    SpeechEvent::Error(kind)
                }
                Err(_) => {
                    warn!(timeout_ms = fallback.as_millis() as u64, "local fallback timer fired");
                    SpeechEvent::Error(SpeechErrorKind::NoSpeech)
                }
            };
            let _ = tx.send(terminal).await;
            let _ = tx.send(SpeechEvent::End).await;
            active.store(false, Ordering::SeqCst);
        });

        StartOutcome::Listening(rx)
    }

    /// Whether a listening session is currently active.
    pub fn is_listening(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Start and block until the terminal event, draining the trailing
    /// `End`. Returns `None` when another session is already listening.
    pub async fn listen_once(&self) -> Option<Result<String, SpeechErrorKind>> {
        let mut rx = match self.start() {
            StartOutcome::Listening(rx) => rx,
            StartOutcome::AlreadyListening => return None,
        };

        let mut outcome = None;
        while let Some(event) = rx.recv().await {
            match event {
                SpeechEvent::Result(transcript) => outcome = Some(Ok(transcript)),
                SpeechEvent::Error(kind) => outcome = Some(Err(kind)),
                SpeechEvent::End => break,
            }
        }
        // A closed channel without a terminal event means the task died;
        // treat it like no speech rather than hanging the trial.
        Some(outcome.unwrap_or(Err(SpeechErrorKind::NoSpeech)))
    }
}
