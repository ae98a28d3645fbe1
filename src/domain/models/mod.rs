//! Domain models for the trial engine.

pub mod config;
pub mod evaluation;
pub mod trial;

pub use config::{ApiConfig, Config, LoggingConfig, SpeechConfig, TimingConfig};
pub use evaluation::{EvaluationResult, HandwritingReport};
pub use trial::{
    normalize_transcript, ChoiceTrial, Phase, ResponseItem, SpeechTrial, TestId, Trial,
    TrialLimits, AUDIO_ADAPTIVE_TRIALS, BASELINE_TRIALS, READING_MAX_TRIALS,
};
