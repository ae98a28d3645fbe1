//! Trialbench - Adaptive Trial Session Engine
//!
//! Trialbench walks a subject through sequential timed screening trials
//! (reading aloud, audio discrimination, handwriting capture), records
//! responses, and hands the aggregate to a remote scoring backend.
//!
//! # Architecture
//!
//! The crate follows a hexagonal layering:
//!
//! - **Domain Layer** (`domain`): trial models, port traits, error taxonomy
//! - **Service Layer** (`services`): the trial session state machine, timing
//!   harness, results aggregator, and screening-run controller
//! - **Infrastructure Layer** (`infrastructure`): the reqwest API gateway,
//!   the speech capture adapter, the config loader, and logging setup
//! - **CLI Layer** (`cli`): terminal front-end for a screening run
//!
//! # Example
//!
//! ```ignore
//! use trialbench::domain::models::{Config, TestId};
//! use trialbench::services::ScreeningRun;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let run = ScreeningRun::new(Config::default())?;
//!     let mut session = run.begin_test(TestId::Reading).await?;
//!     session.submit_transcript("galaxy").await?;
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::errors::{SessionError, SessionResult};
pub use domain::models::{
    ChoiceTrial, Config, EvaluationResult, HandwritingReport, Phase, ResponseItem, SpeechTrial,
    TestId, Trial, TrialLimits,
};
pub use domain::ports::{
    GatewayError, SpeechBackend, SpeechErrorKind, SpeechEvent, TrialApi,
};
pub use infrastructure::api::ApiGateway;
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use infrastructure::speech::SpeechCaptureAdapter;
pub use services::{ResultsAggregator, ScreeningRun, SubmitOutcome, TrialSession};
