//! Ports: traits at the seams between the trial engine and the outside
//! world, plus their error types.

pub mod speech;
pub mod trial_api;

pub use speech::{SpeechBackend, SpeechErrorKind, SpeechEvent};
pub use trial_api::{GatewayError, GatewayResult, TrialApi};
