//! Speech capture: the adapter enforcing the terminal-event contract and
//! the terminal-typed backend used by the CLI.

pub mod adapter;
pub mod stdin;

pub use adapter::{SpeechCaptureAdapter, StartOutcome};
pub use stdin::StdinSpeechBackend;
