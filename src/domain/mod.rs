//! Domain layer: pure models, port traits, and error taxonomy.

pub mod errors;
pub mod models;
pub mod ports;

pub use errors::{SessionError, SessionResult};
