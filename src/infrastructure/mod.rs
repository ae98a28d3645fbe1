//! Infrastructure layer: concrete adapters behind the domain ports.

pub mod api;
pub mod config;
pub mod logging;
pub mod speech;
