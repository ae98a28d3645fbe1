//! Reqwest implementation of the backend port.

pub mod client;
pub mod types;

pub use client::ApiGateway;
