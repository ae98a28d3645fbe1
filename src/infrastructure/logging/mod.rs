//! Tracing subscriber setup from the logging config section.
//!
//! `RUST_LOG` always wins; the configured level is the default filter when
//! the variable is unset. `format: json` selects machine-readable output.
//! Logs go to stderr so they never interleave with scorecard output.

use anyhow::{anyhow, Result};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::domain::models::LoggingConfig;

fn configured_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::new(&config.level)
}

fn json_output(config: &LoggingConfig) -> bool {
    config.format == "json"
}

/// Install the global subscriber. Fails if one is already installed.
pub fn init(config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| configured_filter(config));
    let registry = tracing_subscriber::registry().with(filter);

    let result = if json_output(config) {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
    } else {
        registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .try_init()
    };
    result.map_err(|e| anyhow!("failed to initialize logging: {e}"))
}
