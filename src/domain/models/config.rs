use serde::{Deserialize, Serialize};

/// Main configuration structure for trialbench.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Backend connection settings.
    #[serde(default)]
    pub api: ApiConfig,

    /// Speech capture settings.
    #[serde(default)]
    pub speech: SpeechConfig,

    /// Trial timing settings.
    #[serde(default)]
    pub timing: TimingConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Scoring backend connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ApiConfig {
    /// Base URL of the scoring backend.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    "http://127.0.0.1:8000".to_string()
}

const fn default_timeout_secs() -> u64 {
    30
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Speech capture settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SpeechConfig {
    /// Local fallback timeout in milliseconds: a listening session that has
    /// produced no terminal event by then is closed as no-speech.
    #[serde(default = "default_fallback_timeout_ms")]
    pub fallback_timeout_ms: u64,
}

const fn default_fallback_timeout_ms() -> u64 {
    8_000
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            fallback_timeout_ms: default_fallback_timeout_ms(),
        }
    }
}

/// Trial timing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct TimingConfig {
    /// Settle delay in milliseconds before an audio stimulus auto-plays.
    /// Reaction timing starts after this delay.
    #[serde(default = "default_audio_settle_ms")]
    pub audio_settle_ms: u64,
}

const fn default_audio_settle_ms() -> u64 {
    500
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            audio_settle_ms: default_audio_settle_ms(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty.
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.api.base_url, "http://127.0.0.1:8000");
        assert_eq!(config.api.timeout_secs, 30);
        assert_eq!(config.speech.fallback_timeout_ms, 8_000);
        assert_eq!(config.timing.audio_settle_ms, 500);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_partial_deserialization_fills_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"api": {"base_url": "http://backend:9000"}}"#).unwrap();
        assert_eq!(config.api.base_url, "http://backend:9000");
        assert_eq!(config.api.timeout_secs, 30);
        assert_eq!(config.logging.format, "pretty");
    }
}
