//! Agent configuration loading from file and environment variables.

use beacon_cache::CacheConfig;
use beacon_dispatch::DispatchConfig;
use beacon_session::SessionConfig;
use serde::Deserialize;
use thiserror::Error;

/// Top-level agent configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Session policy.
    #[serde(default)]
    pub session: SessionConfig,

    /// Buffer limits and page filters.
    #[serde(default)]
    pub cache: CacheConfig,

    /// Delivery endpoint and retry policy.
    #[serde(default)]
    pub dispatch: DispatchConfig,

    /// Page recorded as viewed when the agent starts.
    #[serde(default)]
    pub initial_page: Option<String>,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "beacon_dispatch=debug,info").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to output logs in JSON format.
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse the configuration file.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Loads configuration from a TOML file, falling back to defaults.
///
/// Environment variable overrides:
/// - `BEACON_ENDPOINT` overrides `dispatch.endpoint`
/// - `BEACON_RETRIES` overrides `dispatch.retries`
/// - `BEACON_SESSION_SAMPLE_RATE` overrides `session.session_sample_rate`
/// - `BEACON_LOG_LEVEL` overrides `logging.level`
/// - `BEACON_LOG_JSON` overrides `logging.json` (set to "true" to enable)
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read or parsed.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let mut config = match path {
        Some(p) => match std::fs::read_to_string(p) {
            Ok(contents) => toml::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = p, "config file not found, using defaults");
                Config::default()
            }
            Err(e) => return Err(ConfigError::FileRead(e)),
        },
        None => Config::default(),
    };

    apply_overrides(&mut config, |name| std::env::var(name).ok());
    Ok(config)
}

/// Applies `BEACON_*` overrides read through `lookup`. Unparseable values
/// are ignored.
pub fn apply_overrides(config: &mut Config, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(endpoint) = lookup("BEACON_ENDPOINT") {
        config.dispatch.endpoint = endpoint;
    }
    if let Some(retries) = lookup("BEACON_RETRIES") {
        if let Ok(parsed) = retries.parse() {
            config.dispatch.retries = parsed;
        }
    }
    if let Some(rate) = lookup("BEACON_SESSION_SAMPLE_RATE") {
        if let Ok(parsed) = rate.parse() {
            config.session.session_sample_rate = parsed;
        }
    }
    if let Some(level) = lookup("BEACON_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Some(json) = lookup("BEACON_LOG_JSON") {
        config.logging.json = json == "true" || json == "1";
    }
}
