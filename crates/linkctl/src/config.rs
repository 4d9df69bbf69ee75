//! Configuration loading from file and environment variables.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// Top-level linkctl configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Database settings.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Database configuration. Unset paths fall back to install-location
/// defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Directory holding `current.sql`.
    #[serde(default)]
    pub schema_dir: Option<PathBuf>,

    /// Busy timeout for the SQLite connection, in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "warn", "debug", "linkshare_db=debug,info").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to output logs in JSON format.
    #[serde(default)]
    pub json: bool,
}

fn default_busy_timeout_ms() -> u64 {
    5_000
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: None,
            schema_dir: None,
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
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

/// Loads configuration from a TOML file, falling back to defaults when the
/// file does not exist, then applies environment overrides.
///
/// Environment variable overrides:
/// - `LINKSHARE_DB_PATH` overrides `database.path`
/// - `LINKSHARE_SCHEMA_DIR` overrides `database.schema_dir`
/// - `LINKSHARE_LOG_LEVEL` overrides `logging.level`
/// - `LINKSHARE_LOG_JSON` overrides `logging.json` (set to "true" to enable)
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read or parsed.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let mut config = read_config_file(path)?;
    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    Ok(config)
}

fn read_config_file(path: &Path) -> Result<Config, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(contents) => Ok(toml::from_str(&contents)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "config file not found, using defaults");
            Ok(Config::default())
        }
        Err(e) => Err(ConfigError::FileRead(e)),
    }
}

fn apply_env_overrides(config: &mut Config, var: impl Fn(&str) -> Option<String>) {
    if let Some(db_path) = var("LINKSHARE_DB_PATH").filter(|v| !v.trim().is_empty()) {
        config.database.path = Some(PathBuf::from(db_path));
    }
    if let Some(schema_dir) = var("LINKSHARE_SCHEMA_DIR").filter(|v| !v.trim().is_empty()) {
        config.database.schema_dir = Some(PathBuf::from(schema_dir));
    }
    if let Some(level) = var("LINKSHARE_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Some(json) = var("LINKSHARE_LOG_JSON") {
        config.logging.json = json == "true" || json == "1";
    }
}
