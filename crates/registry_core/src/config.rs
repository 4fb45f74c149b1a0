//! Runtime configuration for registry hosts.
//!
//! # Responsibility
//! - Provide defaults matching the deployed service.
//! - Apply `REGISTRY_*` environment overrides with typed validation.
//!
//! # Invariants
//! - Blank environment values are ignored, never treated as overrides.
//! - The undo grace period is never zero.

use crate::logging::default_log_level;
use crate::undo::DEFAULT_GRACE_PERIOD;
use crate::view::engine::DEFAULT_VIEW_LIMIT;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::time::Duration;

pub const ENV_DB_PATH: &str = "REGISTRY_DB_PATH";
pub const ENV_PORT: &str = "REGISTRY_PORT";
pub const ENV_GRACE_MS: &str = "REGISTRY_GRACE_MS";
pub const ENV_LOG_LEVEL: &str = "REGISTRY_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "REGISTRY_LOG_DIR";

const DEFAULT_PORT: u16 = 5002;
const DEFAULT_DB_FILE_NAME: &str = "resident_registry.sqlite3";
const DEFAULT_LOG_DIR_NAME: &str = "resident_registry_logs";

/// Registry runtime settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryConfig {
    pub db_path: PathBuf,
    /// Port the HTTP transport binds; unused by the core itself.
    pub port: u16,
    /// Undo window of the soft-delete coordinator.
    pub grace_period: Duration,
    pub default_view_limit: usize,
    pub log_level: String,
    /// Must be absolute for `init_logging`.
    pub log_dir: PathBuf,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        let temp_dir = std::env::temp_dir();
        Self {
            db_path: temp_dir.join(DEFAULT_DB_FILE_NAME),
            port: DEFAULT_PORT,
            grace_period: DEFAULT_GRACE_PERIOD,
            default_view_limit: DEFAULT_VIEW_LIMIT,
            log_level: default_log_level().to_string(),
            log_dir: temp_dir.join(DEFAULT_LOG_DIR_NAME),
        }
    }
}

impl RegistryConfig {
    /// Defaults overridden by process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by `lookup`, which maps variable names to values.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let read = |key: &'static str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
                .map(|value| (key, value))
        };

        if let Some((_, value)) = read(ENV_DB_PATH) {
            config.db_path = PathBuf::from(value);
        }
        if let Some((key, value)) = read(ENV_PORT) {
            config.port = value
                .parse::<u16>()
                .ok()
                .filter(|port| *port > 0)
                .ok_or(ConfigError::InvalidValue { key, value })?;
        }
        if let Some((key, value)) = read(ENV_GRACE_MS) {
            let millis = value
                .parse::<u64>()
                .ok()
                .filter(|millis| *millis > 0)
                .ok_or(ConfigError::InvalidValue { key, value })?;
            config.grace_period = Duration::from_millis(millis);
        }
        if let Some((_, value)) = read(ENV_LOG_LEVEL) {
            config.log_level = value;
        }
        if let Some((key, value)) = read(ENV_LOG_DIR) {
            let path = PathBuf::from(&value);
            if !path.is_absolute() {
                return Err(ConfigError::InvalidValue { key, value });
            }
            config.log_dir = path;
        }

        Ok(config)
    }
}

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidValue { key: &'static str, value: String },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidValue { key, value } => {
                write!(f, "invalid value `{value}` for `{key}`")
            }
        }
    }
}

impl Error for ConfigError {}
