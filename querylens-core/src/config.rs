use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use tracing::debug;

use crate::errors::{ConfigError, QueryLensError};

pub use querylens_protocol::list::DEFAULT_LIMIT;

/// Default threshold above which a completed list request is flagged as slow.
pub const DEFAULT_SLOW_THRESHOLD_MS: u64 = 2000;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Runtime environment used by the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    fn from_str(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "production" | "prod" => Environment::Production,
            "staging" | "stage" => Environment::Staging,
            _ => Environment::Development,
        }
    }
}

/// Configuration shared by the client, controller and CLI.
#[derive(Debug, Clone)]
pub struct CoreConfig {
    pub api_url: String,
    pub api_token: Option<String>,
    pub environment: Environment,
    pub slow_threshold: Duration,
    pub default_limit: u32,
    /// `None` keeps the query cache unbounded for the lifetime of the process.
    pub cache_capacity: Option<usize>,
    pub storage_dir: PathBuf,
    pub request_timeout: Duration,
}

impl CoreConfig {
    /// Loads configuration from `QUERYLENS_*` variables in the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_with_prefix("QUERYLENS_")
    }

    /// Loads configuration from env vars prefixed with the provided value (e.g. `STAGING_`).
    pub fn from_env_with_prefix(prefix: &str) -> Result<Self, ConfigError> {
        if let Ok(path) = dotenvy::dotenv() {
            debug!(path = %path.display(), "loaded environment file");
        }
        Self::from_lookup(prefix, |key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(prefix: &str, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let key = |suffix: &str| format!("{}{}", prefix, suffix);
        let read = |suffix: &str| {
            lookup(&key(suffix))
                .map(|raw| raw.trim().to_string())
                .filter(|raw| !raw.is_empty())
        };

        let api_key = key("API_URL");
        let api_url = read("API_URL").ok_or(ConfigError::MissingEnvVar(api_key))?;
        let api_token = read("API_TOKEN");

        let environment = read("ENV")
            .map(|raw| Environment::from_str(&raw))
            .unwrap_or_default();

        let slow_threshold_ms: u64 =
            parse_optional(&key("SLOW_THRESHOLD_MS"), read("SLOW_THRESHOLD_MS"))?
                .unwrap_or(DEFAULT_SLOW_THRESHOLD_MS);
        let default_limit: u32 = match read("DEFAULT_LIMIT") {
            Some(raw) if raw.parse::<u32>().ok() == Some(0) => {
                return Err(ConfigError::InvalidEnvVar {
                    key: key("DEFAULT_LIMIT"),
                    value: raw,
                });
            }
            raw => parse_optional(&key("DEFAULT_LIMIT"), raw)?.unwrap_or(DEFAULT_LIMIT),
        };
        let cache_capacity: Option<usize> =
            parse_optional(&key("CACHE_CAPACITY"), read("CACHE_CAPACITY"))?;
        let request_timeout_secs: u64 =
            parse_optional(&key("REQUEST_TIMEOUT_SECS"), read("REQUEST_TIMEOUT_SECS"))?
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);

        let storage_dir = match read("STORAGE_DIR") {
            Some(dir) => PathBuf::from(dir),
            None => default_storage_dir()?,
        };

        Ok(Self {
            api_url,
            api_token,
            environment,
            slow_threshold: Duration::from_millis(slow_threshold_ms),
            default_limit,
            cache_capacity,
            storage_dir,
            request_timeout: Duration::from_secs(request_timeout_secs),
        })
    }

    /// Returns the base URL of the telemetry API.
    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// Whether the process is running in production.
    pub fn is_production(&self) -> bool {
        matches!(self.environment, Environment::Production)
    }
}

fn parse_optional<T: FromStr>(key: &str, raw: Option<String>) -> Result<Option<T>, ConfigError> {
    match raw {
        None => Ok(None),
        Some(value) => value
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidEnvVar {
                key: key.to_string(),
                value,
            }),
    }
}

fn default_storage_dir() -> Result<PathBuf, ConfigError> {
    let mut path = dirs::config_dir().ok_or(ConfigError::NoStorageDir)?;
    path.push("querylens");
    Ok(path)
}

/// Helper that loads config and converts to the canonical QueryLens error type.
pub fn load_core_config() -> Result<CoreConfig, QueryLensError> {
    Ok(CoreConfig::from_env()?)
}
