use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {name}: {message}")]
    InvalidValue { name: String, message: String },
    #[error("failed to parse {name} as integer: {source}")]
    ParseInt {
        name: String,
        #[source]
        source: std::num::ParseIntError,
    },
}

/// Client configuration loaded from environment variables.
///
/// Everything is optional with sensible defaults; the environment only needs
/// to be touched to point the clients at a different Trac/Discourse instance
/// or to tune retry behavior.
#[derive(Debug, Clone)]
pub struct Config {
    // Endpoints
    pub trac_base_url: String,
    pub forum_base_url: String,

    // HTTP
    pub timeout: Duration,

    // Retry / backoff
    pub max_attempts: u32,
    pub backoff_base: Duration,
    pub backoff_cap: Duration,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a set variable fails to parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            trac_base_url: env_or_default("TRAC_BASE_URL", "https://code.djangoproject.com"),
            forum_base_url: env_or_default("FORUM_BASE_URL", "https://forum.djangoproject.com"),
            timeout: Duration::from_secs(parse_env_u64("HTTP_TIMEOUT_SECS", 30)?),
            max_attempts: parse_env_u32("MAX_ATTEMPTS", 5)?,
            backoff_base: Duration::from_millis(parse_env_u64("BACKOFF_BASE_MS", 1_000)?),
            backoff_cap: Duration::from_millis(parse_env_u64("BACKOFF_CAP_MS", 30_000)?),
        })
    }

    /// Validate that the configuration is usable.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                name: "MAX_ATTEMPTS".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if self.timeout.is_zero() {
            return Err(ConfigError::InvalidValue {
                name: "HTTP_TIMEOUT_SECS".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if self.trac_base_url.is_empty() {
            return Err(ConfigError::InvalidValue {
                name: "TRAC_BASE_URL".to_string(),
                message: "cannot be empty".to_string(),
            });
        }
        if self.forum_base_url.is_empty() {
            return Err(ConfigError::InvalidValue {
                name: "FORUM_BASE_URL".to_string(),
                message: "cannot be empty".to_string(),
            });
        }
        if self.backoff_cap < self.backoff_base {
            return Err(ConfigError::InvalidValue {
                name: "BACKOFF_CAP_MS".to_string(),
                message: "cannot be smaller than BACKOFF_BASE_MS".to_string(),
            });
        }
        Ok(())
    }

    /// Configuration for tests: millisecond-scale backoff so retry tests run
    /// near-instantly. Tests override the base URLs with a mock server URI.
    #[must_use]
    pub fn for_testing() -> Self {
        Self {
            trac_base_url: "http://localhost".to_string(),
            forum_base_url: "http://localhost".to_string(),
            timeout: Duration::from_secs(5),
            max_attempts: 5,
            backoff_base: Duration::from_millis(5),
            backoff_cap: Duration::from_millis(20),
        }
    }
}

fn env_or_default(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn parse_env_u64(name: &str, default: u64) -> Result<u64, ConfigError> {
    match std::env::var(name) {
        Ok(val) if !val.is_empty() => val.parse().map_err(|e| ConfigError::ParseInt {
            name: name.to_string(),
            source: e,
        }),
        _ => Ok(default),
    }
}

fn parse_env_u32(name: &str, default: u32) -> Result<u32, ConfigError> {
    match std::env::var(name) {
        Ok(val) if !val.is_empty() => val.parse().map_err(|e| ConfigError::ParseInt {
            name: name.to_string(),
            source: e,
        }),
        _ => Ok(default),
    }
}
