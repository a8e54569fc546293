//! Process configuration read from environment variables.
//!
//! | Variable                        | Required | Default        |
//! |---------------------------------|----------|----------------|
//! | `DATABASE_URL`                  | yes      |                |
//! | `BIND_ADDR`                     | no       | `0.0.0.0:8080` |
//! | `DATABASE_MAX_CONNECTIONS`      | no       | `10`           |
//! | `DATABASE_ACQUIRE_TIMEOUT_SECS` | no       | `30`           |
//!
//! [`Config::from_lookup`] takes the lookup as a function so tests never have
//! to touch the real process environment.

use std::time::Duration;

use thiserror::Error;

pub const DATABASE_URL: &str = "DATABASE_URL";
pub const BIND_ADDR: &str = "BIND_ADDR";
pub const DATABASE_MAX_CONNECTIONS: &str = "DATABASE_MAX_CONNECTIONS";
pub const DATABASE_ACQUIRE_TIMEOUT_SECS: &str = "DATABASE_ACQUIRE_TIMEOUT_SECS";

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_MAX_CONNECTIONS: u32 = 10;
const DEFAULT_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("environment variable {var} must be set")]
    Missing { var: &'static str },

    #[error("environment variable {var} has invalid value {value:?}: expected {expected}")]
    Invalid {
        var: &'static str,
        value: String,
        expected: &'static str,
    },
}

/// Settings for the PostgreSQL connection pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    /// How long a request may wait for a pooled connection.
    pub acquire_timeout: Duration,
}

impl DatabaseConfig {
    /// Pool settings with default sizing for `url`.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            acquire_timeout: DEFAULT_ACQUIRE_TIMEOUT,
        }
    }
}

/// Root configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub bind_addr: String,
    pub database: DatabaseConfig,
}

impl Config {
    /// Reads configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads configuration through `lookup`, which returns a variable's value or `None`.
    ///
    /// Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let url = get(DATABASE_URL).ok_or(ConfigError::Missing { var: DATABASE_URL })?;
        let bind_addr = get(BIND_ADDR).unwrap_or_else(|| DEFAULT_BIND_ADDR.to_owned());

        let max_connections = match get(DATABASE_MAX_CONNECTIONS) {
            Some(raw) => parse_positive(DATABASE_MAX_CONNECTIONS, &raw)?,
            None => DEFAULT_MAX_CONNECTIONS,
        };
        let acquire_timeout = match get(DATABASE_ACQUIRE_TIMEOUT_SECS) {
            Some(raw) => Duration::from_secs(parse_positive(DATABASE_ACQUIRE_TIMEOUT_SECS, &raw)?.into()),
            None => DEFAULT_ACQUIRE_TIMEOUT,
        };

        Ok(Self {
            bind_addr,
            database: DatabaseConfig {
                url,
                max_connections,
                acquire_timeout,
            },
        })
    }
}

fn parse_positive(var: &'static str, raw: &str) -> Result<u32, ConfigError> {
    match raw.trim().parse::<u32>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ConfigError::Invalid {
            var,
            value: raw.to_owned(),
            expected: "a positive integer",
        }),
    }
}
