//! Configuration loading and validation for the media server.
//!
//! Values are read from `MEDIA_SERVER_*` environment variables. Every field has
//! a default, so an empty environment yields a server on an ephemeral port.

use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::server::retry::RetryPolicy;

/// Environment variable prefix, e.g. `MEDIA_SERVER_PORT`.
pub const ENV_PREFIX: &str = "MEDIA_SERVER";

/// Largest accepted bind retry delay (one hour).
pub const MAX_BIND_BACKOFF_MS: u64 = 3_600_000;

/// Validated media server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Port to bind on first start. `0` lets the OS choose a free port.
    #[serde(default)]
    pub port: u16,

    /// Consecutive bind failures tolerated before the listener gives up.
    #[serde(default = "default_bind_retry_limit")]
    pub bind_retry_limit: u32,

    /// Delay before the first bind retry, doubled on each further failure.
    #[serde(default = "default_bind_backoff_base_ms")]
    pub bind_backoff_base_ms: u64,

    /// Upper bound on the bind retry delay.
    #[serde(default = "default_bind_backoff_max_ms")]
    pub bind_backoff_max_ms: u64,

    /// Tracing log level (e.g. `"info"`, `"debug"`).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_bind_retry_limit() -> u32 {
    8
}
fn default_bind_backoff_base_ms() -> u64 {
    50
}
fn default_bind_backoff_max_ms() -> u64 {
    5_000
}
fn default_log_level() -> String {
    "info".into()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 0,
            bind_retry_limit: default_bind_retry_limit(),
            bind_backoff_base_ms: default_bind_backoff_base_ms(),
            bind_backoff_max_ms: default_bind_backoff_max_ms(),
            log_level: default_log_level(),
        }
    }
}

impl Config {
    /// Load and validate configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable cannot be parsed or a value is out of range.
    pub fn from_env() -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(config::Environment::with_prefix(ENV_PREFIX))
            .build()
            .context("failed to build configuration from environment")?;

        let c: Config = cfg
            .try_deserialize()
            .context("failed to deserialise configuration")?;

        c.validate()?;
        Ok(c)
    }

    /// Retry policy applied when the listener cannot bind.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            limit: self.bind_retry_limit,
            base: Duration::from_millis(self.bind_backoff_base_ms),
            max: Duration::from_millis(self.bind_backoff_max_ms),
        }
    }

    /// Validate all fields, returning a descriptive error on the first failure.
    fn validate(&self) -> Result<()> {
        if self.bind_retry_limit == 0 {
            anyhow::bail!("MEDIA_SERVER_BIND_RETRY_LIMIT must be > 0");
        }
        if self.bind_backoff_base_ms == 0 {
            anyhow::bail!("MEDIA_SERVER_BIND_BACKOFF_BASE_MS must be > 0");
        }
        if self.bind_backoff_max_ms < self.bind_backoff_base_ms {
            anyhow::bail!(
                "MEDIA_SERVER_BIND_BACKOFF_MAX_MS must be >= MEDIA_SERVER_BIND_BACKOFF_BASE_MS"
            );
        }
        if self.bind_backoff_max_ms > MAX_BIND_BACKOFF_MS {
            anyhow::bail!("MEDIA_SERVER_BIND_BACKOFF_MAX_MS must be <= {MAX_BIND_BACKOFF_MS}");
        }
        if self.log_level.trim().is_empty() {
            anyhow::bail!("MEDIA_SERVER_LOG_LEVEL must not be empty");
        }
        Ok(())
    }
}
