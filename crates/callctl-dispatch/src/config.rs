//! Dispatch configuration.

use std::time::Duration;

use thiserror::Error;

/// Environment variable holding the default response timeout in
/// milliseconds. `0` waits forever.
pub const RESPONSE_TIMEOUT_ENV: &str = "CALLCTL_RESPONSE_TIMEOUT_MS";

const DEFAULT_RESPONSE_TIMEOUT: Duration = Duration::from_secs(5);

/// A configuration value could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid value {value:?} for {key}: {reason}")]
pub struct ConfigError {
    /// The offending variable.
    pub key: &'static str,
    /// The raw value.
    pub value: String,
    /// Why it was rejected.
    pub reason: String,
}

/// Settings for a [`Dispatcher`](crate::dispatcher::Dispatcher).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchConfig {
    /// Timeout used by `execute_and_await`. `None` waits forever.
    pub response_timeout: Option<Duration>,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            response_timeout: Some(DEFAULT_RESPONSE_TIMEOUT),
        }
    }
}

impl DispatchConfig {
    /// Reads configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set but malformed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads configuration through `lookup`, falling back to defaults for
    /// unset keys.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a value is present but malformed.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(raw) = lookup(RESPONSE_TIMEOUT_ENV) {
            let millis = parse_millis(RESPONSE_TIMEOUT_ENV, &raw)?;
            config.response_timeout = (millis > 0).then(|| Duration::from_millis(millis));
        }
        Ok(config)
    }
}

/// Parses a non-negative millisecond count.
///
/// # Errors
///
/// Returns `ConfigError` naming `key` if `raw` is not a valid `u64`.
pub fn parse_millis(key: &'static str, raw: &str) -> Result<u64, ConfigError> {
    raw.trim().parse().map_err(|e: std::num::ParseIntError| ConfigError {
        key,
        value: raw.to_owned(),
        reason: e.to_string(),
    })
}
