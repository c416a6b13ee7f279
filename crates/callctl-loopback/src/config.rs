//! Loopback harness configuration, read from the environment.

use std::time::Duration;

use callctl_dispatch::config::{ConfigError, DispatchConfig, parse_millis};

/// Echo latency in milliseconds.
pub const ECHO_DELAY_ENV: &str = "CALLCTL_ECHO_DELAY_MS";

/// Number of commands issued by the harness.
pub const COMMANDS_ENV: &str = "CALLCTL_COMMANDS";

/// Settings for one harness run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopbackConfig {
    /// Dispatcher settings.
    pub dispatch: DispatchConfig,
    /// How long the echo server waits before answering.
    pub echo_delay: Duration,
    /// How many commands to issue concurrently.
    pub commands: usize,
}

impl Default for LoopbackConfig {
    fn default() -> Self {
        Self {
            dispatch: DispatchConfig::default(),
            echo_delay: Duration::from_millis(50),
            commands: 3,
        }
    }
}

impl LoopbackConfig {
    /// Reads configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set but malformed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads configuration through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a value is present but malformed.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self {
            dispatch: DispatchConfig::from_lookup(&lookup)?,
            ..Self::default()
        };
        if let Some(raw) = lookup(ECHO_DELAY_ENV) {
            config.echo_delay = Duration::from_millis(parse_millis(ECHO_DELAY_ENV, &raw)?);
        }
        if let Some(raw) = lookup(COMMANDS_ENV) {
            config.commands = raw.trim().parse().map_err(|e: std::num::ParseIntError| {
                ConfigError {
                    key: COMMANDS_ENV,
                    value: raw.clone(),
                    reason: e.to_string(),
                }
            })?;
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn test_reads_all_keys() {
        let env = HashMap::from([
            ("CALLCTL_RESPONSE_TIMEOUT_MS", "100"),
            (ECHO_DELAY_ENV, "5"),
            (COMMANDS_ENV, "7"),
        ]);

        let config =
            LoopbackConfig::from_lookup(|key| env.get(key).map(|v| (*v).to_owned())).unwrap();

        assert_eq!(config.dispatch.response_timeout, Some(Duration::from_millis(100)));
        assert_eq!(config.echo_delay, Duration::from_millis(5));
        assert_eq!(config.commands, 7);
    }

    #[test]
    fn test_rejects_malformed_command_count() {
        let err = LoopbackConfig::from_lookup(|key| {
            (key == COMMANDS_ENV).then(|| "many".to_owned())
        })
        .unwrap_err();

        assert_eq!(err.key, COMMANDS_ENV);
    }
}
