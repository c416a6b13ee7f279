//! Loopback harness error types.

use callctl_dispatch::config::ConfigError;
use callctl_dispatch::error::DispatchError;
use thiserror::Error;

/// Startup and runtime errors for the loopback harness.
#[derive(Debug, Error)]
pub enum AppError {
    /// A required environment variable is missing or invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// A command failed to dispatch or complete.
    #[error("dispatch error: {0}")]
    Dispatch(#[from] DispatchError),

    /// A blocking caller task panicked or was cancelled.
    #[error("task error: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl From<ConfigError> for AppError {
    fn from(err: ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}
