//! Dispatch error types.

use callctl_core::error::CommandError;
use callctl_core::request_id::RequestId;
use callctl_core::transport::TransportError;
use thiserror::Error;

/// Errors raised while dispatching commands or delivering responses.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// A lifecycle or await failure on the command itself.
    #[error(transparent)]
    Command(#[from] CommandError),

    /// The transport could not send the command.
    #[error("failed to send command {request_id}: {source}")]
    Transport {
        /// The command that was not sent.
        request_id: RequestId,
        /// The underlying transport failure.
        source: TransportError,
    },

    /// A response arrived for a command that is not pending.
    #[error("no pending command for request {0}")]
    UnknownRequest(RequestId),

    /// A command with the same request id is already in flight.
    #[error("command {0} is already pending")]
    DuplicateRequest(RequestId),
}

impl DispatchError {
    /// Returns true when waiting again may still succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Command(err) if err.is_retryable())
    }
}
