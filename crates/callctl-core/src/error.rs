//! Command lifecycle error types.

use std::time::Duration;

use thiserror::Error;

use crate::command::{CommandEvent, CommandState};
use crate::request_id::RequestId;

/// Errors raised by command transitions and response futures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    /// A transition was attempted from a state that does not permit it.
    #[error("invalid transition {event} from state {from} for command {request_id}")]
    InvalidTransition {
        /// The command whose lifecycle was violated.
        request_id: RequestId,
        /// The attempted transition.
        event: CommandEvent,
        /// The state the command was in.
        from: CommandState,
    },

    /// A second attempt to set a write-once value.
    #[error("value already set")]
    AlreadySet,

    /// The wait deadline elapsed before a value was set.
    #[error("timed out after {0:?} waiting for value")]
    Timeout(Duration),
}

impl CommandError {
    /// Returns true when waiting again may still succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}
