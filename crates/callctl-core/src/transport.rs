//! Outbound transport abstraction.

use thiserror::Error;

use crate::request_id::RequestId;

/// Failure to hand a command to the wire.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The connection to the call-control server is gone.
    #[error("transport disconnected")]
    Disconnected,

    /// The transport refused the payload.
    #[error("transport rejected command: {0}")]
    Rejected(String),
}

/// Send path to the remote call-control server.
///
/// Responses do not come back through this trait; the receive path
/// delivers them separately, keyed by request id.
pub trait Transport<C>: Send + Sync {
    /// Writes `payload` to the wire, tagged with `request_id`.
    ///
    /// # Errors
    ///
    /// Returns `TransportError` if the command could not be sent.
    fn send(&self, request_id: &RequestId, payload: &C) -> Result<(), TransportError>;
}
