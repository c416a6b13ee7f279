//! In-process echo server.
//!
//! [`EchoTransport`] pushes sent commands onto a tokio channel; the
//! [`serve_echo`] task plays the remote call-control server and answers
//! each one through the dispatcher's receive path after a delay.

use std::sync::Arc;
use std::time::Duration;

use callctl_core::request_id::RequestId;
use callctl_core::transport::{Transport, TransportError};
use callctl_dispatch::dispatcher::Dispatcher;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// A sent command, as seen by the echo server.
pub type Outbound = (RequestId, String);

/// Transport writing commands to the echo server's inbox.
#[derive(Debug, Clone)]
pub struct EchoTransport {
    outbound: mpsc::UnboundedSender<Outbound>,
}

impl EchoTransport {
    /// Creates a transport and the receiver the echo server reads from.
    #[must_use]
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Outbound>) {
        let (outbound, inbound) = mpsc::unbounded_channel();
        (Self { outbound }, inbound)
    }
}

impl Transport<String> for EchoTransport {
    fn send(&self, request_id: &RequestId, payload: &String) -> Result<(), TransportError> {
        self.outbound
            .send((request_id.clone(), payload.clone()))
            .map_err(|_| TransportError::Disconnected)
    }
}

/// The response the echo server returns for `payload`.
#[must_use]
pub fn echo_response(payload: &str) -> String {
    format!("complete: {payload}")
}

/// Answers every command received on `inbound` after `delay`.
///
/// Runs until every sender is dropped.
pub async fn serve_echo(
    mut inbound: mpsc::UnboundedReceiver<Outbound>,
    dispatcher: Arc<Dispatcher<String, String>>,
    delay: Duration,
) {
    while let Some((request_id, payload)) = inbound.recv().await {
        let dispatcher = Arc::clone(&dispatcher);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Err(err) = dispatcher.deliver(&request_id, echo_response(&payload)) {
                warn!(%request_id, error = %err, "echo delivery failed");
            }
        });
    }
    debug!("echo server stopped");
}
