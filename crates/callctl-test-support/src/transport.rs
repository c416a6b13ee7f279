//! Test transports — mock `Transport` implementations for tests.

use std::sync::Mutex;

use callctl_core::request_id::RequestId;
use callctl_core::transport::{Transport, TransportError};

/// A transport that records every sent command and always succeeds.
#[derive(Debug)]
pub struct RecordingTransport<C> {
    sent: Mutex<Vec<(RequestId, C)>>,
}

impl<C: Clone> RecordingTransport<C> {
    /// Create an empty recording transport.
    #[must_use]
    pub fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
        }
    }

    /// Returns a snapshot of all commands that were sent, in send order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn sent(&self) -> Vec<(RequestId, C)> {
        self.sent.lock().unwrap().clone()
    }
}

impl<C: Clone> Default for RecordingTransport<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clone + Send> Transport<C> for RecordingTransport<C> {
    fn send(&self, request_id: &RequestId, payload: &C) -> Result<(), TransportError> {
        self.sent
            .lock()
            .unwrap()
            .push((request_id.clone(), payload.clone()));
        Ok(())
    }
}

/// A transport that always reports a lost connection. Useful for testing
/// send-failure paths.
#[derive(Debug)]
pub struct FailingTransport;

impl<C> Transport<C> for FailingTransport {
    fn send(&self, _request_id: &RequestId, _payload: &C) -> Result<(), TransportError> {
        Err(TransportError::Disconnected)
    }
}
