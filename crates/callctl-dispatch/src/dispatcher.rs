//! Command dispatcher.
//!
//! Tracks in-flight commands by request id. The send path calls
//! [`Dispatcher::dispatch`]; the transport's receive path calls
//! [`Dispatcher::deliver`] for each decoded response.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use callctl_core::clock::Clock;
use callctl_core::command::{Command, CommandState};
use callctl_core::request_id::RequestId;
use callctl_core::transport::Transport;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::DispatchConfig;
use crate::error::DispatchError;

/// Read-only view of an in-flight command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingCommand {
    /// The command's request id.
    pub request_id: RequestId,
    /// Lifecycle state at snapshot time.
    pub state: CommandState,
    /// When the command was handed to the dispatcher.
    pub dispatched_at: DateTime<Utc>,
}

struct Pending<C, R> {
    command: Arc<Command<C, R>>,
    dispatched_at: DateTime<Utc>,
}

/// Coordinates the send and receive paths for commands of payload type `C`
/// and response type `R`.
pub struct Dispatcher<C, R> {
    transport: Arc<dyn Transport<C>>,
    clock: Arc<dyn Clock>,
    config: DispatchConfig,
    pending: Mutex<HashMap<RequestId, Pending<C, R>>>,
}

impl<C, R> Dispatcher<C, R> {
    /// Create a dispatcher sending through `transport`.
    #[must_use]
    pub fn new(
        transport: Arc<dyn Transport<C>>,
        clock: Arc<dyn Clock>,
        config: DispatchConfig,
    ) -> Self {
        Self {
            transport,
            clock,
            config,
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the dispatcher's configuration.
    #[must_use]
    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Registers `command`, marks it requested, sends it and marks it
    /// executing.
    ///
    /// A response that arrives before the send returns may already have
    /// completed the command; the execute step is then skipped.
    ///
    /// # Errors
    ///
    /// - `DispatchError::DuplicateRequest` if the id is already pending.
    /// - `DispatchError::Command` if the command is not `new`.
    /// - `DispatchError::Transport` if sending fails. The command is
    ///   unregistered and left `requested`.
    pub fn dispatch(&self, command: Arc<Command<C, R>>) -> Result<(), DispatchError> {
        let request_id = command.request_id().clone();

        {
            let mut pending = self.pending.lock();
            if pending.contains_key(&request_id) {
                return Err(DispatchError::DuplicateRequest(request_id));
            }
            command.request()?;
            pending.insert(
                request_id.clone(),
                Pending {
                    command: Arc::clone(&command),
                    dispatched_at: self.clock.now(),
                },
            );
        }

        info!(%request_id, "dispatching command");

        if let Err(source) = self.transport.send(&request_id, command.payload()) {
            self.unregister(&request_id, &command);
            warn!(%request_id, error = %source, "command send failed");
            return Err(DispatchError::Transport { request_id, source });
        }

        match command.execute() {
            Ok(()) => Ok(()),
            Err(_) if command.is_complete() => {
                debug!(%request_id, "response arrived before send confirmation");
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Routes an inbound response to its pending command.
    ///
    /// The command is unregistered once complete, so a redelivery of the
    /// same response is reported as unknown.
    ///
    /// # Errors
    ///
    /// - `DispatchError::UnknownRequest` if no command is pending under
    ///   `request_id`.
    /// - `DispatchError::Command` if the command's lifecycle rejected the
    ///   response.
    pub fn deliver(&self, request_id: &RequestId, response: R) -> Result<(), DispatchError> {
        let Some(command) = self
            .pending
            .lock()
            .get(request_id)
            .map(|p| Arc::clone(&p.command))
        else {
            warn!(%request_id, "response for unknown command");
            return Err(DispatchError::UnknownRequest(request_id.clone()));
        };

        let result = command.set_response(response);
        if command.is_complete() {
            self.unregister(request_id, &command);
        }

        match result {
            Ok(()) => {
                info!(%request_id, "response delivered");
                Ok(())
            }
            Err(err) => {
                warn!(%request_id, error = %err, "response rejected by command lifecycle");
                Err(err.into())
            }
        }
    }

    /// Stops tracking a command, typically after the caller gave up
    /// waiting. Later responses for it are reported as unknown.
    pub fn abandon(&self, request_id: &RequestId) -> Option<Arc<Command<C, R>>> {
        let removed = self.pending.lock().remove(request_id).map(|p| p.command);
        if removed.is_some() {
            info!(%request_id, "command abandoned");
        }
        removed
    }

    /// Returns the number of in-flight commands.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }

    /// Returns in-flight commands ordered by dispatch time, then id.
    #[must_use]
    pub fn pending_snapshot(&self) -> Vec<PendingCommand> {
        let mut snapshot: Vec<PendingCommand> = self
            .pending
            .lock()
            .iter()
            .map(|(request_id, p)| PendingCommand {
                request_id: request_id.clone(),
                state: p.command.state(),
                dispatched_at: p.dispatched_at,
            })
            .collect();
        snapshot.sort_by(|a, b| {
            a.dispatched_at
                .cmp(&b.dispatched_at)
                .then_with(|| a.request_id.cmp(&b.request_id))
        });
        snapshot
    }

    fn unregister(&self, request_id: &RequestId, command: &Arc<Command<C, R>>) {
        let mut pending = self.pending.lock();
        if pending
            .get(request_id)
            .is_some_and(|p| Arc::ptr_eq(&p.command, command))
        {
            pending.remove(request_id);
        }
    }
}

impl<C, R: Clone> Dispatcher<C, R> {
    /// Dispatches `command` and blocks for its response using the
    /// configured timeout.
    ///
    /// On timeout the command stays pending; the caller may await it again
    /// or [`abandon`](Self::abandon) it.
    ///
    /// # Errors
    ///
    /// Returns any `dispatch` error, or `DispatchError::Command` wrapping
    /// `CommandError::Timeout` if no response arrives in time.
    pub fn execute_and_await(&self, command: &Arc<Command<C, R>>) -> Result<R, DispatchError> {
        self.dispatch(Arc::clone(command))?;
        self.await_response(command, self.config.response_timeout)
    }

    /// Blocks on an already dispatched command.
    ///
    /// # Errors
    ///
    /// Returns `DispatchError::Command` wrapping `CommandError::Timeout` if
    /// no response arrives within `timeout`.
    pub fn await_response(
        &self,
        command: &Command<C, R>,
        timeout: Option<Duration>,
    ) -> Result<R, DispatchError> {
        command.await_response(timeout).map_err(|err| {
            warn!(request_id = %command.request_id(), error = %err, "awaiting response failed");
            DispatchError::from(err)
        })
    }
}
