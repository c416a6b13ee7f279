//! Command lifecycle state machine.
//!
//! A [`Command`] moves strictly forward through
//! `new -> requested -> executing -> complete`. The final step happens only
//! when the response is delivered through [`Command::set_response`], which
//! also resolves the embedded [`FutureResult`] that callers block on.

use std::fmt;
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::CommandError;
use crate::future::FutureResult;
use crate::request_id::{IdGenerator, RequestId, UuidIdGenerator};

/// Lifecycle state of a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandState {
    /// Constructed, not yet handed to the dispatch layer.
    New,
    /// Accepted by the dispatch layer.
    Requested,
    /// Written to the transport, awaiting a response.
    Executing,
    /// Response received. Terminal.
    Complete,
}

impl CommandState {
    /// Returns the lower-case state name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Requested => "requested",
            Self::Executing => "executing",
            Self::Complete => "complete",
        }
    }
}

impl fmt::Display for CommandState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A lifecycle transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandEvent {
    /// `new -> requested`
    Request,
    /// `requested -> executing`
    Execute,
    /// `executing -> complete`
    Complete,
}

impl CommandEvent {
    /// Returns the `(from, to)` pair this event is legal for.
    #[must_use]
    pub const fn transition(self) -> (CommandState, CommandState) {
        match self {
            Self::Request => (CommandState::New, CommandState::Requested),
            Self::Execute => (CommandState::Requested, CommandState::Executing),
            Self::Complete => (CommandState::Executing, CommandState::Complete),
        }
    }

    /// Returns the lower-case event name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Request => "request",
            Self::Execute => "execute",
            Self::Complete => "complete",
        }
    }
}

impl fmt::Display for CommandEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A protocol command with an identifier, a lifecycle and an eventual
/// response.
///
/// `C` is the outbound protocol payload and `R` the response payload. Both
/// are opaque here.
#[derive(Debug)]
pub struct Command<C, R> {
    request_id: RequestId,
    payload: C,
    state: Mutex<CommandState>,
    response: FutureResult<R>,
}

impl<C, R> Command<C, R> {
    /// Creates a command in state `new` with a freshly generated UUID
    /// request id.
    #[must_use]
    pub fn new(payload: C) -> Self {
        Self::with_request_id(UuidIdGenerator.next_id(), payload)
    }

    /// Creates a command with an id drawn from `generator`.
    #[must_use]
    pub fn with_generator(generator: &dyn IdGenerator, payload: C) -> Self {
        Self::with_request_id(generator.next_id(), payload)
    }

    /// Creates a command with an externally supplied request id.
    #[must_use]
    pub fn with_request_id(request_id: RequestId, payload: C) -> Self {
        Self {
            request_id,
            payload,
            state: Mutex::new(CommandState::New),
            response: FutureResult::new(),
        }
    }

    /// Returns the request id.
    #[must_use]
    pub fn request_id(&self) -> &RequestId {
        &self.request_id
    }

    /// Returns the outbound payload.
    #[must_use]
    pub fn payload(&self) -> &C {
        &self.payload
    }

    /// Returns the current lifecycle state.
    #[must_use]
    pub fn state(&self) -> CommandState {
        *self.state.lock()
    }

    /// Returns true once the response has been delivered.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.state() == CommandState::Complete
    }

    /// Marks the command as accepted by the dispatch layer.
    ///
    /// # Errors
    ///
    /// Returns `CommandError::InvalidTransition` unless the command is `new`.
    pub fn request(&self) -> Result<(), CommandError> {
        self.fire(&mut self.state.lock(), CommandEvent::Request)
    }

    /// Marks the command as written to the transport.
    ///
    /// # Errors
    ///
    /// Returns `CommandError::InvalidTransition` unless the command is
    /// `requested`.
    pub fn execute(&self) -> Result<(), CommandError> {
        self.fire(&mut self.state.lock(), CommandEvent::Execute)
    }

    /// Delivers the response and completes the command.
    ///
    /// A response for a command whose response is already set is ignored.
    /// Otherwise the value is committed first, then a `requested` command is
    /// advanced to `executing` and on to `complete`. The whole operation
    /// holds the state lock, so no observer sees the value without the
    /// matching state.
    ///
    /// # Errors
    ///
    /// Returns `CommandError::InvalidTransition` if the command was never
    /// requested. The response stays committed in that case.
    pub fn set_response(&self, response: R) -> Result<(), CommandError> {
        let mut state = self.state.lock();

        if self.response.set(response).is_err() {
            debug!(request_id = %self.request_id, "duplicate response ignored");
            return Ok(());
        }

        if *state == CommandState::Requested {
            self.fire(&mut state, CommandEvent::Execute)?;
        }
        self.fire(&mut state, CommandEvent::Complete)
    }

    fn fire(&self, state: &mut CommandState, event: CommandEvent) -> Result<(), CommandError> {
        let (from, to) = event.transition();
        if *state != from {
            return Err(CommandError::InvalidTransition {
                request_id: self.request_id.clone(),
                event,
                from: *state,
            });
        }
        *state = to;
        debug!(request_id = %self.request_id, %event, %from, %to, "command transitioned");
        Ok(())
    }
}

impl<C, R: Clone> Command<C, R> {
    /// Blocks until the response arrives or `timeout` elapses.
    ///
    /// Works in any state, so a caller may start waiting before the command
    /// is dispatched.
    ///
    /// # Errors
    ///
    /// Returns `CommandError::Timeout` if no response arrived in time. The
    /// command is unchanged and may be awaited again.
    pub fn await_response(&self, timeout: Option<Duration>) -> Result<R, CommandError> {
        self.response.await_value(timeout)
    }

    /// Returns the response if it has been delivered, without blocking.
    #[must_use]
    pub fn response_if_set(&self) -> Option<R> {
        self.response.try_get()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Instant;

    use super::*;

    fn command(id: &str) -> Command<&'static str, &'static str> {
        Command::with_request_id(RequestId::new(id), "ask")
    }

    fn executing(id: &str) -> Command<&'static str, &'static str> {
        let cmd = command(id);
        cmd.request().unwrap();
        cmd.execute().unwrap();
        cmd
    }

    #[test]
    fn test_new_command_starts_in_new_state() {
        let cmd = command("c0");
        assert_eq!(cmd.state(), CommandState::New);
        assert_eq!(cmd.request_id().as_str(), "c0");
        assert_eq!(*cmd.payload(), "ask");
        assert!(cmd.response_if_set().is_none());
    }

    #[test]
    fn test_generated_request_ids_are_unique() {
        let a: Command<(), ()> = Command::new(());
        let b: Command<(), ()> = Command::new(());
        assert_ne!(a.request_id(), b.request_id());
    }

    #[test]
    fn test_execute_before_request_fails_and_state_stays_new() {
        // Arrange
        let cmd = command("c1");

        // Act
        let result = cmd.execute();

        // Assert
        assert_eq!(
            result,
            Err(CommandError::InvalidTransition {
                request_id: RequestId::new("c1"),
                event: CommandEvent::Execute,
                from: CommandState::New,
            })
        );
        assert_eq!(cmd.state(), CommandState::New);
    }

    #[test]
    fn test_request_then_execute_reaches_executing() {
        let cmd = executing("c1");
        assert_eq!(cmd.state(), CommandState::Executing);
    }

    #[test]
    fn test_second_execute_fails_and_state_unchanged() {
        // Arrange
        let cmd = executing("c1");

        // Act
        let result = cmd.execute();

        // Assert
        assert!(matches!(
            result,
            Err(CommandError::InvalidTransition {
                event: CommandEvent::Execute,
                from: CommandState::Executing,
                ..
            })
        ));
        assert_eq!(cmd.state(), CommandState::Executing);
    }

    #[test]
    fn test_second_request_fails() {
        let cmd = command("c1");
        cmd.request().unwrap();

        assert!(cmd.request().is_err());
        assert_eq!(cmd.state(), CommandState::Requested);
    }

    #[test]
    fn test_set_response_on_executing_completes_command() {
        // Arrange
        let cmd = executing("c1");

        // Act
        cmd.set_response("P").unwrap();

        // Assert
        assert_eq!(cmd.state(), CommandState::Complete);
        assert!(cmd.is_complete());
        assert_eq!(cmd.await_response(None), Ok("P"));
        assert_eq!(cmd.response_if_set(), Some("P"));
    }

    #[test]
    fn test_set_response_on_requested_auto_advances_to_complete() {
        let cmd = command("c1");
        cmd.request().unwrap();

        cmd.set_response("fast echo").unwrap();

        assert_eq!(cmd.state(), CommandState::Complete);
        assert_eq!(cmd.await_response(None), Ok("fast echo"));
    }

    #[test]
    fn test_set_response_on_new_fails_but_commits_value() {
        // Arrange
        let cmd = command("never-sent");

        // Act
        let result = cmd.set_response("stray");

        // Assert
        let err = result.unwrap_err();
        assert_eq!(
            err,
            CommandError::InvalidTransition {
                request_id: RequestId::new("never-sent"),
                event: CommandEvent::Complete,
                from: CommandState::New,
            }
        );
        assert!(err.to_string().contains("never-sent"));
        assert_eq!(cmd.state(), CommandState::New);
        assert_eq!(cmd.response_if_set(), Some("stray"));
    }

    #[test]
    fn test_duplicate_set_response_is_a_no_op() {
        // Arrange
        let cmd = executing("c2");
        cmd.set_response("ERR1").unwrap();

        // Act
        let second = cmd.set_response("ERR2");

        // Assert
        assert_eq!(second, Ok(()));
        assert_eq!(cmd.state(), CommandState::Complete);
        assert_eq!(cmd.await_response(None), Ok("ERR1"));
    }

    #[test]
    fn test_duplicate_set_response_after_stray_delivery_does_not_raise() {
        let cmd = command("c3");
        assert!(cmd.set_response("first").is_err());

        assert_eq!(cmd.set_response("second"), Ok(()));
        assert_eq!(cmd.response_if_set(), Some("first"));
    }

    #[test]
    fn test_await_response_times_out_and_remains_awaitable() {
        // Arrange
        let cmd = executing("c4");
        let timeout = Duration::from_millis(100);

        // Act
        let started = Instant::now();
        let result = cmd.await_response(Some(timeout));

        // Assert
        assert_eq!(result, Err(CommandError::Timeout(timeout)));
        assert!(started.elapsed() >= timeout);
        assert_eq!(cmd.state(), CommandState::Executing);
        assert!(cmd.response_if_set().is_none());

        cmd.set_response("eventually").unwrap();
        assert_eq!(cmd.await_response(Some(timeout)), Ok("eventually"));
    }

    #[test]
    fn test_concurrent_waiters_released_by_response_from_another_thread() {
        // Arrange
        let cmd = command("c1");
        cmd.request().unwrap();
        let waiting = AtomicUsize::new(0);

        // Act
        let (first, second, delivered) = thread::scope(|s| {
            let await_once = || {
                waiting.fetch_add(1, Ordering::SeqCst);
                cmd.await_response(None)
            };
            let a = s.spawn(await_once);
            let b = s.spawn(await_once);
            let deliverer = s.spawn(|| {
                while waiting.load(Ordering::SeqCst) < 2 {
                    thread::yield_now();
                }
                cmd.set_response("OK")
            });
            (
                a.join().unwrap(),
                b.join().unwrap(),
                deliverer.join().unwrap(),
            )
        });

        // Assert
        assert_eq!(first, Ok("OK"));
        assert_eq!(second, Ok("OK"));
        assert_eq!(delivered, Ok(()));
        assert_eq!(cmd.state(), CommandState::Complete);
    }

    #[test]
    fn test_racing_set_response_calls_have_one_winner() {
        let cmd: Command<(), usize> = Command::with_request_id(RequestId::new("race"), ());
        cmd.request().unwrap();
        cmd.execute().unwrap();
        let shared = &cmd;

        thread::scope(|s| {
            for i in 0..8_usize {
                s.spawn(move || shared.set_response(i).unwrap());
            }
        });

        let winner = cmd.response_if_set().unwrap();
        assert!(winner < 8);
        assert_eq!(cmd.state(), CommandState::Complete);
        assert_eq!(cmd.await_response(None), Ok(winner));
    }

    #[test]
    fn test_state_and_event_display_lower_case() {
        assert_eq!(CommandState::Executing.to_string(), "executing");
        assert_eq!(CommandEvent::Complete.to_string(), "complete");
        assert_eq!(
            serde_json::to_string(&CommandState::Requested).unwrap(),
            "\"requested\""
        );
    }
}
