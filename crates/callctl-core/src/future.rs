//! Write-once, blocking-read result container.
//!
//! A [`FutureResult`] is set exactly once by a producer (typically the
//! transport's receive path) and read by any number of consumers, each of
//! which may block until the value arrives.

use std::fmt;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::error::CommandError;

/// A single-assignment value that consumers can block on.
pub struct FutureResult<T> {
    value: Mutex<Option<T>>,
    ready: Condvar,
}

impl<T> FutureResult<T> {
    /// Creates an empty, unset future.
    #[must_use]
    pub fn new() -> Self {
        Self {
            value: Mutex::new(None),
            ready: Condvar::new(),
        }
    }

    /// Stores `value` and wakes every waiter.
    ///
    /// # Errors
    ///
    /// Returns `CommandError::AlreadySet` if a value was stored before. The
    /// original value is kept.
    pub fn set(&self, value: T) -> Result<(), CommandError> {
        let mut slot = self.value.lock();
        if slot.is_some() {
            return Err(CommandError::AlreadySet);
        }
        *slot = Some(value);
        drop(slot);
        self.ready.notify_all();
        Ok(())
    }

    /// Returns whether a value has been stored. Never blocks on a waiter.
    #[must_use]
    pub fn is_set(&self) -> bool {
        self.value.lock().is_some()
    }
}

impl<T: Clone> FutureResult<T> {
    /// Blocks until the value is set, or until `timeout` elapses.
    ///
    /// `None` waits indefinitely. An already-set value is returned without
    /// blocking. A timed-out wait leaves the future untouched, so a later
    /// call can still observe the eventual value.
    ///
    /// # Errors
    ///
    /// Returns `CommandError::Timeout` if the deadline passes first.
    pub fn await_value(&self, timeout: Option<Duration>) -> Result<T, CommandError> {
        let deadline = timeout.and_then(|timeout| Instant::now().checked_add(timeout));
        let mut slot = self.value.lock();

        // Loop so spurious wakeups never end a wait early.
        while slot.is_none() {
            match deadline {
                Some(deadline) => {
                    if self.ready.wait_until(&mut slot, deadline).timed_out() {
                        break;
                    }
                }
                None => self.ready.wait(&mut slot),
            }
        }

        slot.as_ref()
            .cloned()
            .ok_or_else(|| CommandError::Timeout(timeout.unwrap_or_default()))
    }

    /// Returns a copy of the value if it has been set, without blocking.
    #[must_use]
    pub fn try_get(&self) -> Option<T> {
        self.value.lock().clone()
    }
}

impl<T> Default for FutureResult<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: fmt::Debug> fmt::Debug for FutureResult<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FutureResult")
            .field("value", &*self.value.lock())
            .finish_non_exhaustive()
    }
}
