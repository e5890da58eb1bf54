//! Single-use completion slots.
//!
//! A completion slot carries exactly one outcome from an asynchronous
//! producer (a host callback) to one blocking consumer. Both halves are
//! consumed by use, so a second post or a second read does not compile.
//!
//! ```ignore
//! let (completion, reader) = completion_slot::<Bundle>();
//!
//! // Host side, on whatever thread finishes the work
//! completion.on_success(result);
//!
//! // Worker side, blocks until the outcome arrives
//! let outcome = reader.wait()?;
//! ```
//!
//! If the producer is dropped without posting (its owner died or forgot
//! the callback), the reader wakes with [`SlotError::Interrupted`] instead
//! of blocking forever.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender};
use std::time::Duration;

/// The single outcome posted into a slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    Success(T),
    Error(i32),
}

/// Why a slot read produced no outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotError {
    /// The producer was dropped without posting.
    Interrupted,
    /// The bounded wait elapsed first.
    TimedOut,
}

/// Create a fresh slot, returning the producer and consumer halves.
pub fn completion_slot<T>() -> (Completion<T>, SlotReader<T>) {
    let (tx, rx) = mpsc::sync_channel(1);
    (Completion { tx }, SlotReader { rx })
}

/// Producer half of a completion slot.
///
/// Handed to a capability handle together with a request. The handle calls
/// exactly one of [`Completion::on_success`] or [`Completion::on_error`],
/// from any thread.
#[derive(Debug)]
pub struct Completion<T> {
    tx: SyncSender<Outcome<T>>,
}

impl<T> Completion<T> {
    /// Post a successful result.
    pub fn on_success(self, value: T) {
        self.post(Outcome::Success(value));
    }

    /// Post an error code.
    pub fn on_error(self, code: i32) {
        self.post(Outcome::Error(code));
    }

    /// Post an already-built outcome.
    pub fn post(self, outcome: Outcome<T>) {
        // The reader may have timed out and gone; the outcome is discarded then.
        let _ = self.tx.try_send(outcome);
    }
}

/// Consumer half of a completion slot.
#[derive(Debug)]
pub struct SlotReader<T> {
    rx: Receiver<Outcome<T>>,
}

impl<T> SlotReader<T> {
    /// Block until the outcome is posted or the producer is dropped.
    pub fn wait(self) -> Result<Outcome<T>, SlotError> {
        self.rx.recv().map_err(|_| SlotError::Interrupted)
    }

    /// Block for at most `timeout`.
    pub fn wait_timeout(self, timeout: Duration) -> Result<Outcome<T>, SlotError> {
        self.rx.recv_timeout(timeout).map_err(|e| match e {
            RecvTimeoutError::Timeout => SlotError::TimedOut,
            RecvTimeoutError::Disconnected => SlotError::Interrupted,
        })
    }

    /// Wait with an optional bound; `None` waits indefinitely.
    pub fn wait_for(self, timeout: Option<Duration>) -> Result<Outcome<T>, SlotError> {
        match timeout {
            Some(timeout) => self.wait_timeout(timeout),
            None => self.wait(),
        }
    }

    /// Take the outcome if it has already been posted.
    pub fn try_take(&self) -> Option<Outcome<T>> {
        self.rx.try_recv().ok()
    }
}
