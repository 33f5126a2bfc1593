//! Request Context
//!
//! Context carried from the handler into every storage call.
//! Contains the request id, an optional deadline and a cancellation signal.

use std::time::{Duration, Instant};

use tokio::sync::watch;
use uuid::Uuid;

use super::storer::{StorageError, StorageResult};

/// Context carried through one request
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Request ID for tracing
    pub request_id: Uuid,

    /// Point after which storage work is abandoned
    deadline: Option<Instant>,

    /// Flips to `true` when the caller gives up
    cancel: watch::Receiver<bool>,

    /// Start time for duration tracking
    started_at: Instant,
}

/// Cancels the [`RequestContext`] it was created with
#[derive(Debug)]
pub struct CancelHandle(watch::Sender<bool>);

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.send_replace(true);
    }
}

impl RequestContext {
    /// Create a context that can never be cancelled
    pub fn new() -> Self {
        let (_, cancel) = watch::channel(false);
        Self::with_receiver(cancel)
    }

    /// Create a context together with the handle that cancels it
    pub fn cancellable() -> (Self, CancelHandle) {
        let (tx, rx) = watch::channel(false);
        (Self::with_receiver(rx), CancelHandle(tx))
    }

    fn with_receiver(cancel: watch::Receiver<bool>) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            deadline: None,
            cancel,
            started_at: Instant::now(),
        }
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        let deadline = Instant::now() + timeout;
        self.with_deadline(deadline)
    }

    pub fn is_cancelled(&self) -> bool {
        *self.cancel.borrow()
    }

    /// Get elapsed time in milliseconds
    pub fn elapsed_ms(&self) -> u128 {
        self.started_at.elapsed().as_millis()
    }

    /// Fails once the request was cancelled or its deadline passed.
    ///
    /// Storers call this before starting work and between items of bulk work.
    pub fn check(&self) -> StorageResult<()> {
        if self.is_cancelled() {
            return Err(StorageError::Canceled);
        }
        if self.deadline.is_some_and(|d| Instant::now() >= d) {
            return Err(StorageError::DeadlineExceeded);
        }
        Ok(())
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}
