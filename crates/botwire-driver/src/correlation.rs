//! Correlation of API responses with waiting callers.

use std::collections::HashMap;

use parking_lot::Mutex;
use tokio::sync::oneshot;

use botwire_protocols::ApiResponse;

/// Maps each outstanding echo to the channel its caller waits on.
///
/// An entry is removed in the same critical section that looks it up, so a
/// response is delivered at most once. Dropping a sender closes the channel,
/// which the waiting caller sees as a broken pipe.
#[derive(Default)]
pub struct PendingCalls {
    waiters: Mutex<HashMap<u64, oneshot::Sender<ApiResponse>>>,
}

impl PendingCalls {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a waiter for `echo`.
    pub fn allocate(&self, echo: u64) -> oneshot::Receiver<ApiResponse> {
        let (tx, rx) = oneshot::channel();
        self.waiters.lock().insert(echo, tx);
        rx
    }

    /// Hand `response` to the waiter for `echo`.
    ///
    /// Returns false when nobody waits for it, e.g. after a timeout.
    pub fn deliver(&self, echo: u64, response: ApiResponse) -> bool {
        let waiter = self.waiters.lock().remove(&echo);
        match waiter {
            Some(tx) => tx.send(response).is_ok(),
            None => false,
        }
    }

    /// Forget the waiter for `echo`.
    pub fn remove(&self, echo: u64) -> bool {
        self.waiters.lock().remove(&echo).is_some()
    }

    /// Close every pending channel. Returns how many were closed.
    pub fn drop_all(&self) -> usize {
        let drained: Vec<_> = self.waiters.lock().drain().collect();
        drained.len()
    }

    pub fn len(&self) -> usize {
        self.waiters.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.waiters.lock().is_empty()
    }
}
