// src/exec/gate.rs

//! Write-once synchronization points shared between a supervisor and the
//! code that launched it.
//!
//! A [`Gate`] starts empty and can be filled exactly once. Waiters block
//! with a bound and get `None` back if the gate is still empty when the
//! bound elapses, so "not yet" is distinguishable from an error.

use std::time::Duration;

use tokio::sync::watch;
use tokio::time::timeout;

#[derive(Debug)]
pub struct Gate<T> {
    slot: watch::Sender<Option<T>>,
}

impl<T: Clone> Gate<T> {
    pub fn new() -> Self {
        let (slot, _) = watch::channel(None);
        Self { slot }
    }

    /// Fill the gate and wake every waiter.
    ///
    /// Returns `false` (and drops `value`) if the gate was already filled.
    pub fn open(&self, value: T) -> bool {
        let mut value = Some(value);
        self.slot.send_if_modified(|slot| {
            if slot.is_some() {
                return false;
            }
            *slot = value.take();
            true
        })
    }

    pub fn is_open(&self) -> bool {
        self.slot.borrow().is_some()
    }

    /// Current value without waiting.
    pub fn peek(&self) -> Option<T> {
        self.slot.borrow().clone()
    }

    /// Wait up to `bound` for the gate to be filled.
    pub async fn wait(&self, bound: Duration) -> Option<T> {
        let mut rx = self.slot.subscribe();
        match timeout(bound, rx.wait_for(Option::is_some)).await {
            Ok(Ok(value)) => value.clone(),
            // The sender lives as long as `self`, so the channel cannot close
            // while we wait; only the bound can end the wait early.
            _ => None,
        }
    }
}

impl<T: Clone> Default for Gate<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Flips once the child process exists and any grace period has elapsed.
pub type ReadyGate = Gate<()>;
