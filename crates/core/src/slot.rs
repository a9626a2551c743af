// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The zmir Authors

//! Latching three-state cell for mirrored data.
//!
//! A slot starts out `Unknown`, and latches once the engine reports either a
//! value (`Known`) or the absence of the backing node (`Deleted`); it never
//! returns to `Unknown`. The engine is the only writer; application threads
//! read, blocking with a deadline while the slot is still `Unknown`.

use crate::error::StoreError;
use parking_lot::{Condvar, Mutex};
use std::time::{Duration, Instant};

/// Observable state of a [`Slot`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotState<T> {
    /// The engine has not reported anything for this slot yet.
    Unknown,
    /// The engine reported that the backing node does not exist.
    Deleted,
    /// The engine reported a live value.
    Known(T),
}

impl<T> SlotState<T> {
    pub fn is_known(&self) -> bool {
        matches!(self, SlotState::Known(_))
    }
}

/// Three-state cell written by the engine and read by application threads.
///
/// Writers never block; readers wait on a condvar until the deadline.
pub struct Slot<T> {
    state: Mutex<SlotState<T>>,
    changed: Condvar,
}

impl<T: Clone> Slot<T> {
    pub fn new() -> Self {
        Self { state: Mutex::new(SlotState::Unknown), changed: Condvar::new() }
    }

    /// Install a new observation. `Some` latches `Known`, `None` latches
    /// `Deleted`. Wakes every waiter.
    pub fn set(&self, value: Option<T>) {
        let mut state = self.state.lock();
        *state = match value {
            Some(v) => SlotState::Known(v),
            None => SlotState::Deleted,
        };
        self.changed.notify_all();
    }

    /// Snapshot of the current state; never blocks on a writer.
    pub fn peek(&self) -> SlotState<T> {
        self.state.lock().clone()
    }

    /// Wait for a live value.
    ///
    /// Fails with `NoNode` once the slot reports `Deleted`, and with
    /// `Timeout` if it is still `Unknown` at the deadline.
    pub fn wait(&self, timeout: Duration) -> Result<T, StoreError> {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock();
        loop {
            match &*state {
                SlotState::Known(v) => return Ok(v.clone()),
                SlotState::Deleted => return Err(StoreError::NoNode),
                SlotState::Unknown => {}
            }
            if self.changed.wait_until(&mut state, deadline).timed_out() {
                // One final look: a writer may have landed at the deadline.
                return match &*state {
                    SlotState::Known(v) => Ok(v.clone()),
                    SlotState::Deleted => Err(StoreError::NoNode),
                    SlotState::Unknown => Err(StoreError::Timeout(timeout)),
                };
            }
        }
    }

    /// Wait until `accept` approves the current state.
    ///
    /// Unlike [`Slot::wait`] this does not fail on `Deleted`: the predicate
    /// sees every state, which lets callers treat deletion as the success
    /// condition (version waits encode deletion as version −1).
    pub fn wait_for(
        &self,
        timeout: Duration,
        accept: impl Fn(&SlotState<T>) -> bool,
    ) -> Result<(), StoreError> {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock();
        loop {
            if accept(&state) {
                return Ok(());
            }
            if self.changed.wait_until(&mut state, deadline).timed_out() {
                return if accept(&state) { Ok(()) } else { Err(StoreError::Timeout(timeout)) };
            }
        }
    }
}

impl<T: Clone> Default for Slot<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "slot_tests.rs"]
mod tests;
