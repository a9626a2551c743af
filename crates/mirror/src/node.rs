// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The zmir Authors

//! Per-path view of the mirrored tree.
//!
//! A [`Node`] is created lazily by [`Mirror::get`](crate::Mirror::get) and
//! lives until the mirror is closed; the remote node being deleted (and
//! revived) only changes the slot states, never the `Node` itself. Reads
//! block until the engine has heard from the server; writes go to the server
//! synchronously and then wait for the local cache to catch up, so a
//! successful write is immediately visible to local readers.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::debug;

use zmir_core::{Meta, Slot, SlotState, StoreError};

use crate::mirror::Core;

/// Default window writes wait for their own update to land locally.
pub(crate) const AWAIT_UPDATE: Duration = Duration::from_secs(5);

/// Value watcher: `Some((bytes, meta))` while the node lives, `None` on
/// deletion.
pub type ValueWatcher = Arc<dyn Fn(Option<(Vec<u8>, Meta)>) + Send + Sync>;

/// Children watcher: `Some(names)` while the node lives, `None` on deletion.
pub type ChildWatcher = Arc<dyn Fn(Option<Vec<String>>) + Send + Sync>;

/// Cheap-clone handle to one mirrored path.
#[derive(Clone)]
pub struct Node {
    pub(crate) inner: Arc<NodeInner>,
}

pub(crate) struct NodeInner {
    path: String,
    pub(crate) engine: Arc<Core>,
    value: Slot<(Vec<u8>, Meta)>,
    children: Slot<Vec<String>>,
    value_watchers: Mutex<HashMap<String, ValueWatcher>>,
    child_watchers: Mutex<HashMap<String, ChildWatcher>>,
}

impl Node {
    pub(crate) fn new(path: String, engine: Arc<Core>) -> Node {
        Node {
            inner: Arc::new(NodeInner {
                path,
                engine,
                value: Slot::new(),
                children: Slot::new(),
                value_watchers: Mutex::new(HashMap::new()),
                child_watchers: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Canonical path of this node.
    pub fn path(&self) -> &str {
        &self.inner.path
    }

    /// The stored bytes and their metadata.
    ///
    /// Fails with `NoNode` once the engine has learned the path is absent
    /// and with `Timeout` if nothing has been heard by the deadline. A
    /// timeout while the mirror is connected re-arms the read once — the
    /// initial callback may have been lost across a benign reconnect — and
    /// waits one more window before giving up.
    pub fn value(&self, timeout: Duration) -> Result<(Vec<u8>, Meta), StoreError> {
        match self.inner.value.wait(timeout) {
            Err(StoreError::Timeout(_)) if self.inner.engine.is_connected() => {
                debug!(path = %self.inner.path, "value wait timed out while connected; re-arming");
                Core::request_value(&self.inner.engine, &self.inner.path);
                self.inner.value.wait(timeout)
            }
            other => other,
        }
    }

    /// The ordered child names; failure modes as [`Node::value`].
    pub fn children(&self, timeout: Duration) -> Result<Vec<String>, StoreError> {
        match self.inner.children.wait(timeout) {
            Err(StoreError::Timeout(_)) if self.inner.engine.is_connected() => {
                debug!(path = %self.inner.path, "children wait timed out while connected; re-arming");
                Core::request_children(&self.inner.engine, &self.inner.path);
                self.inner.children.wait(timeout)
            }
            other => other,
        }
    }

    /// Create the backing node with the default ACL and no flags.
    ///
    /// Fails locally with `NodeExists` when the mirror already holds a live
    /// value for this path. After the server accepts, waits up to
    /// `await_update` for the local slot to see version 0 (or later).
    pub fn create(&self, value: &[u8], await_update: Duration) -> Result<(), StoreError> {
        if self.inner.value.peek().is_known() {
            return Err(StoreError::NodeExists);
        }
        self.inner.engine.sync_create(&self.inner.path, value, 0)?;
        self.wait_version(0, await_update)
    }

    /// Replace the stored bytes; `version` −1 forces. Waits for the local
    /// slot to reach the version the server assigned.
    pub fn set(&self, value: &[u8], version: i32) -> Result<Meta, StoreError> {
        let meta = self.inner.engine.sync_set(&self.inner.path, value, version)?;
        self.wait_version(meta.version, AWAIT_UPDATE)?;
        Ok(meta)
    }

    /// Delete the backing node; `version` −1 forces. Waits for the local
    /// slot to latch `Deleted`.
    pub fn delete(&self, version: i32) -> Result<(), StoreError> {
        self.inner.engine.sync_delete(&self.inner.path, version)?;
        self.wait_version(-1, AWAIT_UPDATE)
    }

    /// Wait for the mirrored value to reach `version`; −1 waits for
    /// deletion.
    fn wait_version(&self, version: i32, timeout: Duration) -> Result<(), StoreError> {
        self.inner.value.wait_for(timeout, |state| match state {
            SlotState::Deleted => version == -1,
            SlotState::Known((_, meta)) => meta.version >= version,
            SlotState::Unknown => false,
        })
    }

    /// Register a value watcher under `key`, replacing any previous watcher
    /// at that key. Watchers run on the mirror's task runner; a panicking
    /// watcher is caught and logged.
    pub fn add_value_watcher(&self, key: impl Into<String>, watcher: ValueWatcher) {
        self.inner.value_watchers.lock().insert(key.into(), watcher);
    }

    /// Remove the value watcher at `key`; unknown keys are ignored.
    pub fn del_value_watcher(&self, key: &str) {
        self.inner.value_watchers.lock().remove(key);
    }

    /// Register a children watcher under `key`; semantics as
    /// [`Node::add_value_watcher`].
    pub fn add_child_watcher(&self, key: impl Into<String>, watcher: ChildWatcher) {
        self.inner.child_watchers.lock().insert(key.into(), watcher);
    }

    /// Remove the children watcher at `key`; unknown keys are ignored.
    pub fn del_child_watcher(&self, key: &str) {
        self.inner.child_watchers.lock().remove(key);
    }

    // --- engine-side mutators, driven by dispatcher callbacks --------------

    /// Install a value observation; notifies watchers when the version moved
    /// (or the slot was not previously a live value).
    pub(crate) fn apply_value(&self, value: Vec<u8>, meta: Meta) {
        let changed = match self.inner.value.peek() {
            SlotState::Known((_, old)) => old.version != meta.version,
            SlotState::Unknown | SlotState::Deleted => true,
        };
        self.inner.value.set(Some((value.clone(), meta)));
        if changed {
            for watcher in self.value_watcher_snapshot() {
                let payload = (value.clone(), meta);
                self.inner.engine.run_user(move || watcher(Some(payload)));
            }
        }
    }

    /// Install a child-list observation; notifies watchers on structural
    /// change.
    pub(crate) fn apply_children(&self, children: Vec<String>) {
        let changed = match self.inner.children.peek() {
            SlotState::Known(old) => old != children,
            SlotState::Unknown | SlotState::Deleted => true,
        };
        self.inner.children.set(Some(children.clone()));
        if changed {
            for watcher in self.child_watcher_snapshot() {
                let payload = children.clone();
                self.inner.engine.run_user(move || watcher(Some(payload)));
            }
        }
    }

    /// Latch both slots `Deleted`. Edge-triggered: watchers hear `None` only
    /// when some slot previously held a live observation, so repeated
    /// deletions stay silent.
    pub(crate) fn apply_delete(&self) {
        let was_live =
            self.inner.value.peek().is_known() || self.inner.children.peek().is_known();
        self.inner.value.set(None);
        self.inner.children.set(None);
        if was_live {
            debug!(path = %self.inner.path, "node deleted; notifying watchers");
            for watcher in self.value_watcher_snapshot() {
                self.inner.engine.run_user(move || watcher(None));
            }
            for watcher in self.child_watcher_snapshot() {
                self.inner.engine.run_user(move || watcher(None));
            }
        }
    }

    fn value_watcher_snapshot(&self) -> Vec<ValueWatcher> {
        self.inner.value_watchers.lock().values().cloned().collect()
    }

    fn child_watcher_snapshot(&self) -> Vec<ChildWatcher> {
        self.inner.child_watchers.lock().values().cloned().collect()
    }
}

#[cfg(test)]
#[path = "node_tests.rs"]
mod tests;
