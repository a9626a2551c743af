// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The zmir Authors

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! zmir-store: the boundary to the coordination-store client library.
//!
//! The mirror engine consumes the [`StoreClient`] capability set and nothing
//! else from the underlying client. Completion callbacks and watchers run on
//! the client's dispatcher thread, whose receive loop stalls until the
//! callback returns; callers must keep dispatcher work non-blocking and must
//! not issue synchronous requests from inside it.

use std::fmt;
use std::sync::Arc;

use zmir_core::{Acl, EventKind, Meta, SessionState, StoreError};

#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeStore;

/// Identifier of one session opened through [`StoreClient::init`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

/// A watch or session event, delivered on the client's dispatcher thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchedEvent {
    /// Session the event belongs to. Events from superseded sessions carry
    /// the old id so receivers can discard them.
    pub session: SessionId,
    pub kind: EventKind,
    pub state: SessionState,
    /// Empty for session events.
    pub path: String,
}

/// Watcher installed by session setup and by asynchronous reads.
pub type WatchFn = Arc<dyn Fn(WatchedEvent) + Send + Sync>;

pub type DataResult = Result<(Vec<u8>, Meta), StoreError>;
pub type ChildrenResult = Result<Vec<String>, StoreError>;
pub type StatResult = Result<Meta, StoreError>;

/// Completion callback for [`StoreClient::aget`].
pub type DataCallback = Box<dyn FnOnce(DataResult) + Send>;
/// Completion callback for [`StoreClient::aget_children`].
pub type ChildrenCallback = Box<dyn FnOnce(ChildrenResult) + Send>;
/// Completion callback for [`StoreClient::aexists`].
pub type StatCallback = Box<dyn FnOnce(StatResult) + Send>;

/// Capability set the mirror engine consumes from the client library.
pub trait StoreClient: Send + Sync {
    /// Open a session. `watcher` receives session events and every watch
    /// event not bound to a specific request.
    fn init(&self, connstr: &str, watcher: WatchFn) -> Result<SessionId, StoreError>;

    /// End a session; its watches and ephemeral nodes die with it.
    fn close(&self, session: SessionId) -> Result<(), StoreError>;

    /// Asynchronous read. On success the service arms `watcher` (when given)
    /// for the next change to `path`; no watch is armed on failure.
    fn aget(
        &self,
        session: SessionId,
        path: &str,
        watcher: Option<WatchFn>,
        cb: DataCallback,
    ) -> Result<(), StoreError>;

    /// Asynchronous child-list read; watch semantics as [`StoreClient::aget`].
    fn aget_children(
        &self,
        session: SessionId,
        path: &str,
        watcher: Option<WatchFn>,
        cb: ChildrenCallback,
    ) -> Result<(), StoreError>;

    /// Asynchronous existence probe. Unlike the reads, `watcher` is armed
    /// even when the node is absent, firing on its creation.
    fn aexists(
        &self,
        session: SessionId,
        path: &str,
        watcher: Option<WatchFn>,
        cb: StatCallback,
    ) -> Result<(), StoreError>;

    /// Synchronous create. Returns the actual path, which differs from the
    /// requested one when `CREATE_SEQUENCE` is set.
    fn create(
        &self,
        session: SessionId,
        path: &str,
        value: &[u8],
        acl: &[Acl],
        flags: i32,
    ) -> Result<String, StoreError>;

    /// Synchronous set; `version` −1 skips the optimistic check.
    fn set(
        &self,
        session: SessionId,
        path: &str,
        value: &[u8],
        version: i32,
    ) -> Result<Meta, StoreError>;

    /// Synchronous delete; `version` −1 skips the optimistic check.
    fn delete(&self, session: SessionId, path: &str, version: i32) -> Result<(), StoreError>;
}

/// Names of the capability set, for the diagnostic CLI's `functions` listing.
pub const FUNCTION_TABLE: &[&str] =
    &["init", "close", "aget", "aget_children", "aexists", "create", "set", "delete"];
