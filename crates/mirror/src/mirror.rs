// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The zmir Authors

//! The mirror engine: session lifecycle, watch arming, pending replay.
//!
//! Three kinds of thread touch the engine. Application threads call the
//! public surface and may block on slot waits and synchronous store calls.
//! The client library's dispatcher thread delivers watch events and
//! completion callbacks; handlers on that thread only update slots and
//! issue asynchronous requests — synchronous store calls and user code are
//! forbidden there because the dispatcher's receive socket stalls until the
//! callback returns. User callbacks run on the single task-runner thread.
//!
//! Asynchronous requests that fail while the session is unusable are parked
//! on a pending list and replayed, newest first, on the next clean
//! reconnect. A session expiry instead tears down every watch, so the engine
//! reopens the session and re-arms every registered node from scratch.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Mutex, RwLock};
use tracing::{debug, warn};

use zmir_core::{
    normalize, parent, world_acl, EventKind, Meta, ServerProblem, SessionState, StoreError,
};
use zmir_store::{
    ChildrenResult, DataResult, SessionId, StatResult, StoreClient, WatchFn, WatchedEvent,
};

use crate::chroot::ChrootMirror;
use crate::json::JsonNode;
use crate::node::{Node, AWAIT_UPDATE};
use crate::runner::TaskRunner;

/// Default window for blocking reads.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Short local probe used by [`Mirror::ensure_exists`].
const ENSURE_PROBE: Duration = Duration::from_millis(100);

const DEFAULT_PORT: u16 = 2181;

/// Session-state watcher; receives every state transition.
pub type StateWatcher = Arc<dyn Fn(SessionState) + Send + Sync>;

/// An async request that failed while the session was unusable, kept for
/// replay.
pub(crate) enum Pending {
    Value(String),
    Children(String),
    Exists(String),
}

/// Client-side mirror of a coordination store.
///
/// Cheap to clone; all clones share one engine. [`Mirror::close`] is
/// mandatory — it stops the task runner and releases the node registry.
#[derive(Clone)]
pub struct Mirror {
    pub(crate) core: Arc<Core>,
}

pub(crate) struct Core {
    client: Arc<dyn StoreClient>,
    runner: TaskRunner,
    session: Mutex<Option<SessionId>>,
    connstr: Mutex<Option<String>>,
    state: Mutex<SessionState>,
    pub(crate) nodes: RwLock<HashMap<String, Node>>,
    pub(crate) missing: Mutex<HashSet<String>>,
    pub(crate) pending: Mutex<Vec<Pending>>,
    state_watchers: Mutex<HashMap<String, StateWatcher>>,
    disconnected_since: Mutex<Option<Instant>>,
    /// Serializes every call into the client library, which is not
    /// guaranteed reentrant-safe across threads.
    socket: Mutex<()>,
}

impl Mirror {
    /// Build a mirror over the given store client. No session is opened
    /// until [`Mirror::connect`].
    pub fn new(client: Arc<dyn StoreClient>) -> Mirror {
        Mirror {
            core: Arc::new(Core {
                client,
                runner: TaskRunner::new(),
                session: Mutex::new(None),
                connstr: Mutex::new(None),
                state: Mutex::new(SessionState::Unknown),
                nodes: RwLock::new(HashMap::new()),
                missing: Mutex::new(HashSet::new()),
                pending: Mutex::new(Vec::new()),
                state_watchers: Mutex::new(HashMap::new()),
                disconnected_since: Mutex::new(Some(Instant::now())),
                socket: Mutex::new(()),
            }),
        }
    }

    /// Open (or reopen) a session against `servers`, each `host[:port]`
    /// with port 2181 assumed; `localhost` alone when the list is empty.
    /// Idempotent and chainable.
    pub fn connect<S: AsRef<str>>(&self, servers: &[S]) -> Result<&Mirror, StoreError> {
        let mut parts: Vec<String> = servers.iter().map(|s| s.as_ref().to_string()).collect();
        if parts.is_empty() {
            parts.push("localhost".to_string());
        }
        let connstr = parts
            .iter()
            .map(|server| {
                if server.contains(':') {
                    server.clone()
                } else {
                    format!("{server}:{DEFAULT_PORT}")
                }
            })
            .collect::<Vec<_>>()
            .join(",");
        *self.core.connstr.lock() = Some(connstr);
        Core::reopen_session(&self.core)?;
        Ok(self)
    }

    /// The node at `path`, created and armed on first request. The same
    /// `Node` is returned for a path for the life of the mirror.
    pub fn get(&self, path: &str) -> Node {
        Core::get(&self.core, path)
    }

    /// JSON view of [`Mirror::get`].
    pub fn get_json(&self, path: &str) -> JsonNode {
        JsonNode::new(self.get(path))
    }

    /// Create `path`. Zero `flags` goes through [`Node::create`] with its
    /// local fast-fail; with `CREATE_EPHEMERAL`/`CREATE_SEQUENCE` set the
    /// create is issued directly and the returned node follows the actual
    /// path the server chose.
    pub fn create(&self, path: &str, value: &[u8], flags: i32) -> Result<Node, StoreError> {
        Core::create(&self.core, path, value, flags)
    }

    /// Create every missing node up to `path`, then `path` itself.
    pub fn create_r(&self, path: &str, value: &[u8]) -> Result<Node, StoreError> {
        let path = normalize(path);
        if let Some(parent_path) = parent(&path) {
            if parent_path != "/" {
                self.ensure_exists(&parent_path, b"")?;
            }
        }
        self.create(&path, value, 0)
    }

    /// Best-effort idempotent create: a short local probe, then a create
    /// that tolerates concurrent creators and recursively builds missing
    /// parents.
    pub fn ensure_exists(&self, path: &str, value: &[u8]) -> Result<Node, StoreError> {
        Core::ensure_exists(&self.core, path, value)
    }

    /// JSON view of [`Mirror::create`] with no flags.
    pub fn create_json(&self, path: &str, value: &serde_json::Value) -> Result<JsonNode, StoreError> {
        let bytes = encode_json(value)?;
        Ok(JsonNode::new(self.create(path, &bytes, 0)?))
    }

    /// JSON view of [`Mirror::create_r`].
    pub fn create_r_json(
        &self,
        path: &str,
        value: &serde_json::Value,
    ) -> Result<JsonNode, StoreError> {
        let bytes = encode_json(value)?;
        Ok(JsonNode::new(self.create_r(path, &bytes)?))
    }

    /// A façade treating `prefix` as the visible root.
    pub fn chroot(&self, prefix: &str) -> ChrootMirror {
        ChrootMirror::new(prefix, self.clone())
    }

    /// Subscribe to session-state transitions under `key`, replacing any
    /// previous watcher at that key. The callback runs on the task runner.
    pub fn add_state_watcher(&self, key: impl Into<String>, watcher: StateWatcher) {
        self.core.state_watchers.lock().insert(key.into(), watcher);
    }

    /// Remove the state watcher at `key`; unknown keys are ignored.
    pub fn del_state_watcher(&self, key: &str) {
        self.core.state_watchers.lock().remove(key);
    }

    /// Whether the session currently looks healthy.
    pub fn is_connected(&self) -> bool {
        self.core.is_connected()
    }

    /// How long the session has looked unhealthy; `None` while connected.
    pub fn time_disconnected(&self) -> Option<Duration> {
        self.core.disconnected_since.lock().map(|since| since.elapsed())
    }

    /// Stop the task runner, close the session, and drop cached state.
    /// Mandatory before dropping the mirror; idempotent.
    pub fn close(&self) {
        self.core.runner.stop();
        let session = self.core.session.lock().take();
        if let Some(session) = session {
            let _socket = self.core.socket.lock();
            let _ = self.core.client.close(session);
        }
        *self.core.connstr.lock() = None;
        let mut since = self.core.disconnected_since.lock();
        if since.is_none() {
            *since = Some(Instant::now());
        }
        drop(since);
        self.core.nodes.write().clear();
        self.core.missing.lock().clear();
        self.core.pending.lock().clear();
    }
}

impl Core {
    fn session_id(&self) -> Option<SessionId> {
        *self.session.lock()
    }

    pub(crate) fn is_connected(&self) -> bool {
        self.disconnected_since.lock().is_none()
    }

    /// Hand a task to the user-callback thread.
    pub(crate) fn run_user(&self, f: impl FnOnce() + Send + 'static) {
        self.runner.submit(f);
    }

    fn session_watcher(core: &Arc<Core>) -> WatchFn {
        let weak = Arc::downgrade(core);
        Arc::new(move |event| {
            if let Some(core) = weak.upgrade() {
                Core::handle_event(&core, event);
            }
        })
    }

    /// Open a fresh session, replacing (and closing) any previous one.
    fn reopen_session(core: &Arc<Core>) -> Result<(), StoreError> {
        let connstr =
            core.connstr.lock().clone().ok_or(ServerProblem::InvalidState)?;
        let watcher = Core::session_watcher(core);
        let fresh = {
            let _socket = core.socket.lock();
            core.client.init(&connstr, watcher)?
        };
        let stale = core.session.lock().replace(fresh);
        if let Some(stale) = stale {
            let _socket = core.socket.lock();
            let _ = core.client.close(stale);
        }
        debug!(session = %fresh, "opened session");
        Ok(())
    }

    fn get(core: &Arc<Core>, path: &str) -> Node {
        let path = normalize(path);
        if let Some(node) = core.nodes.read().get(&path) {
            return node.clone();
        }
        let node = {
            let mut nodes = core.nodes.write();
            if let Some(node) = nodes.get(&path) {
                return node.clone();
            }
            let node = Node::new(path.clone(), Arc::clone(core));
            nodes.insert(path, node.clone());
            node
        };
        Core::setup(core, &node);
        node
    }

    /// Arm the initial value and children watches for a registered node.
    fn setup(core: &Arc<Core>, node: &Node) {
        debug!(path = node.path(), "arming value and children watches");
        Core::request_value(core, node.path());
        Core::request_children(core, node.path());
    }

    /// Issue an async get; parked for replay if the link is unusable.
    pub(crate) fn request_value(core: &Arc<Core>, path: &str) {
        let Some(session) = core.session_id() else {
            core.pending.lock().push(Pending::Value(path.to_string()));
            return;
        };
        let weak = Arc::downgrade(core);
        let cb_path = path.to_string();
        let issued = {
            let _socket = core.socket.lock();
            core.client.aget(
                session,
                path,
                Some(Core::session_watcher(core)),
                Box::new(move |result: DataResult| {
                    if let Some(core) = weak.upgrade() {
                        Core::on_value(&core, &cb_path, result);
                    }
                }),
            )
        };
        if let Err(err) = issued {
            debug!(path, %err, "get failed to issue; parked for replay");
            core.pending.lock().push(Pending::Value(path.to_string()));
        }
    }

    /// Issue an async get-children; parked for replay if the link is
    /// unusable.
    pub(crate) fn request_children(core: &Arc<Core>, path: &str) {
        let Some(session) = core.session_id() else {
            core.pending.lock().push(Pending::Children(path.to_string()));
            return;
        };
        let weak = Arc::downgrade(core);
        let cb_path = path.to_string();
        let issued = {
            let _socket = core.socket.lock();
            core.client.aget_children(
                session,
                path,
                Some(Core::session_watcher(core)),
                Box::new(move |result: ChildrenResult| {
                    if let Some(core) = weak.upgrade() {
                        Core::on_children(&core, &cb_path, result);
                    }
                }),
            )
        };
        if let Err(err) = issued {
            debug!(path, %err, "get-children failed to issue; parked for replay");
            core.pending.lock().push(Pending::Children(path.to_string()));
        }
    }

    /// Arm an existence watch for an absent path. The missing set
    /// de-duplicates arming: only the first arm installs the watcher, so a
    /// single existence event fires per absence.
    fn request_exists(core: &Arc<Core>, path: &str) {
        let first = core.missing.lock().insert(path.to_string());
        let watcher = if first { Some(Core::session_watcher(core)) } else { None };
        let Some(session) = core.session_id() else {
            core.missing.lock().remove(path);
            core.pending.lock().push(Pending::Exists(path.to_string()));
            return;
        };
        let weak = Arc::downgrade(core);
        let cb_path = path.to_string();
        let issued = {
            let _socket = core.socket.lock();
            core.client.aexists(
                session,
                path,
                watcher,
                Box::new(move |result: StatResult| {
                    if let Some(core) = weak.upgrade() {
                        Core::on_exists(&core, &cb_path, result);
                    }
                }),
            )
        };
        if let Err(err) = issued {
            debug!(path, %err, "exists failed to issue; parked for replay");
            core.missing.lock().remove(path);
            core.pending.lock().push(Pending::Exists(path.to_string()));
        }
    }

    fn on_value(core: &Arc<Core>, path: &str, result: DataResult) {
        let Some(node) = core.nodes.read().get(path).cloned() else { return };
        match result {
            Ok((value, meta)) => node.apply_value(value, meta),
            Err(StoreError::NoNode) => {
                // The get's watch never armed; hold an existence watch
                // instead.
                node.apply_delete();
                Core::request_exists(core, path);
            }
            Err(err) => {
                debug!(path, %err, "get failed; parked for replay");
                core.pending.lock().push(Pending::Value(path.to_string()));
            }
        }
    }

    fn on_children(core: &Arc<Core>, path: &str, result: ChildrenResult) {
        let Some(node) = core.nodes.read().get(path).cloned() else { return };
        match result {
            Ok(children) => node.apply_children(children),
            Err(StoreError::NoNode) => {
                node.apply_delete();
                Core::request_exists(core, path);
            }
            Err(err) => {
                debug!(path, %err, "get-children failed; parked for replay");
                core.pending.lock().push(Pending::Children(path.to_string()));
            }
        }
    }

    fn on_exists(core: &Arc<Core>, path: &str, result: StatResult) {
        match result {
            Ok(_) => {
                // Came into existence while the probe was in flight.
                core.missing.lock().remove(path);
                Core::request_value(core, path);
                Core::request_children(core, path);
            }
            // Absent is the expected steady state; the watch is armed.
            Err(StoreError::NoNode) => {}
            Err(err) => {
                // Drop out of the missing set so the replay re-installs the
                // watcher.
                debug!(path, %err, "exists failed; parked for replay");
                core.missing.lock().remove(path);
                core.pending.lock().push(Pending::Exists(path.to_string()));
            }
        }
    }

    /// Entry point for everything the dispatcher thread delivers.
    fn handle_event(core: &Arc<Core>, event: WatchedEvent) {
        match event.kind {
            EventKind::Changed => Core::request_value(core, &event.path),
            EventKind::Child => Core::request_children(core, &event.path),
            EventKind::Created => {
                core.missing.lock().remove(&event.path);
                Core::request_value(core, &event.path);
                Core::request_children(core, &event.path);
            }
            EventKind::Deleted => {
                let node = core.nodes.read().get(&event.path).cloned();
                if let Some(node) = node {
                    node.apply_delete();
                    Core::request_exists(core, &event.path);
                }
            }
            EventKind::Session => Core::handle_session(core, event),
            EventKind::NotWatching => {
                debug!(path = %event.path, "server dropped a watch");
            }
        }
    }

    fn handle_session(core: &Arc<Core>, event: WatchedEvent) {
        if core.session_id() != Some(event.session) {
            debug!(session = %event.session, "ignoring event from a superseded session");
            return;
        }
        let state = event.state;

        let watchers: Vec<StateWatcher> = core.state_watchers.lock().values().cloned().collect();
        for watcher in watchers {
            core.run_user(move || watcher(state));
        }

        if state == SessionState::Connected {
            *core.disconnected_since.lock() = None;
        } else {
            let mut since = core.disconnected_since.lock();
            if since.is_none() {
                *since = Some(Instant::now());
            }
        }

        let previous = *core.state.lock();
        if state == SessionState::ExpiredSession {
            // Every watch died with the session; open a fresh one.
            if let Err(err) = Core::reopen_session(core) {
                warn!(%err, "session reopen failed");
            }
        } else if state == SessionState::Connected {
            if previous == SessionState::ExpiredSession {
                Core::rebuild(core);
            } else {
                Core::replay_pending(core);
            }
        }
        *core.state.lock() = state;
        debug!(state = %state, "session state");
    }

    /// After expiry and reopen: every registered node re-arms from scratch.
    fn rebuild(core: &Arc<Core>) {
        let nodes: Vec<Node> = core.nodes.read().values().cloned().collect();
        debug!(count = nodes.len(), "re-arming every watch after session rebuild");
        // Stale missing entries would suppress watcher installation on the
        // fresh session.
        core.missing.lock().clear();
        for node in nodes {
            Core::setup(core, &node);
        }
    }

    /// Replay requests parked while the link was down, newest first. The
    /// list is swapped out first so re-failures park again without looping.
    fn replay_pending(core: &Arc<Core>) {
        let parked = std::mem::take(&mut *core.pending.lock());
        debug!(count = parked.len(), "replaying parked requests");
        for request in parked.into_iter().rev() {
            match request {
                Pending::Value(path) => Core::request_value(core, &path),
                Pending::Children(path) => Core::request_children(core, &path),
                Pending::Exists(path) => Core::request_exists(core, &path),
            }
        }
    }

    // --- synchronous store calls (application threads only) ----------------

    pub(crate) fn sync_create(
        &self,
        path: &str,
        value: &[u8],
        flags: i32,
    ) -> Result<String, StoreError> {
        let session = self.session_id().ok_or(ServerProblem::InvalidState)?;
        let _socket = self.socket.lock();
        self.client.create(session, path, value, &world_acl(), flags)
    }

    pub(crate) fn sync_set(
        &self,
        path: &str,
        value: &[u8],
        version: i32,
    ) -> Result<Meta, StoreError> {
        let session = self.session_id().ok_or(ServerProblem::InvalidState)?;
        let _socket = self.socket.lock();
        self.client.set(session, path, value, version)
    }

    pub(crate) fn sync_delete(&self, path: &str, version: i32) -> Result<(), StoreError> {
        let session = self.session_id().ok_or(ServerProblem::InvalidState)?;
        let _socket = self.socket.lock();
        self.client.delete(session, path, version)
    }

    fn create(core: &Arc<Core>, path: &str, value: &[u8], flags: i32) -> Result<Node, StoreError> {
        let path = normalize(path);
        if flags == 0 {
            let node = Core::get(core, &path);
            node.create(value, AWAIT_UPDATE)?;
            return Ok(node);
        }
        let actual = core.sync_create(&path, value, flags)?;
        Ok(Core::get(core, &actual))
    }

    fn ensure_exists(core: &Arc<Core>, path: &str, value: &[u8]) -> Result<Node, StoreError> {
        let path = normalize(path);
        let node = Core::get(core, &path);
        match node.value(ENSURE_PROBE) {
            Ok(_) => Ok(node),
            Err(StoreError::NoNode) | Err(StoreError::Timeout(_)) => {
                match node.create(value, AWAIT_UPDATE) {
                    Ok(()) | Err(StoreError::NodeExists) => Ok(node),
                    Err(StoreError::NoNode) => {
                        // Parent chain missing; build it, then retry.
                        if let Some(parent_path) = parent(&path) {
                            Core::ensure_exists(core, &parent_path, b"")?;
                        }
                        Core::ensure_exists(core, &path, value)
                    }
                    Err(err) => Err(err),
                }
            }
            Err(err) => Err(err),
        }
    }

    #[cfg(test)]
    pub(crate) fn drain_user_tasks(&self) {
        self.runner.flush();
    }
}

fn encode_json(value: &serde_json::Value) -> Result<Vec<u8>, StoreError> {
    serde_json::to_vec(value).map_err(|err| {
        warn!(%err, "failed to encode JSON payload");
        ServerProblem::ApiError.into()
    })
}

#[cfg(test)]
#[path = "mirror_tests.rs"]
mod tests;
