// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The zmir Authors

//! In-memory coordination store for tests and the demo.
//!
//! Implements [`StoreClient`] over a versioned path map with one-shot data,
//! child, and existence watches. All completion callbacks and watch events
//! are delivered on one dispatcher thread, in submission order, and that
//! thread stalls while a callback runs — the same discipline the real
//! client library imposes.
//!
//! Extra controls drive the failure modes the engine must survive:
//! [`FakeStore::disconnect`] / [`FakeStore::reconnect`] for a benign outage,
//! [`FakeStore::expire`] for full session loss, and `seed` / `server_set` /
//! `server_delete` playing the part of another process.

use std::collections::HashMap;
use std::sync::mpsc::{self, Sender};
use std::thread;
use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;
use tracing::debug;

use zmir_core::{
    normalize, parent, world_acl, Acl, EventKind, Meta, ServerProblem, SessionState, StoreError,
    CREATE_EPHEMERAL, CREATE_SEQUENCE,
};

use crate::{
    ChildrenCallback, DataCallback, SessionId, StatCallback, StoreClient, WatchFn, WatchedEvent,
};

enum Job {
    Run(Box<dyn FnOnce() + Send>),
    Barrier(Sender<()>),
    Stop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Registry {
    Data,
    Child,
    Exist,
}

struct SessionRec {
    watcher: WatchFn,
    alive: bool,
}

struct NodeRec {
    value: Vec<u8>,
    acl: Vec<Acl>,
    ctime: i64,
    mtime: i64,
    version: i32,
    cversion: i32,
    aversion: i32,
    /// Counter stamped onto sequential children.
    seq: i32,
    /// Owning session for ephemeral nodes.
    owner: Option<SessionId>,
}

struct State {
    connected: bool,
    connstr: Option<String>,
    next_session: u64,
    sessions: HashMap<SessionId, SessionRec>,
    nodes: HashMap<String, NodeRec>,
    watches: HashMap<(Registry, String), Vec<(SessionId, WatchFn)>>,
}

/// In-memory [`StoreClient`] with a serial dispatcher thread.
pub struct FakeStore {
    state: Mutex<State>,
    queue: Mutex<Sender<Job>>,
}

impl FakeStore {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel::<Job>();
        thread::spawn(move || {
            while let Ok(job) = rx.recv() {
                match job {
                    Job::Run(f) => f(),
                    Job::Barrier(done) => {
                        let _ = done.send(());
                    }
                    Job::Stop => break,
                }
            }
        });

        let mut nodes = HashMap::new();
        nodes.insert("/".to_string(), blank_node(epoch_ms()));
        FakeStore {
            state: Mutex::new(State {
                connected: true,
                connstr: None,
                next_session: 1,
                sessions: HashMap::new(),
                nodes,
                watches: HashMap::new(),
            }),
            queue: Mutex::new(tx),
        }
    }

    fn run(&self, f: impl FnOnce() + Send + 'static) {
        let _ = self.queue.lock().send(Job::Run(Box::new(f)));
    }

    /// Block until the dispatcher has drained everything submitted so far.
    /// Must not be called from a callback.
    pub fn flush(&self) {
        let (tx, rx) = mpsc::channel();
        let _ = self.queue.lock().send(Job::Barrier(tx));
        let _ = rx.recv();
    }

    // --- test controls -----------------------------------------------------

    /// Sever the link: subsequent requests fail with `ConnectionLoss` and
    /// every live session hears `Connecting`.
    pub fn disconnect(&self) {
        let mut st = self.state.lock();
        st.connected = false;
        self.broadcast(&st, SessionState::Connecting);
    }

    /// Restore the link and tell every live session `Connected`.
    pub fn reconnect(&self) {
        let mut st = self.state.lock();
        st.connected = true;
        self.broadcast(&st, SessionState::Connected);
    }

    /// Expire every live session: its watches and ephemeral nodes die and it
    /// hears `ExpiredSession`. The session id stays known so later requests
    /// on it fail with `SessionExpired`.
    pub fn expire(&self) {
        let mut st = self.state.lock();
        let ids: Vec<SessionId> =
            st.sessions.iter().filter(|(_, s)| s.alive).map(|(id, _)| *id).collect();
        for id in &ids {
            if let Some(rec) = st.sessions.get_mut(id) {
                rec.alive = false;
            }
            prune_watches(&mut st, *id);
        }
        for id in &ids {
            self.reap_ephemerals(&mut st, *id);
        }
        for id in ids {
            debug!(%id, "expiring session");
            if let Some(rec) = st.sessions.get(&id) {
                let watcher = rec.watcher.clone();
                let event = WatchedEvent {
                    session: id,
                    kind: EventKind::Session,
                    state: SessionState::ExpiredSession,
                    path: String::new(),
                };
                self.run(move || watcher(event));
            }
        }
    }

    /// Server-side create by "another process"; missing parents are created.
    pub fn seed(&self, path: &str, value: &[u8]) {
        let mut st = self.state.lock();
        let path = normalize(path);
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let mut current = String::new();
        for (idx, segment) in segments.iter().enumerate() {
            current.push('/');
            current.push_str(segment);
            if st.nodes.contains_key(&current) {
                continue;
            }
            let val: &[u8] = if idx + 1 == segments.len() { value } else { b"" };
            let _ = self.create_locked(&mut st, &current, val, &world_acl(), 0, None);
        }
    }

    /// Server-side forced set.
    pub fn server_set(&self, path: &str, value: &[u8]) -> Result<Meta, StoreError> {
        let mut st = self.state.lock();
        self.set_locked(&mut st, path, value, -1)
    }

    /// Server-side forced delete.
    pub fn server_delete(&self, path: &str) -> Result<(), StoreError> {
        let mut st = self.state.lock();
        self.delete_locked(&mut st, path, -1)
    }

    // --- test probes -------------------------------------------------------

    pub fn connstr(&self) -> Option<String> {
        self.state.lock().connstr.clone()
    }

    pub fn has_node(&self, path: &str) -> bool {
        self.state.lock().nodes.contains_key(&normalize(path))
    }

    pub fn node_version(&self, path: &str) -> Option<i32> {
        self.state.lock().nodes.get(&normalize(path)).map(|n| n.version)
    }

    pub fn value_of(&self, path: &str) -> Option<Vec<u8>> {
        self.state.lock().nodes.get(&normalize(path)).map(|n| n.value.clone())
    }

    // --- internals ---------------------------------------------------------

    fn broadcast(&self, st: &State, state: SessionState) {
        for (id, rec) in st.sessions.iter().filter(|(_, s)| s.alive) {
            let id = *id;
            let watcher = rec.watcher.clone();
            let event = WatchedEvent {
                session: id,
                kind: EventKind::Session,
                state,
                path: String::new(),
            };
            self.run(move || watcher(event));
        }
    }

    /// Pop and deliver every watch armed on `path` in `registry`.
    fn fire(&self, st: &mut State, registry: Registry, path: &str, kind: EventKind) {
        let Some(entries) = st.watches.remove(&(registry, path.to_string())) else {
            return;
        };
        let state =
            if st.connected { SessionState::Connected } else { SessionState::Connecting };
        for (session, watcher) in entries {
            if !st.sessions.get(&session).map(|s| s.alive).unwrap_or(false) {
                continue;
            }
            let event =
                WatchedEvent { session, kind, state, path: path.to_string() };
            debug!(path = %event.path, kind = %event.kind, "firing watch");
            self.run(move || watcher(event));
        }
    }

    fn reap_ephemerals(&self, st: &mut State, session: SessionId) {
        let owned: Vec<String> = st
            .nodes
            .iter()
            .filter(|(_, n)| n.owner == Some(session))
            .map(|(p, _)| p.clone())
            .collect();
        for path in owned {
            let _ = self.delete_locked(st, &path, -1);
        }
    }

    fn create_locked(
        &self,
        st: &mut State,
        path: &str,
        value: &[u8],
        acl: &[Acl],
        flags: i32,
        owner: Option<SessionId>,
    ) -> Result<String, StoreError> {
        let path = normalize(path);
        if path == "/" {
            return Err(StoreError::NodeExists);
        }
        let parent_path = parent(&path).ok_or(StoreError::NoNode)?;
        if !st.nodes.contains_key(&parent_path) {
            return Err(StoreError::NoNode);
        }

        let actual = if flags & CREATE_SEQUENCE != 0 {
            let counter = match st.nodes.get_mut(&parent_path) {
                Some(p) => {
                    let n = p.seq;
                    p.seq += 1;
                    n
                }
                None => 0,
            };
            format!("{path}{counter:010}")
        } else {
            path.clone()
        };
        if st.nodes.contains_key(&actual) {
            return Err(StoreError::NodeExists);
        }

        let now = epoch_ms();
        let mut node = blank_node(now);
        node.value = value.to_vec();
        node.acl = acl.to_vec();
        if flags & CREATE_EPHEMERAL != 0 {
            node.owner = owner;
        }
        st.nodes.insert(actual.clone(), node);
        if let Some(p) = st.nodes.get_mut(&parent_path) {
            p.cversion += 1;
        }

        self.fire(st, Registry::Exist, &actual, EventKind::Created);
        self.fire(st, Registry::Child, &parent_path, EventKind::Child);
        Ok(actual)
    }

    fn set_locked(
        &self,
        st: &mut State,
        path: &str,
        value: &[u8],
        version: i32,
    ) -> Result<Meta, StoreError> {
        let path = normalize(path);
        {
            let node = st.nodes.get_mut(&path).ok_or(StoreError::NoNode)?;
            if version != -1 && version != node.version {
                return Err(StoreError::BadVersion);
            }
            node.value = value.to_vec();
            node.version += 1;
            node.mtime = epoch_ms();
        }
        self.fire(st, Registry::Data, &path, EventKind::Changed);
        self.fire(st, Registry::Exist, &path, EventKind::Changed);
        meta_of(&st.nodes, &path).ok_or_else(|| ServerProblem::SystemError.into())
    }

    fn delete_locked(
        &self,
        st: &mut State,
        path: &str,
        version: i32,
    ) -> Result<(), StoreError> {
        let path = normalize(path);
        if path == "/" {
            return Err(ServerProblem::ApiError.into());
        }
        let current = st.nodes.get(&path).map(|n| n.version).ok_or(StoreError::NoNode)?;
        if version != -1 && version != current {
            return Err(StoreError::BadVersion);
        }
        if !children_of(&st.nodes, &path).is_empty() {
            return Err(StoreError::NotEmpty);
        }

        st.nodes.remove(&path);
        self.fire(st, Registry::Data, &path, EventKind::Deleted);
        self.fire(st, Registry::Exist, &path, EventKind::Deleted);
        self.fire(st, Registry::Child, &path, EventKind::Deleted);
        if let Some(parent_path) = parent(&path) {
            if let Some(p) = st.nodes.get_mut(&parent_path) {
                p.cversion += 1;
            }
            self.fire(st, Registry::Child, &parent_path, EventKind::Child);
        }
        Ok(())
    }
}

impl Default for FakeStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for FakeStore {
    fn drop(&mut self) {
        let _ = self.queue.lock().send(Job::Stop);
    }
}

impl StoreClient for FakeStore {
    fn init(&self, connstr: &str, watcher: WatchFn) -> Result<SessionId, StoreError> {
        if connstr.is_empty() {
            return Err(ServerProblem::SystemError.into());
        }
        let mut st = self.state.lock();
        st.connstr = Some(connstr.to_string());
        let id = SessionId(st.next_session);
        st.next_session += 1;
        st.sessions.insert(id, SessionRec { watcher: watcher.clone(), alive: true });
        if st.connected {
            self.run(move || {
                watcher(WatchedEvent {
                    session: id,
                    kind: EventKind::Session,
                    state: SessionState::Connected,
                    path: String::new(),
                })
            });
        }
        Ok(id)
    }

    fn close(&self, session: SessionId) -> Result<(), StoreError> {
        let mut st = self.state.lock();
        if st.sessions.remove(&session).is_none() {
            return Err(ServerProblem::InvalidState.into());
        }
        prune_watches(&mut st, session);
        self.reap_ephemerals(&mut st, session);
        Ok(())
    }

    fn aget(
        &self,
        session: SessionId,
        path: &str,
        watcher: Option<WatchFn>,
        cb: DataCallback,
    ) -> Result<(), StoreError> {
        let mut st = self.state.lock();
        check_session(&st, session)?;
        let path = normalize(path);
        let result = match meta_of(&st.nodes, &path) {
            Some(meta) => {
                if let Some(w) = watcher {
                    arm(&mut st, Registry::Data, &path, session, w);
                }
                let value = st.nodes.get(&path).map(|n| n.value.clone()).unwrap_or_default();
                Ok((value, meta))
            }
            None => Err(StoreError::NoNode),
        };
        self.run(move || cb(result));
        Ok(())
    }

    fn aget_children(
        &self,
        session: SessionId,
        path: &str,
        watcher: Option<WatchFn>,
        cb: ChildrenCallback,
    ) -> Result<(), StoreError> {
        let mut st = self.state.lock();
        check_session(&st, session)?;
        let path = normalize(path);
        let result = if st.nodes.contains_key(&path) {
            if let Some(w) = watcher {
                arm(&mut st, Registry::Child, &path, session, w);
            }
            Ok(children_of(&st.nodes, &path))
        } else {
            Err(StoreError::NoNode)
        };
        self.run(move || cb(result));
        Ok(())
    }

    fn aexists(
        &self,
        session: SessionId,
        path: &str,
        watcher: Option<WatchFn>,
        cb: StatCallback,
    ) -> Result<(), StoreError> {
        let mut st = self.state.lock();
        check_session(&st, session)?;
        let path = normalize(path);
        if let Some(w) = watcher {
            arm(&mut st, Registry::Exist, &path, session, w);
        }
        let result = meta_of(&st.nodes, &path).ok_or(StoreError::NoNode);
        self.run(move || cb(result));
        Ok(())
    }

    fn create(
        &self,
        session: SessionId,
        path: &str,
        value: &[u8],
        acl: &[Acl],
        flags: i32,
    ) -> Result<String, StoreError> {
        let mut st = self.state.lock();
        check_session(&st, session)?;
        self.create_locked(&mut st, path, value, acl, flags, Some(session))
    }

    fn set(
        &self,
        session: SessionId,
        path: &str,
        value: &[u8],
        version: i32,
    ) -> Result<Meta, StoreError> {
        let mut st = self.state.lock();
        check_session(&st, session)?;
        self.set_locked(&mut st, path, value, version)
    }

    fn delete(&self, session: SessionId, path: &str, version: i32) -> Result<(), StoreError> {
        let mut st = self.state.lock();
        check_session(&st, session)?;
        self.delete_locked(&mut st, path, version)
    }
}

fn blank_node(now: i64) -> NodeRec {
    NodeRec {
        value: Vec::new(),
        acl: world_acl(),
        ctime: now,
        mtime: now,
        version: 0,
        cversion: 0,
        aversion: 0,
        seq: 0,
        owner: None,
    }
}

fn epoch_ms() -> i64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis() as i64
}

fn check_session(st: &State, session: SessionId) -> Result<(), StoreError> {
    let rec = st.sessions.get(&session).ok_or(ServerProblem::InvalidState)?;
    if !rec.alive {
        return Err(ServerProblem::SessionExpired.into());
    }
    if !st.connected {
        return Err(ServerProblem::ConnectionLoss.into());
    }
    Ok(())
}

/// Arm a one-shot watch. The real client de-duplicates an identical watcher
/// re-armed on the same path; one entry per session models that.
fn arm(st: &mut State, registry: Registry, path: &str, session: SessionId, watcher: WatchFn) {
    let entries = st.watches.entry((registry, path.to_string())).or_default();
    if let Some(slot) = entries.iter_mut().find(|(sid, _)| *sid == session) {
        slot.1 = watcher;
    } else {
        entries.push((session, watcher));
    }
}

fn prune_watches(st: &mut State, session: SessionId) {
    for entries in st.watches.values_mut() {
        entries.retain(|(sid, _)| *sid != session);
    }
    st.watches.retain(|_, entries| !entries.is_empty());
}

fn children_of(nodes: &HashMap<String, NodeRec>, path: &str) -> Vec<String> {
    let prefix = if path == "/" { "/".to_string() } else { format!("{path}/") };
    let mut kids: Vec<String> = nodes
        .keys()
        .filter_map(|p| p.strip_prefix(&prefix))
        .filter(|rest| !rest.is_empty() && !rest.contains('/'))
        .map(str::to_string)
        .collect();
    kids.sort_unstable();
    kids
}

fn meta_of(nodes: &HashMap<String, NodeRec>, path: &str) -> Option<Meta> {
    nodes.get(path).map(|n| Meta {
        ctime: n.ctime,
        mtime: n.mtime,
        version: n.version,
        aversion: n.aversion,
        cversion: n.cversion,
        data_length: n.value.len() as i32,
        num_children: children_of(nodes, path).len() as i32,
    })
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
