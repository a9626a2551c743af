// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The zmir Authors

use super::*;
use crate::{ChildrenResult, DataResult};
use parking_lot::Mutex as PlMutex;
use std::sync::Arc;

fn collector() -> (WatchFn, Arc<PlMutex<Vec<WatchedEvent>>>) {
    let seen = Arc::new(PlMutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let watcher: WatchFn = Arc::new(move |event| sink.lock().push(event));
    (watcher, seen)
}

fn open(store: &FakeStore) -> (SessionId, Arc<PlMutex<Vec<WatchedEvent>>>) {
    let (watcher, seen) = collector();
    let session = store.init("localhost:2181", watcher).unwrap();
    (session, seen)
}

fn get_sync(store: &FakeStore, session: SessionId, path: &str) -> DataResult {
    let (tx, rx) = mpsc::channel();
    store
        .aget(
            session,
            path,
            None,
            Box::new(move |result| {
                let _ = tx.send(result);
            }),
        )
        .unwrap();
    rx.recv().unwrap()
}

fn ls_sync(store: &FakeStore, session: SessionId, path: &str) -> ChildrenResult {
    let (tx, rx) = mpsc::channel();
    store
        .aget_children(
            session,
            path,
            None,
            Box::new(move |result| {
                let _ = tx.send(result);
            }),
        )
        .unwrap();
    rx.recv().unwrap()
}

#[test]
fn init_records_connstr_and_emits_connected() {
    let store = FakeStore::new();
    let (session, seen) = open(&store);
    store.flush();
    assert_eq!(store.connstr().as_deref(), Some("localhost:2181"));
    let events = seen.lock();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].session, session);
    assert_eq!(events[0].kind, EventKind::Session);
    assert_eq!(events[0].state, SessionState::Connected);
}

#[test]
fn create_then_read_round_trips() {
    let store = FakeStore::new();
    let (session, _) = open(&store);
    let actual = store.create(session, "/a", b"hello", &world_acl(), 0).unwrap();
    assert_eq!(actual, "/a");
    let (value, meta) = get_sync(&store, session, "/a").unwrap();
    assert_eq!(value, b"hello");
    assert_eq!(meta.version, 0);
    assert_eq!(meta.data_length, 5);
}

#[test]
fn create_requires_parent() {
    let store = FakeStore::new();
    let (session, _) = open(&store);
    let err = store.create(session, "/p/q", b"", &world_acl(), 0).unwrap_err();
    assert_eq!(err, StoreError::NoNode);
}

#[test]
fn duplicate_create_fails() {
    let store = FakeStore::new();
    let (session, _) = open(&store);
    store.create(session, "/a", b"1", &world_acl(), 0).unwrap();
    let err = store.create(session, "/a", b"2", &world_acl(), 0).unwrap_err();
    assert_eq!(err, StoreError::NodeExists);
}

#[test]
fn set_checks_version() {
    let store = FakeStore::new();
    let (session, _) = open(&store);
    store.create(session, "/a", b"1", &world_acl(), 0).unwrap();
    let meta = store.set(session, "/a", b"2", 0).unwrap();
    assert_eq!(meta.version, 1);
    let err = store.set(session, "/a", b"3", 0).unwrap_err();
    assert_eq!(err, StoreError::BadVersion);
    let forced = store.set(session, "/a", b"3", -1).unwrap();
    assert_eq!(forced.version, 2);
}

#[test]
fn delete_refuses_non_leaf() {
    let store = FakeStore::new();
    let (session, _) = open(&store);
    store.create(session, "/p", b"", &world_acl(), 0).unwrap();
    store.create(session, "/p/q", b"", &world_acl(), 0).unwrap();
    let err = store.delete(session, "/p", -1).unwrap_err();
    assert_eq!(err, StoreError::NotEmpty);
    store.delete(session, "/p/q", -1).unwrap();
    store.delete(session, "/p", -1).unwrap();
    assert!(!store.has_node("/p"));
}

#[test]
fn children_are_sorted() {
    let store = FakeStore::new();
    let (session, _) = open(&store);
    for name in ["/b", "/a", "/c"] {
        store.create(session, name, b"", &world_acl(), 0).unwrap();
    }
    let kids = ls_sync(&store, session, "/").unwrap();
    assert_eq!(kids, vec!["a", "b", "c"]);
}

#[test]
fn sequence_create_appends_counter() {
    let store = FakeStore::new();
    let (session, _) = open(&store);
    let first = store.create(session, "/q", b"", &world_acl(), CREATE_SEQUENCE).unwrap();
    let second = store.create(session, "/q", b"", &world_acl(), CREATE_SEQUENCE).unwrap();
    assert_eq!(first, "/q0000000000");
    assert_eq!(second, "/q0000000001");
}

#[test]
fn data_watch_fires_once_per_arming() {
    let store = FakeStore::new();
    let (session, _) = open(&store);
    store.create(session, "/a", b"1", &world_acl(), 0).unwrap();

    let (watcher, seen) = collector();
    let (tx, rx) = mpsc::channel();
    store
        .aget(
            session,
            "/a",
            Some(watcher),
            Box::new(move |result| {
                let _ = tx.send(result);
            }),
        )
        .unwrap();
    rx.recv().unwrap().unwrap();

    store.server_set("/a", b"2").unwrap();
    store.server_set("/a", b"3").unwrap();
    store.flush();

    let changed: Vec<_> =
        seen.lock().iter().filter(|e| e.kind == EventKind::Changed).cloned().collect();
    assert_eq!(changed.len(), 1, "one-shot watch must fire exactly once");
    assert_eq!(changed[0].path, "/a");
}

#[test]
fn exist_watch_fires_on_create() {
    let store = FakeStore::new();
    let (session, _) = open(&store);

    let (watcher, seen) = collector();
    let (tx, rx) = mpsc::channel();
    store
        .aexists(
            session,
            "/later",
            Some(watcher),
            Box::new(move |result| {
                let _ = tx.send(result);
            }),
        )
        .unwrap();
    assert_eq!(rx.recv().unwrap().unwrap_err(), StoreError::NoNode);

    store.seed("/later", b"now");
    store.flush();
    let events = seen.lock();
    assert!(events.iter().any(|e| e.kind == EventKind::Created && e.path == "/later"));
}

#[test]
fn child_watch_fires_on_new_child() {
    let store = FakeStore::new();
    let (session, _) = open(&store);

    let (watcher, seen) = collector();
    let (tx, rx) = mpsc::channel();
    store
        .aget_children(
            session,
            "/",
            Some(watcher),
            Box::new(move |result| {
                let _ = tx.send(result);
            }),
        )
        .unwrap();
    rx.recv().unwrap().unwrap();

    store.seed("/fresh", b"");
    store.flush();
    let events = seen.lock();
    assert!(events.iter().any(|e| e.kind == EventKind::Child && e.path == "/"));
}

#[test]
fn disconnect_fails_requests_and_notifies() {
    let store = FakeStore::new();
    let (session, seen) = open(&store);
    store.disconnect();
    let err = store.create(session, "/a", b"", &world_acl(), 0).unwrap_err();
    assert_eq!(err, StoreError::Server(ServerProblem::ConnectionLoss));

    store.reconnect();
    store.flush();
    let states: Vec<_> =
        seen.lock().iter().filter(|e| e.kind == EventKind::Session).map(|e| e.state).collect();
    assert_eq!(
        states,
        vec![SessionState::Connected, SessionState::Connecting, SessionState::Connected]
    );
}

#[test]
fn expired_session_is_rejected() {
    let store = FakeStore::new();
    let (session, seen) = open(&store);
    store.expire();
    store.flush();
    let err = store.set(session, "/", b"", -1).unwrap_err();
    assert_eq!(err, StoreError::Server(ServerProblem::SessionExpired));
    assert!(seen
        .lock()
        .iter()
        .any(|e| e.kind == EventKind::Session && e.state == SessionState::ExpiredSession));
}

#[test]
fn expire_reaps_ephemerals() {
    let store = FakeStore::new();
    let (session, _) = open(&store);
    store.create(session, "/eph", b"", &world_acl(), CREATE_EPHEMERAL).unwrap();
    assert!(store.has_node("/eph"));
    store.expire();
    assert!(!store.has_node("/eph"));
}

#[test]
fn close_drops_watches() {
    let store = FakeStore::new();
    let (session, seen) = open(&store);

    let (watcher, watch_seen) = collector();
    let (tx, rx) = mpsc::channel();
    store
        .aget(
            session,
            "/",
            Some(watcher),
            Box::new(move |result| {
                let _ = tx.send(result);
            }),
        )
        .unwrap();
    rx.recv().unwrap().unwrap();

    store.close(session).unwrap();
    store.server_set("/", b"changed").unwrap();
    store.flush();
    assert!(watch_seen.lock().is_empty());
    drop(seen);
    assert_eq!(
        store.close(session).unwrap_err(),
        StoreError::Server(ServerProblem::InvalidState)
    );
}

#[test]
fn seed_creates_missing_parents() {
    let store = FakeStore::new();
    store.seed("/p/q/r", b"v");
    assert!(store.has_node("/p"));
    assert!(store.has_node("/p/q"));
    assert_eq!(store.value_of("/p/q/r").as_deref(), Some(b"v".as_slice()));
}

#[test]
fn second_session_sees_first_sessions_writes() {
    let store = FakeStore::new();
    let (writer, _) = open(&store);
    let (reader, _) = open(&store);
    store.create(writer, "/shared", b"payload", &world_acl(), 0).unwrap();
    let (value, _) = get_sync(&store, reader, "/shared").unwrap();
    assert_eq!(value, b"payload");
}
