// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The zmir Authors

//! Core read/write scenarios.

use crate::prelude::*;
use std::sync::Arc;
use parking_lot::Mutex;
use zmir_core::StoreError;

#[test]
fn fresh_mirror_reads_the_root() {
    let (mirror, store) = mirror_on_fake();
    store.seed("/app", b"");
    let root = mirror.get("/");

    let (value, meta) = root.value(WAIT).expect("root must be readable");
    assert!(value.is_empty());
    assert_eq!(meta.version, 0);
    assert!(eventually(|| {
        root.children(WAIT).map(|kids| kids.contains(&"app".to_string())).unwrap_or(false)
    }));
    mirror.close();
}

#[test]
fn watcher_fires_when_an_absent_node_appears() {
    let (mirror, store) = mirror_on_fake();
    let node = mirror.get("/x");
    assert!(eventually(|| node.value(WAIT) == Err(StoreError::NoNode)));

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    node.add_value_watcher(
        "spec",
        Arc::new(move |update| sink.lock().push(update.map(|(bytes, meta)| (bytes, meta.version)))),
    );

    store.seed("/x", b"hi");
    assert!(eventually(|| seen.lock().contains(&Some((b"hi".to_vec(), 0)))));
    assert_eq!(node.value(WAIT).expect("created node").0, b"hi");
    mirror.close();
}

#[test]
fn optimistic_writes_reject_stale_versions() {
    let (mirror, _store) = mirror_on_fake();
    let node = mirror.create("/a", b"1", 0).expect("create /a");
    node.set(b"2", 0).expect("first set at version 0");
    assert_eq!(node.set(b"3", 0).expect_err("stale version"), StoreError::BadVersion);
    assert_eq!(node.value(WAIT).expect("value").0, b"2");
    mirror.close();
}

#[test]
fn recursive_create_builds_every_ancestor() {
    let (mirror, store) = mirror_on_fake();
    let node = mirror.create_r("/p/q/r", b"v").expect("create_r");
    for path in ["/p", "/p/q", "/p/q/r"] {
        assert!(store.has_node(path), "{path} must exist");
    }
    let (value, meta) = node.value(WAIT).expect("leaf value");
    assert_eq!(value, b"v");
    assert_eq!(meta.version, 0);
    mirror.close();
}

#[test]
fn ensure_exists_tolerates_racing_creators() {
    let (mirror, store) = mirror_on_fake();
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let mirror = mirror.clone();
            std::thread::spawn(move || mirror.ensure_exists("/race/slot", b"seed").is_ok())
        })
        .collect();
    for handle in handles {
        assert!(handle.join().expect("ensure thread"));
    }
    assert!(store.has_node("/race/slot"));
    assert_eq!(store.node_version("/race/slot"), Some(0));
    mirror.close();
}

#[test]
fn deleting_and_recreating_round_trips() {
    let (mirror, store) = mirror_on_fake();
    let node = mirror.create("/cycle", b"one", 0).expect("create");
    node.delete(0).expect("delete at version 0");
    assert_eq!(node.value(WAIT).expect_err("deleted"), StoreError::NoNode);

    store.seed("/cycle", b"two");
    assert!(eventually(|| node.value(WAIT).map(|(v, _)| v) == Ok(b"two".to_vec())));
    mirror.close();
}
