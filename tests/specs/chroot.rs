// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The zmir Authors

//! Rebasing façade scenarios.

use crate::prelude::*;

#[test]
fn chrooted_create_lands_under_the_prefix() {
    let (mirror, store) = mirror_on_fake();
    mirror.ensure_exists("/base", b"").expect("create /base");

    let scoped = mirror.chroot("/base");
    let node = scoped.create("/k", b"v", 0).expect("chrooted create");

    assert!(store.has_node("/base/k"), "remote path must carry the prefix");
    assert_eq!(node.path(), "/k", "visible path must not");
    assert_eq!(node.value(WAIT).expect("value").0, b"v");
    mirror.close();
}

#[test]
fn chroot_sees_only_its_subtree() {
    let (mirror, store) = mirror_on_fake();
    store.seed("/base/inner", b"yes");
    store.seed("/outside", b"no");

    let scoped = mirror.chroot("/base");
    assert_eq!(scoped.get("/inner").value(WAIT).expect("inner").0, b"yes");
    assert!(eventually(|| {
        scoped
            .get("/")
            .children(WAIT)
            .map(|kids| kids == vec!["inner".to_string()])
            .unwrap_or(false)
    }));
    mirror.close();
}

#[test]
fn chrooted_watchers_track_the_backing_path() {
    let (mirror, store) = mirror_on_fake();
    store.seed("/base/w", b"0");

    let scoped = mirror.chroot("/base");
    let node = scoped.get("/w");
    let seen = std::sync::Arc::new(parking_lot::Mutex::new(Vec::new()));
    let sink = std::sync::Arc::clone(&seen);
    node.add_value_watcher(
        "spec",
        std::sync::Arc::new(move |update| sink.lock().push(update.map(|(bytes, _)| bytes))),
    );

    store.server_set("/base/w", b"1").expect("server set");
    assert!(eventually(|| seen.lock().contains(&Some(b"1".to_vec()))));
    mirror.close();
}
