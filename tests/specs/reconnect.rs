// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The zmir Authors

//! Outage and session-expiry scenarios.

use crate::prelude::*;
use parking_lot::Mutex;
use std::sync::Arc;
use zmir_core::SessionState;

#[test]
fn a_benign_outage_parks_and_replays_reads() {
    let (mirror, store) = mirror_on_fake();
    store.disconnect();
    store.flush();
    assert!(eventually(|| !mirror.is_connected()));

    let node = mirror.get("/arrives-later");
    store.seed("/arrives-later", b"v");
    store.reconnect();

    assert!(eventually(|| mirror.is_connected()));
    assert!(eventually(|| node.value(WAIT).map(|(v, _)| v) == Ok(b"v".to_vec())));
    assert!(mirror.time_disconnected().is_none());
    mirror.close();
}

#[test]
fn session_expiry_rebuilds_the_mirror() {
    let (mirror, store) = mirror_on_fake();
    let tracked = mirror.create("/tracked", b"before", 0).expect("create");

    store.expire();
    store.flush();

    store.server_set("/tracked", b"after").expect("server set");
    assert!(eventually(|| tracked.value(WAIT).map(|(v, _)| v) == Ok(b"after".to_vec())));

    // A further change proves the watches survived the rebuild.
    store.server_set("/tracked", b"later").expect("server set");
    assert!(eventually(|| tracked.value(WAIT).map(|(v, _)| v) == Ok(b"later".to_vec())));
    mirror.close();
}

#[test]
fn state_watchers_hear_the_whole_transition() {
    let (mirror, store) = mirror_on_fake();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    mirror.add_state_watcher("spec", Arc::new(move |state| sink.lock().push(state)));

    store.disconnect();
    store.reconnect();
    store.expire();
    store.flush();

    assert!(eventually(|| {
        let states = seen.lock();
        states.contains(&SessionState::Connecting)
            && states.contains(&SessionState::Connected)
            && states.contains(&SessionState::ExpiredSession)
    }));
    mirror.close();
}

#[test]
fn ephemerals_vanish_when_their_session_dies() {
    let (mirror, store) = mirror_on_fake();
    let node = mirror
        .create("/lock", b"", zmir_core::CREATE_EPHEMERAL)
        .expect("ephemeral create");
    assert!(eventually(|| node.value(WAIT).is_ok()));

    store.expire();
    assert!(!store.has_node("/lock"));
    assert!(eventually(|| node.value(WAIT) == Err(zmir_core::StoreError::NoNode)));
    mirror.close();
}
