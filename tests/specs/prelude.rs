// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The zmir Authors

//! Shared helpers for the scenario specs.

use std::sync::Arc;
use std::time::{Duration, Instant};

use zmir_mirror::Mirror;
use zmir_store::{FakeStore, StoreClient};

/// Generous window for blocking reads; specs should never get near it.
pub const WAIT: Duration = Duration::from_secs(5);

/// A connected mirror over a fresh in-memory store.
pub fn mirror_on_fake() -> (Mirror, Arc<FakeStore>) {
    let store = Arc::new(FakeStore::new());
    let mirror = Mirror::new(Arc::clone(&store) as Arc<dyn StoreClient>);
    mirror.connect(&["localhost"]).expect("connect to fake store");
    store.flush();
    (mirror, store)
}

/// Poll `pred` for a few seconds; returns its final answer.
pub fn eventually(pred: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(3);
    while Instant::now() < deadline {
        if pred() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    pred()
}
