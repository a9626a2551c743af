// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The zmir Authors

//! Compare-and-set update scenarios on the JSON façade.

use crate::prelude::*;
use serde_json::{json, Value};

fn increment(current: Option<Value>) -> Value {
    json!(current.and_then(|v| v.as_i64()).unwrap_or(0) + 1)
}

#[test]
fn update_starts_from_nothing() {
    let (mirror, store) = mirror_on_fake();
    let node = mirror.get_json("/c");
    assert_eq!(node.update(increment).expect("first update"), json!(1));
    assert_eq!(store.value_of("/c").as_deref(), Some(b"1".as_slice()));
    mirror.close();
}

#[test]
fn two_updaters_interleave_without_losing_increments() {
    let (mirror, _store) = mirror_on_fake();
    const PER_THREAD: i64 = 25;

    let handles: Vec<_> = (0..2)
        .map(|_| {
            let mirror = mirror.clone();
            std::thread::spawn(move || {
                let node = mirror.get_json("/c");
                for _ in 0..PER_THREAD {
                    node.update(increment).expect("update");
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("updater thread");
    }

    let node = mirror.get_json("/c");
    assert!(eventually(|| {
        node.value(WAIT).map(|(v, _)| v == json!(2 * PER_THREAD)).unwrap_or(false)
    }));
    mirror.close();
}

#[test]
fn update_result_reflects_the_applied_function() {
    let (mirror, _store) = mirror_on_fake();
    mirror.create_json("/obj", &json!({"hits": 1})).expect("create");
    let node = mirror.get_json("/obj");
    let result = node
        .update(|current| {
            let hits =
                current.as_ref().and_then(|v| v["hits"].as_i64()).unwrap_or(0);
            json!({ "hits": hits + 1 })
        })
        .expect("update");
    assert_eq!(result, json!({"hits": 2}));
    mirror.close();
}
