// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The zmir Authors

use super::*;
use std::sync::Arc;
use std::time::Duration;

#[test]
fn starts_unknown() {
    let slot: Slot<i32> = Slot::new();
    assert_eq!(slot.peek(), SlotState::Unknown);
}

#[test]
fn unknown_wait_times_out() {
    let slot: Slot<i32> = Slot::new();
    let err = slot.wait(Duration::from_millis(20)).unwrap_err();
    assert!(matches!(err, StoreError::Timeout(_)));
}

#[test]
fn known_value_returns_immediately() {
    let slot = Slot::new();
    slot.set(Some(7));
    assert_eq!(slot.wait(Duration::from_secs(5)).unwrap(), 7);
}

#[test]
fn deleted_fails_with_no_node() {
    let slot: Slot<i32> = Slot::new();
    slot.set(None);
    assert_eq!(slot.wait(Duration::from_secs(5)).unwrap_err(), StoreError::NoNode);
}

#[test]
fn set_wakes_a_blocked_reader() {
    let slot = Arc::new(Slot::new());
    let writer = Arc::clone(&slot);
    let start = std::time::Instant::now();
    let reader = std::thread::spawn(move || slot.wait(Duration::from_secs(10)));
    std::thread::sleep(Duration::from_millis(30));
    writer.set(Some(42));
    assert_eq!(reader.join().unwrap().unwrap(), 42);
    assert!(start.elapsed() < Duration::from_secs(5));
}

#[test]
fn never_reports_unknown_after_first_observation() {
    let slot = Slot::new();
    slot.set(Some(1));
    assert!(slot.peek().is_known());
    slot.set(None);
    assert_eq!(slot.peek(), SlotState::Deleted);
    slot.set(Some(2));
    assert_eq!(slot.peek(), SlotState::Known(2));
}

#[test]
fn deleted_node_can_be_revived() {
    let slot = Slot::new();
    slot.set(None);
    assert_eq!(slot.wait(Duration::from_millis(10)).unwrap_err(), StoreError::NoNode);
    slot.set(Some(3));
    assert_eq!(slot.wait(Duration::from_millis(10)).unwrap(), 3);
}

#[test]
fn wait_for_accepts_predicate_target() {
    let slot = Arc::new(Slot::new());
    let writer = Arc::clone(&slot);
    let handle = std::thread::spawn(move || {
        slot.wait_for(Duration::from_secs(10), |state| {
            matches!(state, SlotState::Known(v) if *v >= 3)
        })
    });
    for v in 1..=3 {
        std::thread::sleep(Duration::from_millis(10));
        writer.set(Some(v));
    }
    handle.join().unwrap().unwrap();
}

#[test]
fn wait_for_sees_deleted_as_acceptable() {
    let slot: Slot<i32> = Slot::new();
    slot.set(None);
    slot.wait_for(Duration::from_millis(10), |state| matches!(state, SlotState::Deleted))
        .unwrap();
}

#[test]
fn wait_for_times_out_when_never_accepted() {
    let slot = Slot::new();
    slot.set(Some(1));
    let err = slot
        .wait_for(Duration::from_millis(20), |state| {
            matches!(state, SlotState::Known(v) if *v > 1)
        })
        .unwrap_err();
    assert!(matches!(err, StoreError::Timeout(_)));
}
