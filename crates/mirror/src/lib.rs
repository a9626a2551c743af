// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The zmir Authors

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! zmir-mirror: a continuously updated local view of a coordination store.
//!
//! A [`Mirror`] caches the value and child list of every path it is asked
//! about, keeps them current through the store's watch protocol, and hides
//! session loss, transient disconnection, and the races between asynchronous
//! watch events and application reads. Reads block (with a deadline) until
//! the engine has heard from the server; writes are synchronous and then
//! wait for the local cache to catch up.

pub mod chroot;
pub mod json;
pub mod mirror;
pub mod node;
mod runner;

pub use chroot::{ChrootMirror, ChrootNode};
pub use json::{JsonError, JsonNode, JsonWatcher};
pub use mirror::{Mirror, StateWatcher, DEFAULT_TIMEOUT};
pub use node::{ChildWatcher, Node, ValueWatcher};
