// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The zmir Authors

//! JSON façade over a node.
//!
//! Stored bytes are decoded on read and encoded on write; value watchers
//! get a decoding shim. [`JsonNode::update`] is a compare-and-set loop that
//! retries create/set races until one write lands.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use thiserror::Error;
use tracing::warn;

use zmir_core::{Meta, StoreError};

use crate::mirror::DEFAULT_TIMEOUT;
use crate::node::{ChildWatcher, Node, ValueWatcher};

/// Errors from the JSON façade: everything the store can fail with, plus
/// payloads that are not valid JSON.
#[derive(Debug, Error)]
pub enum JsonError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("invalid JSON payload: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Value watcher on a JSON node: decoded value while the node lives, `None`
/// on deletion.
pub type JsonWatcher = Arc<dyn Fn(Option<(Value, Meta)>) + Send + Sync>;

/// JSON view of one mirrored path.
#[derive(Clone)]
pub struct JsonNode {
    node: Node,
    path: String,
}

impl JsonNode {
    pub(crate) fn new(node: Node) -> JsonNode {
        let path = node.path().to_string();
        JsonNode { node, path }
    }

    /// Same node, reporting `path` instead of the backing path (chroot).
    pub(crate) fn rebased(self, path: String) -> JsonNode {
        JsonNode { node: self.node, path }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// The decoded value and its metadata.
    pub fn value(&self, timeout: Duration) -> Result<(Value, Meta), JsonError> {
        let (bytes, meta) = self.node.value(timeout)?;
        Ok((serde_json::from_slice(&bytes)?, meta))
    }

    pub fn children(&self, timeout: Duration) -> Result<Vec<String>, JsonError> {
        Ok(self.node.children(timeout)?)
    }

    /// Create the backing node holding the encoded value.
    pub fn create(&self, value: &Value, await_update: Duration) -> Result<(), JsonError> {
        let bytes = serde_json::to_vec(value)?;
        self.node.create(&bytes, await_update)?;
        Ok(())
    }

    /// Store the encoded value; `version` −1 forces.
    pub fn set(&self, value: &Value, version: i32) -> Result<Meta, JsonError> {
        let bytes = serde_json::to_vec(value)?;
        Ok(self.node.set(&bytes, version)?)
    }

    pub fn delete(&self, version: i32) -> Result<(), JsonError> {
        Ok(self.node.delete(version)?)
    }

    /// Read-modify-write loop.
    ///
    /// `apply` sees the decoded current value, or `None` while the node is
    /// absent, and returns the replacement. Lost races restart the loop: a
    /// concurrent creator surfaces as `NodeExists`, a concurrent writer as
    /// `BadVersion`. Returns the value that won.
    pub fn update(&self, apply: impl Fn(Option<Value>) -> Value) -> Result<Value, JsonError> {
        loop {
            let current = match self.value(DEFAULT_TIMEOUT) {
                Ok((value, meta)) => Some((value, meta)),
                Err(JsonError::Store(StoreError::NoNode)) => None,
                Err(err) => return Err(err),
            };
            match current {
                None => {
                    let replacement = apply(None);
                    match self.create(&replacement, DEFAULT_TIMEOUT) {
                        Ok(()) => return Ok(replacement),
                        Err(JsonError::Store(StoreError::NodeExists)) => continue,
                        Err(err) => return Err(err),
                    }
                }
                Some((value, meta)) => {
                    let replacement = apply(Some(value));
                    match self.set(&replacement, meta.version) {
                        Ok(_) => return Ok(replacement),
                        Err(JsonError::Store(StoreError::BadVersion)) => continue,
                        Err(err) => return Err(err),
                    }
                }
            }
        }
    }

    /// Register a value watcher with a decoding shim: `None` on deletion,
    /// the decoded value otherwise. Payloads that fail to decode are logged
    /// and skipped.
    pub fn add_value_watcher(&self, key: impl Into<String>, watcher: JsonWatcher) {
        let path = self.path.clone();
        let shim: ValueWatcher = Arc::new(move |update| match update {
            None => watcher(None),
            Some((bytes, meta)) => match serde_json::from_slice(&bytes) {
                Ok(value) => watcher(Some((value, meta))),
                Err(err) => warn!(%path, %err, "ignoring undecodable value update"),
            },
        });
        self.node.add_value_watcher(key, shim);
    }

    pub fn del_value_watcher(&self, key: &str) {
        self.node.del_value_watcher(key);
    }

    pub fn add_child_watcher(&self, key: impl Into<String>, watcher: ChildWatcher) {
        self.node.add_child_watcher(key, watcher);
    }

    pub fn del_child_watcher(&self, key: &str) {
        self.node.del_child_watcher(key);
    }
}

#[cfg(test)]
#[path = "json_tests.rs"]
mod tests;
