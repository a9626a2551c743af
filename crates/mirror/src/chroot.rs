// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The zmir Authors

//! Path-rebasing façade.
//!
//! A [`ChrootMirror`] prepends a fixed prefix to every outbound path and
//! wraps returned nodes so their observable path has the prefix stripped
//! back off; the chroot's own root reports as `/`. Everything that does not
//! take a path forwards to the backing mirror unchanged.

use std::time::Duration;

use zmir_core::{join, normalize, Meta, StoreError};

use crate::json::JsonNode;
use crate::mirror::{Mirror, StateWatcher};
use crate::node::{ChildWatcher, Node, ValueWatcher};

/// A mirror whose visible root is a fixed prefix of the backing tree.
#[derive(Clone)]
pub struct ChrootMirror {
    prefix: String,
    inner: Mirror,
}

impl ChrootMirror {
    pub(crate) fn new(prefix: &str, inner: Mirror) -> ChrootMirror {
        ChrootMirror { prefix: normalize(prefix), inner }
    }

    fn rebase(&self, path: &str) -> String {
        join(&self.prefix, path)
    }

    fn wrap(&self, node: Node) -> ChrootNode {
        ChrootNode::new(&self.prefix, node)
    }

    pub fn get(&self, path: &str) -> ChrootNode {
        self.wrap(self.inner.get(&self.rebase(path)))
    }

    pub fn get_json(&self, path: &str) -> JsonNode {
        self.rebase_json(self.inner.get_json(&self.rebase(path)))
    }

    fn rebase_json(&self, json: JsonNode) -> JsonNode {
        let visible = strip_prefix(&self.prefix, json.path());
        json.rebased(visible)
    }

    pub fn create(&self, path: &str, value: &[u8], flags: i32) -> Result<ChrootNode, StoreError> {
        Ok(self.wrap(self.inner.create(&self.rebase(path), value, flags)?))
    }

    pub fn create_r(&self, path: &str, value: &[u8]) -> Result<ChrootNode, StoreError> {
        Ok(self.wrap(self.inner.create_r(&self.rebase(path), value)?))
    }

    pub fn ensure_exists(&self, path: &str, value: &[u8]) -> Result<ChrootNode, StoreError> {
        Ok(self.wrap(self.inner.ensure_exists(&self.rebase(path), value)?))
    }

    pub fn create_json(
        &self,
        path: &str,
        value: &serde_json::Value,
    ) -> Result<JsonNode, StoreError> {
        Ok(self.rebase_json(self.inner.create_json(&self.rebase(path), value)?))
    }

    pub fn create_r_json(
        &self,
        path: &str,
        value: &serde_json::Value,
    ) -> Result<JsonNode, StoreError> {
        Ok(self.rebase_json(self.inner.create_r_json(&self.rebase(path), value)?))
    }

    /// Chroot deeper; prefixes compose onto the same backing mirror.
    pub fn chroot(&self, path: &str) -> ChrootMirror {
        ChrootMirror { prefix: join(&self.prefix, path), inner: self.inner.clone() }
    }

    pub fn add_state_watcher(&self, key: impl Into<String>, watcher: StateWatcher) {
        self.inner.add_state_watcher(key, watcher);
    }

    pub fn del_state_watcher(&self, key: &str) {
        self.inner.del_state_watcher(key);
    }

    pub fn is_connected(&self) -> bool {
        self.inner.is_connected()
    }

    pub fn time_disconnected(&self) -> Option<Duration> {
        self.inner.time_disconnected()
    }

    /// Closes the backing mirror.
    pub fn close(&self) {
        self.inner.close();
    }
}

/// A node whose observable path hides the chroot prefix.
#[derive(Clone)]
pub struct ChrootNode {
    visible: String,
    node: Node,
}

impl ChrootNode {
    fn new(prefix: &str, node: Node) -> ChrootNode {
        ChrootNode { visible: strip_prefix(prefix, node.path()), node }
    }

    /// Path relative to the chroot; the chroot root is `/`.
    pub fn path(&self) -> &str {
        &self.visible
    }

    pub fn value(&self, timeout: Duration) -> Result<(Vec<u8>, Meta), StoreError> {
        self.node.value(timeout)
    }

    pub fn children(&self, timeout: Duration) -> Result<Vec<String>, StoreError> {
        self.node.children(timeout)
    }

    pub fn create(&self, value: &[u8], await_update: Duration) -> Result<(), StoreError> {
        self.node.create(value, await_update)
    }

    pub fn set(&self, value: &[u8], version: i32) -> Result<Meta, StoreError> {
        self.node.set(value, version)
    }

    pub fn delete(&self, version: i32) -> Result<(), StoreError> {
        self.node.delete(version)
    }

    pub fn add_value_watcher(&self, key: impl Into<String>, watcher: ValueWatcher) {
        self.node.add_value_watcher(key, watcher);
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

fn strip_prefix(prefix: &str, full: &str) -> String {
    if prefix == "/" {
        return full.to_string();
    }
    if full == prefix {
        return "/".to_string();
    }
    let mut nested = String::with_capacity(prefix.len() + 1);
    nested.push_str(prefix);
    nested.push('/');
    match full.strip_prefix(&nested) {
        Some(rest) => format!("/{rest}"),
        None => full.to_string(),
    }
}

#[cfg(test)]
#[path = "chroot_tests.rs"]
mod tests;
