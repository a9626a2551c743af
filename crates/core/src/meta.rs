// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The zmir Authors

//! Server-supplied node metadata.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Immutable metadata attached to every value read.
///
/// `version` is the optimistic-concurrency token checked by `set` and
/// `delete`; the remaining fields are observability.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meta {
    /// Creation time, epoch milliseconds.
    pub ctime: i64,
    /// Last modification time, epoch milliseconds.
    pub mtime: i64,
    /// Data version; 0 for a freshly created node.
    pub version: i32,
    /// ACL version.
    pub aversion: i32,
    /// Child-list version.
    pub cversion: i32,
    /// Length of the stored value in bytes.
    pub data_length: i32,
    /// Number of children.
    pub num_children: i32,
}

impl fmt::Display for Meta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "node meta:")?;
        writeln!(f, "  ctime:    {}", self.ctime)?;
        writeln!(f, "  mtime:    {}", self.mtime)?;
        writeln!(f, "  version:  {}", self.version)?;
        writeln!(f, "  dataLen:  {}", self.data_length)?;
        write!(f, "  numChild: {}", self.num_children)
    }
}

#[cfg(test)]
#[path = "meta_tests.rs"]
mod tests;
