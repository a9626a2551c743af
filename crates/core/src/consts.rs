// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The zmir Authors

//! Event, state, flag, and permission tables for the coordination store.
//!
//! The numeric codes are the service's wire values; they are exposed so
//! diagnostic tooling can enumerate them and so session-state subscribers
//! can get at the raw code.

use serde::{Deserialize, Serialize};

/// Watch and session event kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    /// A watched-for path came into existence.
    Created,
    /// A watched node was deleted.
    Deleted,
    /// A watched node's value changed.
    Changed,
    /// A watched node's child list changed.
    Child,
    /// Session state transition; carries no path.
    Session,
    /// The server dropped a watch without firing it.
    NotWatching,
}

impl EventKind {
    pub const ALL: [EventKind; 6] = [
        EventKind::Created,
        EventKind::Deleted,
        EventKind::Changed,
        EventKind::Child,
        EventKind::Session,
        EventKind::NotWatching,
    ];

    pub const fn code(self) -> i32 {
        match self {
            EventKind::Created => 1,
            EventKind::Deleted => 2,
            EventKind::Changed => 3,
            EventKind::Child => 4,
            EventKind::Session => -1,
            EventKind::NotWatching => -2,
        }
    }

    pub fn from_code(code: i32) -> Option<EventKind> {
        EventKind::ALL.into_iter().find(|kind| kind.code() == code)
    }

    pub const fn name(self) -> &'static str {
        match self {
            EventKind::Created => "CREATED",
            EventKind::Deleted => "DELETED",
            EventKind::Changed => "CHANGED",
            EventKind::Child => "CHILD",
            EventKind::Session => "SESSION",
            EventKind::NotWatching => "NOTWATCHING",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Session lifecycle states.
///
/// `Unknown` is the raw 0 the underlying client reports while a session is
/// in limbo (between a dead link and either reconnection or expiry).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionState {
    Unknown,
    Connecting,
    Associating,
    Connected,
    AuthFailed,
    ExpiredSession,
}

impl SessionState {
    pub const ALL: [SessionState; 6] = [
        SessionState::Unknown,
        SessionState::Connecting,
        SessionState::Associating,
        SessionState::Connected,
        SessionState::AuthFailed,
        SessionState::ExpiredSession,
    ];

    pub const fn code(self) -> i32 {
        match self {
            SessionState::Unknown => 0,
            SessionState::Connecting => 1,
            SessionState::Associating => 2,
            SessionState::Connected => 3,
            SessionState::AuthFailed => -113,
            SessionState::ExpiredSession => -112,
        }
    }

    pub fn from_code(code: i32) -> Option<SessionState> {
        SessionState::ALL.into_iter().find(|state| state.code() == code)
    }

    pub const fn name(self) -> &'static str {
        match self {
            SessionState::Unknown => "UNKNOWN",
            SessionState::Connecting => "CONNECTING",
            SessionState::Associating => "ASSOCIATING",
            SessionState::Connected => "CONNECTED",
            SessionState::AuthFailed => "AUTH_FAILED",
            SessionState::ExpiredSession => "EXPIRED_SESSION",
        }
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Human-readable name for a raw state code.
pub fn describe_state(code: i32) -> &'static str {
    SessionState::from_code(code).map(SessionState::name).unwrap_or("UNKNOWN")
}

/// Human-readable name for a raw event code.
pub fn describe_event(code: i32) -> &'static str {
    EventKind::from_code(code).map(EventKind::name).unwrap_or("UNKNOWN")
}

/// Create-flag: node is removed when the creating session dies.
pub const CREATE_EPHEMERAL: i32 = 1;
/// Create-flag: the server appends a monotonically increasing suffix.
pub const CREATE_SEQUENCE: i32 = 2;

pub const PERM_READ: u32 = 1;
pub const PERM_WRITE: u32 = 2;
pub const PERM_CREATE: u32 = 4;
pub const PERM_DELETE: u32 = 8;
pub const PERM_ADMIN: u32 = 16;
pub const PERM_ALL: u32 = 0x1f;

/// Named numeric constants, for the diagnostic CLI's `consts` listing.
pub const CONST_TABLE: &[(&str, i32)] = &[
    ("CREATE_EPHEMERAL", CREATE_EPHEMERAL),
    ("CREATE_SEQUENCE", CREATE_SEQUENCE),
    ("PERM_READ", PERM_READ as i32),
    ("PERM_WRITE", PERM_WRITE as i32),
    ("PERM_CREATE", PERM_CREATE as i32),
    ("PERM_DELETE", PERM_DELETE as i32),
    ("PERM_ADMIN", PERM_ADMIN as i32),
    ("PERM_ALL", PERM_ALL as i32),
];

/// One ACL entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Acl {
    pub perms: u32,
    pub scheme: String,
    pub id: String,
}

/// The default ACL for every create: all permissions for anyone.
pub fn world_acl() -> Vec<Acl> {
    vec![Acl { perms: PERM_ALL, scheme: "world".to_string(), id: "anyone".to_string() }]
}

#[cfg(test)]
#[path = "consts_tests.rs"]
mod tests;
