// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The zmir Authors

//! Caller-visible error taxonomy.
//!
//! Semantic failures (`NoNode`, `NodeExists`, `BadVersion`, `NotEmpty`)
//! surface directly to callers. Everything that indicates trouble with the
//! server or the connection to it is coalesced into the [`ServerProblem`]
//! category at the client boundary; the engine parks such failures on its
//! pending list for replay instead of surfacing them.

use std::time::Duration;
use thiserror::Error;

/// Store faults that indicate a problem with the server (or our connection
/// to it) rather than with the request itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum ServerProblem {
    #[error("connection lost")]
    ConnectionLoss,
    #[error("session expired")]
    SessionExpired,
    #[error("session moved")]
    SessionMoved,
    #[error("server-side operation timeout")]
    OperationTimeout,
    #[error("handle is closing")]
    Closing,
    #[error("system error")]
    SystemError,
    #[error("api error")]
    ApiError,
    #[error("data inconsistency")]
    DataInconsistency,
    #[error("invalid handle state")]
    InvalidState,
}

impl ServerProblem {
    /// Every category member, for the diagnostic CLI.
    pub const ALL: [ServerProblem; 9] = [
        ServerProblem::ConnectionLoss,
        ServerProblem::SessionExpired,
        ServerProblem::SessionMoved,
        ServerProblem::OperationTimeout,
        ServerProblem::Closing,
        ServerProblem::SystemError,
        ServerProblem::ApiError,
        ServerProblem::DataInconsistency,
        ServerProblem::InvalidState,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            ServerProblem::ConnectionLoss => "CONNECTION_LOSS",
            ServerProblem::SessionExpired => "SESSION_EXPIRED",
            ServerProblem::SessionMoved => "SESSION_MOVED",
            ServerProblem::OperationTimeout => "OPERATION_TIMEOUT",
            ServerProblem::Closing => "CLOSING",
            ServerProblem::SystemError => "SYSTEM_ERROR",
            ServerProblem::ApiError => "API_ERROR",
            ServerProblem::DataInconsistency => "DATA_INCONSISTENCY",
            ServerProblem::InvalidState => "INVALID_STATE",
        }
    }
}

/// Errors surfaced by mirror and store operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The path does not exist (or the local slot is marked deleted).
    #[error("no node")]
    NoNode,

    /// Create raced with another creator.
    #[error("node exists")]
    NodeExists,

    /// Optimistic version check failed.
    #[error("bad version")]
    BadVersion,

    /// Delete on a node that still has children.
    #[error("not empty")]
    NotEmpty,

    /// A local deadline expired before the engine produced an answer.
    #[error("operation timed out after {0:?}")]
    Timeout(Duration),

    /// Any underlying connection, session, or protocol fault.
    #[error(transparent)]
    Server(#[from] ServerProblem),
}

impl StoreError {
    /// True for faults in the [`ServerProblem`] category.
    pub fn is_server_problem(&self) -> bool {
        matches!(self, StoreError::Server(_))
    }

    /// True for failures a retry of the same request cannot fix.
    pub fn is_semantic(&self) -> bool {
        matches!(
            self,
            StoreError::NoNode
                | StoreError::NodeExists
                | StoreError::BadVersion
                | StoreError::NotEmpty
        )
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
