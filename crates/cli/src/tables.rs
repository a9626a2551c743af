// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The zmir Authors

//! Table renderers for the enumeration subcommands, one row per line.

use zmir_core::{ServerProblem, SessionState};
use zmir_core::{EventKind, CONST_TABLE};
use zmir_store::FUNCTION_TABLE;

pub fn state_lines() -> Vec<String> {
    SessionState::ALL
        .into_iter()
        .map(|state| format!("{} ({})", state.name(), state.code()))
        .collect()
}

pub fn event_lines() -> Vec<String> {
    EventKind::ALL
        .into_iter()
        .map(|kind| format!("{} ({})", kind.name(), kind.code()))
        .collect()
}

pub fn const_lines() -> Vec<String> {
    CONST_TABLE.iter().map(|(name, value)| format!("{name} = {value}")).collect()
}

/// The caller-visible error kinds; members of the server-problem category
/// are indented beneath it.
pub fn exception_lines() -> Vec<String> {
    let mut lines = vec![
        "NO_NODE".to_string(),
        "NODE_EXISTS".to_string(),
        "BAD_VERSION".to_string(),
        "NOT_EMPTY".to_string(),
        "OPERATION_TIMEOUT".to_string(),
        "SERVER_PROBLEM".to_string(),
    ];
    lines.extend(ServerProblem::ALL.iter().map(|problem| format!("  {}", problem.name())));
    lines
}

pub fn function_lines() -> Vec<String> {
    FUNCTION_TABLE.iter().map(|name| name.to_string()).collect()
}

#[cfg(test)]
#[path = "tables_tests.rs"]
mod tests;
