// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The zmir Authors

use super::*;

#[test]
fn server_problems_are_categorized() {
    for problem in ServerProblem::ALL {
        let err = StoreError::from(problem);
        assert!(err.is_server_problem(), "{problem:?} should be a server problem");
        assert!(!err.is_semantic());
    }
}

#[yare::parameterized(
    no_node = { StoreError::NoNode },
    node_exists = { StoreError::NodeExists },
    bad_version = { StoreError::BadVersion },
    not_empty = { StoreError::NotEmpty },
)]
fn semantic_errors_surface(err: StoreError) {
    assert!(err.is_semantic());
    assert!(!err.is_server_problem());
}

#[test]
fn timeout_is_neither_semantic_nor_server() {
    let err = StoreError::Timeout(std::time::Duration::from_secs(5));
    assert!(!err.is_semantic());
    assert!(!err.is_server_problem());
}

#[test]
fn server_error_displays_inner_message() {
    let err = StoreError::from(ServerProblem::ConnectionLoss);
    assert_eq!(err.to_string(), "connection lost");
}

#[test]
fn category_names_are_distinct() {
    let mut names: Vec<_> = ServerProblem::ALL.iter().map(|p| p.name()).collect();
    names.sort_unstable();
    names.dedup();
    assert_eq!(names.len(), ServerProblem::ALL.len());
}
