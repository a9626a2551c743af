// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The zmir Authors

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! zmir-core: shared types for the coordination-store mirror

pub mod consts;
pub mod error;
pub mod meta;
pub mod path;
pub mod slot;

pub use consts::{
    describe_event, describe_state, world_acl, Acl, EventKind, SessionState, CONST_TABLE,
    CREATE_EPHEMERAL, CREATE_SEQUENCE, PERM_ADMIN, PERM_ALL, PERM_CREATE, PERM_DELETE, PERM_READ,
    PERM_WRITE,
};
pub use error::{ServerProblem, StoreError};
pub use meta::Meta;
pub use path::{join, normalize, parent};
pub use slot::{Slot, SlotState};
