// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! loom-adapters: the outward-facing collaborators the scheduler talks
//! to — the OS process table and the remote coordinator.

mod coordinator;
mod process;

pub use coordinator::{coordinator_client, CoordinatorClient, CoordinatorError, HttpCoordinatorClient};
pub use process::{count_alive, ProcessStore, SystemProcessStore};

#[cfg(any(test, feature = "test-support"))]
pub use coordinator::FakeCoordinatorClient;
#[cfg(any(test, feature = "test-support"))]
pub use process::FakeProcessStore;
