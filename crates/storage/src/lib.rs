// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! loom-storage: the write-ahead log, materialized state, snapshotting,
//! and the run history store built on top of them.

mod backup;
mod event;
mod history;
mod migration;
mod snapshot;
mod state;
mod wal;

pub use event::Event;
pub use history::{FileHistoryStore, HistoryError};
pub use migration::{Migration, MigrationError, MigrationRegistry};
pub use snapshot::{Snapshot, SnapshotError, CURRENT_SNAPSHOT_VERSION};
pub use state::{MaterializedState, QueueItem};
pub use wal::{Wal, WalEntry, WalError};
