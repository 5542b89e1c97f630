// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The WAL's unit of fact: everything the scheduler's materialized state
//! is derived from.

use loom_core::{DagRef, RunId, RunStatus};
use serde::{Deserialize, Serialize};

/// A fact recorded to the write-ahead log.
///
/// Handlers that derive [`crate::state::MaterializedState`] from these
/// must be idempotent — an event may be applied twice, once for
/// immediate in-process visibility and again during WAL replay on
/// recovery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A new run attempt was created, in `Queued` state.
    AttemptCreated { run_id: RunId, dag: DagRef, started_at_ms: u64 },
    /// An attempt transitioned to a new status.
    AttemptStatusChanged { run_id: RunId, status: RunStatus, at_ms: u64 },
    /// The local launcher's child PID became known for an attempt,
    /// recorded separately from creation since the attempt row is opened
    /// before `fork+exec` returns a PID.
    AttemptPidRecorded { run_id: RunId, pid: u32 },
    /// A run was placed on a named dispatch queue awaiting a free slot.
    QueueItemEnqueued { run_id: RunId, dag: DagRef, queue_name: String, enqueued_at_ms: u64 },
    /// A queued run was picked up (dispatched locally, or sent to the
    /// coordinator) and should no longer occupy queue capacity.
    QueueItemDequeued { run_id: RunId },
    /// Control event marking an orderly daemon shutdown; carries no state
    /// change but must survive WAL replay so recovery can recognize where
    /// the previous process stopped intentionally.
    Shutdown,
}
