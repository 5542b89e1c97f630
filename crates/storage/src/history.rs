// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The run history store: the durable record of every attempt and queue
//! item, backed by a WAL plus periodic snapshots.
//!
//! This is the one collaborator every other scheduler component reads
//! and writes through — the dispatcher creates attempts here, the queue
//! handler enqueues/dequeues here, the zombie detector marks attempts
//! `Error` here, and the readiness gate reads `latest_attempt` from here.

use crate::event::Event;
use crate::migration::MigrationRegistry;
use crate::snapshot::Snapshot;
use crate::state::{MaterializedState, QueueItem};
use crate::wal::{Wal, WalError};
use chrono::{DateTime, Utc};
use loom_core::{DagName, DagRef, RunAttempt, RunId, RunStatus};
use parking_lot::{Mutex, RwLock};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("WAL error: {0}")]
    Wal(#[from] WalError),
    #[error("snapshot error: {0}")]
    Snapshot(#[from] crate::snapshot::SnapshotError),
}

/// A file-backed, WAL-plus-snapshot implementation of the run history
/// store. One instance owns one data directory; concurrent callers
/// within the same process share it behind an `Arc`.
pub struct FileHistoryStore {
    wal: Mutex<Wal>,
    state: RwLock<MaterializedState>,
    snapshot_path: PathBuf,
}

impl FileHistoryStore {
    /// Open the store rooted at `dir` (created if absent), loading the
    /// latest snapshot if one exists and replaying every WAL entry
    /// written after it.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, HistoryError> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;
        let snapshot_path = dir.join("snapshot.json");
        let wal_path = dir.join("history.wal");
        let migrations = MigrationRegistry::new();

        let snapshot = Snapshot::load(&snapshot_path, &migrations)?;
        let (mut state, processed_seq) = match snapshot {
            Some(snap) => (snap.state, snap.seq),
            None => (MaterializedState::default(), 0),
        };

        let mut wal = Wal::open(&wal_path, processed_seq)?;
        for entry in wal.entries_after(processed_seq)? {
            state.apply_event(&entry.event);
            wal.mark_processed(entry.seq);
        }

        Ok(Self { wal: Mutex::new(wal), state: RwLock::new(state), snapshot_path })
    }

    fn record(&self, event: Event) -> Result<(), HistoryError> {
        let mut wal = self.wal.lock();
        let seq = wal.append(&event)?;
        if wal.needs_flush() {
            wal.flush()?;
        }
        wal.mark_processed(seq);
        drop(wal);
        self.state.write().apply_event(&event);
        Ok(())
    }

    pub fn create_attempt(&self, dag: DagRef, started_at_ms: u64) -> Result<RunId, HistoryError> {
        let run_id = RunId::new();
        self.record(Event::AttemptCreated { run_id, dag, started_at_ms })?;
        Ok(run_id)
    }

    pub fn update_status(&self, run_id: RunId, status: RunStatus, at_ms: u64) -> Result<(), HistoryError> {
        self.record(Event::AttemptStatusChanged { run_id, status, at_ms })
    }

    /// Record the locally-launched child's PID against an already-created
    /// attempt, once `fork+exec` has returned one.
    pub fn record_pid(&self, run_id: RunId, pid: u32) -> Result<(), HistoryError> {
        self.record(Event::AttemptPidRecorded { run_id, pid })
    }

    pub fn enqueue(
        &self,
        run_id: RunId,
        dag: DagRef,
        queue_name: String,
        enqueued_at_ms: u64,
    ) -> Result<(), HistoryError> {
        self.record(Event::QueueItemEnqueued { run_id, dag, queue_name, enqueued_at_ms })
    }

    pub fn dequeue(&self, run_id: RunId) -> Result<(), HistoryError> {
        self.record(Event::QueueItemDequeued { run_id })
    }

    /// The most recent attempt recorded for `dag_name`, consulted by the
    /// readiness gate before acting on a schedule firing.
    pub fn latest_attempt(&self, dag_name: &DagName) -> Option<RunAttempt> {
        self.state.read().latest_attempt(dag_name).cloned()
    }

    pub fn find_attempt(&self, run_id: RunId) -> Option<RunAttempt> {
        self.state.read().attempts.get(&run_id).cloned()
    }

    pub fn active_count(&self, dag_name: &DagName) -> usize {
        self.state.read().active_count(dag_name)
    }

    /// Every attempt currently `Running`, for the zombie detector's
    /// liveness sweep.
    pub fn list_running(&self) -> Vec<RunAttempt> {
        self.state.read().attempts.values().filter(|a| a.status.is_running()).cloned().collect()
    }

    pub fn queue_items_for(&self, queue_name: &str) -> Vec<QueueItem> {
        self.state.read().queue_items_for(queue_name).into_iter().cloned().collect()
    }

    /// Persist the current materialized state to disk and discard WAL
    /// entries it subsumes. Call periodically (the scheduler's tick loop
    /// owns the cadence) so recovery after a crash doesn't have to replay
    /// the log from its very first entry.
    pub fn snapshot(&self, now: DateTime<Utc>) -> Result<(), HistoryError> {
        let mut wal = self.wal.lock();
        let seq = wal.write_seq();
        let state = self.state.read().clone();
        Snapshot::new(seq, state, now).save(&self.snapshot_path)?;
        wal.truncate_before(seq + 1)?;
        Ok(())
    }

    pub fn close(&self) -> Result<(), HistoryError> {
        self.wal.lock().flush()?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "history_tests.rs"]
mod tests;
