// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Materialized state built by replaying [`Event`]s.

use crate::event::Event;
use loom_core::{DagName, DagRef, RunId, RunStatus};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A run waiting on a named dispatch queue for a free concurrency slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueItem {
    pub run_id: RunId,
    pub dag: DagRef,
    pub queue_name: String,
    pub enqueued_at_ms: u64,
}

/// Everything the scheduler needs to know derived from WAL replay: every
/// run attempt ever recorded, and what's currently sitting on a queue.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct MaterializedState {
    pub attempts: HashMap<RunId, loom_core::RunAttempt>,
    pub queue: HashMap<RunId, QueueItem>,
}

impl MaterializedState {
    /// Apply `event`, deriving the resulting state change.
    ///
    /// Handlers here must be idempotent: an event may be applied once for
    /// immediate in-process visibility and again during WAL replay.
    pub fn apply_event(&mut self, event: &Event) {
        match event {
            Event::AttemptCreated { run_id, dag, started_at_ms } => {
                self.attempts.entry(*run_id).or_insert_with(|| loom_core::RunAttempt {
                    run_id: *run_id,
                    dag: dag.clone(),
                    status: RunStatus::Queued,
                    started_at_ms: *started_at_ms,
                    finished_at_ms: None,
                    pid: None,
                });
            }
            Event::AttemptStatusChanged { run_id, status, at_ms } => {
                if let Some(attempt) = self.attempts.get_mut(run_id) {
                    attempt.status = *status;
                    if status.is_terminal() {
                        attempt.finished_at_ms = Some(*at_ms);
                    }
                }
            }
            Event::AttemptPidRecorded { run_id, pid } => {
                if let Some(attempt) = self.attempts.get_mut(run_id) {
                    attempt.pid = Some(*pid);
                }
            }
            Event::QueueItemEnqueued { run_id, dag, queue_name, enqueued_at_ms } => {
                self.queue.entry(*run_id).or_insert_with(|| QueueItem {
                    run_id: *run_id,
                    dag: dag.clone(),
                    queue_name: queue_name.clone(),
                    enqueued_at_ms: *enqueued_at_ms,
                });
            }
            Event::QueueItemDequeued { run_id } => {
                self.queue.remove(run_id);
            }
            Event::Shutdown => {}
        }
    }

    /// The most recently started attempt for `dag_name`, if any.
    pub fn latest_attempt(&self, dag_name: &DagName) -> Option<&loom_core::RunAttempt> {
        self.attempts
            .values()
            .filter(|a| &a.dag.name == dag_name)
            .max_by_key(|a| a.started_at_ms)
    }

    /// How many attempts for `dag_name` are currently `Running` or
    /// `Queued` — the count the queue handler's concurrency cap compares
    /// against.
    pub fn active_count(&self, dag_name: &DagName) -> usize {
        self.attempts
            .values()
            .filter(|a| &a.dag.name == dag_name && !a.status.is_terminal())
            .count()
    }

    pub fn queue_items_for(&self, queue_name: &str) -> Vec<&QueueItem> {
        let mut items: Vec<&QueueItem> =
            self.queue.values().filter(|i| i.queue_name == queue_name).collect();
        items.sort_by_key(|i| i.enqueued_at_ms);
        items
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
