// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire DTOs exchanged with the coordinator when a DAG's `worker_selector`
//! routes it to a remote worker instead of a local subprocess.
//!
//! The coordinator's own dispatch protocol — how it picks a worker, how
//! the worker reports back — lives outside this crate; this is only the
//! shape of the one request/response pair the scheduler sends and
//! receives.

use loom_core::{DagName, RunId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// What the scheduler asks the coordinator to do with a run.
///
/// `Stop`/`Restart` carry the `run_id` of an attempt the coordinator
/// already knows about (spec.md §4.5's REMOTE path for non-`Start`
/// kinds), distinct from `Dispatch`, which asks the coordinator to start
/// a fresh run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskOperation {
    Dispatch,
    Stop,
    Restart,
    Cleanup,
}

/// A task message sent to the coordinator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskMessage {
    pub operation: TaskOperation,
    pub dag_name: DagName,
    pub run_id: RunId,
    #[serde(default)]
    pub worker_selector: BTreeMap<String, String>,
}

impl TaskMessage {
    pub fn dispatch(dag_name: DagName, run_id: RunId, worker_selector: BTreeMap<String, String>) -> Self {
        Self { operation: TaskOperation::Dispatch, dag_name, run_id, worker_selector }
    }

    pub fn stop(dag_name: DagName, run_id: RunId, worker_selector: BTreeMap<String, String>) -> Self {
        Self { operation: TaskOperation::Stop, dag_name, run_id, worker_selector }
    }

    pub fn restart(dag_name: DagName, run_id: RunId, worker_selector: BTreeMap<String, String>) -> Self {
        Self { operation: TaskOperation::Restart, dag_name, run_id, worker_selector }
    }

    pub fn cleanup(dag_name: DagName, run_id: RunId) -> Self {
        Self { operation: TaskOperation::Cleanup, dag_name, run_id, worker_selector: BTreeMap::new() }
    }
}

/// The coordinator's reply to a [`TaskMessage`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskAck {
    pub accepted: bool,
    #[serde(default)]
    pub detail: Option<String>,
}

#[cfg(test)]
#[path = "task_tests.rs"]
mod tests;
