// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Run identity and the run attempt state machine.

use crate::dag::DagName;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// A monotonically-ordered, time-based run identifier (UUIDv7).
///
/// Two runs of the same DAG fired at exactly the same instant still get
/// distinct IDs — `Uuid::now_v7` mixes in random bits alongside the
/// millisecond timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RunId(Uuid);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RunId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl Serialize for RunId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for RunId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// A pair uniquely identifying a single DAG invocation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunRef {
    pub dag_name: DagName,
    pub run_id: RunId,
}

impl RunRef {
    pub fn new(dag_name: DagName, run_id: RunId) -> Self {
        Self { dag_name, run_id }
    }
}

impl fmt::Display for RunRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.dag_name, self.run_id)
    }
}

/// Status of one execution attempt.
///
/// `Queued -> Running -> {Success | Error | Cancelled}`, with any state
/// also reachable from `Running` via the zombie detector writing `Error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Queued,
    Running,
    Success,
    Error,
    Cancelled,
}

impl RunStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunStatus::Success | RunStatus::Error | RunStatus::Cancelled)
    }

    pub fn is_running(&self) -> bool {
        matches!(self, RunStatus::Running)
    }
}

crate::simple_display! {
    RunStatus {
        Queued => "queued",
        Running => "running",
        Success => "success",
        Error => "error",
        Cancelled => "cancelled",
    }
}

/// A lightweight snapshot of the DAG definition that produced a run,
/// carried on the attempt so later readers (the zombie detector, the
/// queue handler) don't need a registry lookup to learn where the run
/// lives or how to dispatch it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DagRef {
    pub name: DagName,
    pub proc_group: String,
    #[serde(default)]
    pub worker_selector: std::collections::BTreeMap<String, String>,
}

/// The persisted record of one execution attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunAttempt {
    pub run_id: RunId,
    pub dag: DagRef,
    pub status: RunStatus,
    pub started_at_ms: u64,
    pub finished_at_ms: Option<u64>,
    /// The locally-launched child's PID, when known. `None` for an
    /// attempt dispatched to a remote worker — the zombie detector has no
    /// local process to probe for those and leaves them alone.
    #[serde(default)]
    pub pid: Option<u32>,
}

impl RunAttempt {
    pub fn dag_name(&self) -> &DagName {
        &self.dag.name
    }

    pub fn run_ref(&self) -> RunRef {
        RunRef::new(self.dag.name.clone(), self.run_id)
    }
}

#[cfg(test)]
#[path = "run_tests.rs"]
mod tests;
