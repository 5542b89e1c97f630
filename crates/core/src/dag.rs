// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! DAG identity and metadata.

use crate::schedule::CronSchedule;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// A DAG's unique name, derived from its file basename sans extension.
///
/// Backed by [`SmolStr`] so registry lookups and run refs can clone it
/// cheaply — DAG names are short and compared far more often than built.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DagName(SmolStr);

impl DagName {
    pub fn new(s: impl AsRef<str>) -> Self {
        Self(SmolStr::new(s.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for DagName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for DagName {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for DagName {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl std::borrow::Borrow<str> for DagName {
    fn borrow(&self) -> &str {
        self.0.as_str()
    }
}

/// A workflow definition: schedules, concurrency, and dispatch metadata.
///
/// Parsed in "metadata-only" mode — the step graph body is never
/// evaluated here, only schedules, labels, and concurrency hints.
#[derive(Debug, Clone)]
pub struct Dag {
    pub name: DagName,
    pub location: PathBuf,
    pub start_schedules: Vec<CronSchedule>,
    pub stop_schedules: Vec<CronSchedule>,
    pub restart_schedules: Vec<CronSchedule>,
    pub max_active_runs: u32,
    pub queue_name: Option<String>,
    pub worker_selector: BTreeMap<String, String>,
    pub skip_if_successful: bool,
}

impl Dag {
    /// The queue a remote dispatch for this DAG belongs to: the explicit
    /// `queue_name`, or the DAG name itself.
    pub fn queue_name(&self) -> &str {
        self.queue_name.as_deref().unwrap_or(self.name.as_str())
    }

    /// The namespace under which process liveness for this DAG is scoped.
    pub fn proc_group(&self) -> String {
        format!("dag:{}", self.name)
    }

    /// Non-empty `worker_selector` means this DAG dispatches to a remote
    /// worker through the coordinator rather than running locally.
    pub fn is_distributed(&self) -> bool {
        !self.worker_selector.is_empty()
    }

    /// `max_active_runs`, floored at 1 (spec: a DAG authored with 0 or a
    /// negative value still gets a ceiling of one concurrent run).
    pub fn effective_max_active_runs(&self) -> u32 {
        self.max_active_runs.max(1)
    }
}

#[cfg(any(test, feature = "test-support"))]
impl Dag {
    /// Construct a minimal DAG for tests: no schedules, one queue slot,
    /// local dispatch.
    pub fn test_fixture(name: impl Into<String>) -> Self {
        Self {
            name: DagName::new(name.into()),
            location: PathBuf::from("/dev/null"),
            start_schedules: Vec::new(),
            stop_schedules: Vec::new(),
            restart_schedules: Vec::new(),
            max_active_runs: 1,
            queue_name: None,
            worker_selector: BTreeMap::new(),
            skip_if_successful: false,
        }
    }
}
