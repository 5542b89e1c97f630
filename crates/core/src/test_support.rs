// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for use across crates.
//!
//! Gated behind `#[cfg(any(test, feature = "test-support"))]`.

use crate::dag::DagName;
use crate::run::{DagRef, RunAttempt, RunId, RunStatus};
use std::collections::BTreeMap;

/// Build a `RunAttempt` for a DAG named `dag_name`, with the given status
/// and a `started_at_ms` of `0` (bump it with [`RunAttempt`]'s field
/// directly if a test cares about ordering).
pub fn attempt_fixture(dag_name: &str, status: RunStatus) -> RunAttempt {
    RunAttempt {
        run_id: RunId::new(),
        dag: DagRef {
            name: DagName::new(dag_name),
            proc_group: format!("dag:{dag_name}"),
            worker_selector: BTreeMap::new(),
        },
        status,
        started_at_ms: 0,
        finished_at_ms: None,
        pid: None,
    }
}
