// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The minimal step runner: just enough of a DAG execution engine to make
//! a supervised local dispatch observable end to end.
//!
//! The real step graph (dependencies, retries, per-step agent/container
//! execution) is out of scope (spec.md §1) — this runs the DAG file's
//! top-level `run:` shell command, if any, and nothing else.

use std::path::Path;
use std::process::ExitStatus;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StepError {
    #[error("reading DAG file {path}: {source}")]
    Io { path: String, #[source] source: std::io::Error },
    #[error("parsing DAG file {path}: {source}")]
    Yaml { path: String, #[source] source: serde_yaml::Error },
    #[error("running shell step for {path}: {source}")]
    Spawn { path: String, #[source] source: std::io::Error },
}

/// Run the `run:` shell command from `dag_path`, if present, with each
/// `params` entry exposed to the child as `LOOM_PARAM_<KEY>` (uppercased).
///
/// A DAG file with no `run:` field has nothing to execute here and
/// succeeds trivially — its step graph belongs to the (out-of-scope)
/// execution engine, not this fallback.
pub fn run(dag_path: &Path, params: &[(String, String)]) -> Result<ExitStatus, StepError> {
    let path_str = dag_path.display().to_string();
    let content = std::fs::read_to_string(dag_path)
        .map_err(|source| StepError::Io { path: path_str.clone(), source })?;
    let value: serde_yaml::Value = serde_yaml::from_str(&content)
        .map_err(|source| StepError::Yaml { path: path_str.clone(), source })?;

    let Some(command) = value.get("run").and_then(|v| v.as_str()) else {
        return Ok(success_status());
    };

    let mut cmd = std::process::Command::new("sh");
    cmd.arg("-c").arg(command);
    for (key, value) in params {
        cmd.env(format!("LOOM_PARAM_{}", key.to_uppercase()), value);
    }
    cmd.status().map_err(|source| StepError::Spawn { path: path_str, source })
}

fn success_status() -> ExitStatus {
    use std::os::unix::process::ExitStatusExt;
    ExitStatus::from_raw(0)
}

#[cfg(test)]
#[path = "step_tests.rs"]
mod tests;
