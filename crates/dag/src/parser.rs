// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Parsing a single DAG YAML file into a [`loom_core::Dag`].

use crate::model::DagFile;
use loom_core::{CronSchedule, Dag, DagName, ScheduleParseError};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("{path}: {source}")]
    Yaml { path: String, #[source] source: serde_yaml::Error },
    #[error("{path}: schedule {field}[{index}] {source}")]
    Schedule { path: String, field: &'static str, index: usize, #[source] source: ScheduleParseError },
    #[error("{path}: DAG name cannot be empty")]
    EmptyName { path: String },
}

/// Parse the YAML text of a DAG file located at `path`.
///
/// `path`'s basename (sans extension) becomes the DAG's name unless the
/// file's `name:` field overrides it.
pub fn parse_dag(path: &Path, content: &str) -> Result<Dag, ParseError> {
    let path_str = path.display().to_string();
    let file: DagFile =
        serde_yaml::from_str(content).map_err(|source| ParseError::Yaml { path: path_str.clone(), source })?;

    let name = file
        .name
        .filter(|n| !n.trim().is_empty())
        .or_else(|| path.file_stem().map(|s| s.to_string_lossy().into_owned()))
        .ok_or_else(|| ParseError::EmptyName { path: path_str.clone() })?;

    let start_schedules = parse_schedules(&path_str, "start", &file.schedule.start)?;
    let stop_schedules = parse_schedules(&path_str, "stop", &file.schedule.stop)?;
    let restart_schedules = parse_schedules(&path_str, "restart", &file.schedule.restart)?;

    if file.max_active_runs == 0 {
        tracing::warn!(path = %path_str, "max_active_runs: 0 is floored to 1");
    }

    Ok(Dag {
        name: DagName::new(name),
        location: path.to_path_buf(),
        start_schedules,
        stop_schedules,
        restart_schedules,
        max_active_runs: file.max_active_runs,
        queue_name: file.queue,
        worker_selector: file.worker_selector,
        skip_if_successful: file.skip_if_successful,
    })
}

fn parse_schedules(
    path: &str,
    field: &'static str,
    exprs: &[String],
) -> Result<Vec<CronSchedule>, ParseError> {
    exprs
        .iter()
        .enumerate()
        .map(|(index, expr)| {
            CronSchedule::parse(expr)
                .map_err(|source| ParseError::Schedule { path: path.to_string(), field, index, source })
        })
        .collect()
}

#[cfg(test)]
#[path = "parser_tests.rs"]
mod tests;
