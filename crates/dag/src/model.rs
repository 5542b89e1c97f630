// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Serde shape of a DAG YAML file, separate from [`loom_core::Dag`] because
//! the wire format allows fields the in-memory type normalizes away (e.g.
//! `name` defaulting to the file stem).

use serde::Deserialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScheduleSpec {
    #[serde(default)]
    pub start: Vec<String>,
    #[serde(default)]
    pub stop: Vec<String>,
    #[serde(default)]
    pub restart: Vec<String>,
}

fn default_max_active_runs() -> u32 {
    1
}

/// The on-disk shape of one DAG definition file.
///
/// Only schedule and dispatch metadata is modeled — the step graph body
/// that follows these fields in a real DAG file is left untouched here
/// and handled by the execution engine, not this crate. No
/// `deny_unknown_fields`: a real DAG file's step graph keys (`steps`,
/// `env`, `run`, ...) sit alongside these and must parse without error.
#[derive(Debug, Clone, Deserialize)]
pub struct DagFile {
    pub name: Option<String>,
    #[serde(default)]
    pub schedule: ScheduleSpec,
    #[serde(default = "default_max_active_runs")]
    pub max_active_runs: u32,
    #[serde(default)]
    pub queue: Option<String>,
    #[serde(default)]
    pub worker_selector: BTreeMap<String, String>,
    #[serde(default)]
    pub skip_if_successful: bool,
}
