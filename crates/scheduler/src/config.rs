// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scheduler configuration: resolved through `--config` flag >
//! `LOOM_CONFIG` env var > `$XDG_CONFIG_HOME/loom/config.toml`.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("reading config file {path}: {source}")]
    Io { path: PathBuf, #[source] source: std::io::Error },
    #[error("parsing config file {path}: {source}")]
    Toml { path: PathBuf, #[source] source: toml::de::Error },
    #[error("no config file found and no default config directory available")]
    NoDefaultDir,
}

fn default_queue_poll_interval_ms() -> u64 {
    2_000
}

fn default_zombie_detector_interval_ms() -> u64 {
    45_000
}

fn default_timezone() -> String {
    "UTC".to_string()
}

fn default_state_dir() -> PathBuf {
    PathBuf::from("/var/lib/loom")
}

/// Per-queue concurrency override, keyed by queue name (spec.md §4.6
/// "global queue-config entry").
#[derive(Debug, Clone, Deserialize, Default)]
pub struct QueueConfig {
    pub max_active_runs: u32,
}

/// Resolved scheduler configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerConfig {
    pub dag_dir: PathBuf,
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default = "default_queue_poll_interval_ms")]
    pub queue_poll_interval_ms: u64,
    /// Zero disables the zombie detector entirely (spec.md §4.7).
    #[serde(default = "default_zombie_detector_interval_ms")]
    pub zombie_detector_interval_ms: u64,
    #[serde(default)]
    pub queues: BTreeMap<String, QueueConfig>,
    #[serde(default)]
    pub coordinator_url: Option<String>,
    /// Where the event-sourced history WAL/snapshots and the suspend flag
    /// store live. Shared with the `loom` CLI binary so a `restart`
    /// invocation (which owns its own attempt lifecycle) and a manual
    /// `enqueue`/`dequeue` see the same state as the daemon.
    #[serde(default = "default_state_dir")]
    pub state_dir: PathBuf,
    /// Path to the `loom` CLI binary the local launcher re-execs to run a
    /// DAG step. Defaults to a binary named `loom` next to the running
    /// `loomd` executable.
    #[serde(default)]
    pub orchestrator_binary: Option<PathBuf>,
}

impl SchedulerConfig {
    pub fn queue_poll_interval(&self) -> Duration {
        Duration::from_millis(self.queue_poll_interval_ms)
    }

    pub fn zombie_detector_interval(&self) -> Option<Duration> {
        if self.zombie_detector_interval_ms == 0 {
            None
        } else {
            Some(Duration::from_millis(self.zombie_detector_interval_ms))
        }
    }

    /// Resolve the effective concurrency cap for `queue_name`, falling back
    /// to the DAG's own `max_active_runs` when no global override matches,
    /// and flooring the result at 1 either way (spec.md §4.6).
    pub fn max_active_runs(&self, queue_name: &str, dag_max_active_runs: u32) -> u32 {
        self.queues
            .get(queue_name)
            .map(|q| q.max_active_runs)
            .unwrap_or(dag_max_active_runs)
            .max(1)
    }

    /// Load from `path`, which must exist.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
        Self::from_toml_str(&text)
    }

    /// Parse straight from a TOML string, bypassing the filesystem —
    /// useful for tests and for a baked-in default config.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|source| ConfigError::Toml { path: PathBuf::new(), source })
    }

    pub fn history_dir(&self) -> PathBuf {
        self.state_dir.join("history")
    }

    pub fn suspend_dir(&self) -> PathBuf {
        self.state_dir.join("suspend")
    }

    /// Resolve the binary the local launcher re-execs: the configured
    /// override, or a `loom` sibling of the currently running executable.
    pub fn resolve_orchestrator_binary(&self) -> std::io::Result<PathBuf> {
        if let Some(path) = &self.orchestrator_binary {
            return Ok(path.clone());
        }
        let current = std::env::current_exe()?;
        let name = if cfg!(windows) { "loom.exe" } else { "loom" };
        Ok(current.with_file_name(name))
    }

    /// Resolve the config file path per the precedence chain: `--config`
    /// flag > `LOOM_CONFIG` env var > `$XDG_CONFIG_HOME/loom/config.toml`.
    pub fn resolve_path(flag: Option<&Path>) -> Result<PathBuf, ConfigError> {
        if let Some(path) = flag {
            return Ok(path.to_path_buf());
        }
        if let Ok(path) = std::env::var("LOOM_CONFIG") {
            return Ok(PathBuf::from(path));
        }
        dirs::config_dir().map(|d| d.join("loom/config.toml")).ok_or(ConfigError::NoDefaultDir)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
