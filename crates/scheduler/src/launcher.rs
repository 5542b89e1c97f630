// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The local launcher: re-executes the orchestrator binary as a supervised
//! child process in its own process group, so a SIGTERM delivered to the
//! scheduler doesn't cascade to runs it launched.

use loom_core::RunId;
use std::os::unix::process::CommandExt;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("spawning orchestrator subprocess for {subcommand}: {source}")]
    Spawn { subcommand: &'static str, #[source] source: std::io::Error },
}

/// One of the orchestrator subcommands the local launcher can invoke.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subcommand {
    Start,
    Retry,
    Enqueue,
    Dequeue,
    Stop,
    Restart,
}

impl Subcommand {
    fn as_str(&self) -> &'static str {
        match self {
            Subcommand::Start => "start",
            Subcommand::Retry => "retry",
            Subcommand::Enqueue => "enqueue",
            Subcommand::Dequeue => "dequeue",
            Subcommand::Stop => "stop",
            Subcommand::Restart => "restart",
        }
    }
}

/// Escape literal `\r` and `\n` in a parameter string before it crosses the
/// process boundary as a single shell-quoted argument (spec.md §4.9).
pub fn escape_param(raw: &str) -> String {
    raw.replace('\\', "\\\\").replace('\r', "\\r").replace('\n', "\\n")
}

/// Spawns the orchestrator binary as a new, detached process group.
pub struct LocalLauncher {
    /// Path to the orchestrator binary to re-exec (normally
    /// `std::env::current_exe()`, overridable for tests).
    binary: PathBuf,
    config_path: Option<PathBuf>,
}

impl LocalLauncher {
    pub fn new(binary: PathBuf, config_path: Option<PathBuf>) -> Self {
        Self { binary, config_path }
    }

    /// Launch `subcommand` against `dag_path`, returning once `fork+exec`
    /// succeeds — the child is never waited on here. Equivalent to
    /// [`Self::launch_supervised`] with no completion callback.
    pub fn launch(
        &self,
        subcommand: Subcommand,
        dag_path: &Path,
        run_id: Option<RunId>,
        params: &[(String, String)],
    ) -> Result<u32, LaunchError> {
        self.launch_supervised(subcommand, dag_path, run_id, params, None)
    }

    /// Launch `subcommand`, optionally running `on_exit` on a detached
    /// thread once the child terminates. Used by the dispatcher's local
    /// `Start` path, which needs to learn the run's outcome to close out
    /// the attempt record; `Stop`/`Restart` pass `None` since the
    /// scheduler does not own that attempt's lifecycle.
    pub fn launch_supervised(
        &self,
        subcommand: Subcommand,
        dag_path: &Path,
        run_id: Option<RunId>,
        params: &[(String, String)],
        on_exit: Option<Box<dyn FnOnce(std::process::ExitStatus) + Send>>,
    ) -> Result<u32, LaunchError> {
        let mut cmd = std::process::Command::new(&self.binary);
        cmd.arg(subcommand.as_str());

        if let Some(run_id) = run_id {
            cmd.arg("--run-id").arg(run_id.to_string());
        }
        for (key, value) in params {
            cmd.arg("--params").arg(format!("{key}={}", escape_param(value)));
        }
        if let Some(config_path) = &self.config_path {
            cmd.arg("--config").arg(config_path);
        }
        cmd.arg(dag_path);

        // A fresh process group so the scheduler's own SIGTERM doesn't
        // cascade to runs it launched.
        cmd.process_group(0);
        cmd.stdin(std::process::Stdio::null());
        cmd.stdout(std::process::Stdio::inherit());
        cmd.stderr(std::process::Stdio::inherit());

        let mut child = cmd
            .spawn()
            .map_err(|source| LaunchError::Spawn { subcommand: subcommand.as_str(), source })?;
        let pid = child.id();

        // Reap the child on a detached thread so it never lingers as a
        // zombie; we deliberately don't block `launch` on this.
        std::thread::spawn(move || match child.wait() {
            Ok(status) => {
                if let Some(on_exit) = on_exit {
                    on_exit(status);
                }
            }
            Err(e) => tracing::error!(error = %e, "failed to wait on launched subprocess"),
        });

        Ok(pid)
    }
}

#[cfg(test)]
#[path = "launcher_tests.rs"]
mod tests;
