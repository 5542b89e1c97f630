// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures for the scenario specs below: a disposable DAG
//! directory plus scheduler config, thin wrappers around the `loom`/
//! `loomd` binaries, and a polling helper for eventually-consistent
//! assertions against a real subprocess.

#![allow(dead_code)]

use assert_cmd::cargo::cargo_bin;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

/// Generous upper bound for assertions that wait on a real subprocess
/// rather than a mocked clock.
pub const SPEC_WAIT_MAX_MS: u64 = 20_000;

/// Poll `predicate` every 50ms until it returns `true` or `max_ms`
/// elapses. Returns whether it became true in time.
pub fn wait_for(max_ms: u64, mut predicate: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_millis(max_ms);
    loop {
        if predicate() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        std::thread::sleep(Duration::from_millis(50));
    }
}

/// A disposable scheduler project: a DAG directory, a state directory,
/// and a config file tying them together.
pub struct Project {
    _dir: tempfile::TempDir,
    root: PathBuf,
    dag_dir: PathBuf,
    state_dir: PathBuf,
}

impl Project {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = dir.path().to_path_buf();
        let dag_dir = root.join("dags");
        let state_dir = root.join("state");
        std::fs::create_dir_all(&dag_dir).expect("create dag dir");
        std::fs::create_dir_all(&state_dir).expect("create state dir");
        Self { _dir: dir, root, dag_dir, state_dir }
    }

    pub fn dag_dir(&self) -> &Path {
        &self.dag_dir
    }

    /// Write a DAG YAML file named `<name>.yaml` under the project's DAG
    /// directory. Returns its path.
    pub fn write_dag(&self, name: &str, yaml: &str) -> PathBuf {
        let path = self.dag_dir.join(format!("{name}.yaml"));
        std::fs::write(&path, yaml).expect("write dag file");
        path
    }

    /// Write `config.toml` for this project. `extra` is appended verbatim
    /// (one TOML key per line) so callers can set `coordinator_url`,
    /// tighter poll intervals, etc. without this fixture needing an
    /// opinion on every field.
    pub fn write_config(&self, extra: &str) -> PathBuf {
        let orchestrator = cargo_bin("loom");
        let config = format!(
            "dag_dir = {dag_dir:?}\n\
             state_dir = {state_dir:?}\n\
             orchestrator_binary = {orchestrator:?}\n\
             timezone = \"UTC\"\n\
             queue_poll_interval_ms = 200\n\
             zombie_detector_interval_ms = 300\n\
             {extra}\n",
            dag_dir = self.dag_dir,
            state_dir = self.state_dir,
            orchestrator = orchestrator,
        );
        let path = self.root.join("config.toml");
        std::fs::write(&path, config).expect("write config");
        path
    }
}

/// Run a one-shot `loom <subcommand> ...` invocation and return its
/// captured output.
pub fn loom(args: &[&str]) -> std::process::Output {
    Command::new(cargo_bin("loom")).args(args).output().expect("spawn loom")
}

/// Spawn `loom <subcommand> ...` in the background (e.g. an unsupervised
/// `restart`), without waiting for it to finish.
pub fn spawn_loom(args: &[&str]) -> Child {
    Command::new(cargo_bin("loom"))
        .args(args)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn loom")
}

/// A running `loomd` child, killed on drop so a failing assertion never
/// leaks a daemon past its test.
pub struct DaemonGuard {
    child: Child,
}

impl DaemonGuard {
    /// Spawn `loomd --config <config_path>`, with `env` entries (e.g. a
    /// fixed-clock override) applied first.
    pub fn spawn(config_path: &Path, env: &[(&str, &str)]) -> Self {
        let mut cmd = Command::new(cargo_bin("loomd"));
        cmd.arg("--config").arg(config_path);
        for (key, value) in env {
            cmd.env(key, value);
        }
        cmd.stdout(Stdio::null());
        cmd.stderr(Stdio::null());
        let child = cmd.spawn().expect("spawn loomd");
        Self { child }
    }
}

impl Drop for DaemonGuard {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// Epoch milliseconds for an RFC3339 instant, for building
/// `LOOM_FIXED_CLOCK_MS` values in daemon scenarios.
pub fn epoch_ms(rfc3339: &str) -> i64 {
    chrono::DateTime::parse_from_rfc3339(rfc3339).expect("parse fixed instant").timestamp_millis()
}
