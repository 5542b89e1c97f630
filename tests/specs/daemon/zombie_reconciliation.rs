// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scenario E (spec.md §8): an attempt recorded as `Running` whose owning
//! process has vanished gets reaped to `Error` by the zombie detector.

use crate::prelude::*;

#[test]
fn a_running_attempt_with_a_dead_pid_is_reaped_to_error() {
    let project = Project::new();
    let dag_path = project.write_dag("slow", "name: slow\nrun: \"sleep 5\"\n");
    let config_path = project.write_config("zombie_detector_interval_ms = 200\n");
    let config = config_path.to_str().unwrap();
    let dag = dag_path.to_str().unwrap();

    // `restart` owns its attempt's lifecycle end to end and records its
    // own pid (spec.md §6) — kill it out from under the attempt and its
    // history row is left pointing at a pid that no longer exists,
    // exactly the state the zombie detector is meant to reconcile.
    let mut child = spawn_loom(&["restart", "--config", config, dag]);

    let run_id = wait_for_run_id(config, "slow").expect("restart never registered as running");

    child.kill().expect("kill restart process");
    let _ = child.wait();

    let _daemon = DaemonGuard::spawn(&config_path, &[]);

    let reaped = wait_for(SPEC_WAIT_MAX_MS, || {
        let out = loom(&["status", &run_id, "--config", config]);
        String::from_utf8_lossy(&out.stdout).contains("status:     error")
    });
    assert!(reaped, "zombie detector never reconciled the dead attempt to error");

    let out = loom(&["status", &run_id, "--config", config]);
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("finished_at"), "reaped attempt missing finished_at: {stdout}");
}

/// Poll `loom list` for `dag_name` until a running attempt shows up, and
/// return its run id (the first whitespace-separated field of
/// `run_list`'s `"{run_id}  {dag_name}  pid={pid:?}"` output).
fn wait_for_run_id(config: &str, dag_name: &str) -> Option<String> {
    let mut found = None;
    let ok = wait_for(SPEC_WAIT_MAX_MS, || {
        let out = loom(&["list", dag_name, "--config", config]);
        let stdout = String::from_utf8_lossy(&out.stdout).into_owned();
        let line = stdout.lines().next().unwrap_or_default();
        if line.is_empty() || line == "no running attempts" {
            return false;
        }
        found = line.split_whitespace().next().map(str::to_string);
        found.is_some()
    });
    ok.then(|| found).flatten()
}
