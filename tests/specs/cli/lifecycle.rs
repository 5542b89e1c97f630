// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `loom`'s own CLI surface: enqueue, status, dequeue, and an
//! unsupervised `restart` that owns its attempt's full lifecycle.

use crate::prelude::*;

#[test]
fn enqueue_then_status_then_dequeue() {
    let project = Project::new();
    let dag_path = project.write_dag("sample", "name: sample\n");
    let config_path = project.write_config("");
    let config = config_path.to_str().unwrap();
    let dag = dag_path.to_str().unwrap();

    let out = loom(&["enqueue", "--config", config, dag]);
    assert!(out.status.success(), "enqueue failed: {}", String::from_utf8_lossy(&out.stderr));
    let run_id = String::from_utf8(out.stdout).unwrap().trim().to_string();
    assert!(!run_id.is_empty(), "enqueue printed no run id");

    let out = loom(&["status", &run_id, "--config", config]);
    assert!(out.status.success());
    let stdout = String::from_utf8(out.stdout).unwrap();
    assert!(stdout.contains("status:     queued"), "unexpected status output: {stdout}");
    assert!(stdout.contains(&run_id), "status output missing run id: {stdout}");

    let out = loom(&["dequeue", "--run-id", &run_id, "--config", config, dag]);
    assert!(out.status.success(), "dequeue failed: {}", String::from_utf8_lossy(&out.stderr));

    // The queue entry is gone but the attempt record itself survives —
    // dequeue only removes it from the restart queue, not from history.
    let out = loom(&["status", &run_id, "--config", config]);
    assert!(out.status.success());
}

#[test]
fn status_of_an_unknown_run_id_fails_loudly() {
    let project = Project::new();
    let config_path = project.write_config("");
    let config = config_path.to_str().unwrap();
    let bogus = "018d2c1a-0000-7000-8000-000000000000";

    let out = loom(&["status", bogus, "--config", config]);
    assert!(!out.status.success(), "expected a non-zero exit for a missing attempt");
    assert!(String::from_utf8_lossy(&out.stderr).contains("no attempt found"));
}

#[test]
fn restart_runs_to_completion_and_is_observable_via_list() {
    let project = Project::new();
    let dag_path = project.write_dag("slow", "name: slow\nrun: \"sleep 1\"\n");
    let config_path = project.write_config("");
    let config = config_path.to_str().unwrap();
    let dag = dag_path.to_str().unwrap();

    let mut child = spawn_loom(&["restart", "--config", config, dag]);

    let found_running = wait_for(SPEC_WAIT_MAX_MS, || {
        let out = loom(&["list", "slow", "--config", config]);
        String::from_utf8_lossy(&out.stdout).contains("slow")
    });
    assert!(found_running, "restart never showed up as a running attempt");

    let status = child.wait().expect("wait for restart");
    assert!(status.success(), "restart's own process exited non-zero");

    let settled = wait_for(SPEC_WAIT_MAX_MS, || {
        let out = loom(&["list", "slow", "--config", config]);
        String::from_utf8_lossy(&out.stdout).contains("no running attempts")
    });
    assert!(settled, "restart's attempt never left the running set");
}
