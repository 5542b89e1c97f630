// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scenario A (spec.md §8): a minute-aligned schedule fires a local
//! start without any operator ever invoking the CLI directly.

use crate::prelude::*;

#[test]
fn minute_boundary_tick_dispatches_a_local_start() {
    let project = Project::new();
    let marker = project.dag_dir().parent().unwrap().join("ran.marker");
    let yaml = format!(
        "name: ticks\nschedule:\n  start: [\"*/1 * * * *\"]\nrun: \"touch {}\"\n",
        marker.display()
    );
    project.write_dag("ticks", &yaml);
    let config_path = project.write_config("");

    // Pin the clock half a second shy of a minute boundary: the tick
    // loop wakes, finds nothing due yet, sleeps the remainder, and on
    // the next wake the boundary has "arrived" (the override never
    // advances on its own, so the loop keeps re-polling at this cadence
    // until the daemon is killed — fine for a short-lived test).
    let at = epoch_ms("2024-01-01T00:00:59.500Z");
    let _daemon = DaemonGuard::spawn(&config_path, &[("LOOM_FIXED_CLOCK_MS", &at.to_string())]);

    let ran = wait_for(SPEC_WAIT_MAX_MS, || marker.exists());
    assert!(ran, "local launcher was never invoked for the due schedule entry");
}
