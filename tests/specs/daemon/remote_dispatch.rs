// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scenarios C and D (spec.md §8): a distributed DAG's queued run is
//! picked up by the queue handler and handed to the coordinator, and
//! survives the coordinator being briefly unavailable.

use crate::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

/// Returns `503` for its first `fail_first` calls, then `200` with an
/// accepting ack forever after — simulates a coordinator that's down for
/// a few polls and then recovers, without relying on wiremock's mock
/// priority/ordering rules.
struct FlakyCoordinator {
    calls: Arc<AtomicUsize>,
    fail_first: usize,
}

impl Respond for FlakyCoordinator {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        if n < self.fail_first {
            ResponseTemplate::new(503)
        } else {
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "accepted": true }))
        }
    }
}

#[test]
fn queued_remote_run_survives_coordinator_outages_and_is_eventually_dispatched() {
    // A dedicated multi-thread runtime whose worker threads keep polling
    // the mock server's listener task even while the rest of this test
    // does blocking subprocess/filesystem work outside any `block_on`.
    let rt = tokio::runtime::Builder::new_multi_thread().enable_all().build().expect("build runtime");

    let calls = Arc::new(AtomicUsize::new(0));
    let server = rt.block_on(async {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/tasks/dispatch"))
            .respond_with(FlakyCoordinator { calls: Arc::clone(&calls), fail_first: 3 })
            .mount(&server)
            .await;
        server
    });

    let project = Project::new();
    let dag_path = project.write_dag(
        "gpu-train",
        "name: gpu-train\nworker_selector:\n  gpu: \"true\"\n",
    );
    let config_path = project.write_config(&format!("coordinator_url = {:?}\n", server.uri()));
    let config = config_path.to_str().unwrap();
    let dag = dag_path.to_str().unwrap();

    // Persist the queue item ourselves, the way a remote `Start`
    // schedule entry would — this is also the "enqueue observable
    // before dispatch" property (spec.md §8 item 6): the item exists
    // before `loomd` (and therefore any coordinator call) even starts.
    let out = loom(&["enqueue", "--config", config, dag]);
    assert!(out.status.success(), "seed enqueue failed: {}", String::from_utf8_lossy(&out.stderr));
    assert_eq!(calls.load(Ordering::SeqCst), 0, "coordinator was contacted before the daemon started");

    let _daemon = DaemonGuard::spawn(&config_path, &[]);

    let recovered = wait_for(SPEC_WAIT_MAX_MS, || calls.load(Ordering::SeqCst) > 3);
    assert!(recovered, "queue handler gave up instead of retrying through the outage");

    // The failing calls prove the item wasn't dropped after a single
    // rejected dispatch attempt; it kept reappearing on the queue poll.
    assert!(calls.load(Ordering::SeqCst) >= 4, "expected at least one successful call after the outage");
}
