// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The queue handler: polls the persisted queue for items waiting on a
//! free concurrency slot and re-dispatches them once one opens up.
//!
//! The check-and-launch here is deliberately not atomic (spec.md §4.6):
//! brief over-subscription is corrected on the next iteration, relying on
//! a losing runner exiting cleanly when it discovers it raced another
//! dispatch for the same run.

use crate::config::SchedulerConfig;
use crate::dispatch::{DispatchOutcome, Dispatcher};
use loom_adapters::{count_alive, ProcessStore};
use loom_core::clock::Clock;
use loom_core::RunStatus;
use loom_dag::Registry;
use loom_storage::FileHistoryStore;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// How long to wait, polling, for a re-dispatched item's status to leave
/// `Queued` before giving up on this iteration (spec.md §4.6 step 5).
const CONFIRMATION_TIMEOUT: Duration = Duration::from_secs(5);
const CONFIRMATION_POLL_INTERVAL: Duration = Duration::from_millis(200);

pub struct QueueHandler<C: Clock + 'static> {
    history: Arc<FileHistoryStore>,
    processes: Arc<dyn ProcessStore>,
    registry: Arc<Registry>,
    dispatcher: Arc<Dispatcher<C>>,
    config: SchedulerConfig,
}

impl<C: Clock + 'static> QueueHandler<C> {
    pub fn new(
        history: Arc<FileHistoryStore>,
        processes: Arc<dyn ProcessStore>,
        registry: Arc<Registry>,
        dispatcher: Arc<Dispatcher<C>>,
        config: SchedulerConfig,
    ) -> Self {
        Self { history, processes, registry, dispatcher, config }
    }

    /// How many `Running` attempts among DAGs sharing `queue_name` still
    /// count against its concurrency cap.
    ///
    /// A remotely-dispatched run never gets a local pid recorded, so it
    /// can't be confirmed dead via `ProcessStore` — it counts as alive
    /// unconditionally. Only attempts with a recorded pid are checked
    /// against `ProcessStore`, to exclude locally-launched runs whose
    /// process has actually died without the zombie detector having
    /// caught up yet.
    fn alive_count(&self, queue_name: &str) -> usize {
        let running_for_queue = self.history.list_running().into_iter().filter(|attempt| {
            self.registry
                .get(attempt.dag_name().as_str())
                .map(|dag| dag.queue_name() == queue_name)
                .unwrap_or(false)
        });

        let mut count = 0;
        let mut pids = Vec::new();
        for attempt in running_for_queue {
            match attempt.pid {
                Some(pid) => pids.push(pid as i32),
                None => count += 1,
            }
        }
        count + count_alive(self.processes.as_ref(), &pids)
    }

    /// `queue_name`'s effective concurrency cap: a global per-queue
    /// override, or else the `max_active_runs` of the DAG the queue is
    /// named after (the common case — a queue defaults to its one DAG's
    /// own name unless explicitly shared).
    fn max_active_runs(&self, queue_name: &str, fallback_dag_max: u32) -> u32 {
        self.config.max_active_runs(queue_name, fallback_dag_max)
    }

    /// Process every queued item once, in queue order. Returns the number
    /// of items successfully re-dispatched.
    pub async fn poll_once(&self) -> usize {
        let mut dispatched = 0;
        let queues: std::collections::BTreeSet<String> =
            self.registry.all().iter().map(|d| d.queue_name().to_string()).collect();

        for queue_name in queues {
            for item in self.history.queue_items_for(&queue_name) {
                let Some(attempt) = self.history.find_attempt(item.run_id) else {
                    // Nothing to dispatch for a vanished attempt; drop the
                    // stale queue entry.
                    let _ = self.history.dequeue(item.run_id);
                    continue;
                };
                if attempt.status != RunStatus::Queued {
                    // Raced to completion by another actor already.
                    let _ = self.history.dequeue(item.run_id);
                    continue;
                }

                let Some(dag) = self.registry.get(item.dag.name.as_str()) else {
                    tracing::warn!(dag = %item.dag.name, "queued item references an unknown DAG; dropping");
                    let _ = self.history.dequeue(item.run_id);
                    continue;
                };

                let limit = self.max_active_runs(&queue_name, dag.effective_max_active_runs());
                let alive = self.alive_count(&queue_name);
                if alive as u32 >= limit {
                    tracing::debug!(queue = %queue_name, alive, limit, "queue at capacity; deferring item");
                    continue;
                }

                match self.dispatcher.redispatch_queued(item.run_id, &item.dag, &dag.location).await {
                    Ok(DispatchOutcome::LaunchedLocally { .. } | DispatchOutcome::DispatchedRemotely) => {
                        if self.wait_for_departure_from_queued(item.run_id).await {
                            dispatched += 1;
                            let _ = self.history.dequeue(item.run_id);
                        } else {
                            // Not confirmed within the deadline: leave the item
                            // queued so a later iteration retries it rather than
                            // silently dropping a run that is owed (spec.md §4.6).
                            tracing::warn!(
                                run_id = %item.run_id,
                                "queued item did not leave Queued within the confirmation window; leaving it queued for a later iteration"
                            );
                        }
                    }
                    Ok(other) => {
                        tracing::warn!(run_id = %item.run_id, outcome = ?other, "unexpected dispatch outcome for a queued item");
                    }
                    Err(e) => {
                        tracing::error!(run_id = %item.run_id, error = %e, "failed to re-dispatch queued item");
                    }
                }
            }
        }
        dispatched
    }

    async fn wait_for_departure_from_queued(&self, run_id: loom_core::RunId) -> bool {
        let deadline = tokio::time::Instant::now() + CONFIRMATION_TIMEOUT;
        loop {
            match self.history.find_attempt(run_id) {
                Some(attempt) if attempt.status != RunStatus::Queued => return true,
                _ => {}
            }
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(CONFIRMATION_POLL_INTERVAL).await;
        }
    }

    /// Run the poll loop on `interval` until `cancel` fires.
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.config.queue_poll_interval());
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.poll_once().await;
                }
                _ = cancel.cancelled() => {
                    tracing::info!("queue handler cancelled");
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
