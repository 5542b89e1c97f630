// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The zombie detector: periodically confirms every attempt recorded as
//! `Running` still has a live process behind it, and writes `Error` for
//! the ones that don't.
//!
//! Concurrent mutation by a real, late-arriving process is acceptable —
//! its own status write supersedes this one on a later tick. The
//! invariant here is eventual convergence, not instantaneous correctness.

use loom_adapters::ProcessStore;
use loom_core::clock::Clock;
use loom_core::RunStatus;
use loom_storage::FileHistoryStore;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Scans [`FileHistoryStore::list_running`] and reconciles it against the
/// process table. Guarded by a non-reentrant flag so a slow scan never
/// overlaps itself — a tick that finds the guard already held just skips.
pub struct ZombieDetector<C: Clock> {
    clock: C,
    history: Arc<FileHistoryStore>,
    processes: Arc<dyn ProcessStore>,
    scanning: AtomicBool,
}

impl<C: Clock> ZombieDetector<C> {
    pub fn new(clock: C, history: Arc<FileHistoryStore>, processes: Arc<dyn ProcessStore>) -> Self {
        Self { clock, history, processes, scanning: AtomicBool::new(false) }
    }

    /// Run one scan. Returns the number of attempts reaped as dead. A
    /// no-op, returning `0`, if a scan is already in progress.
    pub fn scan_once(&self) -> usize {
        if self.scanning.swap(true, Ordering::AcqRel) {
            tracing::debug!("zombie scan already in progress, skipping this tick");
            return 0;
        }
        let reaped = self.reconcile();
        self.scanning.store(false, Ordering::Release);
        reaped
    }

    fn reconcile(&self) -> usize {
        let mut reaped = 0;
        for attempt in self.history.list_running() {
            let alive = match attempt.pid {
                // No local PID on record (e.g. a remotely-dispatched run)
                // — nothing this process can probe, so leave it alone.
                None => true,
                Some(pid) => self.processes.is_alive(pid as i32),
            };
            if alive {
                continue;
            }
            let at_ms = self.clock.epoch_ms();
            if let Err(e) = self.history.update_status(attempt.run_id, RunStatus::Error, at_ms) {
                tracing::error!(error = %e, run_id = %attempt.run_id, "failed to reap zombie attempt");
                continue;
            }
            tracing::warn!(run_id = %attempt.run_id, dag = %attempt.dag_name(), "reaped zombie run");
            reaped += 1;
        }
        reaped
    }

    /// Run scans on `interval` until `cancel` fires. `None` disables the
    /// detector entirely (spec.md §4.7's "0 disables").
    pub async fn run(self: Arc<Self>, interval: Option<std::time::Duration>, cancel: CancellationToken) {
        let Some(interval) = interval else {
            tracing::info!("zombie detector disabled (interval = 0)");
            return;
        };
        let mut ticker = tokio::time::interval(interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.scan_once();
                }
                _ = cancel.cancelled() => {
                    tracing::info!("zombie detector cancelled");
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "zombie_tests.rs"]
mod tests;
