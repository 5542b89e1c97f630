// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The dispatcher: turns a gate-cleared [`ScheduleEntry`] into an actual
//! launch, either via the local launcher or the coordinator client.
//!
//! Local `Start` dispatches are the one case where this crate owns a run
//! attempt's full lifecycle: it creates the attempt row, marks it
//! `Running` once the child has forked, and supervises completion so the
//! terminal status gets written without the (out-of-scope) execution
//! engine needing any awareness of the history store at all.

use crate::launcher::{LocalLauncher, Subcommand};
use loom_adapters::CoordinatorClient;
use loom_core::clock::Clock;
use loom_core::{DagRef, EntryKind, GateDecision, RunAttempt, RunId, RunStatus, ScheduleEntry};
use loom_storage::FileHistoryStore;
use loom_wire::TaskMessage;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("launching local subprocess: {0}")]
    Launch(#[from] crate::launcher::LaunchError),
    #[error("writing to the run history store: {0}")]
    Store(#[from] loom_storage::HistoryError),
    #[error("dispatching to the coordinator: {0}")]
    Coordinator(#[from] loom_adapters::CoordinatorError),
    #[error("DAG declares a worker selector but no coordinator is configured")]
    NoCoordinatorConfigured,
}

/// What came of attempting to act on one schedule entry.
#[derive(Debug)]
pub enum DispatchOutcome {
    /// The gate vetoed this firing before any dispatch was attempted.
    Skipped(GateDecision),
    /// A local child was forked for this run (`Start`/retry) and its
    /// completion will be supervised to a terminal status.
    LaunchedLocally { run_id: RunId, pid: u32 },
    /// A local control command (`stop`/`restart`) was sent; no attempt
    /// bookkeeping is owned here since there is nothing new to supervise.
    LocalControlSent,
    /// The run was persisted as a queue item for the queue handler to pick
    /// up later (remote `Start` path — coordinator-unavailability-safe).
    Enqueued { run_id: RunId },
    /// A non-`Start` remote operation (stop/restart) was sent straight to
    /// the coordinator.
    DispatchedRemotely,
}

/// Routes a gate-cleared entry to the local launcher or the coordinator,
/// and for local starts, supervises the spawned child to completion.
pub struct Dispatcher<C: Clock> {
    clock: C,
    history: Arc<FileHistoryStore>,
    launcher: Arc<LocalLauncher>,
    coordinator: Option<Arc<dyn CoordinatorClient>>,
}

impl<C: Clock + 'static> Dispatcher<C> {
    pub fn new(
        clock: C,
        history: Arc<FileHistoryStore>,
        launcher: Arc<LocalLauncher>,
        coordinator: Option<Arc<dyn CoordinatorClient>>,
    ) -> Self {
        Self { clock, history, launcher, coordinator }
    }

    fn dag_ref(entry: &ScheduleEntry) -> DagRef {
        DagRef {
            name: entry.dag.name.clone(),
            proc_group: entry.dag.proc_group(),
            worker_selector: entry.dag.worker_selector.clone(),
        }
    }

    /// Is this entry's DAG routed to a remote worker? Only true when the
    /// DAG declares a worker selector *and* a coordinator is actually
    /// configured — a distributed DAG with no coordinator URL falls back
    /// to local dispatch rather than failing every tick.
    fn is_remote(&self, entry: &ScheduleEntry) -> bool {
        entry.dag.is_distributed() && self.coordinator.is_some()
    }

    /// Apply the readiness gate, then dispatch if it proceeds.
    pub async fn dispatch(&self, entry: &ScheduleEntry) -> Result<DispatchOutcome, DispatchError> {
        let latest = self.history.latest_attempt(entry.dag_name());
        let decision = match entry.kind {
            EntryKind::Start => loom_core::evaluate_start(
                latest.as_ref(),
                entry.dag.skip_if_successful,
                entry.next_time,
                entry.prev_exec_time,
            ),
            EntryKind::Stop => loom_core::evaluate_stop(latest.as_ref()),
            EntryKind::Restart => loom_core::evaluate_restart(latest.as_ref()),
        };
        if !decision.should_proceed() {
            return Ok(DispatchOutcome::Skipped(decision));
        }

        if self.is_remote(entry) {
            self.dispatch_remote(entry, latest.as_ref()).await
        } else {
            self.dispatch_local(entry)
        }
    }

    /// Re-dispatch an already-persisted run in "retry" mode — the queue
    /// handler's use of this dispatcher, distinct from a failure retry.
    /// Does not consult the gate: the item's presence on the queue *is*
    /// the authorization to dispatch.
    pub async fn redispatch_queued(
        &self,
        run_id: RunId,
        dag: &DagRef,
        dag_path: &std::path::Path,
    ) -> Result<DispatchOutcome, DispatchError> {
        if dag.worker_selector.is_empty() || self.coordinator.is_none() {
            let pid = self.spawn_supervised(Subcommand::Retry, dag_path, run_id)?;
            Ok(DispatchOutcome::LaunchedLocally { run_id, pid })
        } else {
            let coordinator =
                self.coordinator.as_ref().ok_or(DispatchError::NoCoordinatorConfigured)?;
            let task = TaskMessage::dispatch(dag.name.clone(), run_id, dag.worker_selector.clone());
            coordinator.dispatch(task).await?;
            // The coordinator accepted the task: it owns the run from here,
            // so mark the attempt `Running` so the queue handler's
            // confirmation poll (spec.md §4.6 step 5) sees it leave `Queued`
            // and the item gets dequeued instead of retried forever.
            self.history.update_status(run_id, RunStatus::Running, self.clock.epoch_ms())?;
            Ok(DispatchOutcome::DispatchedRemotely)
        }
    }

    /// Spawn a locally-launched `Start`/`Retry` run and wire up the
    /// completion callback that closes out its attempt record.
    fn spawn_supervised(
        &self,
        subcommand: Subcommand,
        dag_path: &std::path::Path,
        run_id: RunId,
    ) -> Result<u32, DispatchError> {
        let history = Arc::clone(&self.history);
        let clock = self.clock.clone();
        let pid = self.launcher.launch_supervised(
            subcommand,
            dag_path,
            Some(run_id),
            &[],
            Some(Box::new(move |status| {
                let terminal = if status.success() { RunStatus::Success } else { RunStatus::Error };
                if let Err(e) = history.update_status(run_id, terminal, clock.epoch_ms()) {
                    tracing::error!(error = %e, %run_id, "failed to record terminal run status");
                }
            })),
        )?;
        self.history.record_pid(run_id, pid)?;
        self.history.update_status(run_id, RunStatus::Running, self.clock.epoch_ms())?;
        Ok(pid)
    }

    fn dispatch_local(&self, entry: &ScheduleEntry) -> Result<DispatchOutcome, DispatchError> {
        match entry.kind {
            EntryKind::Start => {
                let dag_ref = Self::dag_ref(entry);
                let run_id = self.history.create_attempt(dag_ref, self.clock.epoch_ms())?;
                let pid = self.spawn_supervised(Subcommand::Start, &entry.dag.location, run_id)?;
                Ok(DispatchOutcome::LaunchedLocally { run_id, pid })
            }
            EntryKind::Stop => {
                self.launcher.launch(Subcommand::Stop, &entry.dag.location, None, &[])?;
                Ok(DispatchOutcome::LocalControlSent)
            }
            EntryKind::Restart => {
                self.launcher.launch(Subcommand::Restart, &entry.dag.location, None, &[])?;
                Ok(DispatchOutcome::LocalControlSent)
            }
        }
    }

    async fn dispatch_remote(
        &self,
        entry: &ScheduleEntry,
        latest: Option<&RunAttempt>,
    ) -> Result<DispatchOutcome, DispatchError> {
        let coordinator = self.coordinator.as_ref().ok_or(DispatchError::NoCoordinatorConfigured)?;
        match entry.kind {
            EntryKind::Start => {
                let dag_ref = Self::dag_ref(entry);
                let run_id = self.history.create_attempt(dag_ref.clone(), self.clock.epoch_ms())?;
                self.history.enqueue(
                    run_id,
                    dag_ref,
                    entry.dag.queue_name().to_string(),
                    self.clock.epoch_ms(),
                )?;
                Ok(DispatchOutcome::Enqueued { run_id })
            }
            EntryKind::Stop => {
                // `evaluate_stop` only proceeds when `latest` is `Running`,
                // so there is always an existing attempt to target here.
                let run_id = latest.map(|a| a.run_id).unwrap_or_else(RunId::new);
                let task =
                    TaskMessage::stop(entry.dag.name.clone(), run_id, entry.dag.worker_selector.clone());
                coordinator.dispatch(task).await?;
                Ok(DispatchOutcome::DispatchedRemotely)
            }
            EntryKind::Restart => {
                // Restart proceeds unconditionally (spec.md §4.4), so
                // `latest` may be `None` for a DAG that has never run —
                // mint a fresh run id for the coordinator to originate in
                // that case, same as a first-ever `Start`.
                let run_id = latest.map(|a| a.run_id).unwrap_or_else(RunId::new);
                let task =
                    TaskMessage::restart(entry.dag.name.clone(), run_id, entry.dag.worker_selector.clone());
                coordinator.dispatch(task).await?;
                Ok(DispatchOutcome::DispatchedRemotely)
            }
        }
    }
}

#[cfg(test)]
#[path = "dispatch_tests.rs"]
mod tests;
