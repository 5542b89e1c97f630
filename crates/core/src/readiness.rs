// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The job readiness gate: the predicate that decides whether a schedule
//! firing actually results in a dispatch, given the DAG's most recent
//! recorded attempt.
//!
//! This is consulted by the tick driver immediately before acting on a
//! [`crate::schedule_entry::ScheduleEntry`] — separate from (and evaluated
//! before) the queue handler's concurrency throttling, since the gate's
//! job is "should this firing do anything at all", not "is there room".

use crate::run::{RunAttempt, RunStatus};
use chrono::{DateTime, Utc};

/// The gate's verdict for one schedule firing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// Act on this firing: launch, enqueue, or dispatch.
    Proceed,
    /// An attempt for this DAG is already running; this firing is a no-op.
    JobRunning,
    /// Nothing is running for this DAG, so there is nothing to stop — or,
    /// for a start firing, this tick's firing has already produced a run
    /// (the last recorded start is at or after `next_time`).
    JobFinished,
    /// The DAG is marked `skip_if_successful` and its last attempt already
    /// succeeded within the firing's own interval.
    JobSuccess,
}

impl GateDecision {
    pub fn should_proceed(&self) -> bool {
        matches!(self, GateDecision::Proceed)
    }
}

fn started_at(attempt: &RunAttempt) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(attempt.started_at_ms as i64).unwrap_or_else(Utc::now)
}

/// Evaluate a `start` schedule firing.
///
/// Checked in order (spec.md §4.4):
/// 1. An attempt already `Running` defers the firing (`JobRunning`).
/// 2. A start already recorded at or after `next_time` means this tick's
///    firing already produced a run — idempotency, not a fresh skip
///    (`JobFinished`).
/// 3. `skip_if_successful` plus a `Success` whose start falls in
///    `[prev_exec_time, next_time)` is an explicit skip (`JobSuccess`).
/// 4. Otherwise, proceed.
pub fn evaluate_start(
    latest: Option<&RunAttempt>,
    skip_if_successful: bool,
    next_time: DateTime<Utc>,
    prev_exec_time: Option<DateTime<Utc>>,
) -> GateDecision {
    let Some(attempt) = latest else {
        return GateDecision::Proceed;
    };
    if attempt.status.is_running() {
        return GateDecision::JobRunning;
    }
    let started = started_at(attempt);
    if started >= next_time {
        return GateDecision::JobFinished;
    }
    if skip_if_successful && attempt.status == RunStatus::Success {
        let after_prev = prev_exec_time.map_or(true, |prev| started >= prev);
        if after_prev {
            return GateDecision::JobSuccess;
        }
    }
    GateDecision::Proceed
}

/// Evaluate a `stop` schedule firing.
///
/// `skip_if_successful` never applies to stop: a DAG that already
/// succeeded has nothing running to stop anyway, so the distinction is
/// immaterial and the gate reports `JobFinished` either way.
pub fn evaluate_stop(latest: Option<&RunAttempt>) -> GateDecision {
    match latest {
        Some(attempt) if attempt.status.is_running() => GateDecision::Proceed,
        _ => GateDecision::JobFinished,
    }
}

/// Evaluate a `restart` schedule firing.
///
/// Restart proceeds unconditionally (spec.md §4.4: "restart semantics
/// cover both cases") — whether a prior attempt is running or already
/// terminal, the firing is acted on regardless. `skip_if_successful`
/// never applies here either.
pub fn evaluate_restart(_latest: Option<&RunAttempt>) -> GateDecision {
    GateDecision::Proceed
}

#[cfg(test)]
#[path = "readiness_tests.rs"]
mod tests;
