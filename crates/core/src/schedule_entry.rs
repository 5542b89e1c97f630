// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Flattened, time-sortable schedule entries built from a DAG's cron fields.

use crate::dag::{Dag, DagName};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use std::sync::Arc;

/// Which cron field on the DAG produced this entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    Start,
    Restart,
    Stop,
}

crate::simple_display! {
    EntryKind {
        Start => "start",
        Restart => "restart",
        Stop => "stop",
    }
}

/// One upcoming firing, combined with a cheap handle back to the DAG that
/// produced it so the tick driver never needs a second registry lookup.
#[derive(Debug, Clone)]
pub struct ScheduleEntry {
    pub kind: EntryKind,
    pub next_time: DateTime<Utc>,
    /// The firing time immediately before `next_time` on the same cron
    /// field, per spec.md §4.4 — probed once here, at entry-construction
    /// time, rather than recomputed by every reader of the entry.
    pub prev_exec_time: Option<DateTime<Utc>>,
    pub dag: Arc<Dag>,
}

impl ScheduleEntry {
    pub fn dag_name(&self) -> &DagName {
        &self.dag.name
    }
}

impl PartialEq for ScheduleEntry {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.next_time == other.next_time && self.dag.name == other.dag.name
    }
}

impl Eq for ScheduleEntry {}

/// Orders entries by firing time so a min-heap or sorted `Vec` can drive a
/// tick loop purely off `next_time`.
impl PartialOrd for ScheduleEntry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScheduleEntry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.next_time.cmp(&other.next_time)
    }
}

/// Expand every cron field on `dag` into entries whose `next_time` falls
/// at or before `now`, i.e. the firings a tick sweep starting at `now`
/// must act on. Cron fields are interpreted in `tz`; `next_time` and
/// `prev_exec_time` are still expressed in UTC.
pub fn due_entries(dag: &Arc<Dag>, now: DateTime<Utc>, tz: Tz) -> Vec<ScheduleEntry> {
    let mut entries = Vec::new();
    for sched in &dag.start_schedules {
        if let Some(next_time) = sched.next_at_or_before(now, tz) {
            let prev_exec_time = sched.prev_exec_time(next_time, tz);
            entries.push(ScheduleEntry { kind: EntryKind::Start, next_time, prev_exec_time, dag: Arc::clone(dag) });
        }
    }
    for sched in &dag.restart_schedules {
        if let Some(next_time) = sched.next_at_or_before(now, tz) {
            let prev_exec_time = sched.prev_exec_time(next_time, tz);
            entries.push(ScheduleEntry {
                kind: EntryKind::Restart,
                next_time,
                prev_exec_time,
                dag: Arc::clone(dag),
            });
        }
    }
    for sched in &dag.stop_schedules {
        if let Some(next_time) = sched.next_at_or_before(now, tz) {
            let prev_exec_time = sched.prev_exec_time(next_time, tz);
            entries.push(ScheduleEntry { kind: EntryKind::Stop, next_time, prev_exec_time, dag: Arc::clone(dag) });
        }
    }
    entries
}

#[cfg(test)]
#[path = "schedule_entry_tests.rs"]
mod tests;
