// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! loom-core: domain types shared by every `loom` crate — DAG identity,
//! run attempts, the clock abstraction, cron arithmetic, and the job
//! readiness gate.

pub mod macros;

pub mod clock;
pub mod dag;
pub mod readiness;
pub mod run;
pub mod schedule;
pub mod schedule_entry;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use clock::{Clock, FakeClock, SystemClock};
pub use dag::{Dag, DagName};
pub use readiness::{evaluate_restart, evaluate_start, evaluate_stop, GateDecision};
pub use run::{DagRef, RunAttempt, RunId, RunRef, RunStatus};
pub use schedule::{CronSchedule, ScheduleParseError};
pub use schedule_entry::{due_entries, EntryKind, ScheduleEntry};
