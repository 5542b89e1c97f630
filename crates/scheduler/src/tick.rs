// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The tick driver: emits events aligned to wall-clock minute boundaries,
//! re-aligning from wall clock on every iteration rather than accumulating
//! a fixed period offset (so a slow iteration doesn't cause drift to
//! compound).

use chrono::{DateTime, Timelike, Utc};
use loom_core::clock::fixed;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const TICK_PERIOD_SECS: i64 = 60;

/// The next whole-minute boundary at or after `now`. `now` itself only
/// counts as a boundary when it falls exactly on `:00.000`; otherwise the
/// next full minute is returned.
pub fn next_minute_boundary(now: DateTime<Utc>) -> DateTime<Utc> {
    let floor = now
        - chrono::Duration::seconds(now.second() as i64)
        - chrono::Duration::nanoseconds(now.nanosecond() as i64);
    if floor < now {
        floor + chrono::Duration::seconds(TICK_PERIOD_SECS)
    } else {
        floor
    }
}

/// How long to sleep before the next tick, given `now`. Never negative —
/// callers sleeping for `Duration::ZERO` fire immediately.
pub fn sleep_duration(now: DateTime<Utc>) -> Duration {
    (next_minute_boundary(now) - now).to_std().unwrap_or(Duration::ZERO)
}

fn current_time() -> DateTime<Utc> {
    fixed::get().unwrap_or_else(Utc::now)
}

/// Run the tick loop until `cancel` fires. `on_tick` receives each tick's
/// reference time and is expected to launch its dispatch fan-out without
/// blocking the loop on completion — per spec, the loop advances only
/// after a tick's work has been *launched*, not finished.
pub async fn run<F>(cancel: CancellationToken, mut on_tick: F)
where
    F: FnMut(DateTime<Utc>),
{
    loop {
        let wait = sleep_duration(current_time());
        tokio::select! {
            _ = tokio::time::sleep(wait) => {}
            _ = cancel.cancelled() => {
                tracing::info!("tick driver cancelled before firing");
                return;
            }
        }
        if cancel.is_cancelled() {
            return;
        }
        on_tick(current_time());
    }
}

#[cfg(test)]
#[path = "tick_tests.rs"]
mod tests;
