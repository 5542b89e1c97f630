// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cron expression parsing and firing-time arithmetic.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use cron::Schedule as CronExpr;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("invalid cron expression {expr:?}: {source}")]
pub struct ScheduleParseError {
    expr: String,
    #[source]
    source: cron::error::Error,
}

/// A parsed cron expression, paired with the source text for logging.
#[derive(Debug, Clone)]
pub struct CronSchedule {
    expr: String,
    inner: CronExpr,
}

impl CronSchedule {
    /// Parse a standard 5-field cron expression (`min hour dom month dow`,
    /// as every DAG's `schedule:` entries are written). The underlying
    /// `cron` crate speaks Quartz's 6/7-field dialect with a leading
    /// seconds column, so a bare 5-field expression is normalized by
    /// pinning seconds to `0`; a caller that already supplies a seconds
    /// field is passed through unchanged.
    pub fn parse(expr: &str) -> Result<Self, ScheduleParseError> {
        let normalized = match expr.split_whitespace().count() {
            5 => format!("0 {expr}"),
            _ => expr.to_string(),
        };
        let inner = CronExpr::from_str(&normalized)
            .map_err(|source| ScheduleParseError { expr: expr.to_string(), source })?;
        Ok(Self { expr: expr.to_string(), inner })
    }

    pub fn source(&self) -> &str {
        &self.expr
    }

    /// The next firing time strictly after `after`, with cron fields
    /// (hour, day-of-week, ...) interpreted in `tz` — the minute-granular
    /// instant returned is still expressed in UTC.
    pub fn next_after(&self, after: DateTime<Utc>, tz: Tz) -> Option<DateTime<Utc>> {
        let local_after = after.with_timezone(&tz);
        self.inner.after(&local_after).next().map(|t| t.with_timezone(&Utc))
    }

    /// The most recent firing time at or before `now` (inclusive of `now`
    /// itself, since the registry's tick window is `[now - 1s, now]`),
    /// with cron fields interpreted in `tz`.
    ///
    /// `cron`'s iterator only walks forward, so this steps back from `now`
    /// by generous windows until it finds a firing, then confirms there is
    /// no later one still `<= now`.
    pub fn next_at_or_before(&self, now: DateTime<Utc>, tz: Tz) -> Option<DateTime<Utc>> {
        let local_now = now.with_timezone(&tz);
        let mut probe = local_now - chrono::Duration::days(1);
        for _ in 0..8 {
            if let Some(candidate) =
                self.inner.after(&probe).take_while(|t| *t <= local_now).last()
            {
                return Some(candidate.with_timezone(&Utc));
            }
            probe -= chrono::Duration::days(1);
        }
        None
    }

    /// The firing time immediately before `next_time`, derived by probing
    /// one step past `next_time` and subtracting the resulting period.
    ///
    /// This handles irregular cron intervals (e.g. `"0 9 * * 1-5"`) without
    /// the caller needing to persist any extra state.
    pub fn prev_exec_time(&self, next_time: DateTime<Utc>, tz: Tz) -> Option<DateTime<Utc>> {
        let after_next = self.next_after(next_time, tz)?;
        let period = after_next - next_time;
        if period <= chrono::Duration::zero() {
            return None;
        }
        Some(next_time - period)
    }
}

impl PartialEq for CronSchedule {
    fn eq(&self, other: &Self) -> bool {
        self.expr == other.expr
    }
}

impl Eq for CronSchedule {}

#[cfg(test)]
#[path = "schedule_tests.rs"]
mod tests;
