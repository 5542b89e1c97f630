// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Clock abstraction for testable time handling.
//!
//! Production code consults [`SystemClock`], which reads real wall time
//! unless the process-wide [`fixed`] override has been set. The override
//! exists so integration tests can pin "now" without threading a fake
//! clock through every collaborator that calls `Utc::now()` indirectly
//! (e.g. cron schedule evaluation).

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

/// A clock that provides the current time.
pub trait Clock: Clone + Send + Sync {
    fn now(&self) -> Instant;
    fn epoch_ms(&self) -> u64;
    fn now_utc(&self) -> DateTime<Utc>;
}

/// Process-wide fixed-time override, guarded by a read-write lock.
///
/// Never set in production; [`SystemClock::now_utc`] falls back to real
/// wall time when this is `None`.
pub mod fixed {
    use super::*;

    static OVERRIDE: RwLock<Option<DateTime<Utc>>> = RwLock::new(None);

    /// Pin "now" to `at` for every [`SystemClock`] in this process.
    pub fn set(at: DateTime<Utc>) {
        *OVERRIDE.write() = Some(at);
    }

    /// Advance the pinned time by `delta`, or set it to `Utc::now() + delta`
    /// if no override is currently set.
    pub fn advance(delta: chrono::Duration) {
        let mut guard = OVERRIDE.write();
        *guard = Some(guard.unwrap_or_else(Utc::now) + delta);
    }

    /// Remove the override; subsequent calls read real wall time again.
    pub fn clear() {
        *OVERRIDE.write() = None;
    }

    /// Read the override, if any.
    pub fn get() -> Option<DateTime<Utc>> {
        *OVERRIDE.read()
    }
}

/// Real system clock.
#[derive(Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn epoch_ms(&self) -> u64 {
        SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis() as u64
    }

    fn now_utc(&self) -> DateTime<Utc> {
        fixed::get().unwrap_or_else(Utc::now)
    }
}

/// Fake clock for testing with independently controllable monotonic and
/// wall-clock time. Does not touch the process-wide [`fixed`] override —
/// use this when a collaborator takes a `Clock` by value; use `fixed` when
/// the collaborator reaches for `Utc::now()` on its own (e.g. third-party
/// cron-expression evaluation).
#[derive(Clone)]
pub struct FakeClock {
    instant: Arc<RwLock<Instant>>,
    utc: Arc<RwLock<DateTime<Utc>>>,
}

impl FakeClock {
    pub fn new() -> Self {
        Self {
            instant: Arc::new(RwLock::new(Instant::now())),
            utc: Arc::new(RwLock::new(Utc::now())),
        }
    }

    pub fn at(utc: DateTime<Utc>) -> Self {
        let clock = Self::new();
        *clock.utc.write() = utc;
        clock
    }

    pub fn advance(&self, duration: std::time::Duration) {
        *self.instant.write() += duration;
        *self.utc.write() += chrono::Duration::from_std(duration).unwrap_or_default();
    }

    pub fn set_utc(&self, utc: DateTime<Utc>) {
        *self.utc.write() = utc;
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for FakeClock {
    fn now(&self) -> Instant {
        *self.instant.read()
    }

    fn epoch_ms(&self) -> u64 {
        self.utc.read().timestamp_millis().max(0) as u64
    }

    fn now_utc(&self) -> DateTime<Utc> {
        *self.utc.read()
    }
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;
