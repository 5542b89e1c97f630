// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process liveness checks for the zombie detector.
//!
//! A run attempt recorded as `Running` claims a specific PID launched it.
//! The zombie detector periodically asks [`ProcessStore::is_alive`] to
//! confirm that PID still exists before trusting the `Running` status —
//! a daemon restart or an OOM-killed child leaves the WAL saying
//! "running" long after the process is gone.

use nix::sys::signal::kill;
use nix::unistd::Pid;

/// Abstraction over "is this PID alive", so the zombie detector can be
/// tested without spawning real processes.
pub trait ProcessStore: Send + Sync {
    /// Probe whether `pid` refers to a live process, without actually
    /// sending it a signal (`kill(pid, 0)` is the standard POSIX idiom
    /// for an existence check).
    fn is_alive(&self, pid: i32) -> bool;
}

/// Count how many of `pids` are still alive according to `store`.
///
/// A free function rather than a trait default so `ProcessStore` stays
/// object-safe for use behind `Arc<dyn ProcessStore>`.
pub fn count_alive(store: &dyn ProcessStore, pids: &[i32]) -> usize {
    pids.iter().filter(|pid| store.is_alive(**pid)).count()
}

/// Liveness backed by the real OS process table.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemProcessStore;

impl ProcessStore for SystemProcessStore {
    fn is_alive(&self, pid: i32) -> bool {
        // A signal value of `None` asks the kernel to validate the PID
        // and permissions without delivering anything.
        kill(Pid::from_raw(pid), None).is_ok()
    }
}

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::ProcessStore;
    use parking_lot::Mutex;
    use std::collections::HashSet;
    use std::sync::Arc;

    /// Liveness backed by an explicit set of PIDs the test controls.
    #[derive(Clone, Default)]
    pub struct FakeProcessStore {
        alive: Arc<Mutex<HashSet<i32>>>,
    }

    impl FakeProcessStore {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn mark_alive(&self, pid: i32) {
            self.alive.lock().insert(pid);
        }

        pub fn mark_dead(&self, pid: i32) {
            self.alive.lock().remove(&pid);
        }
    }

    impl ProcessStore for FakeProcessStore {
        fn is_alive(&self, pid: i32) -> bool {
            self.alive.lock().contains(&pid)
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeProcessStore;

#[cfg(test)]
#[path = "process_tests.rs"]
mod tests;
