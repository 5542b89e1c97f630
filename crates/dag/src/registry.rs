// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The DAG registry: an in-memory map of every DAG definition found under
//! a directory.
//!
//! The map is updated two ways: incrementally, one file at a time, as the
//! filesystem watcher observes individual create/write/remove events
//! ([`Registry::upsert_path`], [`Registry::remove_path`]); and wholesale,
//! by [`Registry::rescan`], which is a safety net for events the watcher
//! coalesces or misses rather than the primary update path. Either way, a
//! file that is transiently unreadable during a scan leaves its
//! last-known-good entry untouched rather than disappearing from the
//! registry.

use crate::parser::parse_dag;
use crate::suspend::SuspendFlags;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use loom_core::{due_entries, Dag, DagName, ScheduleEntry};
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("reading DAG directory {path}: {source}")]
    Io { path: PathBuf, #[source] source: std::io::Error },
}

/// Holds the current set of DAGs, keyed by name.
///
/// A DAG file that fails to read or parse is skipped (and logged) rather
/// than aborting the whole scan, so one author's typo doesn't take every
/// other DAG's schedule down — and the previously known-good entry for
/// that file, if any, is left exactly as it was.
pub struct Registry {
    dags: RwLock<HashMap<DagName, Arc<Dag>>>,
    dir: PathBuf,
}

impl Registry {
    /// Build a registry from the DAGs currently on disk under `dir`.
    pub fn initialize(dir: impl Into<PathBuf>) -> Result<Self, RegistryError> {
        let dir = dir.into();
        let scan = scan_dir(&dir)?;
        Ok(Self { dags: RwLock::new(scan.parsed), dir })
    }

    /// Re-scan the directory and merge the result into the in-memory map.
    ///
    /// Unlike a wholesale replace, a file that fails to read or parse this
    /// pass leaves its existing entry in place untouched; only paths that
    /// have genuinely disappeared (no longer present under `dir` at all)
    /// are removed. Called both by the filesystem watcher, as a debounced
    /// fallback for bursts of events, and on a fixed interval as a safety
    /// net against events `notify` coalesces or drops outright — the
    /// per-file [`Self::upsert_path`]/[`Self::remove_path`] calls driven
    /// directly off individual watch events are the primary update path.
    pub fn rescan(&self) -> Result<(), RegistryError> {
        let scan = scan_dir(&self.dir)?;
        let count = self.merge_scan(scan);
        tracing::debug!(dir = %self.dir.display(), dags = count, "DAG registry rescanned");
        Ok(())
    }

    /// Reparse a single file and upsert it into the registry.
    ///
    /// A file that can't be read or doesn't parse leaves the registry
    /// unchanged rather than removing whatever entry it previously
    /// contributed — the same last-known-good behavior as `rescan`, just
    /// scoped to one path.
    pub fn upsert_path(&self, path: &Path) {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "DAG file unreadable after change event; keeping last-known-good entry"
                );
                return;
            }
        };
        match parse_dag(path, &content) {
            Ok(dag) => {
                let mut dags = self.dags.write();
                // The same path may have previously parsed under a
                // different name (the DAG was renamed in place); drop
                // that stale entry so it doesn't linger alongside the
                // fresh one.
                dags.retain(|name, existing| existing.location.as_path() != path || *name == dag.name);
                dags.insert(dag.name.clone(), Arc::new(dag));
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "skipping invalid DAG file after change event; keeping last-known-good entry"
                );
            }
        }
    }

    /// Remove whichever entry was parsed from `path`, if any.
    pub fn remove_path(&self, path: &Path) {
        self.dags.write().retain(|_, dag| dag.location.as_path() != path);
    }

    /// Merge a fresh scan into the current map: paths that failed to
    /// parse this pass keep their existing entry, paths no longer present
    /// under `dir` are dropped, and everything that parsed successfully
    /// overwrites whatever was there before. Returns the resulting size.
    fn merge_scan(&self, scan: ScanResult) -> usize {
        let mut dags = self.dags.write();
        dags.retain(|name, dag| {
            if !scan.seen_paths.contains(&dag.location) {
                // The file is gone entirely.
                false
            } else if scan.unreadable.contains(&dag.location) {
                // Transiently unreadable this pass; keep the last-known-good entry.
                true
            } else {
                // The file was read and parsed successfully this pass —
                // keep this entry only if it's the same (name, path) pair
                // the fresh scan produced; a path that now parses to a
                // different name has renamed this entry away.
                scan.parsed.get(name).map(|fresh| fresh.location == dag.location).unwrap_or(false)
            }
        });
        dags.extend(scan.parsed);
        dags.len()
    }

    pub fn get(&self, name: &str) -> Option<Arc<Dag>> {
        self.dags.read().get(name).cloned()
    }

    pub fn all(&self) -> Vec<Arc<Dag>> {
        self.dags.read().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.dags.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Every schedule firing across every DAG that is due at or before
    /// `now`, sorted by firing time. Cron fields are interpreted in `tz`.
    ///
    /// A DAG currently suspended in `suspend` contributes no entries,
    /// regardless of what its schedule would otherwise emit.
    pub fn due_entries(&self, now: DateTime<Utc>, suspend: &SuspendFlags, tz: Tz) -> Vec<ScheduleEntry> {
        let mut entries: Vec<ScheduleEntry> = self
            .dags
            .read()
            .values()
            .filter(|dag| !suspend.is_suspended(dag.name.as_str()))
            .flat_map(|dag| due_entries(dag, now, tz))
            .collect();
        entries.sort();
        entries
    }
}

/// The result of one pass over the DAG directory.
struct ScanResult {
    /// DAGs that parsed successfully this pass, keyed by name.
    parsed: HashMap<DagName, Arc<Dag>>,
    /// Paths that exist under the directory but failed to read or parse.
    unreadable: HashSet<PathBuf>,
    /// Every `.yaml`/`.yml` path seen under the directory this pass,
    /// whether or not it parsed — used to tell "genuinely deleted" apart
    /// from "transiently unreadable."
    seen_paths: HashSet<PathBuf>,
}

fn scan_dir(dir: &Path) -> Result<ScanResult, RegistryError> {
    let mut parsed = HashMap::new();
    let mut unreadable = HashSet::new();
    if !dir.exists() {
        return Ok(ScanResult { parsed, unreadable, seen_paths: HashSet::new() });
    }
    let paths = collect_dag_files(dir).map_err(|source| RegistryError::Io { path: dir.to_path_buf(), source })?;
    let seen_paths: HashSet<PathBuf> = paths.iter().cloned().collect();
    for path in paths {
        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "skipping unreadable DAG file");
                unreadable.insert(path);
                continue;
            }
        };
        match parse_dag(&path, &content) {
            Ok(dag) => {
                if let Some(existing) = parsed.insert(dag.name.clone(), Arc::new(dag)) {
                    tracing::warn!(
                        dag = %existing.name,
                        path = %path.display(),
                        "duplicate DAG name; keeping the later file in scan order"
                    );
                }
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "skipping invalid DAG file");
                unreadable.insert(path);
            }
        }
    }
    Ok(ScanResult { parsed, unreadable, seen_paths })
}

fn collect_dag_files(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut stack = vec![dir.to_path_buf()];
    while let Some(current) = stack.pop() {
        for entry in std::fs::read_dir(&current)?.flatten() {
            let path = entry.path();
            if path.is_dir() {
                stack.push(path);
            } else if matches!(path.extension().and_then(|e| e.to_str()), Some("yaml") | Some("yml")) {
                files.push(path);
            }
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
