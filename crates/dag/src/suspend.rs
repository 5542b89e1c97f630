// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The suspend flag store: the "per the flag store" collaborator spec.md
//! §4.2 and §6 mention alongside the registry's `Next`/`IsSuspended`
//! contract.
//!
//! A suspended DAG is represented as an empty sentinel file named
//! `<dag_name>.suspend` under a directory, so suspension survives a
//! scheduler restart without a database of its own — the same rationale
//! the WAL-plus-snapshot history store uses for durability, scaled down
//! to a single boolean per DAG.

use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SuspendError {
    #[error("updating suspend flag for {dag_name:?} at {path}: {source}")]
    Io { dag_name: String, path: PathBuf, #[source] source: std::io::Error },
}

/// Tracks which DAGs are currently suspended, backed by sentinel files
/// under a directory.
pub struct SuspendFlags {
    dir: PathBuf,
}

impl SuspendFlags {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn flag_path(&self, dag_name: &str) -> PathBuf {
        self.dir.join(format!("{dag_name}.suspend"))
    }

    /// Whether `dag_name` is currently suspended. A missing flag
    /// directory (nothing has ever been suspended) counts as "not
    /// suspended" rather than an error.
    pub fn is_suspended(&self, dag_name: &str) -> bool {
        self.flag_path(dag_name).exists()
    }

    pub fn suspend(&self, dag_name: &str) -> Result<(), SuspendError> {
        fs::create_dir_all(&self.dir)
            .map_err(|source| SuspendError::Io { dag_name: dag_name.to_string(), path: self.dir.clone(), source })?;
        let path = self.flag_path(dag_name);
        fs::write(&path, b"")
            .map_err(|source| SuspendError::Io { dag_name: dag_name.to_string(), path, source })
    }

    pub fn resume(&self, dag_name: &str) -> Result<(), SuspendError> {
        let path = self.flag_path(dag_name);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(SuspendError::Io { dag_name: dag_name.to_string(), path, source }),
        }
    }
}

#[cfg(test)]
#[path = "suspend_tests.rs"]
mod tests;
