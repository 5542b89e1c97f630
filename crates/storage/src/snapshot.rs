// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Snapshot persistence for crash recovery.
//!
//! A snapshot stores the complete materialized state at a point in time,
//! identified by the WAL sequence number it was taken at. Recovery loads
//! the snapshot and replays WAL entries after that sequence.

use crate::backup::rotate_bak_path;
use crate::migration::{MigrationError, MigrationRegistry};
use crate::state::MaterializedState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use thiserror::Error;

/// Current snapshot schema version.
pub const CURRENT_SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("migration error: {0}")]
    Migration(#[from] MigrationError),
}

/// A point-in-time capture of [`MaterializedState`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(rename = "v")]
    pub version: u32,
    /// WAL sequence number at the time of snapshot.
    pub seq: u64,
    pub state: MaterializedState,
    pub created_at: DateTime<Utc>,
}

impl Snapshot {
    pub fn new(seq: u64, state: MaterializedState, created_at: DateTime<Utc>) -> Self {
        Self { version: CURRENT_SNAPSHOT_VERSION, seq, state, created_at }
    }

    /// Write the snapshot to `path` atomically via a same-directory
    /// temp file and rename, so a crash mid-write never leaves a
    /// half-written snapshot in place of a good one.
    pub fn save(&self, path: &Path) -> Result<(), SnapshotError> {
        let tmp_path = path.with_extension("tmp");
        {
            let mut file = File::create(&tmp_path)?;
            serde_json::to_writer_pretty(&mut file, self)?;
            file.flush()?;
        }
        fs::rename(&tmp_path, path)?;
        Ok(())
    }

    /// Load the snapshot at `path`, migrating it to
    /// [`CURRENT_SNAPSHOT_VERSION`] if it was written by an older binary.
    ///
    /// A snapshot that fails to parse is quarantined to `.bak` (rotating
    /// prior backups) and treated as absent, so a corrupt snapshot falls
    /// back to a cold start from the WAL rather than blocking recovery.
    pub fn load(path: &Path, migrations: &MigrationRegistry) -> Result<Option<Self>, SnapshotError> {
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(path)?;
        let raw: serde_json::Value = match serde_json::from_str(&content) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "quarantining corrupt snapshot");
                let bak_path = rotate_bak_path(path);
                fs::rename(path, &bak_path)?;
                return Ok(None);
            }
        };
        let migrated = migrations.migrate_to(raw, CURRENT_SNAPSHOT_VERSION)?;
        let snapshot: Snapshot = serde_json::from_value(migrated)?;
        Ok(Some(snapshot))
    }
}

#[cfg(test)]
#[path = "snapshot_tests.rs"]
mod tests;
