// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only, newline-delimited JSON write-ahead log.
//!
//! Every durable state change is appended here before it takes effect.
//! On restart, a snapshot plus the WAL entries written after it
//! reconstruct the exact state the process had before it stopped.

use crate::backup::rotate_bak_path;
use crate::event::Event;
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WalError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// One WAL record: a sequence number plus the fact it recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalEntry {
    pub seq: u64,
    pub event: Event,
}

/// Flush after this many unflushed appends even if the interval hasn't
/// elapsed, so a burst of writes doesn't grow unbounded buffered state.
const FLUSH_THRESHOLD: u64 = 100;
/// Flush after this much time has passed since the last flush, so a
/// trickle of writes still reaches disk promptly.
const FLUSH_INTERVAL: Duration = Duration::from_millis(500);

/// An append-only log of [`Event`]s, backed by a single JSONL file.
pub struct Wal {
    path: PathBuf,
    file: File,
    write_seq: u64,
    processed_seq: u64,
    read_pos: u64,
    unflushed: u64,
    last_flush: Instant,
}

impl Wal {
    /// Open (creating if absent) the WAL at `path`.
    ///
    /// `processed_seq` is the sequence number up to which the caller has
    /// already materialized state (typically from a snapshot); entries at
    /// or below it are skipped by [`Wal::next_unprocessed`].
    ///
    /// If the file contains a corrupt or non-UTF-8 tail — e.g. a process
    /// was killed mid-write — the corrupt suffix is quarantined to a
    /// `.bak` file (rotating up to three generations) and the file is
    /// rewritten with only the entries that parsed cleanly.
    pub fn open(path: impl AsRef<Path>, processed_seq: u64) -> Result<Self, WalError> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            File::create(&path)?;
        }

        let (valid_entries, had_corruption) = scan_valid_entries(&path)?;
        if had_corruption {
            let bak_path = rotate_bak_path(&path);
            fs::rename(&path, &bak_path)?;
            rewrite_entries(&path, &valid_entries)?;
        }

        let write_seq = valid_entries.last().map(|e| e.seq).unwrap_or(0);
        let file = OpenOptions::new().append(true).open(&path)?;

        Ok(Self {
            path,
            file,
            write_seq,
            processed_seq,
            read_pos: 0,
            unflushed: 0,
            last_flush: Instant::now(),
        })
    }

    pub fn write_seq(&self) -> u64 {
        self.write_seq
    }

    pub fn processed_seq(&self) -> u64 {
        self.processed_seq
    }

    /// Append `event`, returning its assigned sequence number. Buffered —
    /// call [`Wal::flush`] (or rely on [`Wal::needs_flush`]) to guarantee
    /// durability.
    pub fn append(&mut self, event: &Event) -> Result<u64, WalError> {
        self.write_seq += 1;
        let entry = WalEntry { seq: self.write_seq, event: event.clone() };
        writeln!(self.file, "{}", serde_json::to_string(&entry)?)?;
        self.unflushed += 1;
        Ok(self.write_seq)
    }

    pub fn flush(&mut self) -> Result<(), WalError> {
        self.file.flush()?;
        self.unflushed = 0;
        self.last_flush = Instant::now();
        Ok(())
    }

    /// Whether enough unflushed writes (or enough time) have accumulated
    /// that the caller should flush before continuing.
    pub fn needs_flush(&self) -> bool {
        self.unflushed >= FLUSH_THRESHOLD
            || (self.unflushed > 0 && self.last_flush.elapsed() >= FLUSH_INTERVAL)
    }

    /// Record `seq` (and everything before it) as materialized, advancing
    /// the point [`Wal::next_unprocessed`] resumes from.
    pub fn mark_processed(&mut self, seq: u64) {
        if seq > self.processed_seq {
            self.processed_seq = seq;
        }
    }

    /// Read the next entry past `processed_seq` that hasn't been consumed
    /// yet, skipping already-processed entries and any corrupt tail.
    ///
    /// Returns `Ok(None)` — never an error — when the next unread bytes
    /// don't parse, since a concurrent writer may simply not have
    /// finished flushing a line yet.
    pub fn next_unprocessed(&mut self) -> Result<Option<WalEntry>, WalError> {
        loop {
            let mut reader = BufReader::new(File::open(&self.path)?);
            std::io::Seek::seek(&mut reader, std::io::SeekFrom::Start(self.read_pos))?;
            let mut buf = Vec::new();
            let bytes = reader.read_until(b'\n', &mut buf)?;
            if bytes == 0 {
                return Ok(None);
            }
            self.read_pos += bytes as u64;

            let line = match std::str::from_utf8(&buf) {
                Ok(s) => trim_newline(s),
                Err(_) => return Ok(None),
            };
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<WalEntry>(line) {
                Ok(entry) if entry.seq > self.processed_seq => return Ok(Some(entry)),
                Ok(_) => continue,
                Err(_) => return Ok(None),
            }
        }
    }

    /// Every valid entry with `seq > after`, stopping at the first
    /// corrupt or non-UTF-8 line rather than erroring.
    pub fn entries_after(&self, after: u64) -> Result<Vec<WalEntry>, WalError> {
        let (entries, _had_corruption) = scan_valid_entries(&self.path)?;
        Ok(entries.into_iter().filter(|e| e.seq > after).collect())
    }

    /// Drop every entry with `seq < keep_from`, rewriting the file in
    /// place. Used after a snapshot makes older entries unnecessary for
    /// recovery.
    pub fn truncate_before(&mut self, keep_from: u64) -> Result<(), WalError> {
        let (entries, _) = scan_valid_entries(&self.path)?;
        let kept: Vec<WalEntry> = entries.into_iter().filter(|e| e.seq >= keep_from).collect();
        rewrite_entries(&self.path, &kept)?;
        self.file = OpenOptions::new().append(true).open(&self.path)?;
        self.read_pos = 0;
        Ok(())
    }
}

fn trim_newline(s: &str) -> &str {
    s.trim_end_matches('\n').trim_end_matches('\r')
}

/// Scan `path` from the start, returning every entry that parses cleanly
/// and whether a corrupt or non-UTF-8 line cut the scan short.
fn scan_valid_entries(path: &Path) -> Result<(Vec<WalEntry>, bool), WalError> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut entries = Vec::new();
    let mut buf = Vec::new();
    loop {
        buf.clear();
        let bytes = reader.read_until(b'\n', &mut buf)?;
        if bytes == 0 {
            return Ok((entries, false));
        }
        let line = match std::str::from_utf8(&buf) {
            Ok(s) => trim_newline(s),
            Err(_) => return Ok((entries, true)),
        };
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<WalEntry>(line) {
            Ok(entry) => entries.push(entry),
            Err(_) => return Ok((entries, true)),
        }
    }
}

fn rewrite_entries(path: &Path, entries: &[WalEntry]) -> Result<(), WalError> {
    let mut file = File::create(path)?;
    for entry in entries {
        writeln!(file, "{}", serde_json::to_string(entry)?)?;
    }
    file.flush()?;
    Ok(())
}

#[cfg(test)]
#[path = "wal_tests.rs"]
mod tests;
