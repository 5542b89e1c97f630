// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Keeps a [`Registry`] in sync with its directory.
//!
//! The primary path is per-event: a `notify` watcher reparses and upserts
//! (or removes) exactly the file an event names, as soon as it fires. A
//! debounced full rescan after a burst of events, and a periodic rescan
//! on a fixed interval, both sit behind that as safety nets for whatever
//! `notify` coalesces or drops outright (documented behavior of some
//! platforms' filesystem notification APIs, particularly over network
//! filesystems) — they are not how a normal create/write/remove gets
//! picked up.

use crate::registry::Registry;
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WatchError {
    #[error("setting up filesystem watch on {path}: {source}")]
    Watcher { path: std::path::PathBuf, #[source] source: notify::Error },
}

/// How long to wait after the first filesystem event in a burst before
/// rescanning, so a multi-file `git checkout` triggers one rescan instead
/// of dozens.
const DEBOUNCE: Duration = Duration::from_millis(300);

/// How often to rescan regardless of filesystem events, as a safety net.
const SAFETY_NET_INTERVAL: Duration = Duration::from_secs(60);

/// Spawn the background tasks that keep `registry` current: an event-driven
/// watcher plus a periodic safety-net rescan. Returns the `notify` watcher
/// handle, which must be kept alive for the duration the watch should run —
/// dropping it stops filesystem notifications.
pub fn spawn(registry: Arc<Registry>) -> Result<RecommendedWatcher, WatchError> {
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();

    let incremental_registry = Arc::clone(&registry);
    let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
        if let Ok(event) = res {
            apply_incremental(&incremental_registry, &event);
            if is_relevant(&event) {
                let _ = tx.send(());
            }
        }
    })
    .map_err(|source| WatchError::Watcher { path: registry.dir().to_path_buf(), source })?;

    watcher
        .watch(registry.dir(), RecursiveMode::Recursive)
        .map_err(|source| WatchError::Watcher { path: registry.dir().to_path_buf(), source })?;

    let debounced_registry = Arc::clone(&registry);
    tokio::spawn(async move {
        while rx.recv().await.is_some() {
            // Drain anything else that piled up during the debounce window
            // so a burst of events collapses into a single rescan.
            tokio::time::sleep(DEBOUNCE).await;
            while rx.try_recv().is_ok() {}
            if let Err(e) = debounced_registry.rescan() {
                tracing::warn!(error = %e, "DAG registry rescan failed after filesystem event");
            }
        }
    });

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SAFETY_NET_INTERVAL);
        interval.tick().await; // first tick fires immediately; skip it
        loop {
            interval.tick().await;
            if let Err(e) = registry.rescan() {
                tracing::warn!(error = %e, "periodic DAG registry rescan failed");
            }
        }
    });

    Ok(watcher)
}

fn is_relevant(event: &notify::Event) -> bool {
    use notify::EventKind::*;
    matches!(event.kind, Create(_) | Modify(_) | Remove(_))
        && event.paths.iter().any(|p| {
            matches!(p.extension().and_then(|e| e.to_str()), Some("yaml") | Some("yml"))
        })
}

/// Apply one filesystem event directly to the registry: upsert on
/// create/write, delete on remove. `notify` reports a rename as a
/// `Remove` for the old path and a `Create` for the new one on most
/// backends, which this falls out of naturally — no separate rename
/// handling needed.
fn apply_incremental(registry: &Registry, event: &notify::Event) {
    use notify::EventKind::*;
    for path in &event.paths {
        if !matches!(path.extension().and_then(|e| e.to_str()), Some("yaml") | Some("yml")) {
            continue;
        }
        match event.kind {
            Remove(_) => registry.remove_path(path),
            Create(_) | Modify(_) => registry.upsert_path(path),
            _ => {}
        }
    }
}
