// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! loomd: the scheduler daemon.
//!
//! Ties together the tick driver, DAG registry, dispatcher, queue
//! handler, and zombie detector behind one process: on each wall-clock
//! minute boundary it asks the registry which schedule entries are due,
//! clears each through the readiness gate, and dispatches it locally or
//! to the coordinator.

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

use std::path::PathBuf;
use std::sync::Arc;

use loom_adapters::{coordinator_client, SystemProcessStore};
use loom_core::clock::SystemClock;
use loom_dag::{Registry, SuspendFlags};
use loom_storage::FileHistoryStore;
use tokio_util::sync::CancellationToken;

use loom_scheduler::config::SchedulerConfig;
use loom_scheduler::dispatch::Dispatcher;
use loom_scheduler::launcher::LocalLauncher;
use loom_scheduler::queue::QueueHandler;
use loom_scheduler::zombie::ZombieDetector;
use loom_scheduler::{shutdown, tick};

/// How often the registry gets a periodic snapshot, independent of the
/// minute-aligned schedule tick.
const SNAPSHOT_INTERVAL: std::time::Duration = std::time::Duration::from_secs(300);

fn config_path_from_args() -> Option<PathBuf> {
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--config" {
            return args.next().map(PathBuf::from);
        }
        if let Some(value) = arg.strip_prefix("--config=") {
            return Some(PathBuf::from(value));
        }
    }
    None
}

fn setup_logging(log_dir: &std::path::Path) -> std::io::Result<tracing_appender::non_blocking::WorkerGuard> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    std::fs::create_dir_all(log_dir)?;
    let file_appender = tracing_appender::rolling::daily(log_dir, "loomd.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking))
        .with(fmt::layer().with_writer(std::io::stderr).with_ansi(false))
        .init();

    Ok(guard)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config_flag = config_path_from_args();
    let config_path = SchedulerConfig::resolve_path(config_flag.as_deref())?;
    let config = SchedulerConfig::load(&config_path)?;

    let _log_guard = setup_logging(&config.state_dir.join("logs"))?;
    tracing::info!(config = %config_path.display(), "starting loomd");

    apply_fixed_clock_override_from_env();

    let tz: chrono_tz::Tz = config
        .timezone
        .parse()
        .map_err(|_| format!("invalid timezone {:?} in config", config.timezone))?;

    let history = Arc::new(FileHistoryStore::open(config.history_dir())?);
    let registry = Arc::new(Registry::initialize(&config.dag_dir)?);
    let suspend = Arc::new(SuspendFlags::new(config.suspend_dir()));
    let _watcher = loom_dag::spawn_watch(Arc::clone(&registry))?;

    let orchestrator_binary = config.resolve_orchestrator_binary()?;
    let launcher = Arc::new(LocalLauncher::new(orchestrator_binary, Some(config_path.clone())));
    let processes = Arc::new(SystemProcessStore);

    let coordinator = match &config.coordinator_url {
        Some(url) => Some(coordinator_client(url).await),
        None => None,
    };

    let clock = SystemClock;
    let dispatcher = Arc::new(Dispatcher::new(clock, Arc::clone(&history), Arc::clone(&launcher), coordinator));
    let queue_handler = Arc::new(QueueHandler::new(
        Arc::clone(&history),
        Arc::clone(&processes) as _,
        Arc::clone(&registry),
        Arc::clone(&dispatcher),
        config.clone(),
    ));
    let zombie_detector =
        Arc::new(ZombieDetector::new(clock, Arc::clone(&history), Arc::clone(&processes) as _));

    let cancel = CancellationToken::new();

    tokio::spawn(shutdown::wait_for_shutdown_signal(cancel.clone()));
    tokio::spawn(Arc::clone(&queue_handler).run(cancel.clone()));
    tokio::spawn(Arc::clone(&zombie_detector).run(config.zombie_detector_interval(), cancel.clone()));
    tokio::spawn(snapshot_loop(Arc::clone(&history), cancel.clone()));

    tick::run(cancel.clone(), |now| {
        let entries = registry.due_entries(now, &suspend, tz);
        // Each entry's dispatch runs in its own task so a slow one (a
        // coordinator RPC, a subprocess fork) never holds up the others
        // due in the same tick; completion order across the batch is
        // arbitrary by design.
        for entry in entries {
            let dispatcher = Arc::clone(&dispatcher);
            tokio::spawn(async move {
                match dispatcher.dispatch(&entry).await {
                    Ok(outcome) => {
                        tracing::debug!(dag = %entry.dag.name, kind = ?entry.kind, outcome = ?outcome, "dispatched schedule entry");
                    }
                    Err(e) => {
                        tracing::error!(dag = %entry.dag.name, kind = ?entry.kind, error = %e, "failed to dispatch schedule entry");
                    }
                }
            });
        }
    })
    .await;

    tracing::info!("shutting down");
    if let Err(e) = history.close() {
        tracing::error!(error = %e, "failed to close history store cleanly");
    }

    Ok(())
}

/// Pins `loom_core::clock::fixed` from `LOOM_FIXED_CLOCK_MS` (epoch
/// milliseconds), if set. Never set by an operator in production; exists
/// so integration tests can drive `loomd`'s minute-aligned tick loop
/// against a chosen instant instead of waiting on the real clock.
fn apply_fixed_clock_override_from_env() {
    let Ok(raw) = std::env::var("LOOM_FIXED_CLOCK_MS") else { return };
    let Ok(ms) = raw.parse::<i64>() else {
        tracing::warn!(raw, "ignoring unparseable LOOM_FIXED_CLOCK_MS");
        return;
    };
    let Some(at) = chrono::DateTime::<chrono::Utc>::from_timestamp_millis(ms) else {
        tracing::warn!(ms, "ignoring out-of-range LOOM_FIXED_CLOCK_MS");
        return;
    };
    tracing::info!(%at, "fixed clock override active");
    loom_core::clock::fixed::set(at);
}

async fn snapshot_loop(history: Arc<FileHistoryStore>, cancel: CancellationToken) {
    let mut ticker = tokio::time::interval(SNAPSHOT_INTERVAL);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(e) = history.snapshot(chrono::Utc::now()) {
                    tracing::error!(error = %e, "failed to write periodic snapshot");
                }
            }
            _ = cancel.cancelled() => {
                tracing::info!("snapshot loop cancelled");
                return;
            }
        }
    }
}
