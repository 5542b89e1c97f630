// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Signal handling: SIGHUP/SIGINT/SIGTERM/SIGQUIT all trigger the same
//! graceful shutdown, expressed as cancelling a shared [`CancellationToken`]
//! rather than exiting the process directly so every in-flight task gets
//! a chance to wind down (spec.md §5).

use tokio::signal::unix::{signal, SignalKind};
use tokio_util::sync::CancellationToken;

/// Wait for any of the shutdown-triggering signals, then cancel `token`.
/// Runs until the first signal arrives; intended to be spawned once at
/// startup and left to run for the process lifetime.
pub async fn wait_for_shutdown_signal(token: CancellationToken) {
    let Ok(mut hangup) = signal(SignalKind::hangup()) else {
        tracing::error!("failed to install SIGHUP handler");
        return;
    };
    let Ok(mut interrupt) = signal(SignalKind::interrupt()) else {
        tracing::error!("failed to install SIGINT handler");
        return;
    };
    let Ok(mut terminate) = signal(SignalKind::terminate()) else {
        tracing::error!("failed to install SIGTERM handler");
        return;
    };
    let Ok(mut quit) = signal(SignalKind::quit()) else {
        tracing::error!("failed to install SIGQUIT handler");
        return;
    };

    let which = tokio::select! {
        _ = hangup.recv() => "SIGHUP",
        _ = interrupt.recv() => "SIGINT",
        _ = terminate.recv() => "SIGTERM",
        _ = quit.recv() => "SIGQUIT",
    };
    tracing::info!(signal = which, "received shutdown signal");
    token.cancel();
}
