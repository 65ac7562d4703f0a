//! Graceful shutdown (§5): installs handlers for interrupt/terminate
//! signals, sets a shared flag checked once per poll cycle by the event-log
//! client's `consume` loop. No in-flight handler is interrupted mid-way —
//! the flag is only observed between records.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use pipeline_core::config::EventLogConfig;
use pipeline_eventlog::EventLogClient;

/// Spawns a background task that sets `flag` on SIGINT/SIGTERM (or Ctrl+C
/// on platforms without SIGTERM) and returns the shared flag immediately.
pub fn install(worker_name: &'static str) -> Arc<AtomicBool> {
    let flag = Arc::new(AtomicBool::new(false));
    let task_flag = flag.clone();

    tokio::spawn(async move {
        wait_for_signal().await;
        info!(worker = worker_name, "shutdown signal received, finishing in-flight work");
        task_flag.store(true, Ordering::Relaxed);
    });

    flag
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate()).expect("install SIGTERM handler");
    let mut sigint = signal(SignalKind::interrupt()).expect("install SIGINT handler");

    tokio::select! {
        _ = sigterm.recv() => {},
        _ = sigint.recv() => {},
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

/// Final step of the §5 shutdown sequence, run after the consume loop has
/// returned (the consumer itself is dropped on function exit, triggering a
/// group rebalance): flush the producer's outstanding queue and close the
/// database session. No in-flight handler is abandoned — by the time this
/// runs, the last commit or rollback has already happened.
pub async fn flush_and_close(
    worker_name: &'static str,
    eventlog: &EventLogClient,
    pool: &sqlx::PgPool,
    config: &EventLogConfig,
) {
    let undelivered = eventlog.flush(Duration::from_millis(config.flush_timeout_ms));
    if undelivered > 0 {
        warn!(worker = worker_name, undelivered, "producer flush timed out with messages still queued");
    } else {
        info!(worker = worker_name, "producer flushed cleanly");
    }

    pool.close().await;
    info!(worker = worker_name, "database session closed, exiting");
}
