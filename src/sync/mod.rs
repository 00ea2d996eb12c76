//! Polling loop that keeps the remote listening port equal to the port file.

pub mod port_file;
pub mod reconcile;

use crate::integrations::qbittorrent::PreferencesApi;
pub use reconcile::{sync_once, CycleAbort, CycleOutcome, SyncState};
use std::path::Path;
use std::time::Duration;
use tokio::time::MissedTickBehavior;

/// Block until `path` exists, checking every `delay`.
pub async fn wait_for_port_file(path: &Path, delay: Duration) {
    tracing::info!("Waiting for port file: {}", path.display());
    while !tokio::fs::try_exists(path).await.unwrap_or(false) {
        tokio::time::sleep(delay).await;
    }
    tracing::info!("Port file found, starting sync loop...");
}

/// Run a cycle immediately and then once per `interval`, forever.
///
/// Cycles are awaited inline so two never overlap.
pub async fn run<A: PreferencesApi>(api: &mut A, port_file: &Path, interval: Duration) {
    let mut state = SyncState::default();
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        // First tick completes immediately.
        ticker.tick().await;
        sync_once(api, port_file, &mut state).await;
    }
}
