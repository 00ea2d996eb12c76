//! One reconciliation cycle between the port file and the remote preference.

use crate::integrations::qbittorrent::{ClientError, PreferencesApi};
use crate::sync::port_file::{self, PortFileError};
use std::path::Path;
use thiserror::Error;

/// State carried from one cycle to the next. Lives only as long as the loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncState {
    /// Last file port fully processed. Zero means nothing applied yet.
    pub last_port: u16,
}

#[derive(Debug, Error)]
pub enum CycleAbort {
    #[error("error reading port file: {0}")]
    PortFile(#[from] PortFileError),

    #[error("re-authentication failed: {0}")]
    Reauth(#[source] ClientError),

    #[error("failed to get current port: {0}")]
    GetPort(#[source] ClientError),

    #[error("failed to set listening port: {0}")]
    SetPort(#[source] ClientError),
}

#[derive(Debug)]
pub enum CycleOutcome {
    /// File port matches the last processed port; no request was made.
    Unchanged(u16),
    /// Remote already listens on the file port.
    AlreadyApplied(u16),
    Updated { from: u16, to: u16 },
    Aborted(CycleAbort),
}

impl CycleOutcome {
    pub fn is_aborted(&self) -> bool {
        matches!(self, CycleOutcome::Aborted(_))
    }
}

/// Run one cycle. Aborted cycles leave `state` untouched so the next tick
/// retries the same divergence.
pub async fn sync_once<A: PreferencesApi>(
    api: &mut A,
    port_file: &Path,
    state: &mut SyncState,
) -> CycleOutcome {
    match reconcile(api, port_file, state).await {
        Ok(outcome) => outcome,
        Err(abort) => {
            match &abort {
                CycleAbort::PortFile(_) => tracing::warn!("{}", abort),
                _ => tracing::error!("{}", abort),
            }
            CycleOutcome::Aborted(abort)
        }
    }
}

async fn reconcile<A: PreferencesApi>(
    api: &mut A,
    port_file: &Path,
    state: &mut SyncState,
) -> Result<CycleOutcome, CycleAbort> {
    let file_port = port_file::read_port(port_file).await?;

    if file_port == state.last_port {
        tracing::debug!("Port unchanged: {}", file_port);
        return Ok(CycleOutcome::Unchanged(file_port));
    }

    tracing::info!(
        "Port changed from {} to {}, updating qBittorrent...",
        state.last_port,
        file_port
    );

    let current = fetch_remote_port(api).await?;
    tracing::info!("qBittorrent current port: {}", current);

    let outcome = if current == file_port {
        tracing::info!("qBittorrent already configured with correct port: {}", file_port);
        CycleOutcome::AlreadyApplied(file_port)
    } else {
        apply_port(api, file_port).await?;
        tracing::info!("Updated qBittorrent listening port to {}", file_port);
        CycleOutcome::Updated {
            from: current,
            to: file_port,
        }
    };

    state.last_port = file_port;
    Ok(outcome)
}

async fn fetch_remote_port<A: PreferencesApi>(api: &mut A) -> Result<u16, CycleAbort> {
    match api.get_listen_port().await {
        Ok(port) => Ok(port),
        Err(e) if e.is_auth_expired() => {
            tracing::info!("Session expired, re-authenticating...");
            api.authenticate().await.map_err(CycleAbort::Reauth)?;
            api.get_listen_port().await.map_err(CycleAbort::GetPort)
        }
        Err(e) => Err(CycleAbort::GetPort(e)),
    }
}

async fn apply_port<A: PreferencesApi>(api: &mut A, port: u16) -> Result<(), CycleAbort> {
    match api.set_listen_port(port).await {
        Ok(()) => Ok(()),
        Err(e) if e.is_auth_expired() => {
            tracing::info!("Session expired during set, re-authenticating...");
            api.authenticate().await.map_err(CycleAbort::Reauth)?;
            api.set_listen_port(port).await.map_err(CycleAbort::SetPort)
        }
        Err(e) => Err(CycleAbort::SetPort(e)),
    }
}
