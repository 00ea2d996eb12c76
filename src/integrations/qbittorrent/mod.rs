//! qBittorrent integration
//!
//! Session-aware access to the WebUI preferences API. Callers go through
//! [`PreferencesApi`] so the sync loop never touches HTTP directly.

pub mod client;

pub use client::{ClientError, QbitClient};

/// Authenticated operations on the remote listening-port preference.
///
/// `get_listen_port` and `set_listen_port` return [`ClientError::AuthExpired`]
/// when the session is rejected; callers decide whether to `authenticate`
/// and retry.
#[allow(async_fn_in_trait)]
pub trait PreferencesApi {
    async fn authenticate(&mut self) -> Result<(), ClientError>;
    async fn get_listen_port(&mut self) -> Result<u16, ClientError>;
    async fn set_listen_port(&mut self, port: u16) -> Result<(), ClientError>;
}
