//! portsync - keeps qBittorrent's listening port in sync with a forwarded-port file
//!
//! This library crate exposes internal modules for integration testing.

pub mod config;
pub mod integrations;
pub mod sync;
