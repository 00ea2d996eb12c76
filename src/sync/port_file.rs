//! Forwarded-port file written by the VPN sidecar.
//!
//! Format: trimmed contents are a decimal integer in [1, 65535].

use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PortFileError {
    #[error("failed to read port file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid port number: {0:?}")]
    Invalid(String),

    #[error("port number out of range: {0}")]
    OutOfRange(i64),
}

pub fn parse_port(content: &str) -> Result<u16, PortFileError> {
    let trimmed = content.trim();
    let value: i64 = trimmed
        .parse()
        .map_err(|_| PortFileError::Invalid(trimmed.to_string()))?;

    match u16::try_from(value) {
        Ok(port) if port >= 1 => Ok(port),
        _ => Err(PortFileError::OutOfRange(value)),
    }
}

pub async fn read_port(path: &Path) -> Result<u16, PortFileError> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| PortFileError::Read {
            path: path.to_path_buf(),
            source,
        })?;
    parse_port(&content)
}
