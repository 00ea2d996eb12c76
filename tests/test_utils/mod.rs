//! Test utilities and fixtures for portsync tests

#![allow(dead_code)]

pub mod fake_api;

use std::path::PathBuf;
use tempfile::TempDir;

/// Write `content` to a fresh port file and return its directory guard and path.
pub fn port_file_with(content: &str) -> (TempDir, PathBuf) {
    let dir = TempDir::new().expect("create temp dir");
    let path = dir.path().join("forwarded_port");
    std::fs::write(&path, content).expect("write port file");
    (dir, path)
}
