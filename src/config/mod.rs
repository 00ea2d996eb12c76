use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_URL: &str = "http://localhost:30024";
pub const DEFAULT_USERNAME: &str = "admin";
pub const DEFAULT_PORT_FILE: &str = "/tmp/gluetun/forwarded_port";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("QBITTORRENT_PASSWORD environment variable is required")]
    MissingPassword,
}

/// Effective runtime configuration. Built once at startup and never mutated.
#[derive(Debug, Clone)]
pub struct Config {
    pub url: String,
    pub username: String,
    pub password: String,
    pub port_file: PathBuf,
    pub check_interval: Duration,
    pub wait_poll: Duration,
    pub request_timeout: Duration,
}

/// On-disk TOML layout. Every field is optional so a file can override just
/// one setting.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub qbittorrent: QbittorrentConfig,
    #[serde(default)]
    pub port_file: Option<PathBuf>,
    #[serde(default)]
    pub polling: PollingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QbittorrentConfig {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_request_timeout() -> u64 {
    10
}

impl Default for QbittorrentConfig {
    fn default() -> Self {
        Self {
            url: None,
            username: None,
            password: None,
            request_timeout_secs: default_request_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig {
    #[serde(default = "default_check_interval")]
    pub check_interval_secs: u64,
    #[serde(default = "default_wait_poll")]
    pub wait_poll_secs: u64,
}

fn default_check_interval() -> u64 {
    30
}

fn default_wait_poll() -> u64 {
    5
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            check_interval_secs: default_check_interval(),
            wait_poll_secs: default_wait_poll(),
        }
    }
}

/// Values taken from the environment or the command line. They win over the
/// config file. Empty strings count as unset.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub url: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub port_file: Option<PathBuf>,
    /// Kept as text: an unparseable interval falls back instead of failing.
    pub check_interval: Option<String>,
}

pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "portsync").map(|dirs| dirs.config_dir().to_path_buf())
}

pub fn default_config_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("config.toml"))
}

/// Load the config file (if any) and merge the overrides on top.
///
/// An explicit `path` must exist. Without one, the platform default location
/// is read only when present.
pub fn load(path: Option<&Path>, overrides: Overrides) -> Result<Config> {
    let file = match path {
        Some(p) => read_file(p)?,
        None => match default_config_path() {
            Some(p) if p.exists() => read_file(&p)?,
            _ => FileConfig::default(),
        },
    };

    Ok(resolve(file, overrides)?)
}

pub fn read_file(path: &Path) -> Result<FileConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config from {}", path.display()))?;

    let config: FileConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config from {}", path.display()))?;

    Ok(config)
}

/// Merge file values, overrides and defaults into the effective config.
pub fn resolve(file: FileConfig, overrides: Overrides) -> Result<Config, ConfigError> {
    let password = non_empty(overrides.password)
        .or(non_empty(file.qbittorrent.password))
        .ok_or(ConfigError::MissingPassword)?;

    let url = non_empty(overrides.url)
        .or(non_empty(file.qbittorrent.url))
        .unwrap_or_else(|| DEFAULT_URL.to_string());

    let username = non_empty(overrides.username)
        .or(non_empty(file.qbittorrent.username))
        .unwrap_or_else(|| DEFAULT_USERNAME.to_string());

    let port_file = overrides
        .port_file
        .filter(|p| !p.as_os_str().is_empty())
        .or(file.port_file)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_PORT_FILE));

    let file_interval = positive_or_default(
        "polling.check_interval_secs",
        file.polling.check_interval_secs,
        default_check_interval(),
    );
    let check_interval_secs = match non_empty(overrides.check_interval) {
        Some(raw) => match raw.trim().parse::<u64>() {
            Ok(secs) if secs > 0 => secs,
            _ => {
                tracing::warn!(
                    "Ignoring invalid CHECK_INTERVAL {:?}, using {}s",
                    raw,
                    file_interval
                );
                file_interval
            }
        },
        None => file_interval,
    };

    let wait_poll_secs = positive_or_default(
        "polling.wait_poll_secs",
        file.polling.wait_poll_secs,
        default_wait_poll(),
    );
    let request_timeout_secs = positive_or_default(
        "qbittorrent.request_timeout_secs",
        file.qbittorrent.request_timeout_secs,
        default_request_timeout(),
    );

    Ok(Config {
        url: url.trim_end_matches('/').to_string(),
        username,
        password,
        port_file,
        check_interval: Duration::from_secs(check_interval_secs),
        wait_poll: Duration::from_secs(wait_poll_secs),
        request_timeout: Duration::from_secs(request_timeout_secs),
    })
}

/// Zero durations are rejected the same way wherever they come from.
fn positive_or_default(key: &str, secs: u64, default: u64) -> u64 {
    if secs > 0 {
        return secs;
    }
    tracing::warn!("Ignoring invalid {} 0, using {}s", key, default);
    default
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}
