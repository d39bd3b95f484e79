//! TOML configuration.
//!
//! Every section and field has a default, so an empty file (or
//! [`Config::minimal`]) describes a catalog talking to `localhost:8080` and
//! persisting into `./data`.
//!
//! ```toml
//! [api]
//! base_url = "http://localhost:8080"
//! timeout_secs = 30
//!
//! [stream]
//! url = "ws://localhost:8080/notifications"
//! reconnect_delay_ms = 2000
//! max_reconnect_attempts = 5
//!
//! [storage]
//! backend = "file"   # or "memory"
//! dir = "./data"
//! key = "documents"
//!
//! [toasts]
//! default_duration_ms = 5000
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub stream: StreamConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub toasts: ToastConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    #[serde(default = "default_api_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_api_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_api_base_url() -> String {
    "http://localhost:8080".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct StreamConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_stream_url")]
    pub url: String,
    /// Base of the linear backoff; attempt `n` waits `n * reconnect_delay_ms`.
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,
    #[serde(default = "default_max_reconnect_attempts")]
    pub max_reconnect_attempts: u32,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            url: default_stream_url(),
            reconnect_delay_ms: default_reconnect_delay_ms(),
            max_reconnect_attempts: default_max_reconnect_attempts(),
        }
    }
}

impl StreamConfig {
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }
}

fn default_true() -> bool {
    true
}
fn default_stream_url() -> String {
    "ws://localhost:8080/notifications".to_string()
}
fn default_reconnect_delay_ms() -> u64 {
    2000
}
fn default_max_reconnect_attempts() -> u32 {
    5
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    #[serde(default = "default_backend")]
    pub backend: String,
    #[serde(default = "default_storage_dir")]
    pub dir: PathBuf,
    #[serde(default = "default_storage_key")]
    pub key: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            dir: default_storage_dir(),
            key: default_storage_key(),
        }
    }
}

fn default_backend() -> String {
    "file".to_string()
}
fn default_storage_dir() -> PathBuf {
    PathBuf::from("./data")
}
fn default_storage_key() -> String {
    "documents".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct ToastConfig {
    #[serde(default = "default_toast_ms")]
    pub default_duration_ms: u64,
}

impl Default for ToastConfig {
    fn default() -> Self {
        Self {
            default_duration_ms: default_toast_ms(),
        }
    }
}

impl ToastConfig {
    pub fn default_duration(&self) -> Duration {
        Duration::from_millis(self.default_duration_ms)
    }
}

fn default_toast_ms() -> u64 {
    5000
}

impl Config {
    /// All defaults; used when no config file exists.
    pub fn minimal() -> Self {
        Self::default()
    }

    /// Check value ranges and cross-field constraints.
    pub fn validate(&self) -> Result<()> {
        let api = self.api.base_url.trim();
        if !(api.starts_with("http://") || api.starts_with("https://")) {
            anyhow::bail!("api.base_url must be an http(s) URL, got '{}'", api);
        }
        if self.api.timeout_secs == 0 {
            anyhow::bail!("api.timeout_secs must be > 0");
        }

        if self.stream.enabled {
            if !self.stream.url.trim().starts_with("ws://") {
                anyhow::bail!("stream.url must be a ws:// URL, got '{}'", self.stream.url);
            }
            if self.stream.reconnect_delay_ms == 0 {
                anyhow::bail!("stream.reconnect_delay_ms must be > 0");
            }
            if self.stream.max_reconnect_attempts == 0 {
                anyhow::bail!("stream.max_reconnect_attempts must be >= 1");
            }
        }

        match self.storage.backend.as_str() {
            "file" | "memory" => {}
            other => anyhow::bail!(
                "Unknown storage backend: '{}'. Must be file or memory.",
                other
            ),
        }
        if self.storage.key.trim().is_empty() {
            anyhow::bail!("storage.key must not be empty");
        }

        Ok(())
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    config.validate()?;
    Ok(config)
}

/// Load `path` if it exists, otherwise fall back to [`Config::minimal`].
pub fn load_config_or_default(path: &Path) -> Result<Config> {
    if path.exists() {
        load_config(path)
    } else {
        tracing::debug!("no config at {}, using defaults", path.display());
        Ok(Config::minimal())
    }
}
