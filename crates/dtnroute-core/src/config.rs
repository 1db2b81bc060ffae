//! Configuration system for dtnroute.
//!
//! Resolution order: environment variables → config file → defaults.
//! The daemon applies its command-line flags on top.
//!
//! Config file location:
//!   1. $DTNROUTE_CONFIG (explicit override)
//!   2. $XDG_CONFIG_HOME/dtnroute/config.toml
//!   3. ~/.config/dtnroute/config.toml

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Path the node serves the external routing channel on.
pub const EROUTING_PATH: &str = "/ws/erouting";

/// Default node address: loopback, the node's web port.
pub const DEFAULT_NODE_ADDR: &str = "127.0.0.1:3000";

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RouteConfig {
    pub node: NodeConfig,
    pub reconnect: ReconnectConfig,
    pub stats: StatsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// WebSocket URL of the node's external routing channel.
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectConfig {
    /// Reconnect after the channel closes or fails to establish.
    pub enabled: bool,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    /// Consecutive failed connects before giving up. 0 = never give up.
    pub max_attempts: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StatsConfig {
    /// Seconds between stats log lines. 0 = disabled.
    pub interval_secs: u64,
}

// ── Defaults ──────────────────────────────────────────────────────────────────

impl Default for RouteConfig {
    fn default() -> Self {
        Self {
            node: NodeConfig::default(),
            reconnect: ReconnectConfig::default(),
            stats: StatsConfig::default(),
        }
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            url: url_for_addr(DEFAULT_NODE_ADDR),
        }
    }
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            initial_delay_ms: 500,
            max_delay_ms: 30_000,
            max_attempts: 0,
        }
    }
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self { interval_secs: 30 }
    }
}

impl ReconnectConfig {
    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms.max(self.initial_delay_ms))
    }
}

impl StatsConfig {
    pub fn interval(&self) -> Option<Duration> {
        (self.interval_secs > 0).then(|| Duration::from_secs(self.interval_secs))
    }
}

/// Expand `host:port` into the node's external routing URL.
pub fn url_for_addr(addr: &str) -> String {
    format!("ws://{addr}{EROUTING_PATH}")
}

// ── Path helpers ──────────────────────────────────────────────────────────────

fn config_dir() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| dirs_or_home().join(".config"))
        .join("dtnroute")
}

fn dirs_or_home() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {0}: {1}")]
    ReadFailed(PathBuf, std::io::Error),
    #[error("failed to parse {0}: {1}")]
    ParseFailed(PathBuf, toml::de::Error),
    #[error("failed to write {0}: {1}")]
    WriteFailed(PathBuf, std::io::Error),
    #[error("failed to serialize: {0}")]
    SerializeFailed(toml::ser::Error),
    #[error("node url must start with ws:// or wss://, got {0:?}")]
    InvalidUrl(String),
}

// ── Loading ───────────────────────────────────────────────────────────────────

impl RouteConfig {
    /// Load config: env vars → file → defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::file_path();
        let mut config = if path.exists() {
            let text = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::ReadFailed(path.clone(), e))?;
            toml::from_str(&text).map_err(|e| ConfigError::ParseFailed(path.clone(), e))?
        } else {
            RouteConfig::default()
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Config file path.
    pub fn file_path() -> PathBuf {
        std::env::var("DTNROUTE_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| config_dir().join("config.toml"))
    }

    /// Write default config if none exists. Returns the path.
    pub fn write_default_if_missing() -> Result<PathBuf, ConfigError> {
        let path = Self::file_path();
        if !path.exists() {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
            }
            let text = toml::to_string_pretty(&RouteConfig::default())
                .map_err(ConfigError::SerializeFailed)?;
            std::fs::write(&path, text).map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
        }
        Ok(path)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = self.node.url.as_str();
        if url.starts_with("ws://") || url.starts_with("wss://") {
            Ok(())
        } else {
            Err(ConfigError::InvalidUrl(self.node.url.clone()))
        }
    }

    /// Apply DTNROUTE_* env var overrides.
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply DTNROUTE_* overrides from `var`. Unparsable numbers are ignored.
    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(v) = var("DTNROUTE_NODE__URL") {
            self.node.url = v;
        }
        if let Some(v) = var("DTNROUTE_RECONNECT__ENABLED") {
            self.reconnect.enabled = v == "true" || v == "1";
        }
        if let Some(v) = var("DTNROUTE_RECONNECT__MAX_ATTEMPTS") {
            if let Ok(n) = v.parse() {
                self.reconnect.max_attempts = n;
            }
        }
        if let Some(v) = var("DTNROUTE_STATS__INTERVAL_SECS") {
            if let Ok(n) = v.parse() {
                self.stats.interval_secs = n;
            }
        }
    }
}
