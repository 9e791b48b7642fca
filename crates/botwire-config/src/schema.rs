//! Configuration schema definitions.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub driver: DriverConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// WebSocket driver configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriverConfig {
    /// `ws://host:port/path`, or `ws+unix://<encoded path>/path` for a Unix socket.
    #[serde(default = "default_url")]
    pub url: String,

    /// Sent as a bearer token when set.
    #[serde(default)]
    pub access_token: Option<String>,

    /// Identities to wait for during the handshake.
    #[serde(default)]
    pub self_ids: Vec<i64>,

    #[serde(default)]
    pub timing: TimingConfig,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            access_token: None,
            self_ids: Vec::new(),
            timing: TimingConfig::default(),
        }
    }
}

impl DriverConfig {
    /// The token, ignoring an empty string.
    pub fn token(&self) -> Option<&str> {
        self.access_token.as_deref().filter(|t| !t.is_empty())
    }
}

fn default_url() -> String {
    "ws://127.0.0.1:6700".to_string()
}

/// Driver timing, in milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingConfig {
    #[serde(default = "default_dial_backoff_ms")]
    pub dial_backoff_ms: u64,

    #[serde(default = "default_handshake_window_ms")]
    pub handshake_window_ms: u64,

    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,

    #[serde(default = "default_api_timeout_ms")]
    pub api_timeout_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            dial_backoff_ms: default_dial_backoff_ms(),
            handshake_window_ms: default_handshake_window_ms(),
            reconnect_delay_ms: default_reconnect_delay_ms(),
            api_timeout_ms: default_api_timeout_ms(),
        }
    }
}

impl TimingConfig {
    pub fn dial_backoff(&self) -> Duration {
        Duration::from_millis(self.dial_backoff_ms)
    }

    pub fn handshake_window(&self) -> Duration {
        Duration::from_millis(self.handshake_window_ms)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    pub fn api_timeout(&self) -> Duration {
        Duration::from_millis(self.api_timeout_ms)
    }
}

fn default_dial_backoff_ms() -> u64 {
    2_000
}

fn default_handshake_window_ms() -> u64 {
    5_000
}

fn default_reconnect_delay_ms() -> u64 {
    3
}

fn default_api_timeout_ms() -> u64 {
    60_000
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter directive, overridden by `RUST_LOG`.
    #[serde(default = "default_level")]
    pub level: String,

    #[serde(default)]
    pub format: LogFormat,

    /// Also write daily-rotated log files here when set.
    #[serde(default)]
    pub directory: Option<PathBuf>,

    #[serde(default = "default_file_prefix")]
    pub file_prefix: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: LogFormat::default(),
            directory: None,
            file_prefix: default_file_prefix(),
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}

fn default_file_prefix() -> String {
    "botwire.log".to_string()
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}
