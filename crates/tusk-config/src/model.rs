// SPDX-FileCopyrightText: 2026 Tusk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use std::net::SocketAddr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level Tusk configuration.
///
/// Every section is optional and defaults to values suitable for a single
/// small instance.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TuskConfig {
    /// Instance identity and logging.
    #[serde(default)]
    pub server: ServerConfig,

    /// SQLite storage settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Worker pool and message retry settings.
    #[serde(default)]
    pub workers: WorkersConfig,

    /// Outbound federation delivery settings.
    #[serde(default)]
    pub delivery: DeliveryConfig,

    /// Transactional email settings.
    #[serde(default)]
    pub email: EmailConfig,

    /// Entity cache settings.
    #[serde(default)]
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Domain this instance serves, e.g. `social.example.org`.
    #[serde(default = "default_host")]
    pub host: String,

    /// `https` in production; `http` only for local testing.
    #[serde(default = "default_protocol")]
    pub protocol: String,

    /// Human readable instance name used in emails.
    #[serde(default = "default_instance_name")]
    pub instance_name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Address to serve Prometheus metrics on while running. Unset keeps
    /// metrics in-process.
    #[serde(default)]
    pub metrics_listen: Option<SocketAddr>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            protocol: default_protocol(),
            instance_name: default_instance_name(),
            log_level: default_log_level(),
            metrics_listen: None,
        }
    }
}

impl ServerConfig {
    /// `protocol://host`, no trailing slash.
    pub fn base_url(&self) -> String {
        format!("{}://{}", self.protocol, self.host)
    }
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_protocol() -> String {
    "https".to_string()
}

fn default_instance_name() -> String {
    "tusk".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("tusk").join("tusk.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("tusk.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

/// Exponential backoff curve, shared by message retries and delivery retries.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BackoffConfig {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    /// Delay before the first retry, in milliseconds.
    pub base_ms: u64,
    /// Upper bound on any single delay, in milliseconds.
    pub max_ms: u64,
    /// Growth factor between consecutive delays.
    pub multiplier: f64,
}

impl BackoffConfig {
    pub fn base(&self) -> Duration {
        Duration::from_millis(self.base_ms)
    }

    pub fn max(&self) -> Duration {
        Duration::from_millis(self.max_ms)
    }
}

/// Worker pool configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WorkersConfig {
    /// Number of concurrent executors. Defaults to the available parallelism.
    #[serde(default = "default_worker_count")]
    pub count: usize,

    /// Deadline for a single handler invocation, in seconds.
    #[serde(default = "default_handler_timeout_secs")]
    pub handler_timeout_secs: u64,

    /// How long `stop` waits for queued work before dead-lettering the rest.
    #[serde(default = "default_drain_timeout_secs")]
    pub drain_timeout_secs: u64,

    /// Retry curve for messages whose handlers fail transiently.
    #[serde(default = "default_message_backoff")]
    pub retry: BackoffConfig,
}

impl Default for WorkersConfig {
    fn default() -> Self {
        Self {
            count: default_worker_count(),
            handler_timeout_secs: default_handler_timeout_secs(),
            drain_timeout_secs: default_drain_timeout_secs(),
            retry: default_message_backoff(),
        }
    }
}

impl WorkersConfig {
    pub fn handler_timeout(&self) -> Duration {
        Duration::from_secs(self.handler_timeout_secs)
    }

    pub fn drain_timeout(&self) -> Duration {
        Duration::from_secs(self.drain_timeout_secs)
    }
}

fn default_worker_count() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

fn default_handler_timeout_secs() -> u64 {
    120
}

fn default_drain_timeout_secs() -> u64 {
    300
}

fn default_message_backoff() -> BackoffConfig {
    BackoffConfig {
        max_attempts: 5,
        base_ms: 1_000,
        max_ms: 300_000,
        multiplier: 2.0,
    }
}

/// Outbound federation delivery configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DeliveryConfig {
    /// Per-request timeout, in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Inboxes delivered to concurrently for one message.
    #[serde(default = "default_delivery_concurrency")]
    pub concurrency: usize,

    /// Upper bound on a server-provided `Retry-After`, in seconds.
    #[serde(default = "default_max_retry_after_secs")]
    pub max_retry_after_secs: u64,

    /// User-Agent header sent with every delivery.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Retry curve for transient failures of a single inbox.
    #[serde(default = "default_delivery_backoff")]
    pub retry: BackoffConfig,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: default_request_timeout_secs(),
            concurrency: default_delivery_concurrency(),
            max_retry_after_secs: default_max_retry_after_secs(),
            user_agent: default_user_agent(),
            retry: default_delivery_backoff(),
        }
    }
}

impl DeliveryConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn max_retry_after(&self) -> Duration {
        Duration::from_secs(self.max_retry_after_secs)
    }
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_delivery_concurrency() -> usize {
    8
}

fn default_max_retry_after_secs() -> u64 {
    30
}

fn default_user_agent() -> String {
    format!("tusk/{}", env!("CARGO_PKG_VERSION"))
}

fn default_delivery_backoff() -> BackoffConfig {
    BackoffConfig {
        max_attempts: 4,
        base_ms: 500,
        max_ms: 30_000,
        multiplier: 2.0,
    }
}

/// SMTP configuration. Email is disabled unless `enabled = true`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EmailConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default)]
    pub smtp_host: Option<String>,

    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,

    #[serde(default)]
    pub smtp_username: Option<String>,

    #[serde(default)]
    pub smtp_password: Option<String>,

    /// Sender address, e.g. `Tusk <noreply@social.example.org>`.
    #[serde(default)]
    pub from: Option<String>,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            smtp_host: None,
            smtp_port: default_smtp_port(),
            smtp_username: None,
            smtp_password: None,
            from: None,
        }
    }
}

fn default_smtp_port() -> u16 {
    587
}

/// Entity cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CacheConfig {
    /// Maximum cached entries per entity kind.
    #[serde(default = "default_cache_max_entries")]
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: default_cache_max_entries(),
        }
    }
}

fn default_cache_max_entries() -> usize {
    10_000
}
