// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for Beacon.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Beacon configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BeaconConfig {
    /// Application identity and logging.
    #[serde(default)]
    pub app: AppConfig,

    /// Local queue database settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Remote collector endpoint settings.
    #[serde(default)]
    pub collector: CollectorConfig,

    /// Queue retry and retention policy.
    #[serde(default)]
    pub queue: QueueConfig,

    /// Connectivity probe settings.
    #[serde(default)]
    pub network: NetworkConfig,

    /// Caching proxy settings.
    #[serde(default)]
    pub proxy: ProxyConfig,
}

/// Application identity configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Application name; prefixes the cache partition names.
    #[serde(default = "default_app_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: default_app_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_app_name() -> String {
    "beacon".to_string()
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
        .map(|p| p.join("beacon").join("beacon.db"))
        .and_then(|p| p.to_str().map(String::from))
        .unwrap_or_else(|| "beacon.db".to_string())
}

fn default_wal_mode() -> bool {
    true
}

/// Remote collector configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CollectorConfig {
    /// Full URL of the multipart submission endpoint.
    #[serde(default = "default_collector_endpoint")]
    pub endpoint: String,

    /// Upper bound on a single delivery attempt, in seconds.
    #[serde(default = "default_collector_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            endpoint: default_collector_endpoint(),
            timeout_secs: default_collector_timeout_secs(),
        }
    }
}

fn default_collector_endpoint() -> String {
    "http://127.0.0.1:3000/api/reports".to_string()
}

fn default_collector_timeout_secs() -> u64 {
    30
}

/// Queue retry and retention configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct QueueConfig {
    /// Delivery attempts before an entry is marked failed.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Backoff delay after the first failed attempt, in milliseconds.
    /// Doubles for every further failure.
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,

    /// Interval of the periodic sync poll, in seconds.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Age after which completed entries are purged by the cleanup signal.
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            backoff_base_ms: default_backoff_base_ms(),
            poll_interval_secs: default_poll_interval_secs(),
            retention_days: default_retention_days(),
        }
    }
}

fn default_max_retries() -> u32 {
    3
}

fn default_backoff_base_ms() -> u64 {
    1000
}

fn default_poll_interval_secs() -> u64 {
    30
}

fn default_retention_days() -> u32 {
    7
}

/// Connectivity probe configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct NetworkConfig {
    /// URL probed to decide reachability. `None` uses the collector origin.
    #[serde(default)]
    pub probe_url: Option<String>,

    /// Seconds between reachability probes.
    #[serde(default = "default_probe_interval_secs")]
    pub probe_interval_secs: u64,

    /// Timeout for a single probe request, in seconds.
    #[serde(default = "default_probe_timeout_secs")]
    pub probe_timeout_secs: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            probe_url: None,
            probe_interval_secs: default_probe_interval_secs(),
            probe_timeout_secs: default_probe_timeout_secs(),
        }
    }
}

fn default_probe_interval_secs() -> u64 {
    10
}

fn default_probe_timeout_secs() -> u64 {
    5
}

/// Caching proxy configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ProxyConfig {
    /// Run the caching proxy as part of `beacon serve`.
    #[serde(default = "default_proxy_enabled")]
    pub enabled: bool,

    /// Host address to bind.
    #[serde(default = "default_proxy_bind_address")]
    pub bind_address: String,

    /// Port to bind.
    #[serde(default = "default_proxy_port")]
    pub port: u16,

    /// Origin that requests are forwarded to.
    #[serde(default = "default_proxy_upstream")]
    pub upstream: String,

    /// Version tag of the cache partitions. Changing it retires old partitions.
    #[serde(default = "default_cache_version")]
    pub cache_version: String,

    /// Paths seeded into the static partition at install time.
    #[serde(default = "default_static_assets")]
    pub static_assets: Vec<String>,

    /// Page served for navigations when both network and cache miss.
    #[serde(default = "default_offline_path")]
    pub offline_path: String,

    /// Path prefix of the collector API surface (always network-first).
    #[serde(default = "default_api_prefix")]
    pub api_prefix: String,

    /// Seconds between background `offline-queue-sync` signals.
    #[serde(default = "default_sync_interval_secs")]
    pub sync_interval_secs: u64,

    /// Seconds between background `offline-queue-cleanup` signals.
    #[serde(default = "default_cleanup_interval_secs")]
    pub cleanup_interval_secs: u64,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            enabled: default_proxy_enabled(),
            bind_address: default_proxy_bind_address(),
            port: default_proxy_port(),
            upstream: default_proxy_upstream(),
            cache_version: default_cache_version(),
            static_assets: default_static_assets(),
            offline_path: default_offline_path(),
            api_prefix: default_api_prefix(),
            sync_interval_secs: default_sync_interval_secs(),
            cleanup_interval_secs: default_cleanup_interval_secs(),
        }
    }
}

fn default_proxy_enabled() -> bool {
    true
}

fn default_proxy_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_proxy_port() -> u16 {
    8787
}

fn default_proxy_upstream() -> String {
    "http://127.0.0.1:3000".to_string()
}

fn default_cache_version() -> String {
    "v1".to_string()
}

fn default_static_assets() -> Vec<String> {
    [
        "/",
        "/intake",
        "/dashboard",
        "/offline",
        "/manifest.json",
        "/icons/icon-192x192.png",
        "/icons/icon-512x512.png",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_offline_path() -> String {
    "/offline".to_string()
}

fn default_api_prefix() -> String {
    "/api/".to_string()
}

fn default_sync_interval_secs() -> u64 {
    300
}

fn default_cleanup_interval_secs() -> u64 {
    86_400
}
