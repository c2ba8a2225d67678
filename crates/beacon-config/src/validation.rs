// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Collects every violation instead of stopping at the first one.

use crate::diagnostic::ConfigError;
use crate::model::BeaconConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
pub fn validate_config(config: &BeaconConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail = |message: String| errors.push(ConfigError::Validation { message });

    if config.app.name.trim().is_empty() {
        fail("app.name must not be empty".to_string());
    }
    if !LOG_LEVELS.contains(&config.app.log_level.as_str()) {
        fail(format!(
            "app.log_level `{}` is not one of {}",
            config.app.log_level,
            LOG_LEVELS.join(", ")
        ));
    }

    if config.storage.database_path.trim().is_empty() {
        fail("storage.database_path must not be empty".to_string());
    }

    if !is_http_url(&config.collector.endpoint) {
        fail(format!(
            "collector.endpoint `{}` must be an http:// or https:// URL",
            config.collector.endpoint
        ));
    }
    if config.collector.timeout_secs == 0 {
        fail("collector.timeout_secs must be at least 1".to_string());
    }

    if config.queue.max_retries == 0 {
        fail("queue.max_retries must be at least 1".to_string());
    }
    if config.queue.backoff_base_ms == 0 {
        fail("queue.backoff_base_ms must be at least 1".to_string());
    }
    if config.queue.poll_interval_secs == 0 {
        fail("queue.poll_interval_secs must be at least 1".to_string());
    }

    if let Some(url) = &config.network.probe_url
        && !is_http_url(url)
    {
        fail(format!(
            "network.probe_url `{url}` must be an http:// or https:// URL"
        ));
    }
    if config.network.probe_interval_secs == 0 {
        fail("network.probe_interval_secs must be at least 1".to_string());
    }

    let proxy = &config.proxy;
    if proxy.enabled {
        let addr = proxy.bind_address.trim();
        let is_valid_ip = addr.parse::<std::net::IpAddr>().is_ok();
        let is_valid_hostname = !addr.is_empty()
            && addr
                .chars()
                .all(|c| c.is_alphanumeric() || c == '.' || c == '-');
        if !is_valid_ip && !is_valid_hostname {
            fail(format!(
                "proxy.bind_address `{addr}` is not a valid IP address or hostname"
            ));
        }
        if !is_http_url(&proxy.upstream) {
            fail(format!(
                "proxy.upstream `{}` must be an http:// or https:// URL",
                proxy.upstream
            ));
        }
    }
    if proxy.cache_version.trim().is_empty() {
        fail("proxy.cache_version must not be empty".to_string());
    }
    for path in proxy
        .static_assets
        .iter()
        .chain([&proxy.offline_path, &proxy.api_prefix])
    {
        if !path.starts_with('/') {
            fail(format!("proxy path `{path}` must start with `/`"));
        }
    }
    if !proxy.static_assets.contains(&proxy.offline_path) {
        fail(format!(
            "proxy.static_assets must include the offline page `{}`",
            proxy.offline_path
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn is_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(validate_config(&BeaconConfig::default()).is_ok());
    }

    #[test]
    fn collects_all_errors() {
        let mut config = BeaconConfig::default();
        config.queue.max_retries = 0;
        config.collector.endpoint = "ftp://example".to_string();
        config.storage.database_path = "  ".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn disabled_proxy_skips_address_checks() {
        let mut config = BeaconConfig::default();
        config.proxy.enabled = false;
        config.proxy.bind_address = "not valid!".to_string();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn offline_page_must_be_precached() {
        let mut config = BeaconConfig::default();
        config.proxy.static_assets.retain(|p| p != "/offline");
        let errors = validate_config(&config).unwrap_err();
        assert!(errors[0].to_string().contains("offline page"));
    }
}
