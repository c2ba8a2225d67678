// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Layered configuration loading with Figment.
//!
//! Lookup order: `/etc/beacon/beacon.toml`, then `~/.config/beacon/beacon.toml`,
//! then `./beacon.toml`, then `BEACON_*` environment variables.

#![allow(clippy::result_large_err)] // figment::Error is external

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::BeaconConfig;

/// Config sections that environment variables may address.
const SECTIONS: &[&str] = &["app", "storage", "collector", "queue", "network", "proxy"];

/// TOML files consulted by [`load_config`], lowest priority first.
pub fn config_file_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from("/etc/beacon/beacon.toml")];
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("beacon").join("beacon.toml"));
    }
    paths.push(PathBuf::from("beacon.toml"));
    paths
}

/// Build the figment for the standard hierarchy without extracting it.
pub fn build_figment() -> Figment {
    let mut figment = Figment::new().merge(Serialized::defaults(BeaconConfig::default()));
    for path in config_file_paths() {
        figment = figment.merge(Toml::file(path));
    }
    figment.merge(env_provider())
}

/// Load configuration from the standard hierarchy with env var overrides.
pub fn load_config() -> Result<BeaconConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from an inline TOML document. No files, no env.
pub fn load_config_from_str(toml_content: &str) -> Result<BeaconConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(BeaconConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from one explicit file (the `--config` flag) plus env overrides.
pub fn load_config_from_path(path: &Path) -> Result<BeaconConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(BeaconConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// `BEACON_QUEUE_MAX_RETRIES` becomes `queue.max_retries`.
///
/// Only the first underscore after a known section name is turned into a dot,
/// so keys that contain underscores survive intact.
fn env_provider() -> Env {
    Env::prefixed("BEACON_").map(|key| map_env_key(key.as_str()).into())
}

fn map_env_key(key: &str) -> String {
    for section in SECTIONS {
        if let Some(rest) = key
            .strip_prefix(section)
            .and_then(|rest| rest.strip_prefix('_'))
        {
            return format!("{section}.{rest}");
        }
    }
    key.to_string()
}
