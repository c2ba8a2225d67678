// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wiring shared by every command: the store, the monitor and the engine.

use std::sync::Arc;
use std::time::Duration;

use beacon_config::BeaconConfig;
use beacon_core::{BeaconError, QueueStore};
use beacon_net::{Connectivity, NetworkMonitor, ReachabilityProbe};
use beacon_storage::SqliteQueueStore;
use beacon_sync::{HttpCollector, SubmissionQueue, SyncEngine, SyncOptions};
use tracing::debug;

/// An opened queue with its delivery engine.
pub struct Pipeline {
    pub store: Arc<SqliteQueueStore>,
    pub monitor: Arc<NetworkMonitor>,
    pub engine: Arc<SyncEngine>,
}

impl Pipeline {
    /// Opens the queue database and builds the engine around it.
    ///
    /// `initial` seeds the monitor; commands that never deliver pass
    /// [`Connectivity::Offline`] so nothing reaches the network.
    pub async fn open(config: &BeaconConfig, initial: Connectivity) -> Result<Self, BeaconError> {
        let store = Arc::new(SqliteQueueStore::new(config.storage.clone()));
        store.initialize().await?;

        let collector = Arc::new(HttpCollector::from_config(&config.collector)?);
        let monitor = NetworkMonitor::new(initial);
        let engine = SyncEngine::new(
            store.clone(),
            collector,
            monitor.clone(),
            SyncOptions::from_config(&config.queue, &config.collector),
        );
        debug!(path = %config.storage.database_path, %initial, "pipeline opened");

        Ok(Self {
            store,
            monitor,
            engine,
        })
    }

    pub fn queue(&self) -> SubmissionQueue {
        self.engine.queue()
    }

    /// Stops the engine and checkpoints the database.
    pub async fn close(&self) -> Result<(), BeaconError> {
        self.engine.stop();
        self.store.close().await
    }
}

/// Probe for the configured endpoint, or the collector's origin.
pub fn probe(config: &BeaconConfig) -> Result<ReachabilityProbe, BeaconError> {
    let url = config
        .network
        .probe_url
        .clone()
        .unwrap_or_else(|| origin_of(&config.collector.endpoint).to_string());
    ReachabilityProbe::new(
        url,
        Duration::from_secs(config.network.probe_interval_secs),
        Duration::from_secs(config.network.probe_timeout_secs),
    )
}

/// `scheme://authority` of a URL.
fn origin_of(url: &str) -> &str {
    let Some(scheme_end) = url.find("://") else {
        return url;
    };
    let rest = &url[scheme_end + 3..];
    match rest.find('/') {
        Some(path_start) => &url[..scheme_end + 3 + path_start],
        None => url,
    }
}
