// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP reachability probe feeding a [`NetworkMonitor`].

use std::sync::Arc;
use std::time::Duration;

use beacon_core::BeaconError;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::monitor::{Connectivity, NetworkMonitor};

/// Periodically requests a URL and reports whether any HTTP response came back.
///
/// A response of any status counts as online; only transport failures and
/// timeouts count as offline.
pub struct ReachabilityProbe {
    client: reqwest::Client,
    url: String,
    interval: Duration,
}

impl ReachabilityProbe {
    pub fn new(url: String, interval: Duration, timeout: Duration) -> Result<Self, BeaconError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BeaconError::Network {
                message: format!("failed to build probe client: {e}"),
                source: Some(Box::new(e)),
            })?;
        Ok(Self {
            client,
            url,
            interval,
        })
    }

    /// Issue one probe request.
    pub async fn check(&self) -> Connectivity {
        match self.client.head(&self.url).send().await {
            Ok(response) => {
                debug!(url = %self.url, status = %response.status(), "probe reachable");
                Connectivity::Online
            }
            Err(e) => {
                debug!(url = %self.url, error = %e, "probe unreachable");
                Connectivity::Offline
            }
        }
    }

    /// Probe on every tick until `cancel` fires, reporting into `monitor`.
    pub fn spawn(self, monitor: Arc<NetworkMonitor>, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.interval);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        monitor.report(self.check().await);
                    }
                    _ = cancel.cancelled() => {
                        info!("reachability probe stopping");
                        break;
                    }
                }
            }
        })
    }
}
