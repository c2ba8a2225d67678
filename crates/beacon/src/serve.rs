// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `beacon serve` command implementation.
//!
//! Runs the long-lived side of Beacon: the reachability probe feeding the
//! network monitor, the sync supervisor draining the queue, and (when
//! enabled) the caching proxy with its background scheduler. The proxy's
//! control channel is wired back into the queue so periodic sync and
//! cleanup signals reach it.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use beacon_config::BeaconConfig;
use beacon_core::BeaconError;
use beacon_proxy::{
    CachingProxy, ControlMessage, HttpUpstream, ProxyOptions, ServerConfig, spawn_scheduler,
    start_server,
};
use beacon_storage::SqliteCacheStore;
use beacon_sync::SyncEngine;

use crate::app::{self, Pipeline};
use crate::shutdown;

/// Run the `beacon serve` command until SIGINT or SIGTERM.
pub async fn run_serve(config: BeaconConfig) -> Result<(), BeaconError> {
    let probe = app::probe(&config)?;
    let initial = probe.check().await;
    let pipeline = Pipeline::open(&config, initial).await?;
    info!(%initial, "beacon starting");

    let cancel = shutdown::install_signal_handler();
    let mut tasks: Vec<JoinHandle<()>> = vec![
        probe.spawn(pipeline.monitor.clone(), cancel.clone()),
        pipeline.engine.spawn_supervisor(cancel.clone()),
    ];

    let mut server: Option<JoinHandle<Result<(), BeaconError>>> = None;
    if config.proxy.enabled {
        let cache = Arc::new(SqliteCacheStore::new(pipeline.store.database()?));
        let upstream = Arc::new(HttpUpstream::new(
            &config.proxy.upstream,
            Duration::from_secs(config.collector.timeout_secs),
        )?);
        let proxy = CachingProxy::new(
            cache,
            upstream,
            ProxyOptions::from_config(&config.app, &config.proxy),
        );
        let lifecycle = proxy.start().await;
        info!(%lifecycle, upstream = %config.proxy.upstream, "caching proxy initialized");

        let retention = chrono::Duration::days(i64::from(config.queue.retention_days));
        tasks.push(spawn_control_listener(
            proxy.control().subscribe(),
            pipeline.engine.clone(),
            retention,
            cancel.clone(),
        ));
        tasks.push(spawn_scheduler(
            proxy.control().clone(),
            Duration::from_secs(config.proxy.sync_interval_secs),
            Duration::from_secs(config.proxy.cleanup_interval_secs),
            cancel.clone(),
        ));

        let server_config = ServerConfig {
            bind_address: config.proxy.bind_address.clone(),
            port: config.proxy.port,
        };
        let server_cancel = cancel.clone();
        server = Some(tokio::spawn(async move {
            let result = start_server(server_config, proxy, server_cancel.clone()).await;
            if result.is_err() {
                // Without the proxy there is nothing for clients to talk to.
                server_cancel.cancel();
            }
            result
        }));
    } else {
        info!("caching proxy disabled");
    }

    cancel.cancelled().await;
    info!("shutting down");

    for task in tasks {
        if let Err(e) = task.await {
            warn!(error = %e, "background task ended abnormally");
        }
    }
    let server_result = match server {
        Some(handle) => handle
            .await
            .map_err(|e| BeaconError::Internal(format!("proxy server task failed: {e}")))
            .and_then(|r| r),
        None => Ok(()),
    };

    if let Err(e) = pipeline.close().await {
        error!(error = %e, "failed to close queue database");
    }
    server_result?;

    info!("beacon serve shutdown complete");
    Ok(())
}

/// Applies control messages to the queue until `cancel` fires.
///
/// A sync message requests a drain pass; a cleanup message purges completed
/// entries older than `retention`.
fn spawn_control_listener(
    mut messages: broadcast::Receiver<ControlMessage>,
    engine: Arc<SyncEngine>,
    retention: chrono::Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let message = tokio::select! {
                _ = cancel.cancelled() => break,
                message = messages.recv() => message,
            };
            match message {
                Ok(ControlMessage::SyncOfflineQueue { .. }) => {
                    debug!("control: sync requested");
                    engine.trigger().fire();
                }
                Ok(ControlMessage::CleanupOfflineQueue { .. }) => {
                    match engine.queue().purge_expired(retention).await {
                        Ok(removed) => info!(removed, "control: expired entries purged"),
                        Err(e) => warn!(error = %e, "control: cleanup failed"),
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "control listener lagged");
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}
