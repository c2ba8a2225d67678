// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory [`CacheStore`] with write-failure injection.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use beacon_core::types::{CachedResponse, RequestKey};
use beacon_core::{AdapterType, BeaconError, CacheStore, HealthStatus, PluginAdapter};

type Partition = Vec<(RequestKey, CachedResponse)>;

#[derive(Default)]
pub struct MemoryCacheStore {
    partitions: Mutex<BTreeMap<String, Partition>>,
    fail_writes: AtomicBool,
}

impl MemoryCacheStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Keys stored in one partition, in insertion order.
    pub async fn keys(&self, partition: &str) -> Vec<RequestKey> {
        self.partitions
            .lock()
            .await
            .get(partition)
            .map(|records| records.iter().map(|(k, _)| k.clone()).collect())
            .unwrap_or_default()
    }

    fn check_write(&self) -> Result<(), BeaconError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            Err(BeaconError::Storage {
                source: "injected cache write failure".into(),
            })
        } else {
            Ok(())
        }
    }
}

fn upsert(records: &mut Partition, key: &RequestKey, response: &CachedResponse) {
    match records.iter_mut().find(|(k, _)| k == key) {
        Some((_, existing)) => *existing = response.clone(),
        None => records.push((key.clone(), response.clone())),
    }
}

#[async_trait]
impl PluginAdapter for MemoryCacheStore {
    fn name(&self) -> &str {
        "memory-cache"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Cache
    }

    async fn health_check(&self) -> Result<HealthStatus, BeaconError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), BeaconError> {
        Ok(())
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn lookup(
        &self,
        partition: &str,
        key: &RequestKey,
    ) -> Result<Option<CachedResponse>, BeaconError> {
        Ok(self.partitions.lock().await.get(partition).and_then(|records| {
            records
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, r)| r.clone())
        }))
    }

    async fn store(
        &self,
        partition: &str,
        key: &RequestKey,
        response: &CachedResponse,
    ) -> Result<(), BeaconError> {
        self.check_write()?;
        let mut partitions = self.partitions.lock().await;
        upsert(
            partitions.entry(partition.to_string()).or_default(),
            key,
            response,
        );
        Ok(())
    }

    async fn store_all(
        &self,
        partition: &str,
        records: &[(RequestKey, CachedResponse)],
    ) -> Result<(), BeaconError> {
        self.check_write()?;
        let mut partitions = self.partitions.lock().await;
        let target = partitions.entry(partition.to_string()).or_default();
        for (key, response) in records {
            upsert(target, key, response);
        }
        Ok(())
    }

    async fn partitions(&self) -> Result<Vec<String>, BeaconError> {
        Ok(self
            .partitions
            .lock()
            .await
            .iter()
            .filter(|(_, records)| !records.is_empty())
            .map(|(name, _)| name.clone())
            .collect())
    }

    async fn delete_partition(&self, partition: &str) -> Result<usize, BeaconError> {
        Ok(self
            .partitions
            .lock()
            .await
            .remove(partition)
            .map(|records| records.len())
            .unwrap_or(0))
    }
}
