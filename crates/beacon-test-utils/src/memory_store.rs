// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory [`QueueStore`] with failure injection.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use beacon_core::{
    AdapterType, BeaconError, EntryId, EntryStatus, HealthStatus, IndexQuery, PluginAdapter,
    QueueEntry, QueueStore,
};

/// A queue store backed by a `HashMap`.
///
/// Every `put` is appended to a history log so tests can assert the exact
/// sequence of status transitions.
#[derive(Default)]
pub struct MemoryQueueStore {
    entries: Mutex<HashMap<EntryId, QueueEntry>>,
    history: Mutex<Vec<(EntryId, EntryStatus)>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl MemoryQueueStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make every subsequent read fail (or succeed again).
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent write fail (or succeed again).
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// `(id, status)` for every `put`, in call order.
    pub async fn history(&self) -> Vec<(EntryId, EntryStatus)> {
        self.history.lock().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn check(&self, flag: &AtomicBool, op: &str) -> Result<(), BeaconError> {
        if flag.load(Ordering::SeqCst) {
            Err(BeaconError::Storage {
                source: format!("injected {op} failure").into(),
            })
        } else {
            Ok(())
        }
    }
}

fn oldest_first(mut entries: Vec<QueueEntry>) -> Vec<QueueEntry> {
    entries.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
    entries
}

#[async_trait]
impl PluginAdapter for MemoryQueueStore {
    fn name(&self) -> &str {
        "memory-queue"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, BeaconError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), BeaconError> {
        Ok(())
    }
}

#[async_trait]
impl QueueStore for MemoryQueueStore {
    async fn initialize(&self) -> Result<(), BeaconError> {
        Ok(())
    }

    async fn close(&self) -> Result<(), BeaconError> {
        Ok(())
    }

    async fn add(&self, entry: &QueueEntry) -> Result<(), BeaconError> {
        self.check(&self.fail_writes, "write")?;
        let mut entries = self.entries.lock().await;
        if entries.contains_key(&entry.id) {
            return Err(BeaconError::DuplicateEntry {
                id: entry.id.to_string(),
            });
        }
        entries.insert(entry.id.clone(), entry.clone());
        Ok(())
    }

    async fn get(&self, id: &EntryId) -> Result<Option<QueueEntry>, BeaconError> {
        self.check(&self.fail_reads, "read")?;
        Ok(self.entries.lock().await.get(id).cloned())
    }

    async fn get_all(&self) -> Result<Vec<QueueEntry>, BeaconError> {
        self.check(&self.fail_reads, "read")?;
        Ok(oldest_first(
            self.entries.lock().await.values().cloned().collect(),
        ))
    }

    async fn get_all_by_index(&self, query: IndexQuery) -> Result<Vec<QueueEntry>, BeaconError> {
        self.check(&self.fail_reads, "read")?;
        let entries = self.entries.lock().await;
        let matching = entries
            .values()
            .filter(|e| match query {
                IndexQuery::Status(status) => e.status == status,
                IndexQuery::CreatedBefore(cutoff) => e.created_at < cutoff,
            })
            .cloned()
            .collect();
        Ok(oldest_first(matching))
    }

    async fn put(&self, entry: &QueueEntry) -> Result<(), BeaconError> {
        self.check(&self.fail_writes, "write")?;
        self.entries
            .lock()
            .await
            .insert(entry.id.clone(), entry.clone());
        self.history
            .lock()
            .await
            .push((entry.id.clone(), entry.status));
        Ok(())
    }

    async fn delete(&self, id: &EntryId) -> Result<(), BeaconError> {
        self.check(&self.fail_writes, "write")?;
        self.entries.lock().await.remove(id);
        Ok(())
    }
}
