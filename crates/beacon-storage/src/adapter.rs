// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementations of [`QueueStore`] and [`CacheStore`].

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::debug;

use beacon_config::model::StorageConfig;
use beacon_core::types::{CachedResponse, RequestKey};
use beacon_core::{
    AdapterType, BeaconError, CacheStore, EntryId, HealthStatus, IndexQuery, PluginAdapter,
    QueueEntry, QueueStore,
};

use crate::database::{Database, map_tr_err};
use crate::queries;

async fn ping(db: &Database) -> Result<HealthStatus, BeaconError> {
    db.connection()
        .call(|conn| -> Result<(), rusqlite::Error> { conn.execute_batch("SELECT 1;") })
        .await
        .map_err(map_tr_err)?;
    Ok(HealthStatus::Healthy)
}

/// SQLite-backed queue store.
///
/// The database is opened lazily by [`QueueStore::initialize`]; every other
/// operation fails with a storage error until then.
pub struct SqliteQueueStore {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteQueueStore {
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    /// The opened database, for sharing with a [`SqliteCacheStore`].
    pub fn database(&self) -> Result<Database, BeaconError> {
        self.db().cloned()
    }

    fn db(&self) -> Result<&Database, BeaconError> {
        self.db.get().ok_or_else(|| BeaconError::Storage {
            source: "queue store not initialized; call initialize() first".into(),
        })
    }
}

#[async_trait]
impl PluginAdapter for SqliteQueueStore {
    fn name(&self) -> &str {
        "sqlite-queue"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, BeaconError> {
        match self.db.get() {
            Some(db) => ping(db).await,
            None => Ok(HealthStatus::Unhealthy("not initialized".to_string())),
        }
    }

    async fn shutdown(&self) -> Result<(), BeaconError> {
        if let Some(db) = self.db.get() {
            db.checkpoint().await?;
        }
        Ok(())
    }
}

#[async_trait]
impl QueueStore for SqliteQueueStore {
    async fn initialize(&self) -> Result<(), BeaconError> {
        let db = Database::open(&self.config.database_path, self.config.wal_mode).await?;
        self.db.set(db).map_err(|_| BeaconError::Storage {
            source: "queue store already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite queue store initialized");
        Ok(())
    }

    async fn close(&self) -> Result<(), BeaconError> {
        self.db()?.checkpoint().await
    }

    async fn add(&self, entry: &QueueEntry) -> Result<(), BeaconError> {
        queries::queue::add_entry(self.db()?, entry).await
    }

    async fn get(&self, id: &EntryId) -> Result<Option<QueueEntry>, BeaconError> {
        queries::queue::get_entry(self.db()?, id).await
    }

    async fn get_all(&self) -> Result<Vec<QueueEntry>, BeaconError> {
        queries::queue::list_entries(self.db()?).await
    }

    async fn get_all_by_index(&self, query: IndexQuery) -> Result<Vec<QueueEntry>, BeaconError> {
        queries::queue::list_by_index(self.db()?, query).await
    }

    async fn put(&self, entry: &QueueEntry) -> Result<(), BeaconError> {
        queries::queue::put_entry(self.db()?, entry).await
    }

    async fn delete(&self, id: &EntryId) -> Result<(), BeaconError> {
        queries::queue::delete_entry(self.db()?, id).await
    }
}

/// SQLite-backed response cache sharing the queue's database.
pub struct SqliteCacheStore {
    db: Database,
}

impl SqliteCacheStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl PluginAdapter for SqliteCacheStore {
    fn name(&self) -> &str {
        "sqlite-cache"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Cache
    }

    async fn health_check(&self) -> Result<HealthStatus, BeaconError> {
        ping(&self.db).await
    }

    async fn shutdown(&self) -> Result<(), BeaconError> {
        Ok(())
    }
}

#[async_trait]
impl CacheStore for SqliteCacheStore {
    async fn lookup(
        &self,
        partition: &str,
        key: &RequestKey,
    ) -> Result<Option<CachedResponse>, BeaconError> {
        queries::cache::lookup(&self.db, partition, key).await
    }

    async fn store(
        &self,
        partition: &str,
        key: &RequestKey,
        response: &CachedResponse,
    ) -> Result<(), BeaconError> {
        queries::cache::store(&self.db, partition, key, response).await
    }

    async fn store_all(
        &self,
        partition: &str,
        records: &[(RequestKey, CachedResponse)],
    ) -> Result<(), BeaconError> {
        queries::cache::store_all(&self.db, partition, records).await
    }

    async fn partitions(&self) -> Result<Vec<String>, BeaconError> {
        queries::cache::partitions(&self.db).await
    }

    async fn delete_partition(&self, partition: &str) -> Result<usize, BeaconError> {
        queries::cache::delete_partition(&self.db, partition).await
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use tempfile::{TempDir, tempdir};

    use beacon_core::{Attachment, EntryStatus, NewSubmission, Payload};

    use super::*;

    async fn open_store() -> (SqliteQueueStore, TempDir) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("queue.db");
        let store = SqliteQueueStore::new(StorageConfig {
            database_path: path.to_str().unwrap().to_string(),
            wal_mode: true,
        });
        store.initialize().await.unwrap();
        (store, dir)
    }

    fn voice_entry() -> QueueEntry {
        let payload = Payload::Audio {
            clips: vec![
                Attachment::new("part-1.webm", "audio/webm", vec![1, 2, 3]),
                Attachment::new("part-2.webm", "audio/webm", vec![4, 5]),
            ],
            transcript: Some("bridge closed".to_string()),
        };
        QueueEntry::from_submission(
            NewSubmission::new(payload)
                .with_lang("en")
                .with_location(35.1796, 129.0756),
            3,
        )
    }

    #[tokio::test]
    async fn adapter_identity() {
        let store = SqliteQueueStore::new(StorageConfig::default());
        assert_eq!(store.name(), "sqlite-queue");
        assert_eq!(store.adapter_type(), AdapterType::Storage);
        assert!(matches!(
            store.health_check().await.unwrap(),
            HealthStatus::Unhealthy(_)
        ));
    }

    #[tokio::test]
    async fn operations_before_initialize_fail() {
        let store = SqliteQueueStore::new(StorageConfig::default());
        let err = store.get_all().await.unwrap_err();
        assert!(err.to_string().contains("not initialized"));
    }

    #[tokio::test]
    async fn add_then_get_round_trips_payload_and_attachments() {
        let (store, _dir) = open_store().await;
        let entry = voice_entry();
        store.add(&entry).await.unwrap();

        let loaded = store.get(&entry.id).await.unwrap().expect("entry stored");
        assert_eq!(loaded, entry);
        assert_eq!(loaded.payload.attachments()[1].file_name, "part-2.webm");
    }

    #[tokio::test]
    async fn add_rejects_duplicate_id() {
        let (store, _dir) = open_store().await;
        let entry = voice_entry();
        store.add(&entry).await.unwrap();
        let err = store.add(&entry).await.unwrap_err();
        assert!(matches!(err, BeaconError::DuplicateEntry { .. }));
    }

    #[tokio::test]
    async fn put_updates_lifecycle_fields_only() {
        let (store, _dir) = open_store().await;
        let mut entry = voice_entry();
        store.add(&entry).await.unwrap();

        entry.status = EntryStatus::Failed;
        entry.retry_count = 3;
        entry.error_message = Some("Max retries exceeded".to_string());
        store.put(&entry).await.unwrap();

        let loaded = store.get(&entry.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, EntryStatus::Failed);
        assert_eq!(loaded.retry_count, 3);
        assert_eq!(loaded.error_message.as_deref(), Some("Max retries exceeded"));
        assert_eq!(loaded.payload.attachments().len(), 2);
    }

    #[tokio::test]
    async fn put_inserts_missing_entry() {
        let (store, _dir) = open_store().await;
        let entry = voice_entry();
        store.put(&entry).await.unwrap();
        assert!(store.get(&entry.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn delete_is_idempotent_and_removes_attachments() {
        let (store, _dir) = open_store().await;
        let entry = voice_entry();
        store.add(&entry).await.unwrap();
        store.delete(&entry.id).await.unwrap();
        store.delete(&entry.id).await.unwrap();
        assert!(store.get(&entry.id).await.unwrap().is_none());

        let db = store.database().unwrap();
        let orphans: i64 = db
            .connection()
            .call(|conn| -> Result<i64, rusqlite::Error> {
                conn.query_row("SELECT COUNT(*) FROM queue_attachments", [], |r| r.get(0))
            })
            .await
            .unwrap();
        assert_eq!(orphans, 0);
    }

    #[tokio::test]
    async fn indexes_filter_and_order_oldest_first() {
        let (store, _dir) = open_store().await;
        let now = Utc::now();
        let old = QueueEntry::from_submission(
            NewSubmission::text("old").with_created_at(now - Duration::days(10)),
            3,
        );
        let mut mid = QueueEntry::from_submission(
            NewSubmission::text("mid").with_created_at(now - Duration::days(2)),
            3,
        );
        mid.status = EntryStatus::Completed;
        let new = QueueEntry::from_submission(NewSubmission::text("new"), 3);
        for e in [&new, &mid, &old] {
            store.add(e).await.unwrap();
        }

        let pending = store
            .get_all_by_index(IndexQuery::Status(EntryStatus::Pending))
            .await
            .unwrap();
        let ids: Vec<_> = pending.iter().map(|e| e.id.clone()).collect();
        assert_eq!(ids, vec![old.id.clone(), new.id.clone()]);

        let stale = store
            .get_all_by_index(IndexQuery::CreatedBefore(now - Duration::days(1)))
            .await
            .unwrap();
        assert_eq!(stale.len(), 2);
        assert_eq!(stale[0].id, old.id);

        assert_eq!(store.get_all().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn entries_survive_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("durable.db");
        let config = StorageConfig {
            database_path: path.to_str().unwrap().to_string(),
            wal_mode: true,
        };
        let entry = voice_entry();
        {
            let store = SqliteQueueStore::new(config.clone());
            store.initialize().await.unwrap();
            store.add(&entry).await.unwrap();
            store.close().await.unwrap();
        }
        let store = SqliteQueueStore::new(config);
        store.initialize().await.unwrap();
        assert_eq!(store.get(&entry.id).await.unwrap(), Some(entry));
    }

    #[tokio::test]
    async fn cache_partitions_store_and_delete() {
        let (store, _dir) = open_store().await;
        let cache = SqliteCacheStore::new(store.database().unwrap());
        let page = CachedResponse {
            status: 200,
            headers: vec![("content-type".into(), "text/html".into())],
            body: b"<h1>offline</h1>".to_vec(),
            stored_at: Utc::now(),
        };

        cache
            .store_all(
                "beacon-static-v1",
                &[
                    (RequestKey::get("/offline"), page.clone()),
                    (RequestKey::get("/"), page.clone()),
                ],
            )
            .await
            .unwrap();
        cache
            .store("beacon-dynamic-v1", &RequestKey::get("/api/x"), &page)
            .await
            .unwrap();

        let hit = cache
            .lookup("beacon-static-v1", &RequestKey::get("/offline"))
            .await
            .unwrap()
            .expect("cached");
        assert_eq!(hit.body, page.body);
        assert_eq!(hit.headers, page.headers);
        assert!(
            cache
                .lookup("beacon-dynamic-v1", &RequestKey::get("/offline"))
                .await
                .unwrap()
                .is_none()
        );

        assert_eq!(
            cache.partitions().await.unwrap(),
            vec!["beacon-dynamic-v1".to_string(), "beacon-static-v1".to_string()]
        );
        assert_eq!(cache.delete_partition("beacon-static-v1").await.unwrap(), 2);
        assert_eq!(cache.partitions().await.unwrap(), vec!["beacon-dynamic-v1"]);
    }
}
