// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persistent store trait for queue entries.

use async_trait::async_trait;

use crate::error::BeaconError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{EntryId, IndexQuery, QueueEntry};

/// Durable key-value storage for queue entries with `by-status` and
/// `by-created` secondary indexes.
///
/// Implementations perform no retries: failures (quota exceeded, corruption)
/// are returned to the caller unchanged. A committed `add`, `put`, or
/// `delete` must survive a process restart.
#[async_trait]
pub trait QueueStore: PluginAdapter {
    /// Opens the backing storage (migrations, connections).
    async fn initialize(&self) -> Result<(), BeaconError>;

    /// Flushes pending writes and releases the backing storage.
    async fn close(&self) -> Result<(), BeaconError>;

    /// Inserts a new entry. Fails with [`BeaconError::DuplicateEntry`] if the id exists.
    async fn add(&self, entry: &QueueEntry) -> Result<(), BeaconError>;

    async fn get(&self, id: &EntryId) -> Result<Option<QueueEntry>, BeaconError>;

    /// Every entry, in store iteration order.
    async fn get_all(&self) -> Result<Vec<QueueEntry>, BeaconError>;

    /// Entries matching a secondary-index query, oldest first.
    async fn get_all_by_index(&self, query: IndexQuery) -> Result<Vec<QueueEntry>, BeaconError>;

    /// Inserts or replaces an entry.
    async fn put(&self, entry: &QueueEntry) -> Result<(), BeaconError>;

    /// Removes an entry. Deleting a missing id is not an error.
    async fn delete(&self, id: &EntryId) -> Result<(), BeaconError>;
}
