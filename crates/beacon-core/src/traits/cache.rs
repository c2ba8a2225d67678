// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Partitioned response cache trait used by the caching proxy.

use async_trait::async_trait;

use crate::error::BeaconError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{CachedResponse, RequestKey};

/// Named partitions of stored response snapshots.
#[async_trait]
pub trait CacheStore: PluginAdapter {
    /// Looks up a key in one partition.
    async fn lookup(
        &self,
        partition: &str,
        key: &RequestKey,
    ) -> Result<Option<CachedResponse>, BeaconError>;

    /// Stores a response, replacing any previous snapshot for the key.
    async fn store(
        &self,
        partition: &str,
        key: &RequestKey,
        response: &CachedResponse,
    ) -> Result<(), BeaconError>;

    /// Stores a batch atomically: either every record is written or none is.
    async fn store_all(
        &self,
        partition: &str,
        records: &[(RequestKey, CachedResponse)],
    ) -> Result<(), BeaconError>;

    /// Names of every partition holding at least one record.
    async fn partitions(&self) -> Result<Vec<String>, BeaconError>;

    /// Deletes a partition and all of its records. Returns the number removed.
    async fn delete_partition(&self, partition: &str) -> Result<usize, BeaconError>;
}
