// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Application-facing submission queue.
//!
//! Every operation goes straight to the [`QueueStore`]; the queue keeps no
//! copy of its own. Store failures are returned unchanged and never retried.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use beacon_core::{
    BeaconError, EntryId, EntryStatus, IndexQuery, NewSubmission, QueueEntry, QueueStatus,
    QueueStore,
};
use beacon_net::NetworkMonitor;

use crate::retry::RetryTimers;
use crate::trigger::SyncTrigger;

/// Handle for submitting reports and inspecting the backlog.
#[derive(Clone)]
pub struct SubmissionQueue {
    store: Arc<dyn QueueStore>,
    monitor: Arc<NetworkMonitor>,
    trigger: SyncTrigger,
    timers: Arc<RetryTimers>,
    max_retries: u32,
}

impl SubmissionQueue {
    pub(crate) fn new(
        store: Arc<dyn QueueStore>,
        monitor: Arc<NetworkMonitor>,
        trigger: SyncTrigger,
        timers: Arc<RetryTimers>,
        max_retries: u32,
    ) -> Self {
        Self {
            store,
            monitor,
            trigger,
            timers,
            max_retries,
        }
    }

    /// Persist a submission as a new `pending` entry.
    ///
    /// Returns once the entry is durable. When online, a drain pass is
    /// requested but not awaited, so delivery problems never surface here.
    pub async fn enqueue(&self, submission: NewSubmission) -> Result<EntryId, BeaconError> {
        let entry = QueueEntry::from_submission(submission, self.max_retries);
        self.store.add(&entry).await?;
        info!(id = %entry.id, kind = %entry.kind(), "submission queued");

        if self.monitor.is_online() {
            self.trigger.fire();
        }
        Ok(entry.id)
    }

    /// Per-status counts over the whole store.
    pub async fn status(&self) -> Result<QueueStatus, BeaconError> {
        Ok(QueueStatus::tally(&self.store.get_all().await?))
    }

    /// Every entry, oldest first.
    pub async fn items(&self) -> Result<Vec<QueueEntry>, BeaconError> {
        self.store.get_all().await
    }

    pub async fn clear_completed(&self) -> Result<usize, BeaconError> {
        self.clear(EntryStatus::Completed).await
    }

    pub async fn clear_failed(&self) -> Result<usize, BeaconError> {
        self.clear(EntryStatus::Failed).await
    }

    async fn clear(&self, status: EntryStatus) -> Result<usize, BeaconError> {
        let entries = self
            .store
            .get_all_by_index(IndexQuery::Status(status))
            .await?;
        for entry in &entries {
            self.timers.cancel(&entry.id);
            self.store.delete(&entry.id).await?;
        }
        info!(%status, removed = entries.len(), "queue entries cleared");
        Ok(entries.len())
    }

    /// Delete `completed` entries created before `now - retention`.
    ///
    /// `failed` entries are kept until cleared explicitly.
    pub async fn purge_expired(&self, retention: chrono::Duration) -> Result<usize, BeaconError> {
        let cutoff = Utc::now() - retention;
        let mut removed = 0;
        for entry in self
            .store
            .get_all_by_index(IndexQuery::CreatedBefore(cutoff))
            .await?
        {
            if entry.status == EntryStatus::Completed {
                self.timers.cancel(&entry.id);
                self.store.delete(&entry.id).await?;
                removed += 1;
            }
        }
        debug!(%cutoff, removed, "expired entries purged");
        Ok(removed)
    }

    /// Return entries stranded in `processing` by a previous process to `pending`.
    pub async fn recover_interrupted(&self) -> Result<usize, BeaconError> {
        let stranded = self
            .store
            .get_all_by_index(IndexQuery::Status(EntryStatus::Processing))
            .await?;
        for mut entry in stranded.iter().cloned() {
            entry.status = EntryStatus::Pending;
            self.store.put(&entry).await?;
        }
        if !stranded.is_empty() {
            warn!(count = stranded.len(), "recovered entries interrupted mid-delivery");
        }
        Ok(stranded.len())
    }
}
