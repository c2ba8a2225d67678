// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Drain passes and the supervisor loop that schedules them.
//!
//! At most one pass runs at a time. A pass claims pending entries one by
//! one, delivers each through the [`Collector`], and applies the retry
//! policy on failure. Going offline cancels the running pass.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use arc_swap::ArcSwapOption;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use beacon_config::model::{CollectorConfig, QueueConfig};
use beacon_core::{
    BeaconError, Collector, EntryStatus, IndexQuery, QueueEntry, QueueStore, SyncResult,
};
use beacon_net::{Connectivity, NetworkMonitor};

use crate::queue::SubmissionQueue;
use crate::retry::{RetryTimers, record_failure};
use crate::trigger::SyncTrigger;

/// Tunables for the engine, usually derived from configuration.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Retry budget given to new entries.
    pub max_retries: u32,
    /// Delay after the first failed attempt; doubles per further failure.
    pub backoff_base: Duration,
    /// Upper bound on one delivery attempt.
    pub attempt_timeout: Duration,
    /// Interval of the supervisor's periodic pass.
    pub poll_interval: Duration,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            max_retries: beacon_core::types::DEFAULT_MAX_RETRIES,
            backoff_base: Duration::from_millis(1000),
            attempt_timeout: Duration::from_secs(30),
            poll_interval: Duration::from_secs(30),
        }
    }
}

impl SyncOptions {
    pub fn from_config(queue: &QueueConfig, collector: &CollectorConfig) -> Self {
        Self {
            max_retries: queue.max_retries,
            backoff_base: Duration::from_millis(queue.backoff_base_ms),
            attempt_timeout: Duration::from_secs(collector.timeout_secs),
            poll_interval: Duration::from_secs(queue.poll_interval_secs),
        }
    }
}

/// Resets the drain flag when a pass ends, including by being dropped.
struct DrainGuard<'a>(&'a AtomicBool);

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Delivers queued entries to the collector.
pub struct SyncEngine {
    store: Arc<dyn QueueStore>,
    collector: Arc<dyn Collector>,
    monitor: Arc<NetworkMonitor>,
    timers: Arc<RetryTimers>,
    trigger: SyncTrigger,
    options: SyncOptions,
    draining: AtomicBool,
    pass: ArcSwapOption<CancellationToken>,
}

impl SyncEngine {
    pub fn new(
        store: Arc<dyn QueueStore>,
        collector: Arc<dyn Collector>,
        monitor: Arc<NetworkMonitor>,
        options: SyncOptions,
    ) -> Arc<Self> {
        let trigger = SyncTrigger::new();
        Arc::new(Self {
            store,
            collector,
            monitor,
            timers: Arc::new(RetryTimers::new(trigger.clone())),
            trigger,
            options,
            draining: AtomicBool::new(false),
            pass: ArcSwapOption::empty(),
        })
    }

    /// Queue handle sharing this engine's store, trigger, and timers.
    pub fn queue(&self) -> SubmissionQueue {
        SubmissionQueue::new(
            Arc::clone(&self.store),
            Arc::clone(&self.monitor),
            self.trigger.clone(),
            Arc::clone(&self.timers),
            self.options.max_retries,
        )
    }

    pub fn trigger(&self) -> SyncTrigger {
        self.trigger.clone()
    }

    pub fn timers(&self) -> &RetryTimers {
        &self.timers
    }

    pub fn is_draining(&self) -> bool {
        self.draining.load(Ordering::Acquire)
    }

    /// Run one drain pass now.
    ///
    /// Returns a rejected result without touching the store when offline or
    /// when another pass is already running.
    pub async fn sync(&self) -> SyncResult {
        if !self.monitor.is_online() {
            debug!("sync skipped: offline");
            return SyncResult::rejected();
        }
        if self
            .draining
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("sync skipped: pass already running");
            return SyncResult::rejected();
        }
        let _guard = DrainGuard(&self.draining);

        let token = CancellationToken::new();
        self.pass.store(Some(Arc::new(token.clone())));
        // An offline signal may have landed between the check and the store.
        if !self.monitor.is_online() {
            token.cancel();
        }

        let result = self.drain(&token).await;
        self.pass.store(None);
        result
    }

    async fn drain(&self, token: &CancellationToken) -> SyncResult {
        let mut result = SyncResult::default();

        let pending = match self
            .store
            .get_all_by_index(IndexQuery::Status(EntryStatus::Pending))
            .await
        {
            Ok(pending) => pending,
            Err(e) => {
                error!(error = %e, "failed to read pending entries");
                result.errors.push(format!("Failed to read queue: {e}"));
                return result;
            }
        };

        for entry in pending {
            if token.is_cancelled() {
                info!("drain pass cancelled; remaining entries stay pending");
                break;
            }
            if self.timers.is_waiting(&entry.id) {
                continue;
            }
            self.process(entry, token, &mut result).await;
        }

        result.success = result.failed == 0;
        info!(
            processed = result.processed,
            failed = result.failed,
            "drain pass finished"
        );
        result
    }

    async fn process(
        &self,
        mut entry: QueueEntry,
        token: &CancellationToken,
        result: &mut SyncResult,
    ) {
        entry.status = EntryStatus::Processing;
        if let Err(e) = self.store.put(&entry).await {
            error!(id = %entry.id, error = %e, "failed to claim entry");
            result.failed += 1;
            result.errors.push(format!("Item {}: {e}", entry.id));
            return;
        }

        match self.attempt(&entry, token).await {
            Ok(()) => {
                entry.status = EntryStatus::Completed;
                entry.error_message = None;
                result.processed += 1;
                info!(id = %entry.id, "submission delivered");
                let finished = match self.store.put(&entry).await {
                    Ok(()) => self.store.delete(&entry.id).await,
                    Err(e) => Err(e),
                };
                if let Err(e) = finished {
                    // Delivered but not removed; cleanup purges it later.
                    error!(id = %entry.id, error = %e, "failed to retire delivered entry");
                    result.errors.push(format!("Item {}: {e}", entry.id));
                }
            }
            Err(e) => {
                result.failed += 1;
                result.errors.push(format!("Item {}: {e}", entry.id));

                let delay = record_failure(&mut entry, self.options.backoff_base);
                match delay {
                    Some(delay) => warn!(
                        id = %entry.id,
                        retry = entry.retry_count,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "delivery failed; will retry"
                    ),
                    None => warn!(
                        id = %entry.id,
                        retries = entry.retry_count,
                        error = %e,
                        "delivery failed; retry budget exhausted"
                    ),
                }

                if let Err(store_err) = self.store.put(&entry).await {
                    error!(id = %entry.id, error = %store_err, "failed to record delivery failure");
                    result.errors.push(format!("Item {}: {store_err}", entry.id));
                    return;
                }
                // Cancelled attempts back off like any other failure.
                if let Some(delay) = delay {
                    self.timers.schedule(entry.id.clone(), delay);
                }
            }
        }
    }

    async fn attempt(
        &self,
        entry: &QueueEntry,
        token: &CancellationToken,
    ) -> Result<(), BeaconError> {
        let timeout = self.options.attempt_timeout;
        tokio::select! {
            biased;
            _ = token.cancelled() => Err(BeaconError::Cancelled),
            outcome = tokio::time::timeout(timeout, self.collector.deliver(entry)) => {
                outcome.unwrap_or(Err(BeaconError::Timeout { duration: timeout }))
            }
        }
    }

    /// Cancel the running pass, if any. Backoff timers keep running.
    pub fn cancel_pass(&self) -> bool {
        match self.pass.load_full() {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Cancel the running pass and every retry timer.
    ///
    /// Entries with cancelled timers become eligible on the next pass.
    pub fn stop(&self) {
        self.cancel_pass();
        let swept = self.timers.cancel_all();
        debug!(swept, "sync engine stopped");
    }

    /// Drive passes from triggers, the poll interval, and connectivity changes
    /// until `shutdown` fires.
    pub fn spawn_supervisor(self: &Arc<Self>, shutdown: CancellationToken) -> JoinHandle<()> {
        let engine = Arc::clone(self);
        let weak = Arc::downgrade(self);
        let trigger = self.trigger.clone();
        let subscription = self.monitor.subscribe(move |connectivity| match connectivity {
            Connectivity::Online => trigger.fire(),
            Connectivity::Offline => {
                if let Some(engine) = weak.upgrade() {
                    if engine.cancel_pass() {
                        debug!("drain pass cancelled: offline");
                    }
                }
            }
        });

        tokio::spawn(async move {
            let _subscription = subscription;
            match engine.queue().recover_interrupted().await {
                Ok(0) => {}
                Ok(count) => info!(count, "interrupted entries returned to pending"),
                Err(e) => error!(error = %e, "failed to recover interrupted entries"),
            }

            let mut poll = tokio::time::interval(engine.options.poll_interval);
            poll.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = engine.trigger.fired() => {}
                    _ = poll.tick() => {}
                }
                if !engine.monitor.is_online() {
                    continue;
                }

                let pass = engine.sync();
                tokio::pin!(pass);
                let result = tokio::select! {
                    result = &mut pass => result,
                    _ = shutdown.cancelled() => {
                        engine.stop();
                        pass.await
                    }
                };
                if !result.success && !result.was_rejected() {
                    warn!(errors = ?result.errors, "drain pass reported failures");
                }
            }

            engine.stop();
            info!("sync supervisor stopped");
        })
    }
}
