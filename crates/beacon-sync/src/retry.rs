// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Retry policy and per-entry backoff timers.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use beacon_core::types::MAX_RETRIES_EXCEEDED;
use beacon_core::{EntryId, EntryStatus, QueueEntry};

use crate::trigger::SyncTrigger;

/// Delay before the `retry_count`-th retry: `base * 2^(retry_count - 1)`.
///
/// Saturates instead of overflowing for absurd retry counts.
pub fn backoff_delay(base: Duration, retry_count: u32) -> Duration {
    let exponent = retry_count.saturating_sub(1).min(31);
    base.saturating_mul(1u32 << exponent)
}

/// Apply one failed attempt to `entry`.
///
/// Returns the backoff delay when the entry goes back to `pending`, or
/// `None` when its budget is spent and it is now `failed`.
pub fn record_failure(entry: &mut QueueEntry, base: Duration) -> Option<Duration> {
    entry.retry_count += 1;
    if entry.retries_exhausted() {
        entry.status = EntryStatus::Failed;
        entry.error_message = Some(MAX_RETRIES_EXCEEDED.to_string());
        return None;
    }
    let delay = backoff_delay(base, entry.retry_count);
    entry.status = EntryStatus::Pending;
    entry.error_message = Some(format!(
        "Retry {}/{} in {}ms",
        entry.retry_count,
        entry.max_retries,
        delay.as_millis()
    ));
    Some(delay)
}

struct RetryTimer {
    generation: u64,
    ready_at: Instant,
    token: CancellationToken,
}

/// Cancellable backoff timers keyed by entry id.
///
/// An entry with a live timer is not eligible for delivery. When a timer
/// elapses it removes itself and fires the sync trigger.
pub struct RetryTimers {
    timers: Arc<DashMap<EntryId, RetryTimer>>,
    generation: AtomicU64,
    trigger: SyncTrigger,
}

impl RetryTimers {
    pub fn new(trigger: SyncTrigger) -> Self {
        Self {
            timers: Arc::new(DashMap::new()),
            generation: AtomicU64::new(0),
            trigger,
        }
    }

    /// Start (or restart) the timer for `id`. Must be called inside a tokio runtime.
    pub fn schedule(&self, id: EntryId, delay: Duration) {
        let generation = self.generation.fetch_add(1, Ordering::Relaxed);
        let token = CancellationToken::new();
        let ready_at = Instant::now() + delay;
        let previous = self.timers.insert(
            id.clone(),
            RetryTimer {
                generation,
                ready_at,
                token: token.clone(),
            },
        );
        if let Some(previous) = previous {
            previous.token.cancel();
        }

        let timers = Arc::clone(&self.timers);
        let trigger = self.trigger.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep_until(ready_at) => {
                    timers.remove_if(&id, |_, timer| timer.generation == generation);
                    debug!(%id, "retry backoff elapsed");
                    trigger.fire();
                }
                _ = token.cancelled() => {}
            }
        });
    }

    /// True while `id` is still backing off.
    pub fn is_waiting(&self, id: &EntryId) -> bool {
        self.timers.contains_key(id)
    }

    /// Time left before `id` becomes eligible again.
    pub fn remaining(&self, id: &EntryId) -> Option<Duration> {
        self.timers
            .get(id)
            .map(|timer| timer.ready_at.saturating_duration_since(Instant::now()))
    }

    pub fn cancel(&self, id: &EntryId) -> bool {
        match self.timers.remove(id) {
            Some((_, timer)) => {
                timer.token.cancel();
                true
            }
            None => false,
        }
    }

    /// Cancel every timer. Returns how many were live.
    pub fn cancel_all(&self) -> usize {
        let ids: Vec<EntryId> = self.timers.iter().map(|t| t.key().clone()).collect();
        ids.iter().filter(|id| self.cancel(id)).count()
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }
}
