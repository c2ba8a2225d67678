// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scriptable [`Collector`] for deterministic delivery tests.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use beacon_core::{
    AdapterType, BeaconError, Collector, EntryId, HealthStatus, PluginAdapter, QueueEntry,
};

/// What the next delivery attempt does.
#[derive(Debug, Clone)]
pub enum Outcome {
    /// Acknowledge with a 2xx.
    Accept,
    /// Answer with a non-success status.
    Reject(u16),
    /// Sleep, then acknowledge.
    AcceptAfter(Duration),
    /// Never complete; only cancellation or a timeout ends the attempt.
    Hang,
}

/// A collector that plays back scripted outcomes.
///
/// Outcomes are popped from a FIFO queue; once it is empty every attempt
/// succeeds. In-flight attempts are counted so tests can assert that
/// deliveries never overlap.
pub struct MockCollector {
    script: Mutex<VecDeque<Outcome>>,
    attempts: Mutex<Vec<EntryId>>,
    delivered: Mutex<Vec<EntryId>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockCollector {
    pub fn new() -> Arc<Self> {
        Self::with_script(Vec::new())
    }

    pub fn with_script(script: Vec<Outcome>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(VecDeque::from(script)),
            attempts: Mutex::new(Vec::new()),
            delivered: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        })
    }

    pub async fn push(&self, outcome: Outcome) {
        self.script.lock().await.push_back(outcome);
    }

    /// Ids of every attempt, including failed ones, in call order.
    pub async fn attempts(&self) -> Vec<EntryId> {
        self.attempts.lock().await.clone()
    }

    /// Ids of acknowledged deliveries, in call order.
    pub async fn delivered(&self) -> Vec<EntryId> {
        self.delivered.lock().await.clone()
    }

    /// Highest number of attempts observed running at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

/// Decrements the in-flight counter even when the attempt future is dropped.
struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl PluginAdapter for MockCollector {
    fn name(&self) -> &str {
        "mock-collector"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Collector
    }

    async fn health_check(&self) -> Result<HealthStatus, BeaconError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), BeaconError> {
        Ok(())
    }
}

#[async_trait]
impl Collector for MockCollector {
    async fn deliver(&self, entry: &QueueEntry) -> Result<(), BeaconError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let _guard = InFlight(&self.in_flight);

        self.attempts.lock().await.push(entry.id.clone());
        let outcome = self
            .script
            .lock()
            .await
            .pop_front()
            .unwrap_or(Outcome::Accept);

        match outcome {
            Outcome::Accept => {}
            Outcome::AcceptAfter(delay) => tokio::time::sleep(delay).await,
            Outcome::Reject(status) => {
                return Err(BeaconError::Delivery {
                    message: format!("collector returned {status}"),
                    source: None,
                });
            }
            Outcome::Hang => std::future::pending::<()>().await,
        }

        self.delivered.lock().await.push(entry.id.clone());
        Ok(())
    }
}
