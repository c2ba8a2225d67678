// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Last-known connectivity state with transition callbacks.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use dashmap::DashMap;
use strum::Display;
use tokio::sync::watch;
use tracing::info;

/// Connectivity as last reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "lowercase")]
pub enum Connectivity {
    Online,
    Offline,
}

impl Connectivity {
    pub fn is_online(self) -> bool {
        self == Connectivity::Online
    }
}

impl From<bool> for Connectivity {
    fn from(online: bool) -> Self {
        if online {
            Connectivity::Online
        } else {
            Connectivity::Offline
        }
    }
}

type Callback = Arc<dyn Fn(Connectivity) + Send + Sync>;

/// Tracks connectivity and notifies subscribers on every transition.
///
/// `is_online()` is advisory: it reflects the last signal, which may lag the
/// real network. The monitor never polls on its own.
pub struct NetworkMonitor {
    state: watch::Sender<Connectivity>,
    callbacks: DashMap<u64, Callback>,
    next_id: AtomicU64,
}

impl NetworkMonitor {
    pub fn new(initial: Connectivity) -> Arc<Self> {
        Arc::new(Self {
            state: watch::Sender::new(initial),
            callbacks: DashMap::new(),
            next_id: AtomicU64::new(0),
        })
    }

    pub fn is_online(&self) -> bool {
        self.current().is_online()
    }

    pub fn current(&self) -> Connectivity {
        *self.state.borrow()
    }

    /// Register a transition callback. It stays registered until the
    /// returned [`Subscription`] is dropped or unsubscribed.
    pub fn subscribe<F>(self: &Arc<Self>, callback: F) -> Subscription
    where
        F: Fn(Connectivity) + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.callbacks.insert(id, Arc::new(callback));
        Subscription {
            monitor: Arc::downgrade(self),
            id,
        }
    }

    /// Watch receiver for async consumers.
    pub fn changes(&self) -> watch::Receiver<Connectivity> {
        self.state.subscribe()
    }

    pub fn set_online(&self, online: bool) {
        self.report(Connectivity::from(online));
    }

    /// Feed a platform signal. Repeated identical signals are ignored.
    pub fn report(&self, connectivity: Connectivity) {
        let changed = self.state.send_if_modified(|current| {
            if *current == connectivity {
                false
            } else {
                *current = connectivity;
                true
            }
        });
        if !changed {
            return;
        }

        info!(%connectivity, "connectivity changed");
        // Snapshot first so callbacks may subscribe or unsubscribe.
        let callbacks: Vec<Callback> = self.callbacks.iter().map(|c| c.value().clone()).collect();
        for callback in callbacks {
            callback(connectivity);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.callbacks.len()
    }
}

/// Handle returned by [`NetworkMonitor::subscribe`].
#[must_use = "dropping a Subscription unsubscribes the callback"]
pub struct Subscription {
    monitor: Weak<NetworkMonitor>,
    id: u64,
}

impl Subscription {
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(monitor) = self.monitor.upgrade() {
            monitor.callbacks.remove(&self.id);
        }
    }
}
