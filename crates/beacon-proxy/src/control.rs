// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message channel between the proxy's background side and its clients.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Background tag that asks clients to drain their offline queue.
pub const SYNC_TAG: &str = "offline-queue-sync";

/// Background tag that asks clients to purge old completed entries.
pub const CLEANUP_TAG: &str = "offline-queue-cleanup";

const CHANNEL_CAPACITY: usize = 64;

/// Background → foreground message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ControlMessage {
    SyncOfflineQueue { timestamp: i64 },
    CleanupOfflineQueue { timestamp: i64 },
}

impl ControlMessage {
    /// Maps a background tag to its message, stamped with the current time.
    pub fn for_tag(tag: &str) -> Option<Self> {
        let timestamp = Utc::now().timestamp_millis();
        match tag {
            SYNC_TAG => Some(ControlMessage::SyncOfflineQueue { timestamp }),
            CLEANUP_TAG => Some(ControlMessage::CleanupOfflineQueue { timestamp }),
            _ => None,
        }
    }

    pub fn timestamp(&self) -> i64 {
        match self {
            ControlMessage::SyncOfflineQueue { timestamp }
            | ControlMessage::CleanupOfflineQueue { timestamp } => *timestamp,
        }
    }
}

/// Foreground → proxy message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientMessage {
    /// Activate a waiting proxy immediately.
    SkipWaiting,
    /// Fetch the listed URLs into the dynamic partition.
    CacheUrls { urls: Vec<String> },
}

/// Fan-out of [`ControlMessage`]s to every subscribed client.
#[derive(Clone)]
pub struct ControlChannel {
    tx: broadcast::Sender<ControlMessage>,
}

impl ControlChannel {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ControlMessage> {
        self.tx.subscribe()
    }

    /// Broadcasts a message. Returns the number of clients that received it.
    pub fn broadcast(&self, message: ControlMessage) -> usize {
        match self.tx.send(message) {
            Ok(n) => n,
            Err(_) => {
                debug!("control message dropped, no subscribers");
                0
            }
        }
    }

    /// Handles a background tag. Unknown tags are ignored.
    pub fn dispatch_tag(&self, tag: &str) -> usize {
        match ControlMessage::for_tag(tag) {
            Some(message) => {
                debug!(tag, "dispatching background tag");
                self.broadcast(message)
            }
            None => {
                warn!(tag, "ignoring unknown background tag");
                0
            }
        }
    }
}

impl Default for ControlChannel {
    fn default() -> Self {
        Self::new()
    }
}
