// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fire-and-forget wakeup for the sync supervisor.

use std::sync::Arc;

use tokio::sync::Notify;

/// Requests a drain pass without waiting for it.
///
/// Fires coalesce: any number of fires while the supervisor is busy result
/// in a single follow-up pass.
#[derive(Clone, Default)]
pub struct SyncTrigger(Arc<Notify>);

impl SyncTrigger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fire(&self) {
        self.0.notify_one();
    }

    pub async fn fired(&self) {
        self.0.notified().await;
    }
}
