// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Periodic background tags.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::control::{CLEANUP_TAG, ControlChannel, SYNC_TAG};

/// Emits [`SYNC_TAG`] and [`CLEANUP_TAG`] on the control channel at fixed
/// intervals until `cancel` fires. The first tag of each kind is emitted one
/// full interval after spawning.
pub fn spawn_scheduler(
    control: ControlChannel,
    sync_every: Duration,
    cleanup_every: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let start = tokio::time::Instant::now();
        let mut sync = interval_at(start + sync_every, sync_every);
        let mut cleanup = interval_at(start + cleanup_every, cleanup_every);
        sync.set_missed_tick_behavior(MissedTickBehavior::Delay);
        cleanup.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!("background scheduler stopped");
                    break;
                }
                _ = sync.tick() => {
                    control.dispatch_tag(SYNC_TAG);
                }
                _ = cleanup.tick() => {
                    control.dispatch_tag(CLEANUP_TAG);
                }
            }
        }
    })
}
