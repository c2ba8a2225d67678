// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Remote collector trait.

use async_trait::async_trait;

use crate::error::BeaconError;
use crate::traits::adapter::PluginAdapter;
use crate::types::QueueEntry;

/// Destination that accepts queued submissions.
///
/// `Ok(())` means the collector acknowledged the submission with a success
/// status. Any error, including a non-success status, is a delivery failure.
/// Callers cancel an attempt by dropping the returned future.
#[async_trait]
pub trait Collector: PluginAdapter {
    async fn deliver(&self, entry: &QueueEntry) -> Result<(), BeaconError>;
}
