// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Beacon offline-first submission pipeline.
//!
//! This crate provides the foundational trait definitions, error types, and
//! the queue/cache data model shared by the storage, sync, and proxy crates.
//! All adapters implement traits defined here.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::BeaconError;
pub use types::{
    AdapterType, Attachment, EntryId, EntryStatus, GeoPoint, HealthStatus, IndexQuery,
    NewSubmission, Payload, QueueEntry, QueueStatus, SubmissionKind, SyncResult,
};

pub use traits::{CacheStore, Collector, PluginAdapter, QueueStore};
