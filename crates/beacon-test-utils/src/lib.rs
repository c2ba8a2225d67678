// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Beacon.
//!
//! In-memory stores with failure injection, a scriptable collector, and
//! submission fixtures. Nothing here touches disk or the network.

pub mod fixtures;
pub mod memory_cache;
pub mod memory_store;
pub mod mock_collector;

pub use memory_cache::MemoryCacheStore;
pub use memory_store::MemoryQueueStore;
pub use mock_collector::{MockCollector, Outcome};
