// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter trait definitions for the Beacon pipeline.
//!
//! All adapters extend the [`PluginAdapter`] base trait and use
//! `#[async_trait]` for dynamic dispatch compatibility.

pub mod adapter;
pub mod cache;
pub mod collector;
pub mod store;

pub use adapter::PluginAdapter;
pub use cache::CacheStore;
pub use collector::Collector;
pub use store::QueueStore;
