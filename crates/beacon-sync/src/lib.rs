// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Offline submission queue and its delivery engine.
//!
//! [`SubmissionQueue`] is what the application talks to: it persists
//! submissions and answers status questions. [`SyncEngine`] drains pending
//! entries to the [`beacon_core::Collector`] whenever the network allows,
//! retrying failures with exponential backoff.

pub mod collector;
pub mod engine;
pub mod queue;
pub mod retry;
pub mod trigger;

pub use collector::HttpCollector;
pub use engine::{SyncEngine, SyncOptions};
pub use queue::SubmissionQueue;
pub use trigger::SyncTrigger;
