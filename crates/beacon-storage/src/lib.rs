// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence for Beacon.
//!
//! WAL-mode SQLite with embedded migrations and a single-writer connection
//! via `tokio-rusqlite`. Hosts the durable submission queue and the caching
//! proxy's response partitions.

pub mod adapter;
pub mod database;
pub mod migrations;
pub mod queries;

pub use adapter::{SqliteCacheStore, SqliteQueueStore};
pub use database::Database;
