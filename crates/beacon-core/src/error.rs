// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Beacon submission pipeline.

use thiserror::Error;

/// The primary error type used across all Beacon adapter traits and core operations.
#[derive(Debug, Error)]
pub enum BeaconError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (quota, corruption, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// An `add` was attempted for a key that is already present.
    #[error("queue entry already exists: {id}")]
    DuplicateEntry { id: String },

    /// Delivery to the remote collector failed (transport error or non-2xx status).
    #[error("delivery failed: {message}")]
    Delivery {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Network errors outside of delivery (probe, upstream fetch).
    #[error("network error: {message}")]
    Network {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Caching proxy errors (install, activation, cache miss without network).
    #[error("proxy error: {message}")]
    Proxy {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Adapter health check failed.
    #[error("health check failed for {name}: {source}")]
    HealthCheckFailed {
        name: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Operation was cancelled before it completed.
    #[error("operation cancelled")]
    Cancelled,

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl BeaconError {
    /// Wraps any error as a storage failure.
    pub fn storage<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        BeaconError::Storage {
            source: Box::new(err),
        }
    }
}
