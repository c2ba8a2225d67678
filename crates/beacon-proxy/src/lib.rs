// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Offline-capable caching proxy for the Beacon web client.
//!
//! Sits between the browser and the application origin. Static assets are
//! served cache-first, everything else network-first with cache fallback,
//! and navigations that miss both get the cached offline page. A control
//! channel carries periodic sync and cleanup signals to the queue side.

pub mod classify;
pub mod control;
pub mod proxy;
pub mod scheduler;
pub mod server;
pub mod upstream;

pub use control::{CLEANUP_TAG, ClientMessage, ControlChannel, ControlMessage, SYNC_TAG};
pub use proxy::{CachingProxy, Lifecycle, ProxyOptions, ProxyResponse, ResponseSource};
pub use scheduler::spawn_scheduler;
pub use server::{ServerConfig, router, start_server};
pub use upstream::{HttpUpstream, ProxyRequest, Upstream, UpstreamResponse};
