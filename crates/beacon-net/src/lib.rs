// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Connectivity tracking for Beacon.
//!
//! [`NetworkMonitor`] holds the last known online/offline signal and fans
//! transitions out to subscribers. [`ReachabilityProbe`] produces that
//! signal for headless processes by polling an HTTP endpoint.

pub mod monitor;
pub mod probe;

pub use monitor::{Connectivity, NetworkMonitor, Subscription};
pub use probe::ReachabilityProbe;
