// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Global constants for zonesync.
//!
//! This module contains all numeric and string constants used throughout the codebase.
//! Constants are organized by category for easy maintenance.

// ============================================================================
// Topology Constants
// ============================================================================

/// Prefix applied to discovered host names to form topology hostname keys
/// (e.g. host `alpha` becomes `on.alpha`)
pub const TOPOLOGY_PREFIX: &str = "on.";

/// Prefix used for tunnel-scoped internal aliases of topology hosts
pub const TUNNEL_PREFIX: &str = "tun.";

/// Number of attempts for the topology TXT query
pub const TOPOLOGY_QUERY_ATTEMPTS: u32 = 3;

/// Fixed delay between topology TXT query attempts (seconds)
pub const TOPOLOGY_RETRY_DELAY_SECS: u64 = 2;

/// Per-attempt timeout for the topology TXT query (seconds)
pub const TOPOLOGY_QUERY_TIMEOUT_SECS: u64 = 5;

/// Prefix length used for topology subnets (hosts are grouped per /24)
pub const TOPOLOGY_SUBNET_PREFIX: u8 = 24;

// ============================================================================
// Zone API Constants
// ============================================================================

/// Page size for paginated record-set listings
pub const ZONE_LIST_PAGE_SIZE: u32 = 100;

/// Default TTL for records created by the reconciler (5 minutes)
pub const DEFAULT_RECORD_TTL_SECS: u32 = 300;

/// Record name representing the zone apex
pub const APEX_RECORD_NAME: &str = "@";

// ============================================================================
// Protocol Detection Constants
// ============================================================================

/// Candidate ports probed during protocol detection, in order.
///
/// Web-facing ports come first since they are the common case. The list is
/// fixed, not configurable: detection must stay deterministic and testable.
pub const PROBE_PORT_ORDER: [u16; 11] = [
    8443, // alternate HTTPS
    9443, // alternate admin HTTPS
    8080, // alternate HTTP
    21,   // FTP
    443,  // HTTPS
    80,   // HTTP
    587,  // SMTP (STARTTLS)
    465,  // SMTPS
    993,  // IMAPS
    123,  // NTP
    53,   // DNS
];

/// Per-port TCP connect timeout during protocol detection (milliseconds)
pub const PROBE_CONNECT_TIMEOUT_MILLIS: u64 = 1500;

/// Map a port to its protocol name, or `None` when unrecognized.
#[must_use]
pub fn protocol_for_port(port: u16) -> Option<&'static str> {
    match port {
        443 | 8443 | 9443 => Some("https"),
        80 | 8080 => Some("http"),
        21 => Some("ftp"),
        587 => Some("smtp"),
        465 => Some("smtps"),
        993 => Some("imaps"),
        123 => Some("ntp"),
        53 => Some("dns"),
        _ => None,
    }
}

// ============================================================================
// Monitoring Constants
// ============================================================================

/// Default check interval for generated monitoring endpoints
pub const DEFAULT_MONITOR_INTERVAL: &str = "60s";

/// Default HTTP status code accepted by generated endpoints
pub const DEFAULT_ALLOWED_STATUS_CODE: u16 = 200;

/// Group name for endpoints that match no topology host
pub const FALLBACK_GROUP: &str = "other";

// ============================================================================
// HTTP Client Constants
// ============================================================================

/// Timeout for REST calls to the directory and zone APIs (seconds)
pub const API_REQUEST_TIMEOUT_SECS: u64 = 15;

// ============================================================================
// Runtime Constants
// ============================================================================

/// Number of worker threads for Tokio runtime
pub const TOKIO_WORKER_THREADS: usize = 4;

/// Default interval between reconciliation cycles (seconds)
pub const DEFAULT_CYCLE_INTERVAL_SECS: u64 = 300;

#[cfg(test)]
#[path = "constants_tests.rs"]
mod constants_tests;
