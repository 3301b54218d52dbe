// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Subnet and IPv4 helpers.
//!
//! Pure functions used by topology resolution, desired-state mapping and
//! monitoring grouping. All of them tolerate malformed input: a bad
//! address is "not contained" or `None`, never a panic or an error.

use crate::constants::TOPOLOGY_SUBNET_PREFIX;
use ipnetwork::Ipv4Network;
use std::net::Ipv4Addr;

/// Parse a dotted-quad IPv4 address into its 32-bit host-order value.
///
/// Returns `None` for anything that is not a valid dotted quad.
#[must_use]
pub fn ipv4_to_u32(addr: &str) -> Option<u32> {
    addr.trim().parse::<Ipv4Addr>().ok().map(u32::from)
}

/// Check whether `addr` falls inside `network`.
///
/// Malformed addresses are treated as not contained.
#[must_use]
pub fn subnet_contains(network: &Ipv4Network, addr: &str) -> bool {
    addr.trim()
        .parse::<Ipv4Addr>()
        .map(|ip| network.contains(ip))
        .unwrap_or(false)
}

/// Derive the /24 block containing `addr`.
///
/// Returns `None` when `addr` is not a valid IPv4 address.
#[must_use]
pub fn slash24_of(addr: &str) -> Option<Ipv4Network> {
    let ip = addr.trim().parse::<Ipv4Addr>().ok()?;
    let base = Ipv4Addr::from(u32::from(ip) & 0xffff_ff00);
    Ipv4Network::new(base, TOPOLOGY_SUBNET_PREFIX).ok()
}

#[cfg(test)]
#[path = "net_tests.rs"]
mod net_tests;
