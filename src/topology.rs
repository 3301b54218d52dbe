// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Infrastructure topology discovery via a DNS TXT record.
//!
//! A single TXT record, queried raw against a configured resolver, carries
//! the mapping of discovered hosts to their addresses as
//! `host1:ip1,host2:ip2,...`. Each entry is reduced to the /24 block of
//! its address and keyed by the topology-prefixed hostname (`on.<host>`).
//!
//! The query is attempted up to [`TOPOLOGY_QUERY_ATTEMPTS`] times with a
//! fixed delay between attempts and a per-attempt timeout. Total failure
//! degrades to an empty map with an error log: callers treat an empty map
//! as "no topology data", never as an exception.

use crate::constants::{
    TOPOLOGY_PREFIX, TOPOLOGY_QUERY_ATTEMPTS, TOPOLOGY_QUERY_TIMEOUT_SECS,
    TOPOLOGY_RETRY_DELAY_SECS,
};
use crate::errors::TopologyError;
use crate::net::slash24_of;
use anyhow::{Context as AnyhowContext, Result};
use hickory_client::client::{AsyncClient, ClientHandle};
use hickory_client::rr::{DNSClass, Name, RecordType};
use hickory_client::udp::UdpClientStream;
use hickory_proto::rr::RData;
use ipnetwork::Ipv4Network;
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Mapping from topology hostname key (`on.<host>`) to its /24 subnet.
///
/// Built fresh each cycle and owned exclusively by that cycle.
pub type TopologyMap = BTreeMap<String, Ipv4Network>;

/// Resolves the infrastructure topology from the configured TXT record.
pub struct TopologyResolver {
    source: String,
    resolver: String,
}

impl TopologyResolver {
    /// Create a resolver for a TXT `source` name queried against
    /// `resolver` (an `ip:port` socket address).
    #[must_use]
    pub fn new(source: &str, resolver: &str) -> Self {
        Self {
            source: source.to_string(),
            resolver: resolver.to_string(),
        }
    }

    /// Resolve the topology mapping.
    ///
    /// Never fails past this boundary: all errors degrade to an empty map.
    pub async fn resolve(&self) -> TopologyMap {
        let addr: SocketAddr = match self.resolver.parse() {
            Ok(addr) => addr,
            Err(e) => {
                error!(
                    resolver = %self.resolver,
                    error = %e,
                    "Invalid topology resolver address, returning empty topology"
                );
                return TopologyMap::new();
            }
        };

        let mut last_error: Option<TopologyError> = None;

        for attempt in 1..=TOPOLOGY_QUERY_ATTEMPTS {
            match tokio::time::timeout(
                Duration::from_secs(TOPOLOGY_QUERY_TIMEOUT_SECS),
                self.query_txt(addr),
            )
            .await
            {
                Ok(Ok(payload)) => {
                    if attempt > 1 {
                        debug!(
                            attempt = attempt,
                            source = %self.source,
                            "Topology TXT query succeeded after retries"
                        );
                    }
                    let map = parse_topology_payload(&payload);
                    info!(
                        hosts = map.len(),
                        source = %self.source,
                        "Resolved topology mapping"
                    );
                    return map;
                }
                Ok(Err(e)) => {
                    warn!(
                        attempt = attempt,
                        source = %self.source,
                        resolver = %addr,
                        error = %e,
                        "Topology TXT query attempt failed"
                    );
                    last_error = Some(TopologyError::QueryFailed {
                        name: self.source.clone(),
                        resolver: addr.to_string(),
                        reason: e.to_string(),
                    });
                }
                Err(_) => {
                    warn!(
                        attempt = attempt,
                        source = %self.source,
                        resolver = %addr,
                        timeout_secs = TOPOLOGY_QUERY_TIMEOUT_SECS,
                        "Topology TXT query attempt timed out"
                    );
                    last_error = Some(TopologyError::QueryFailed {
                        name: self.source.clone(),
                        resolver: addr.to_string(),
                        reason: format!("timed out after {TOPOLOGY_QUERY_TIMEOUT_SECS}s"),
                    });
                }
            }

            if attempt < TOPOLOGY_QUERY_ATTEMPTS {
                tokio::time::sleep(Duration::from_secs(TOPOLOGY_RETRY_DELAY_SECS)).await;
            }
        }

        error!(
            source = %self.source,
            attempts = TOPOLOGY_QUERY_ATTEMPTS,
            error = %last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "unknown".to_string()),
            "All topology TXT query attempts failed, returning empty topology"
        );
        TopologyMap::new()
    }

    /// Issue one raw TXT query and join the answer's character strings.
    async fn query_txt(&self, server_addr: SocketAddr) -> Result<String> {
        let stream = UdpClientStream::<tokio::net::UdpSocket>::new(server_addr);
        let (mut client, bg) = AsyncClient::connect(stream).await?;

        // Spawn the background task
        tokio::spawn(bg);

        let name = Name::from_str(&self.source)
            .with_context(|| format!("Invalid topology source name: {}", self.source))?;

        let response = client
            .query(name, DNSClass::IN, RecordType::TXT)
            .await
            .with_context(|| {
                format!(
                    "Failed to query TXT record {} on {server_addr}",
                    self.source
                )
            })?;

        let mut payload = String::new();
        for record in response.answers() {
            if let Some(RData::TXT(txt)) = record.data() {
                for chunk in txt.txt_data() {
                    payload.push_str(&String::from_utf8_lossy(chunk));
                }
            }
        }

        if payload.is_empty() {
            anyhow::bail!(TopologyError::EmptyAnswer {
                name: self.source.clone(),
            });
        }

        Ok(payload)
    }
}

/// Parse a `host1:ip1,host2:ip2,...` payload into a topology map.
///
/// Entries tolerate surrounding whitespace. Malformed entries (missing
/// separator, invalid address) are skipped with a warning, not fatal.
#[must_use]
pub fn parse_topology_payload(payload: &str) -> TopologyMap {
    let mut map = TopologyMap::new();

    for entry in payload.split(',') {
        let entry = entry.trim();
        if entry.is_empty() {
            continue;
        }

        let Some((host, ip)) = entry.split_once(':') else {
            warn!(entry = entry, "Skipping topology entry without separator");
            continue;
        };

        let host = host.trim();
        if host.is_empty() {
            warn!(entry = entry, "Skipping topology entry with empty host");
            continue;
        }

        let Some(subnet) = slash24_of(ip) else {
            warn!(
                entry = entry,
                host = host,
                "Skipping topology entry with invalid address"
            );
            continue;
        };

        let key = format!("{TOPOLOGY_PREFIX}{}", host.to_lowercase());
        debug!(key = %key, subnet = %subnet, "Discovered topology host");
        map.insert(key, subnet);
    }

    map
}

/// Strip the topology prefix from a hostname key (`on.alpha` → `alpha`).
#[must_use]
pub fn short_host_name(key: &str) -> &str {
    key.strip_prefix(TOPOLOGY_PREFIX).unwrap_or(key)
}

#[cfg(test)]
#[path = "topology_tests.rs"]
mod topology_tests;
