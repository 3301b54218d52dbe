// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Monitoring endpoint synthesis.
//!
//! Derives health-check endpoint definitions from the cycle's desired
//! pairs and from zone records not claimed by any resource. Protocol and
//! port for zone-derived endpoints come from a live TCP probe sequence;
//! resource-derived endpoints reuse the target data the directory already
//! provided. The generated config is written atomically and only when its
//! content actually changed.
//!
//! Filtering invariant: an endpoint is never generated for a name hit by
//! the ignore list, the technical-alias skip or aggressive host
//! filtering.

use crate::config::{AlertDefinition, MonitoringSettings};
use crate::constants::{
    protocol_for_port, FALLBACK_GROUP, PROBE_CONNECT_TIMEOUT_MILLIS, PROBE_PORT_ORDER,
    TOPOLOGY_PREFIX, TUNNEL_PREFIX,
};
use crate::context::Context;
use crate::desired::DesiredPair;
use crate::net::subnet_contains;
use crate::topology::{short_host_name, TopologyMap};
use crate::zone_api::ZoneRecord;
use anyhow::{Context as AnyhowContext, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::io::Write;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

/// The generated monitoring configuration. Purely derived output; never
/// read back.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct MonitoringConfig {
    /// Endpoint definitions in generation order
    pub endpoints: Vec<MonitoringEndpoint>,
}

/// One monitoring endpoint definition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MonitoringEndpoint {
    /// Display name
    pub name: String,

    /// Group the endpoint is filed under
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,

    /// Check URL (`https://host:port`, `icmp://host`, ...)
    pub url: String,

    /// Check interval (e.g. `60s`)
    pub interval: String,

    /// Health conditions
    pub conditions: Vec<String>,

    /// Optional client options
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client: Option<ClientOptions>,

    /// Alert definitions
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alerts: Vec<AlertDefinition>,
}

/// Client options attached to an endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClientOptions {
    /// Request timeout (e.g. `10s`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<String>,

    /// Skip TLS verification
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insecure: Option<bool>,
}

/// Result of protocol/port detection for one target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectedService {
    /// Detected protocol name
    pub protocol: String,
    /// Detected port; 0 for the icmp fallback
    pub port: u16,
}

/// Seam over the TCP connect probe so detection ordering is testable
/// without open sockets.
#[async_trait]
pub trait PortProbe: Send + Sync {
    /// Whether a TCP connection to `host:port` succeeds within the probe
    /// timeout.
    async fn connects(&self, host: &str, port: u16) -> bool;
}

/// Real probe: bounded-timeout TCP connect.
pub struct TcpProbe;

#[async_trait]
impl PortProbe for TcpProbe {
    async fn connects(&self, host: &str, port: u16) -> bool {
        matches!(
            tokio::time::timeout(
                Duration::from_millis(PROBE_CONNECT_TIMEOUT_MILLIS),
                tokio::net::TcpStream::connect((host, port)),
            )
            .await,
            Ok(Ok(_))
        )
    }
}

/// Detection state machine. One terminal success state per call.
enum ProbeState {
    /// Checking for a configured port override
    TryingOverride,
    /// Probing candidate port at this index of [`PROBE_PORT_ORDER`]
    ProbingPort(usize),
    /// All probes failed
    Fallback,
}

/// Generates the monitoring configuration for one cycle.
pub struct MonitoringGenerator {
    base_domain: String,
    settings: MonitoringSettings,
    ignore_list: Vec<String>,
    keep_records: Vec<String>,
    topology: TopologyMap,
    probe: Box<dyn PortProbe>,
}

impl MonitoringGenerator {
    /// Build a generator from the shared context, probing with real TCP
    /// connects.
    #[must_use]
    pub fn new(ctx: &Context) -> Self {
        Self::with_probe(ctx, Box::new(TcpProbe))
    }

    /// Build a generator with a custom probe implementation.
    #[must_use]
    pub fn with_probe(ctx: &Context, probe: Box<dyn PortProbe>) -> Self {
        Self {
            base_domain: ctx.settings.domain.trim_end_matches('.').to_string(),
            settings: ctx.settings.monitoring.clone(),
            ignore_list: ctx.settings.reconciler.ignore_subdomains.clone(),
            keep_records: ctx.settings.reconciler.keep_records.clone(),
            topology: TopologyMap::new(),
            probe,
        }
    }

    /// Install the cycle's topology mapping, used for grouping and for
    /// the technical-alias filter.
    pub fn set_topology(&mut self, topology: TopologyMap) {
        self.topology = topology;
    }

    /// Detect protocol and port for a target.
    ///
    /// A configured port override for the subdomain resolves immediately
    /// from the port→protocol table without any network probe. Otherwise
    /// the candidate ports are probed in their fixed order and the first
    /// accepting port wins; total probe failure falls back to
    /// `icmp`/port 0.
    pub async fn detect_protocol_and_port(&self, target: &str, subdomain: &str) -> DetectedService {
        let mut state = ProbeState::TryingOverride;

        loop {
            match state {
                ProbeState::TryingOverride => {
                    if let Some(&port) = self.settings.port_overrides.get(subdomain) {
                        let protocol = protocol_for_port(port).unwrap_or("tcp");
                        debug!(
                            subdomain = subdomain,
                            port = port,
                            protocol = protocol,
                            "Port override resolves detection without probing"
                        );
                        return DetectedService {
                            protocol: protocol.to_string(),
                            port,
                        };
                    }
                    state = ProbeState::ProbingPort(0);
                }
                ProbeState::ProbingPort(index) => {
                    let Some(&port) = PROBE_PORT_ORDER.get(index) else {
                        state = ProbeState::Fallback;
                        continue;
                    };
                    if self.probe.connects(target, port).await {
                        let protocol = protocol_for_port(port).unwrap_or("tcp");
                        debug!(
                            host = target,
                            port = port,
                            protocol = protocol,
                            "Probe connected"
                        );
                        return DetectedService {
                            protocol: protocol.to_string(),
                            port,
                        };
                    }
                    state = ProbeState::ProbingPort(index + 1);
                }
                ProbeState::Fallback => {
                    debug!(host = target, "No probe port accepted, falling back to icmp");
                    return DetectedService {
                        protocol: "icmp".to_string(),
                        port: 0,
                    };
                }
            }
        }
    }

    /// Whether an endpoint name is excluded by the filtering rules.
    ///
    /// Three independent triggers: ignore-list exact/substring match,
    /// technical-alias skip, aggressive host filtering.
    #[must_use]
    pub fn should_skip_endpoint(&self, name: &str) -> bool {
        if self
            .ignore_list
            .iter()
            .any(|entry| name == entry || name.contains(entry.as_str()))
        {
            return true;
        }

        if self.settings.skip_technical_cnames && self.is_technical_alias(name) {
            return true;
        }

        if self.settings.aggressive_host_filter
            && self
                .topology
                .keys()
                .any(|key| name.contains(short_host_name(key)))
        {
            return true;
        }

        false
    }

    /// Whether a name embeds a topology- or tunnel-scoped internal alias
    /// of a known host (`on.<host>` or `tun.<host>`).
    #[must_use]
    pub fn is_technical_alias(&self, name: &str) -> bool {
        self.topology.keys().any(|key| {
            let host = short_host_name(key);
            let scoped = [
                format!("{TOPOLOGY_PREFIX}{host}"),
                format!("{TUNNEL_PREFIX}{host}"),
            ];
            scoped
                .iter()
                .any(|alias| name == alias || name.starts_with(&format!("{alias}.")) || name.contains(&format!(".{alias}")))
        })
    }

    /// Compute the allowed HTTP status codes for a subdomain/name pair.
    ///
    /// Starts from the global allow-list and adds each configured extra
    /// code whose pattern list matches the subdomain or name
    /// (case-insensitive, equality or containment). Deduplicated and
    /// sorted ascending.
    #[must_use]
    pub fn allowed_codes_for(&self, subdomain: &str, name: &str) -> Vec<u16> {
        let mut codes = self.settings.allowed_status_codes.clone();

        let subdomain = subdomain.to_lowercase();
        let name = name.to_lowercase();
        for (&code, patterns) in &self.settings.extra_status_codes {
            if codes.contains(&code) {
                continue;
            }
            let matched = patterns.iter().any(|pattern| {
                let pattern = pattern.to_lowercase();
                subdomain == pattern
                    || name == pattern
                    || subdomain.contains(&pattern)
                    || name.contains(&pattern)
            });
            if matched {
                codes.push(code);
            }
        }

        codes.sort_unstable();
        codes.dedup();
        codes
    }

    /// Construct one endpoint definition.
    ///
    /// URL layout depends on protocol; the default condition is a
    /// status-code check for http/https and a plain connectivity check
    /// otherwise, unless explicit conditions are supplied.
    #[must_use]
    pub fn build_endpoint(
        &self,
        name: &str,
        group: Option<String>,
        protocol: &str,
        host: &str,
        port: u16,
        allowed_codes: &[u16],
        conditions: Option<Vec<String>>,
    ) -> MonitoringEndpoint {
        let url = match protocol {
            "icmp" => format!("icmp://{host}"),
            "dns" => format!("dns://{host}"),
            _ => format!("{protocol}://{host}:{port}"),
        };

        let conditions = conditions.unwrap_or_else(|| {
            if protocol == "http" || protocol == "https" {
                vec![status_condition(allowed_codes)]
            } else {
                vec!["[CONNECTED] == true".to_string()]
            }
        });

        let insecure = (protocol == "https").then_some(true);
        let client = if self.settings.client_timeout.is_some() || insecure.is_some() {
            Some(ClientOptions {
                timeout: self.settings.client_timeout.clone(),
                insecure,
            })
        } else {
            None
        };

        MonitoringEndpoint {
            name: name.to_string(),
            group,
            url,
            interval: self.settings.interval.clone(),
            conditions,
            client,
            alerts: self.settings.alerts.clone(),
        }
    }

    /// Generate the full configuration from the cycle's desired pairs and
    /// the zone records left unclaimed by them.
    pub async fn generate(
        &self,
        pairs: &[DesiredPair],
        zone_records: &[ZoneRecord],
    ) -> MonitoringConfig {
        let mut endpoints = Vec::new();
        let mut claimed: BTreeSet<String> = BTreeSet::new();

        // Resource entries first
        for pair in pairs {
            claimed.insert(pair.subdomain.clone());
            claimed.insert(pair.fqdn.clone());

            if self.should_skip_endpoint(&pair.subdomain) || self.should_skip_endpoint(&pair.fqdn)
            {
                debug!(subdomain = %pair.subdomain, "Resource endpoint filtered out");
                continue;
            }

            let name = self
                .settings
                .name_overrides
                .get(&pair.subdomain)
                .cloned()
                .unwrap_or_else(|| pair.resource_name.clone());

            let service = match self.settings.port_overrides.get(&pair.subdomain) {
                Some(&port) => DetectedService {
                    protocol: protocol_for_port(port).unwrap_or("tcp").to_string(),
                    port,
                },
                None => DetectedService {
                    protocol: pair.protocol.clone(),
                    port: pair.port,
                },
            };

            let group = self.group_for(&pair.address, &pair.fqdn);
            let codes = self.allowed_codes_for(&pair.subdomain, &name);
            endpoints.push(self.build_endpoint(
                &name,
                Some(group),
                &service.protocol,
                &pair.address,
                service.port,
                &codes,
                None,
            ));
        }

        // Leftover zone records
        let mut seen_names: BTreeSet<String> = BTreeSet::new();
        for record in zone_records {
            if record.record_type != "A" && record.record_type != "CNAME" {
                continue;
            }
            // Multi-value record sets flatten to several records per name
            if !seen_names.insert(record.name.clone()) {
                continue;
            }

            let fqdn = if record.name == crate::constants::APEX_RECORD_NAME {
                self.base_domain.clone()
            } else {
                format!("{}.{}", record.name, self.base_domain)
            };

            let retained = self.keep_records.iter().any(|k| k == &record.name);
            if (claimed.contains(&record.name) || claimed.contains(&fqdn)) && !retained {
                continue;
            }

            if self.is_technical_alias(&record.name) && !retained {
                debug!(name = %record.name, "Skipping un-retained technical alias");
                continue;
            }

            if self.should_skip_endpoint(&record.name) {
                debug!(name = %record.name, "Zone endpoint filtered out");
                continue;
            }

            let name = self
                .settings
                .name_overrides
                .get(&record.name)
                .cloned()
                .unwrap_or_else(|| record.name.clone());

            // A records probe their address; CNAMEs probe the domain itself
            let target = if record.record_type == "A" {
                record.value.clone()
            } else {
                fqdn.clone()
            };

            let service = self.detect_protocol_and_port(&target, &record.name).await;
            let group = self.group_for(&record.value, &record.name);
            let codes = self.allowed_codes_for(&record.name, &name);
            endpoints.push(self.build_endpoint(
                &name,
                Some(group),
                &service.protocol,
                &target,
                service.port,
                &codes,
                None,
            ));

            claimed.insert(record.name.clone());
            claimed.insert(fqdn);
        }

        info!(endpoints = endpoints.len(), "Generated monitoring config");
        MonitoringConfig { endpoints }
    }

    /// Resolve the group for an endpoint: subnet containment of the
    /// address, else hostname substring match against the name, else the
    /// fallback group.
    fn group_for(&self, address: &str, name: &str) -> String {
        if let Some(key) = self
            .topology
            .iter()
            .find(|(_, subnet)| subnet_contains(subnet, address))
            .map(|(key, _)| key)
        {
            return short_host_name(key).to_string();
        }

        if let Some(key) = self
            .topology
            .keys()
            .find(|key| name.contains(short_host_name(key)))
        {
            return short_host_name(key).to_string();
        }

        FALLBACK_GROUP.to_string()
    }

    /// Serialize the config and replace `path` atomically, but only when
    /// the content differs from what is already there.
    ///
    /// Returns whether a write occurred.
    ///
    /// # Errors
    ///
    /// Returns an error when serialization, the temp-file write or the
    /// final rename fails.
    pub fn write_if_changed(&self, config: &MonitoringConfig, path: &Path) -> Result<bool> {
        let rendered =
            serde_yaml::to_string(config).context("Failed to serialize monitoring config")?;

        // Missing file counts as changed
        if let Ok(existing) = std::fs::read(path) {
            if content_hash(&existing) == content_hash(rendered.as_bytes()) {
                debug!(path = %path.display(), "Monitoring config unchanged, skipping write");
                return Ok(false);
            }
        }

        let dir = path.parent().filter(|p| !p.as_os_str().is_empty());
        let mut tmp = match dir {
            Some(dir) => tempfile::NamedTempFile::new_in(dir),
            None => tempfile::NamedTempFile::new(),
        }
        .context("Failed to create temporary monitoring config")?;

        tmp.write_all(rendered.as_bytes())
            .context("Failed to write temporary monitoring config")?;
        tmp.persist(path)
            .map_err(|e| e.error)
            .with_context(|| format!("Failed to replace {}", path.display()))?;

        info!(
            path = %path.display(),
            bytes = rendered.len(),
            "Monitoring config written"
        );
        Ok(true)
    }
}

/// SHA-256 of raw content, as a hex string.
fn content_hash(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

/// The default status-code condition for an allow-list.
fn status_condition(codes: &[u16]) -> String {
    match codes {
        [] => "[STATUS] == 200".to_string(),
        [single] => format!("[STATUS] == {single}"),
        many => {
            let joined = many
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            format!("[STATUS] == any({joined})")
        }
    }
}

#[cfg(test)]
#[path = "monitoring_tests.rs"]
mod monitoring_tests;
