// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Desired-state computation.
//!
//! Joins the resource directory with the topology mapping: every resource
//! that carries a domain and a usable target inside a known subnet yields
//! one desired domain → CNAME pairing. These pairs are the sole input to
//! zone convergence and a primary input to monitoring generation.

use crate::directory::{Directory, ResourceEntry, ResourceTarget};
use crate::net::subnet_contains;
use crate::topology::TopologyMap;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// The computed mapping from a resource's domain to the topology hostname
/// serving its target. At most one pair exists per subdomain per cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesiredPair {
    /// Subdomain relative to the base domain; empty for the apex
    pub subdomain: String,
    /// Fully qualified domain
    pub fqdn: String,
    /// Topology hostname key serving the target (`on.<host>`)
    pub host_key: String,
    /// Full CNAME target (`on.<host>.<base domain>`)
    pub cname_target: String,
    /// Whether this pair addresses the zone apex
    pub is_root: bool,
    /// Name of the resource this pair derives from
    pub resource_name: String,
    /// Selected target address
    pub address: String,
    /// Selected target port
    pub port: u16,
    /// Resolved protocol (`http`, `https` or `tcp`)
    pub protocol: String,
}

impl DesiredPair {
    /// The key this pair converges under: `@` for the apex, else the
    /// subdomain.
    #[must_use]
    pub fn record_name(&self) -> &str {
        if self.is_root {
            crate::constants::APEX_RECORD_NAME
        } else {
            &self.subdomain
        }
    }
}

/// Builds desired pairs from the directory and a topology mapping.
pub struct DesiredStateBuilder<'a, D: Directory + ?Sized> {
    directory: &'a D,
    base_domain: String,
}

impl<'a, D: Directory + ?Sized> DesiredStateBuilder<'a, D> {
    /// Create a builder over a directory seam and the base domain.
    #[must_use]
    pub fn new(directory: &'a D, base_domain: &str) -> Self {
        Self {
            directory,
            base_domain: base_domain.trim_end_matches('.').to_string(),
        }
    }

    /// Compute the desired pairs for this cycle.
    ///
    /// Resources without a domain, without a usable target, or whose
    /// target matches no topology subnet are skipped with a log line.
    /// When two resources resolve to the same subdomain the
    /// last-processed one wins; the overwrite is logged.
    pub async fn build_desired_pairs(&self, topology: &TopologyMap) -> Vec<DesiredPair> {
        let Some(org_id) = self.directory.resolve_organization().await else {
            warn!("No organization resolvable, desired state is empty");
            return Vec::new();
        };

        let resources = self.directory.list_resources(&org_id).await;
        let mut pairs: BTreeMap<String, DesiredPair> = BTreeMap::new();

        for resource in &resources {
            if !resource.enabled {
                debug!(resource = %resource.name, "Skipping disabled resource");
                continue;
            }

            let Some(pair) = self.pair_for_resource(resource, topology).await else {
                continue;
            };

            let key = pair.record_name().to_string();
            if let Some(previous) = pairs.insert(key.clone(), pair) {
                warn!(
                    subdomain = %key,
                    previous_resource = %previous.resource_name,
                    winning_resource = %pairs[&key].resource_name,
                    "Two resources resolve to the same subdomain, last one wins"
                );
            }
        }

        info!(
            resources = resources.len(),
            pairs = pairs.len(),
            "Computed desired CNAME pairs"
        );
        pairs.into_values().collect()
    }

    /// Compute the desired pair for one resource, or `None` when skipped.
    async fn pair_for_resource(
        &self,
        resource: &ResourceEntry,
        topology: &TopologyMap,
    ) -> Option<DesiredPair> {
        let Some(domain) = resource.domain.as_deref().map(str::trim).filter(|d| !d.is_empty())
        else {
            debug!(resource = %resource.name, "Skipping resource without a domain");
            return None;
        };

        let fqdn = self.qualify(domain);
        let subdomain = self.subdomain_of(&fqdn);
        let is_root = subdomain.is_empty() || subdomain == self.base_domain;

        let mut targets = self.directory.list_targets(&resource.id).await;
        if targets.is_empty() {
            // Fall back to targets embedded in the resource record
            targets = resource.targets.clone();
        }
        let Some(target) = select_target(&targets) else {
            warn!(resource = %resource.name, "Skipping resource without any target");
            return None;
        };

        if crate::net::ipv4_to_u32(&target.address).is_none() {
            warn!(
                resource = %resource.name,
                address = %target.address,
                "Skipping resource without a usable target IP"
            );
            return None;
        }

        let Some((host_key, _)) = topology
            .iter()
            .find(|(_, subnet)| subnet_contains(subnet, &target.address))
        else {
            warn!(
                resource = %resource.name,
                address = %target.address,
                "Target address matches no topology subnet, skipping resource"
            );
            return None;
        };

        let protocol = resolve_protocol(
            target.method.as_deref(),
            resource.protocol.as_deref(),
            target.port,
        );

        Some(DesiredPair {
            subdomain,
            fqdn,
            host_key: host_key.clone(),
            cname_target: format!("{host_key}.{}", self.base_domain),
            is_root,
            resource_name: resource.name.clone(),
            address: target.address.clone(),
            port: target.port,
            protocol,
        })
    }

    /// Append the base domain unless `domain` is already fully qualified
    /// under it.
    fn qualify(&self, domain: &str) -> String {
        let domain = domain.trim_end_matches('.');
        if domain == self.base_domain || domain.ends_with(&format!(".{}", self.base_domain)) {
            domain.to_string()
        } else {
            format!("{domain}.{}", self.base_domain)
        }
    }

    /// The part of `fqdn` left of the base domain; empty for the apex.
    fn subdomain_of(&self, fqdn: &str) -> String {
        fqdn.strip_suffix(&format!(".{}", self.base_domain))
            .unwrap_or_else(|| fqdn.strip_suffix(&self.base_domain).unwrap_or(fqdn))
            .to_string()
    }
}

/// Select the first target flagged enabled, or the first target when none
/// are flagged.
#[must_use]
pub fn select_target(targets: &[ResourceTarget]) -> Option<&ResourceTarget> {
    targets.iter().find(|t| t.enabled).or_else(|| targets.first())
}

/// Resolve the protocol for a target by precedence: explicit target
/// method, explicit resource protocol, then port heuristic.
#[must_use]
pub fn resolve_protocol(
    target_method: Option<&str>,
    resource_protocol: Option<&str>,
    port: u16,
) -> String {
    for hint in [target_method, resource_protocol].into_iter().flatten() {
        let hint = hint.to_lowercase();
        if hint == "http" || hint == "https" {
            return hint;
        }
    }

    match port {
        443 | 8443 | 9443 => "https".to_string(),
        80 => "http".to_string(),
        _ => "tcp".to_string(),
    }
}

#[cfg(test)]
#[path = "desired_tests.rs"]
mod desired_tests;
