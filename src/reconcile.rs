// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Zone convergence.
//!
//! Diffs the zone's current CNAME records against the desired pairs and
//! issues create/update/delete calls to converge them. Only managed
//! records are touched: CNAMEs whose value references a topology hostname.
//! Names on the retention list are never deleted; subdomains on the
//! ignore list never enter the expected state.
//!
//! Deletions run strictly before creates and updates, so an upsert never
//! collides with a to-be-removed name. Known gap: a name that changes
//! owner within one cycle is deleted first and re-created afterwards, so
//! it briefly disappears from the zone instead of transitioning
//! atomically. This matches the convergence contract and is deliberately
//! not papered over with transactional semantics the zone API does not
//! offer.

use crate::constants::{DEFAULT_RECORD_TTL_SECS, TOPOLOGY_PREFIX};
use crate::desired::DesiredPair;
use crate::zone_api::{normalize_value, ZoneApi, ZoneRecord};
use std::collections::BTreeMap;
use tracing::{debug, error, info};

/// Converges zone CNAME records to the desired pairs.
pub struct ZoneReconciler<'a, Z: ZoneApi + ?Sized> {
    zone: &'a Z,
    domain: String,
    keep_records: Vec<String>,
    ignore_subdomains: Vec<String>,
    root_aliases: Vec<String>,
}

impl<'a, Z: ZoneApi + ?Sized> ZoneReconciler<'a, Z> {
    /// Create a reconciler over a zone seam.
    #[must_use]
    pub fn new(
        zone: &'a Z,
        domain: &str,
        keep_records: &[String],
        ignore_subdomains: &[String],
        root_aliases: &[String],
    ) -> Self {
        Self {
            zone,
            domain: domain.to_string(),
            keep_records: keep_records.to_vec(),
            ignore_subdomains: ignore_subdomains.to_vec(),
            root_aliases: root_aliases.to_vec(),
        }
    }

    /// Converge the zone and return the refreshed record set.
    ///
    /// An unresolvable zone aborts with an empty result. Individual
    /// mutation failures are logged by the zone client and abandoned;
    /// remaining records are still processed.
    pub async fn reconcile(&self, pairs: &[DesiredPair]) -> Vec<ZoneRecord> {
        let Some(zone_id) = self.zone.resolve_zone_id(&self.domain).await else {
            error!(domain = %self.domain, "Zone id not resolvable, skipping convergence");
            return Vec::new();
        };

        let current = self.zone.list_records(&zone_id).await;
        let managed = managed_records(&current);
        let expected = self.expected_state(pairs);

        debug!(
            zone = %zone_id,
            current = current.len(),
            managed = managed.len(),
            expected = expected.len(),
            "Computed zone diff inputs"
        );

        // Delete phase: strictly before any create/update
        for (name, record) in &managed {
            if expected.contains_key(name) {
                continue;
            }
            if self.keep_records.iter().any(|k| k == name) {
                info!(
                    name = %name,
                    value = %record.value,
                    "Record absent from desired state but retained by configuration"
                );
                continue;
            }
            self.zone
                .delete_record(&zone_id, name, &record.record_type)
                .await;
        }

        // Upsert phase
        for (name, target) in &expected {
            match managed.get(name) {
                Some(record) if normalize_value(&record.value) == normalize_value(target) => {
                    debug!(name = %name, value = %target, "Record already converged");
                }
                Some(record) => {
                    info!(
                        name = %name,
                        before = %record.value,
                        after = %target,
                        "Record value diverged, updating"
                    );
                    self.zone
                        .update_record(
                            &zone_id,
                            name,
                            "CNAME",
                            std::slice::from_ref(target),
                            record.ttl,
                        )
                        .await;
                }
                None => {
                    self.zone
                        .create_record(&zone_id, name, "CNAME", target, DEFAULT_RECORD_TTL_SECS)
                        .await;
                }
            }
        }

        self.zone.list_records(&zone_id).await
    }

    /// Build the expected name → CNAME-target map from desired pairs,
    /// honoring the ignore list.
    fn expected_state(&self, pairs: &[DesiredPair]) -> BTreeMap<String, String> {
        let mut expected = BTreeMap::new();

        for pair in pairs {
            if self.is_ignored(pair) {
                debug!(
                    subdomain = %pair.subdomain,
                    resource = %pair.resource_name,
                    "Pair is on the ignore list, excluded from convergence"
                );
                continue;
            }
            expected.insert(pair.record_name().to_string(), pair.cname_target.clone());
        }

        expected
    }

    /// A pair is ignored when its subdomain is listed; root pairs match
    /// through any configured root alias as well.
    fn is_ignored(&self, pair: &DesiredPair) -> bool {
        if self.ignore_subdomains.iter().any(|s| s == &pair.subdomain) {
            return true;
        }
        pair.is_root
            && self
                .root_aliases
                .iter()
                .any(|alias| self.ignore_subdomains.contains(alias))
    }
}

/// Index the current records the reconciler considers its own: CNAMEs
/// whose value references a topology hostname, keyed by record name.
#[must_use]
pub fn managed_records(records: &[ZoneRecord]) -> BTreeMap<String, ZoneRecord> {
    records
        .iter()
        .filter(|r| r.record_type == "CNAME" && is_topology_target(&r.value))
        .map(|r| (r.name.clone(), r.clone()))
        .collect()
}

/// Whether a CNAME value points at a topology hostname.
#[must_use]
pub fn is_topology_target(value: &str) -> bool {
    normalize_value(value).starts_with(TOPOLOGY_PREFIX)
}

#[cfg(test)]
#[path = "reconcile_tests.rs"]
mod reconcile_tests;
