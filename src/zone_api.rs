// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! REST client for the DNS zone API.
//!
//! The zone API models its data as record sets: one `name` + `type` pair
//! carrying one or more values. Listing flattens every record set to one
//! [`ZoneRecord`] per value for internal processing; updates re-aggregate
//! by replacing the full value set of a name+type pair.
//!
//! CNAME values are normalized to carry a trailing dot when sent and have
//! trailing dots stripped when compared. All mutations report a boolean
//! success flag: failures are logged and swallowed, never raised.

use crate::api_shapes::extract_str;
use crate::constants::{DEFAULT_RECORD_TTL_SECS, ZONE_LIST_PAGE_SIZE};
use crate::context::Context;
use crate::errors::ApiError;
use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, error, info, warn};

/// One flat zone record. Represents externally-owned state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneRecord {
    /// Composite identifier, `name/type`
    pub id: String,
    /// Record name (`@` for the apex)
    pub name: String,
    /// Record type (`A`, `CNAME`, ...)
    pub record_type: String,
    /// One value of the record set
    pub value: String,
    /// TTL in seconds
    pub ttl: u32,
    /// Owning zone id
    pub zone_id: String,
}

impl ZoneRecord {
    /// Composite id for a name+type pair.
    #[must_use]
    pub fn composite_id(name: &str, record_type: &str) -> String {
        format!("{name}/{record_type}")
    }
}

/// Strip any trailing dot for comparisons.
#[must_use]
pub fn normalize_value(value: &str) -> &str {
    value.trim_end_matches('.')
}

/// Ensure a CNAME target carries its trailing dot for the wire.
#[must_use]
pub fn to_wire_cname(value: &str) -> String {
    format!("{}.", value.trim_end_matches('.'))
}

/// Seam over the zone API, so the reconciler can be exercised without a
/// live server.
#[async_trait]
pub trait ZoneApi: Send + Sync {
    /// Resolve the zone id for a domain, or `None` when not resolvable.
    async fn resolve_zone_id(&self, domain: &str) -> Option<String>;

    /// List all records of a zone, flattened per value.
    async fn list_records(&self, zone_id: &str) -> Vec<ZoneRecord>;

    /// Create a record set with a single value.
    async fn create_record(
        &self,
        zone_id: &str,
        name: &str,
        record_type: &str,
        value: &str,
        ttl: u32,
    ) -> bool;

    /// Replace the full value set of a name+type pair.
    async fn update_record(
        &self,
        zone_id: &str,
        name: &str,
        record_type: &str,
        values: &[String],
        ttl: u32,
    ) -> bool;

    /// Delete a name+type pair entirely.
    async fn delete_record(&self, zone_id: &str, name: &str, record_type: &str) -> bool;
}

/// Concrete zone client over the REST API.
pub struct ZoneClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
    configured_zone: Option<String>,
}

impl ZoneClient {
    /// Build a client from the shared context.
    #[must_use]
    pub fn new(ctx: &Context) -> Self {
        Self {
            http: ctx.http.clone(),
            base_url: ctx.settings.zone.api_url.trim_end_matches('/').to_string(),
            token: ctx.settings.zone.api_token.clone(),
            configured_zone: ctx.settings.zone.zone_id.clone(),
        }
    }

    /// Perform a request and decode the body as JSON.
    async fn request_json(
        &self,
        method: reqwest::Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value, ApiError> {
        let url = format!("{}{path}", self.base_url);

        let mut request = self.http.request(method, &url).bearer_auth(&self.token);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| ApiError::RequestFailed {
            url: url.clone(),
            reason: e.to_string(),
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::UnexpectedStatus {
                url,
                status: status.as_u16(),
                body: body.chars().take(200).collect(),
            });
        }

        if status == reqwest::StatusCode::NO_CONTENT {
            return Ok(Value::Null);
        }

        response.json().await.map_err(|e| ApiError::InvalidBody {
            url,
            reason: e.to_string(),
        })
    }

    /// Flatten one record-set object into per-value records.
    fn flatten_record_set(set: &Value, zone_id: &str) -> Vec<ZoneRecord> {
        let Some(name) = extract_str(set, &["name"]) else {
            warn!("Skipping record set without a name");
            return Vec::new();
        };
        let Some(record_type) = extract_str(set, &["type"]) else {
            warn!(name = %name, "Skipping record set without a type");
            return Vec::new();
        };
        let ttl = set
            .get("ttl")
            .and_then(Value::as_u64)
            .and_then(|t| u32::try_from(t).ok())
            .unwrap_or(DEFAULT_RECORD_TTL_SECS);

        let values = set
            .get("records")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        values
            .iter()
            .filter_map(|entry| match entry {
                Value::String(s) => Some(s.clone()),
                other => extract_str(other, &["content", "value"]),
            })
            .map(|value| ZoneRecord {
                id: ZoneRecord::composite_id(&name, &record_type),
                name: name.clone(),
                record_type: record_type.clone(),
                value,
                ttl,
                zone_id: zone_id.to_string(),
            })
            .collect()
    }
}

#[async_trait]
impl ZoneApi for ZoneClient {
    async fn resolve_zone_id(&self, domain: &str) -> Option<String> {
        if let Some(id) = &self.configured_zone {
            debug!(zone = %id, "Using configured zone id");
            return Some(id.clone());
        }

        let path = format!("/zones?name={domain}");
        let body = match self.request_json(reqwest::Method::GET, &path, None).await {
            Ok(body) => body,
            Err(e) => {
                error!(domain = domain, error = %e, "Failed to query zone by name");
                return None;
            }
        };

        let zones = body
            .get("zones")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        let id = zones
            .iter()
            .find(|z| extract_str(z, &["name"]).as_deref() == Some(domain))
            .and_then(|z| extract_str(z, &["id"]));

        match &id {
            Some(id) => debug!(domain = domain, zone = %id, "Resolved zone id"),
            None => warn!(domain = domain, "Zone API knows no zone by this name"),
        }
        id
    }

    async fn list_records(&self, zone_id: &str) -> Vec<ZoneRecord> {
        let mut all_records = Vec::new();
        let mut page: u64 = 1;

        loop {
            let path = format!(
                "/zones/{zone_id}/rrsets?page={page}&per_page={ZONE_LIST_PAGE_SIZE}"
            );
            let body = match self.request_json(reqwest::Method::GET, &path, None).await {
                Ok(body) => body,
                Err(e) => {
                    error!(zone = zone_id, page = page, error = %e, "Failed to list records");
                    return all_records;
                }
            };

            let sets = body
                .get("rrsets")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default();

            let sets_in_page = sets.len();
            for set in &sets {
                all_records.extend(Self::flatten_record_set(set, zone_id));
            }

            debug!(
                zone = zone_id,
                page = page,
                sets_in_page = sets_in_page,
                total_records = all_records.len(),
                "Fetched record-set page"
            );

            let last_page = body
                .get("meta")
                .and_then(|m| m.get("pagination"))
                .and_then(|p| p.get("last_page"))
                .and_then(Value::as_u64)
                .unwrap_or(page);

            if page >= last_page {
                break;
            }
            page += 1;
        }

        all_records
    }

    async fn create_record(
        &self,
        zone_id: &str,
        name: &str,
        record_type: &str,
        value: &str,
        ttl: u32,
    ) -> bool {
        let wire_value = if record_type == "CNAME" {
            to_wire_cname(value)
        } else {
            value.to_string()
        };

        info!(
            zone = zone_id,
            name = name,
            r#type = record_type,
            value = %wire_value,
            "Creating zone record"
        );

        let body = json!({
            "name": name,
            "type": record_type,
            "ttl": ttl,
            "records": [wire_value],
        });

        let path = format!("/zones/{zone_id}/rrsets");
        match self
            .request_json(reqwest::Method::POST, &path, Some(&body))
            .await
        {
            Ok(_) => true,
            Err(e) => {
                error!(
                    zone = zone_id,
                    name = name,
                    r#type = record_type,
                    error = %e,
                    "Failed to create zone record"
                );
                false
            }
        }
    }

    async fn update_record(
        &self,
        zone_id: &str,
        name: &str,
        record_type: &str,
        values: &[String],
        ttl: u32,
    ) -> bool {
        let wire_values: Vec<String> = if record_type == "CNAME" {
            values.iter().map(|v| to_wire_cname(v)).collect()
        } else {
            values.to_vec()
        };

        info!(
            zone = zone_id,
            name = name,
            r#type = record_type,
            values = ?wire_values,
            "Updating zone record set"
        );

        let body = json!({ "ttl": ttl, "records": wire_values });
        let path = format!("/zones/{zone_id}/rrsets/{name}/{record_type}");
        match self
            .request_json(reqwest::Method::PUT, &path, Some(&body))
            .await
        {
            Ok(_) => true,
            Err(e) => {
                error!(
                    zone = zone_id,
                    name = name,
                    r#type = record_type,
                    error = %e,
                    "Failed to update zone record set"
                );
                false
            }
        }
    }

    async fn delete_record(&self, zone_id: &str, name: &str, record_type: &str) -> bool {
        info!(
            zone = zone_id,
            name = name,
            r#type = record_type,
            "Deleting zone record set"
        );

        let path = format!("/zones/{zone_id}/rrsets/{name}/{record_type}");
        match self
            .request_json(reqwest::Method::DELETE, &path, None)
            .await
        {
            Ok(_) => true,
            Err(e) => {
                error!(
                    zone = zone_id,
                    name = name,
                    r#type = record_type,
                    error = %e,
                    "Failed to delete zone record set"
                );
                false
            }
        }
    }
}

#[cfg(test)]
#[path = "zone_api_tests.rs"]
mod zone_api_tests;
