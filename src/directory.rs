// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! REST client for the resource directory.
//!
//! The directory is the authority for named services and their live
//! network targets. Its API is read-only from our side, bearer-token
//! authenticated, and notoriously loose about response envelopes — every
//! listing goes through [`crate::api_shapes`] before any field is read.
//!
//! Every operation is fail-soft: network failures and malformed bodies
//! degrade to an empty (or `None`) result with an error log. This client
//! never raises past its own boundary.

use crate::api_shapes::{extract_bool, extract_items, extract_str, extract_u64};
use crate::context::Context;
use crate::errors::ApiError;
use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, error, warn};

/// One named service from the resource directory. Read-only within a cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceEntry {
    /// Directory-side identifier
    pub id: String,
    /// Display name
    pub name: String,
    /// Domain the service is published under, when set
    pub domain: Option<String>,
    /// Resource-level protocol hint (`http`, `https`, ...)
    pub protocol: Option<String>,
    /// Whether the resource is enabled in the directory
    pub enabled: bool,
    /// Targets embedded in the resource record, used as a fallback when
    /// the live target listing comes back empty
    pub targets: Vec<ResourceTarget>,
}

/// One network target of a resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceTarget {
    /// Target IPv4 address
    pub address: String,
    /// Target port
    pub port: u16,
    /// Target-level protocol hint (`http`, `https`, ...)
    pub method: Option<String>,
    /// Whether this target is flagged enabled/primary
    pub enabled: bool,
}

/// Seam over the resource directory, so the desired-state builder can be
/// exercised without a live server.
#[async_trait]
pub trait Directory: Send + Sync {
    /// Resolve the organization id to operate on, or `None` when the
    /// directory is unreachable and no id is configured.
    async fn resolve_organization(&self) -> Option<String>;

    /// List the organization's resources.
    async fn list_resources(&self, org_id: &str) -> Vec<ResourceEntry>;

    /// List a resource's live targets.
    async fn list_targets(&self, resource_id: &str) -> Vec<ResourceTarget>;
}

/// Concrete directory client over the REST API.
pub struct DirectoryClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
    configured_org: Option<String>,
}

impl DirectoryClient {
    /// Build a client from the shared context.
    #[must_use]
    pub fn new(ctx: &Context) -> Self {
        Self {
            http: ctx.http.clone(),
            base_url: ctx.settings.directory.api_url.trim_end_matches('/').to_string(),
            token: ctx.settings.directory.api_token.clone(),
            configured_org: ctx.settings.directory.organization_id.clone(),
        }
    }

    /// Perform a GET and decode the body as JSON.
    async fn get_json(&self, path: &str) -> Result<Value, ApiError> {
        let url = format!("{}{path}", self.base_url);

        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| ApiError::RequestFailed {
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

        response.json().await.map_err(|e| ApiError::InvalidBody {
            url,
            reason: e.to_string(),
        })
    }
}

#[async_trait]
impl Directory for DirectoryClient {
    async fn resolve_organization(&self) -> Option<String> {
        if let Some(id) = &self.configured_org {
            debug!(org = %id, "Using configured organization id");
            return Some(id.clone());
        }

        let body = match self.get_json("/organizations").await {
            Ok(body) => body,
            Err(e) => {
                error!(error = %e, "Failed to list organizations");
                return None;
            }
        };

        let orgs = extract_items(&body, "organizations");
        let Some(first) = orgs.first() else {
            warn!("Directory returned no organizations");
            return None;
        };

        let id = extract_str(first, &["id", "uuid", "_id"]);
        match &id {
            Some(id) => debug!(org = %id, "Resolved organization from directory"),
            None => warn!("First organization entry carries no recognizable id field"),
        }
        id
    }

    async fn list_resources(&self, org_id: &str) -> Vec<ResourceEntry> {
        let path = format!("/organizations/{org_id}/resources");
        let body = match self.get_json(&path).await {
            Ok(body) => body,
            Err(e) => {
                error!(org = org_id, error = %e, "Failed to list resources");
                return Vec::new();
            }
        };

        let items = extract_items(&body, "resources");
        let resources: Vec<ResourceEntry> = items.iter().filter_map(parse_resource).collect();

        debug!(
            org = org_id,
            resources = resources.len(),
            "Listed directory resources"
        );
        resources
    }

    async fn list_targets(&self, resource_id: &str) -> Vec<ResourceTarget> {
        let path = format!("/resources/{resource_id}/targets");
        let body = match self.get_json(&path).await {
            Ok(body) => body,
            Err(e) => {
                error!(resource = resource_id, error = %e, "Failed to list targets");
                return Vec::new();
            }
        };

        let items = extract_items(&body, "targets");
        items.iter().filter_map(parse_target).collect()
    }
}

/// Decode one resource entry, tolerating the directory's field aliases.
///
/// Entries without a recognizable id are dropped.
fn parse_resource(value: &Value) -> Option<ResourceEntry> {
    let id = extract_str(value, &["id", "uuid", "_id"])?;
    let name = extract_str(value, &["name", "title"]).unwrap_or_else(|| id.clone());
    let domain = extract_str(value, &["domain", "fqdn", "host"]);
    let protocol = extract_str(value, &["protocol", "scheme"]);
    let enabled = extract_bool(value, &["enabled", "active"]).unwrap_or(true);

    let targets = value
        .get("targets")
        .and_then(Value::as_array)
        .map(|list| list.iter().filter_map(parse_target).collect())
        .unwrap_or_default();

    Some(ResourceEntry {
        id,
        name,
        domain,
        protocol,
        enabled,
        targets,
    })
}

/// Decode one target entry. Targets without an address are dropped.
fn parse_target(value: &Value) -> Option<ResourceTarget> {
    let address = extract_str(value, &["address", "ip", "host"])?;
    let port = extract_u64(value, &["port"]).and_then(|p| u16::try_from(p).ok())?;
    let method = extract_str(value, &["method", "protocol", "scheme"]);
    let enabled = extract_bool(value, &["enabled", "primary"]).unwrap_or(false);

    Some(ResourceTarget {
        address,
        port,
        method,
        enabled,
    })
}

#[cfg(test)]
#[path = "directory_tests.rs"]
mod directory_tests;
