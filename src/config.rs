// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Settings for the zonesync daemon.
//!
//! The settings tree is deserialized from a YAML file whose path is given
//! on the command line. Every component reads its knobs from here through
//! the shared [`crate::context::Context`]; nothing in the pipeline touches
//! the file or the environment directly.
//!
//! API tokens can be overridden from the environment
//! (`ZONESYNC_DIRECTORY_TOKEN`, `ZONESYNC_ZONE_TOKEN`) so secrets can be
//! kept out of the file.

use crate::constants::{DEFAULT_ALLOWED_STATUS_CODE, DEFAULT_MONITOR_INTERVAL};
use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Environment variable overriding `directory.api_token`
pub const ENV_DIRECTORY_TOKEN: &str = "ZONESYNC_DIRECTORY_TOKEN";

/// Environment variable overriding `zone.api_token`
pub const ENV_ZONE_TOKEN: &str = "ZONESYNC_ZONE_TOKEN";

/// Root of the settings tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Base DNS domain all subdomains hang off (e.g. `example.com`)
    pub domain: String,

    /// Topology discovery settings
    pub topology: TopologySettings,

    /// Resource directory API settings
    pub directory: DirectorySettings,

    /// DNS zone API settings
    pub zone: ZoneSettings,

    /// Zone reconciler lists
    #[serde(default)]
    pub reconciler: ReconcilerSettings,

    /// Monitoring config generation settings
    pub monitoring: MonitoringSettings,
}

/// Where and how to discover the infrastructure topology.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopologySettings {
    /// Name of the TXT record carrying `host:ip` pairs
    pub source: String,

    /// Resolver to query, as `ip:port` (e.g. `192.0.2.53:53`)
    pub resolver: String,
}

/// Resource directory API access.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectorySettings {
    /// Base URL of the directory API
    pub api_url: String,

    /// Bearer token for the directory API
    #[serde(default)]
    pub api_token: String,

    /// Organization id to use verbatim; resolved from the API when absent
    #[serde(default)]
    pub organization_id: Option<String>,
}

/// DNS zone API access.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZoneSettings {
    /// Base URL of the zone API
    pub api_url: String,

    /// Bearer token for the zone API
    #[serde(default)]
    pub api_token: String,

    /// Zone id to use verbatim; resolved by domain name when absent
    #[serde(default)]
    pub zone_id: Option<String>,
}

/// Lists steering the zone reconciler.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReconcilerSettings {
    /// Record names exempt from deletion even when absent from desired state
    #[serde(default)]
    pub keep_records: Vec<String>,

    /// Subdomains excluded from desired-state computation entirely
    #[serde(default)]
    pub ignore_subdomains: Vec<String>,

    /// Additional names the zone apex is known under, matched against the
    /// ignore list for root pairs
    #[serde(default)]
    pub root_aliases: Vec<String>,
}

/// Monitoring config generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringSettings {
    /// Path of the generated monitoring config file
    pub output_path: PathBuf,

    /// Display-name overrides, keyed by subdomain or record name
    #[serde(default)]
    pub name_overrides: BTreeMap<String, String>,

    /// Per-subdomain port overrides; a hit here skips live detection
    #[serde(default)]
    pub port_overrides: BTreeMap<String, u16>,

    /// Globally accepted HTTP status codes
    #[serde(default = "default_allowed_status_codes")]
    pub allowed_status_codes: Vec<u16>,

    /// Extra status codes, each accepted only for subdomains matching one
    /// of the listed patterns
    #[serde(default)]
    pub extra_status_codes: BTreeMap<u16, Vec<String>>,

    /// Skip technical topology/tunnel aliases when generating endpoints
    #[serde(default = "default_true")]
    pub skip_technical_cnames: bool,

    /// Skip any endpoint whose name contains a known topology hostname
    #[serde(default)]
    pub aggressive_host_filter: bool,

    /// Check interval applied to every generated endpoint
    #[serde(default = "default_interval")]
    pub interval: String,

    /// Optional per-endpoint client timeout (e.g. `10s`)
    #[serde(default)]
    pub client_timeout: Option<String>,

    /// Alert definitions attached to every generated endpoint
    #[serde(default)]
    pub alerts: Vec<AlertDefinition>,
}

/// One alert definition attached to generated endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AlertDefinition {
    /// Alert provider type (e.g. `discord`, `email`)
    #[serde(rename = "type")]
    pub kind: String,

    /// Whether a resolution notification is sent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub send_on_resolved: Option<bool>,

    /// Failures before the alert triggers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_threshold: Option<u32>,

    /// Successes before the alert resolves
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success_threshold: Option<u32>,
}

fn default_allowed_status_codes() -> Vec<u16> {
    vec![DEFAULT_ALLOWED_STATUS_CODE]
}

fn default_interval() -> String {
    DEFAULT_MONITOR_INTERVAL.to_string()
}

fn default_true() -> bool {
    true
}

impl Settings {
    /// Load settings from a YAML file, apply environment overrides and
    /// validate the result.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] when the file cannot be read or parsed,
    /// or when a field fails validation.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::Unreadable {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        let mut settings: Settings =
            serde_yaml::from_str(&raw).map_err(|e| ConfigError::Invalid {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;

        if let Ok(token) = std::env::var(ENV_DIRECTORY_TOKEN) {
            settings.directory.api_token = token;
        }
        if let Ok(token) = std::env::var(ENV_ZONE_TOKEN) {
            settings.zone.api_token = token;
        }

        settings.validate()?;
        Ok(settings)
    }

    /// Validate field contents beyond what serde enforces.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::BadField`] for the first invalid field found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.domain.trim().is_empty() {
            return Err(ConfigError::BadField {
                field: "domain".to_string(),
                reason: "must not be empty".to_string(),
            });
        }

        self.topology
            .resolver
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::BadField {
                field: "topology.resolver".to_string(),
                reason: format!("not a socket address: {e}"),
            })?;

        for (field, value) in [
            ("directory.api_url", &self.directory.api_url),
            ("zone.api_url", &self.zone.api_url),
        ] {
            url::Url::parse(value).map_err(|e| ConfigError::BadField {
                field: field.to_string(),
                reason: format!("not a valid URL: {e}"),
            })?;
        }

        Ok(())
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod config_tests;
