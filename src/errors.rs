// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Error types for zonesync components.
//!
//! This module provides specialized error types for:
//! - Topology TXT resolution (DNS query failures, malformed payloads)
//! - REST API operations against the directory and zone services
//! - Configuration loading and validation
//!
//! All component boundaries are fail-soft (see the orchestrator): these
//! types exist for structured logging and for classification inside a
//! component, not for propagation across the cycle boundary.

use thiserror::Error;

/// Errors that can occur while resolving the infrastructure topology.
#[derive(Error, Debug)]
pub enum TopologyError {
    /// The configured resolver address could not be parsed as `ip:port`
    #[error("Invalid resolver address '{address}': {reason}")]
    InvalidResolverAddress {
        /// The configured resolver address
        address: String,
        /// Why parsing failed
        reason: String,
    },

    /// The TXT query failed (network error, NXDOMAIN, timeout)
    #[error("TXT query for '{name}' against {resolver} failed: {reason}")]
    QueryFailed {
        /// The queried record name
        name: String,
        /// The resolver that was queried
        resolver: String,
        /// Specific reason for the failure
        reason: String,
    },

    /// The TXT query succeeded but returned no usable payload
    #[error("TXT query for '{name}' returned no answer")]
    EmptyAnswer {
        /// The queried record name
        name: String,
    },
}

/// Errors that can occur during REST calls to the directory or zone APIs.
#[derive(Error, Debug)]
pub enum ApiError {
    /// The HTTP request could not be sent (connect failure, timeout)
    #[error("Request to {url} failed: {reason}")]
    RequestFailed {
        /// The request URL
        url: String,
        /// Reason for the connection failure
        reason: String,
    },

    /// The server answered with a non-success status code
    #[error("Unexpected HTTP status {status} from {url}: {body}")]
    UnexpectedStatus {
        /// The request URL
        url: String,
        /// HTTP status code
        status: u16,
        /// Response body, truncated for logging
        body: String,
    },

    /// The response body was not valid JSON
    #[error("Invalid JSON from {url}: {reason}")]
    InvalidBody {
        /// The request URL
        url: String,
        /// Decode error detail
        reason: String,
    },
}

impl ApiError {
    /// Returns true if this error is transient and the operation could be
    /// retried on a later cycle.
    ///
    /// Transient errors include network failures and 5xx/429 responses.
    /// Non-transient errors include 4xx client errors and malformed bodies.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::RequestFailed { .. } => true,
            Self::UnexpectedStatus { status, .. } => {
                *status == 429 || (*status >= 500 && *status < 600)
            }
            Self::InvalidBody { .. } => false,
        }
    }
}

/// Errors raised while loading or validating the settings file.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The settings file could not be read
    #[error("Cannot read settings file '{path}': {reason}")]
    Unreadable {
        /// The settings file path
        path: String,
        /// I/O error detail
        reason: String,
    },

    /// The settings file is not valid YAML for the expected schema
    #[error("Cannot parse settings file '{path}': {reason}")]
    Invalid {
        /// The settings file path
        path: String,
        /// Decode error detail
        reason: String,
    },

    /// A required field is missing or malformed
    #[error("Invalid setting '{field}': {reason}")]
    BadField {
        /// Dotted path of the offending field
        field: String,
        /// Why the value is rejected
        reason: String,
    },
}

#[cfg(test)]
#[path = "errors_tests.rs"]
mod errors_tests;
