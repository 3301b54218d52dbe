// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Tests for error classification.

#[cfg(test)]
mod tests {
    use crate::errors::ApiError;

    fn status_error(status: u16) -> ApiError {
        ApiError::UnexpectedStatus {
            url: "http://api.test/zones".to_string(),
            status,
            body: String::new(),
        }
    }

    #[test]
    fn test_network_failures_are_transient() {
        let err = ApiError::RequestFailed {
            url: "http://api.test/zones".to_string(),
            reason: "connection refused".to_string(),
        };
        assert!(err.is_transient());
    }

    #[test]
    fn test_server_errors_are_transient() {
        assert!(status_error(500).is_transient());
        assert!(status_error(502).is_transient());
        assert!(status_error(503).is_transient());
        assert!(status_error(429).is_transient());
    }

    #[test]
    fn test_client_errors_are_permanent() {
        assert!(!status_error(400).is_transient());
        assert!(!status_error(401).is_transient());
        assert!(!status_error(404).is_transient());
    }

    #[test]
    fn test_invalid_body_is_permanent() {
        let err = ApiError::InvalidBody {
            url: "http://api.test/zones".to_string(),
            reason: "expected value at line 1".to_string(),
        };
        assert!(!err.is_transient());
    }
}
