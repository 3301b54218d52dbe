// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Tests for envelope shape decoding.

#[cfg(test)]
mod tests {
    use crate::api_shapes::{
        extract_bool, extract_items, extract_str, extract_u64, ShapeStrategy,
    };
    use serde_json::json;

    #[test]
    fn test_bare_array_shape() {
        let body = json!([{"id": 1}, {"id": 2}]);
        let items = extract_items(&body, "resources");
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn test_data_items_shape() {
        let body = json!({"data": {"items": [{"id": 1}]}});
        let items = extract_items(&body, "resources");
        assert_eq!(items.len(), 1);
    }

    #[test]
    fn test_data_array_shape() {
        let body = json!({"data": [{"id": 1}, {"id": 2}, {"id": 3}]});
        let items = extract_items(&body, "resources");
        assert_eq!(items.len(), 3);
    }

    #[test]
    fn test_direct_key_shape() {
        let body = json!({"resources": [{"id": 1}]});
        let items = extract_items(&body, "resources");
        assert_eq!(items.len(), 1);
    }

    #[test]
    fn test_unrecognized_shape_is_empty() {
        let body = json!({"unexpected": {"weird": true}});
        assert!(extract_items(&body, "resources").is_empty());
        assert!(extract_items(&json!(null), "resources").is_empty());
        assert!(extract_items(&json!("text"), "resources").is_empty());
    }

    #[test]
    fn test_strategy_order_bare_array_wins() {
        // A bare array is matched by the first strategy even when the
        // caller passed a key that would also match later strategies.
        let body = json!([{"id": "a"}]);
        assert_eq!(
            ShapeStrategy::BareArray.apply(&body, "ignored"),
            Some(vec![json!({"id": "a"})])
        );
        assert_eq!(ShapeStrategy::DataItems.apply(&body, "ignored"), None);
    }

    #[test]
    fn test_data_items_beats_direct_key() {
        // When both `data.items` and the direct key are present, the
        // earlier strategy wins.
        let body = json!({
            "data": {"items": [{"id": "nested"}]},
            "resources": [{"id": "direct"}]
        });
        let items = extract_items(&body, "resources");
        assert_eq!(items, vec![json!({"id": "nested"})]);
    }

    #[test]
    fn test_empty_matched_array_still_wins() {
        // A structurally matching empty array terminates the search; the
        // direct key is not consulted.
        let body = json!({"data": [], "resources": [{"id": 1}]});
        assert!(extract_items(&body, "resources").is_empty());
    }

    #[test]
    fn test_extract_str_field_order() {
        let obj = json!({"uuid": "u-1", "id": "i-1"});
        assert_eq!(extract_str(&obj, &["id", "uuid"]), Some("i-1".to_string()));
        assert_eq!(extract_str(&obj, &["uuid", "id"]), Some("u-1".to_string()));
    }

    #[test]
    fn test_extract_str_numeric_id() {
        let obj = json!({"id": 42});
        assert_eq!(extract_str(&obj, &["id"]), Some("42".to_string()));
    }

    #[test]
    fn test_extract_str_skips_empty_strings() {
        let obj = json!({"id": "", "uuid": "u-1"});
        assert_eq!(extract_str(&obj, &["id", "uuid"]), Some("u-1".to_string()));
    }

    #[test]
    fn test_extract_u64_variants() {
        assert_eq!(extract_u64(&json!({"port": 443}), &["port"]), Some(443));
        assert_eq!(extract_u64(&json!({"port": "8080"}), &["port"]), Some(8080));
        assert_eq!(extract_u64(&json!({"port": "nope"}), &["port"]), None);
        assert_eq!(extract_u64(&json!({}), &["port"]), None);
    }

    #[test]
    fn test_extract_bool() {
        assert_eq!(
            extract_bool(&json!({"enabled": true}), &["enabled", "primary"]),
            Some(true)
        );
        assert_eq!(
            extract_bool(&json!({"primary": false}), &["enabled", "primary"]),
            Some(false)
        );
        assert_eq!(extract_bool(&json!({}), &["enabled"]), None);
    }
}
