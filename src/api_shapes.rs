// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Tolerant decoding of heterogeneous API response envelopes.
//!
//! The directory API does not guarantee a stable response shape: the same
//! endpoint may answer with a bare array, `{"data": {"items": [...]}}`,
//! `{"data": [...]}` or `{"items": [...]}` / `{"<key>": [...]}`. Rather
//! than probing fields ad hoc at every call site, decoding is an explicit
//! ordered list of strategies tried in sequence against the raw
//! [`serde_json::Value`]; the first structural match wins. Each strategy
//! is independently unit-testable.

use serde_json::Value;

/// One extraction strategy for a list-carrying response envelope.
///
/// Strategies are tried in the order of [`ShapeStrategy::ALL`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeStrategy {
    /// The response body is the array itself
    BareArray,
    /// The array sits at `data.items`
    DataItems,
    /// The array sits directly under `data`
    DataArray,
    /// The array sits under the caller-supplied key
    DirectKey,
}

impl ShapeStrategy {
    /// All strategies in evaluation order.
    pub const ALL: [ShapeStrategy; 4] = [
        ShapeStrategy::BareArray,
        ShapeStrategy::DataItems,
        ShapeStrategy::DataArray,
        ShapeStrategy::DirectKey,
    ];

    /// Apply this strategy to a value.
    ///
    /// Returns `Some` when the value structurally matches the shape this
    /// strategy expects, even if the matched array is empty.
    #[must_use]
    pub fn apply(self, value: &Value, key: &str) -> Option<Vec<Value>> {
        match self {
            ShapeStrategy::BareArray => value.as_array().cloned(),
            ShapeStrategy::DataItems => value
                .get("data")
                .and_then(|d| d.get("items"))
                .and_then(Value::as_array)
                .cloned(),
            ShapeStrategy::DataArray => {
                value.get("data").and_then(Value::as_array).cloned()
            }
            ShapeStrategy::DirectKey => value.get(key).and_then(Value::as_array).cloned(),
        }
    }
}

/// Extract the item list from a response envelope of unknown shape.
///
/// Tries every [`ShapeStrategy`] in order and returns the first structural
/// match; an unrecognized envelope yields an empty list.
#[must_use]
pub fn extract_items(value: &Value, key: &str) -> Vec<Value> {
    for strategy in ShapeStrategy::ALL {
        if let Some(items) = strategy.apply(value, key) {
            return items;
        }
    }
    Vec::new()
}

/// Read the first present string field from an ordered list of names.
///
/// Numeric values are rendered to their decimal string so ids that arrive
/// as JSON numbers still resolve.
#[must_use]
pub fn extract_str(value: &Value, names: &[&str]) -> Option<String> {
    for name in names {
        match value.get(name) {
            Some(Value::String(s)) if !s.is_empty() => return Some(s.clone()),
            Some(Value::Number(n)) => return Some(n.to_string()),
            _ => {}
        }
    }
    None
}

/// Read the first present unsigned integer field from an ordered list of
/// names. String-encoded numbers are parsed.
#[must_use]
pub fn extract_u64(value: &Value, names: &[&str]) -> Option<u64> {
    for name in names {
        match value.get(name) {
            Some(Value::Number(n)) => {
                if let Some(v) = n.as_u64() {
                    return Some(v);
                }
            }
            Some(Value::String(s)) => {
                if let Ok(v) = s.parse::<u64>() {
                    return Some(v);
                }
            }
            _ => {}
        }
    }
    None
}

/// Read the first present boolean field from an ordered list of names.
#[must_use]
pub fn extract_bool(value: &Value, names: &[&str]) -> Option<bool> {
    for name in names {
        if let Some(Value::Bool(b)) = value.get(name) {
            return Some(*b);
        }
    }
    None
}

#[cfg(test)]
#[path = "api_shapes_tests.rs"]
mod api_shapes_tests;
