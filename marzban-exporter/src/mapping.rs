//! Coercion of untyped control-plane JSON into sample values and labels.
//!
//! Upstream documents are loosely shaped, so nothing here fails: a missing
//! or unusable number becomes `0` and a missing label becomes `"unknown"`.

use serde_json::Value;

/// Label value used when a field is absent or null.
pub const UNKNOWN_LABEL: &str = "unknown";

/// Read a numeric field from a JSON object.
///
/// - Numbers are returned as `f64`
/// - Booleans map to `1` / `0`
/// - Strings are parsed as floats when possible
/// - Anything else, including a missing field, yields `0`
pub fn number(record: &Value, field: &str) -> f64 {
    record.get(field).map(coerce_number).unwrap_or(0.0)
}

/// Read a label field from a JSON object.
///
/// Strings are used verbatim, null or missing fields become
/// [`UNKNOWN_LABEL`], and every other value is rendered as compact JSON.
pub fn label(record: &Value, field: &str) -> String {
    match record.get(field) {
        None | Some(Value::Null) => UNKNOWN_LABEL.to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Read a boolean-ish field as `1` or `0`.
pub fn flag(record: &Value, field: &str) -> f64 {
    if number(record, field) != 0.0 { 1.0 } else { 0.0 }
}

/// Extract a list of records from a response.
///
/// Accepts either a bare JSON array or an object holding the array under
/// `key`. Any other shape is treated as an empty list.
pub fn records<'a>(document: &'a Value, key: &str) -> &'a [Value] {
    match document {
        Value::Array(items) => items,
        Value::Object(map) => match map.get(key) {
            Some(Value::Array(items)) => items,
            _ => &[],
        },
        _ => &[],
    }
}

fn coerce_number(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::Bool(b) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        Value::String(s) => s.trim().parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    }
}
