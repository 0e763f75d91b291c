//! Response-shape normalization for the Testly API.
//!
//! The server wraps payloads inconsistently across endpoints: some return the
//! document bare, some under `{"success": true, "data": ...}`, and list
//! endpoints variously use `exams`, `attempts`, `data`, `results` or `items`.
//! Every call site goes through these two functions instead of sniffing
//! shapes locally.

use serde_json::Value;

use crate::api::errors::ApiError;

/// Keys probed, in order, when a list endpoint wraps its array in an object.
const ARRAY_KEYS: &[&str] = &["exams", "attempts", "teachers", "data", "results", "items"];

/// Unwraps a `{success, data, message}` envelope to its payload. A bare
/// document passes through untouched.
pub(crate) fn unwrap_data(payload: Value) -> Value {
    match payload {
        Value::Object(mut object) if object.contains_key("success") && object.contains_key("data") => {
            object.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    }
}

/// Coerces a list response to an array: bare array, any of the known wrapper
/// keys, or the first array-valued field as a last resort. Anything else is
/// an empty list, never an error — read paths keep rendering.
pub(crate) fn coerce_array(payload: Value) -> Vec<Value> {
    match payload {
        Value::Array(items) => items,
        Value::Object(mut object) => {
            for key in ARRAY_KEYS {
                if let Some(Value::Array(items)) = object.remove(*key) {
                    return items;
                }
            }
            let fallback = object.into_iter().map(|(_, value)| value).find(|v| v.is_array());
            match fallback {
                Some(Value::Array(items)) => items,
                _ => Vec::new(),
            }
        }
        _ => Vec::new(),
    }
}

/// Decodes a single document after envelope unwrapping.
pub(crate) fn decode<T: serde::de::DeserializeOwned>(payload: Value) -> Result<T, ApiError> {
    serde_json::from_value(payload)
        .map_err(|err| ApiError::Unexpected(format!("undecodable document: {err}")))
}

/// Decodes a list response: unwraps the envelope, coerces to an array, and
/// drops (with a warning) entries that fail to decode instead of failing the
/// whole page.
pub(crate) fn decode_list<T: serde::de::DeserializeOwned>(
    payload: Value,
    what: &'static str,
) -> Vec<T> {
    let items = coerce_array(unwrap_data(payload));
    let total = items.len();
    let decoded: Vec<T> = items
        .into_iter()
        .filter_map(|item| match serde_json::from_value(item) {
            Ok(value) => Some(value),
            Err(err) => {
                tracing::warn!(error = %err, what, "Dropping undecodable list entry");
                None
            }
        })
        .collect();

    if decoded.is_empty() && total > 0 {
        tracing::warn!(what, total, "No usable entries in list response");
    }

    decoded
}

/// Pulls a human-readable message out of an error body, trying the field
/// names seen across the server's error responses.
pub(crate) fn extract_error_message(payload: &Value) -> String {
    payload
        .get("message")
        .and_then(Value::as_str)
        .or_else(|| payload.get("error").and_then(Value::as_str))
        .or_else(|| payload.get("detail").and_then(Value::as_str))
        .unwrap_or("unknown_error")
        .to_string()
}
