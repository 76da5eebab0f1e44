//! Conversion utilities between wire JSON and BSON documents.
//!
//! Provides structural conversion between serde_json::Value and BSON, the
//! recursive wire-timestamp normalization applied on both write and read
//! paths, and argument-extraction helpers for tool handlers.

use mongodb::bson::{Bson, DateTime, Document};
use serde_json::{Map, Value as JsonValue};

use crate::error::{Result, ServerError};

/// Convert a JSON value to BSON, structurally.
///
/// Integers become `Int64`, other numbers `Double`. Wire-timestamp rewriting
/// is a separate pass ([`normalize_timestamps`]) so the two concerns stay
/// independent.
pub fn json_to_bson(json: JsonValue) -> Bson {
    match json {
        JsonValue::Null => Bson::Null,
        JsonValue::Bool(b) => Bson::Boolean(b),
        JsonValue::Number(n) => n
            .as_i64()
            .map(Bson::Int64)
            .or_else(|| n.as_f64().map(Bson::Double))
            .unwrap_or(Bson::Null),
        JsonValue::String(s) => Bson::String(s),
        JsonValue::Array(items) => Bson::Array(items.into_iter().map(json_to_bson).collect()),
        JsonValue::Object(map) => Bson::Document(json_object_to_doc(map)),
    }
}

/// Convert a JSON object to a BSON document, field order preserved.
pub fn json_object_to_doc(map: Map<String, JsonValue>) -> Document {
    let mut doc = Document::new();
    for (k, v) in map {
        doc.insert(k, json_to_bson(v));
    }
    doc
}

/// Convert a BSON value to JSON for a response payload.
///
/// Native timestamps render as RFC 3339 strings, object ids as hex. Exotic
/// BSON types that never originate from this server fall back to relaxed
/// extended JSON.
pub fn bson_to_json(bson: Bson) -> JsonValue {
    match bson {
        Bson::Null => JsonValue::Null,
        Bson::Boolean(b) => JsonValue::Bool(b),
        Bson::Int32(i) => JsonValue::from(i),
        Bson::Int64(i) => JsonValue::from(i),
        Bson::Double(f) => JsonValue::from(f),
        Bson::String(s) => JsonValue::String(s),
        Bson::Array(items) => JsonValue::Array(items.into_iter().map(bson_to_json).collect()),
        Bson::Document(doc) => {
            let mut map = Map::new();
            for (k, v) in doc {
                map.insert(k, bson_to_json(v));
            }
            JsonValue::Object(map)
        }
        Bson::DateTime(dt) => dt
            .try_to_rfc3339_string()
            .map(JsonValue::String)
            .unwrap_or_else(|_| JsonValue::from(dt.timestamp_millis())),
        Bson::ObjectId(oid) => JsonValue::String(oid.to_hex()),
        other => other.into_relaxed_extjson(),
    }
}

/// Recursively rewrite wire-timestamp mappings into native timestamps.
///
/// A wire timestamp is a mapping with exactly two numeric fields, `seconds`
/// and `nanoseconds`. Native timestamps pass through unchanged, sequences are
/// normalized element-wise, other mappings field-wise with key order
/// preserved, scalars unchanged. Pure and total; applying it twice is a no-op.
pub fn normalize_timestamps(value: Bson) -> Bson {
    match value {
        Bson::Document(doc) => match wire_timestamp(&doc) {
            Some(dt) => Bson::DateTime(dt),
            None => Bson::Document(
                doc.into_iter()
                    .map(|(k, v)| (k, normalize_timestamps(v)))
                    .collect(),
            ),
        },
        Bson::Array(items) => Bson::Array(items.into_iter().map(normalize_timestamps).collect()),
        other => other,
    }
}

/// Normalize every field value of a document.
pub fn normalize_doc(doc: Document) -> Document {
    doc.into_iter()
        .map(|(k, v)| (k, normalize_timestamps(v)))
        .collect()
}

/// Match the wire-timestamp shape: exactly `seconds` and `nanoseconds`, both
/// numeric. Sub-millisecond precision is truncated to the backend's native
/// resolution.
fn wire_timestamp(doc: &Document) -> Option<DateTime> {
    if doc.len() != 2 {
        return None;
    }
    let seconds = doc.get("seconds").and_then(numeric)?;
    let nanos = doc.get("nanoseconds").and_then(numeric)?;
    Some(DateTime::from_millis(seconds * 1000 + nanos / 1_000_000))
}

fn numeric(value: &Bson) -> Option<i64> {
    match value {
        Bson::Int32(i) => Some(i64::from(*i)),
        Bson::Int64(i) => Some(*i),
        Bson::Double(f) => Some(*f as i64),
        _ => None,
    }
}

/// Build a document response payload: the id under `id`, then the normalized
/// data fields in stored order.
pub fn doc_response(id: &str, data: Document) -> JsonValue {
    let mut map = Map::new();
    map.insert("id".to_string(), JsonValue::String(id.to_string()));
    for (k, v) in normalize_doc(data) {
        map.insert(k, bson_to_json(v));
    }
    JsonValue::Object(map)
}

/// Helper to get a required string argument from JSON arguments.
pub fn get_string_arg(args: &Map<String, JsonValue>, name: &str) -> Result<String> {
    args.get(name)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| ServerError::MissingArg(name.to_string()))
}

/// Helper to get an optional string argument from JSON arguments.
pub fn get_optional_string(args: &Map<String, JsonValue>, name: &str) -> Option<String> {
    args.get(name).and_then(|v| v.as_str()).map(|s| s.to_string())
}

/// Helper to get an optional boolean argument.
pub fn get_optional_bool(args: &Map<String, JsonValue>, name: &str) -> Option<bool> {
    args.get(name).and_then(|v| v.as_bool())
}

/// Helper to get a required object argument as a BSON document.
pub fn get_object_arg(args: &Map<String, JsonValue>, name: &str) -> Result<Document> {
    match args.get(name) {
        None => Err(ServerError::MissingArg(name.to_string())),
        Some(JsonValue::Object(map)) => Ok(json_object_to_doc(map.clone())),
        Some(_) => Err(ServerError::InvalidArg {
            name: name.to_string(),
            reason: "expected an object".to_string(),
        }),
    }
}
