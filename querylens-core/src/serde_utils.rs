use serde_json::Value;

use crate::errors::{QueryLensError, Result};

/// Serializes a value to pretty JSON with canonical error handling.
pub fn to_pretty_json<T: serde::Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value)
        .map_err(|err| QueryLensError::SerializationError(err.to_string()))
}

/// Deserializes a JSON string into the provided type with shared error semantics.
pub fn from_json_str<T: serde::de::DeserializeOwned>(input: &str) -> Result<T> {
    serde_json::from_str(input)
        .map_err(|err| QueryLensError::DeserializationError(err.to_string()))
}

/// Deserializes JSON bytes.
pub fn from_json_bytes<T: serde::de::DeserializeOwned>(input: &[u8]) -> Result<T> {
    serde_json::from_slice(input)
        .map_err(|err| QueryLensError::DeserializationError(err.to_string()))
}

/// Serializes a value to compact JSON with object keys sorted at every depth.
///
/// Two values that compare equal always produce the same string, which makes
/// the output usable as a cache key.
pub fn to_canonical_json<T: serde::Serialize>(value: &T) -> Result<String> {
    let value = serde_json::to_value(value)
        .map_err(|err| QueryLensError::SerializationError(err.to_string()))?;
    serde_json::to_string(&sort_keys(value))
        .map_err(|err| QueryLensError::SerializationError(err.to_string()))
}

fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(key, value)| (key, sort_keys(value)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_keys).collect()),
        other => other,
    }
}
