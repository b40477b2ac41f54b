use serde_json::{json, Map, Number, Value};

use super::bvalue::{BDict, BValue};
use super::encode::{encode_with, EncodeOptions};
use super::error::BencodeError;

/// Marker for hex-escaped bytes. A non-UTF-8 value becomes the one-entry
/// object `{"_bytes_hex": "<hex>"}`; a dictionary key that is not UTF-8, or
/// that itself starts with the marker, becomes `"_bytes_hex:<hex>"`.
pub const BYTES_HEX_KEY: &str = "_bytes_hex";

/// JSON view of a value. Integers keep their full u64/i64 range, lists and
/// dictionaries map one to one, byte strings are JSON strings when they are
/// UTF-8 and hex-escaped otherwise. `json_to_bvalue` reverses it exactly.
pub fn bvalue_to_json(bv: &BValue) -> Value {
    match bv {
        BValue::Integer(i) => json!(i),
        BValue::ByteString(bytes) => bytes_to_json(bytes),
        BValue::List(items) => Value::Array(items.iter().map(bvalue_to_json).collect()),
        BValue::Dict(dict) => dict_to_json(dict),
    }
}

pub fn dict_to_json(dict: &BDict) -> Value {
    let mut json_map = Map::new();
    for (k, v) in dict {
        let key = match std::str::from_utf8(k) {
            Ok(s) if !s.starts_with(BYTES_HEX_KEY) => s.to_string(),
            // not UTF-8, or would be mistaken for an escape on the way back
            _ => format!("{}:{}", BYTES_HEX_KEY, hex::encode(k)),
        };
        json_map.insert(key, bvalue_to_json(v));
    }
    Value::Object(json_map)
}

fn bytes_to_json(bytes: &[u8]) -> Value {
    match std::str::from_utf8(bytes) {
        Ok(s) => Value::String(s.to_string()),
        Err(_) => json!({ BYTES_HEX_KEY: hex::encode(bytes) }),
    }
}

/// Converts loosely-typed JSON into a `BValue`.
///
/// This is the only place arbitrary input enters the codec: floats, booleans
/// and null have no bencode form and fail with `UnsupportedType`.
pub fn json_to_bvalue(value: &Value) -> Result<BValue, BencodeError> {
    match value {
        Value::String(s) => Ok(BValue::from(s.as_str())),
        Value::Number(n) => number_to_bvalue(n),
        Value::Array(items) => items
            .iter()
            .map(json_to_bvalue)
            .collect::<Result<Vec<_>, _>>()
            .map(BValue::List),
        Value::Object(map) => {
            if let Some(bytes) = hex_bytes(map)? {
                return Ok(BValue::ByteString(bytes));
            }
            json_object_to_dict(map).map(BValue::Dict)
        }
        Value::Bool(_) => Err(BencodeError::UnsupportedType("boolean")),
        Value::Null => Err(BencodeError::UnsupportedType("null")),
    }
}

fn json_object_to_dict(map: &Map<String, Value>) -> Result<BDict, BencodeError> {
    let mut dict = BDict::with_capacity(map.len());
    for (k, v) in map {
        dict.insert(json_key_to_bytes(k)?, json_to_bvalue(v)?);
    }
    Ok(dict)
}

fn json_key_to_bytes(key: &str) -> Result<Vec<u8>, BencodeError> {
    match key.strip_prefix(BYTES_HEX_KEY).and_then(|rest| rest.strip_prefix(':')) {
        Some(encoded) => hex::decode(encoded).map_err(|_| BencodeError::TypeMismatch {
            expected: "hex-encoded key",
            found: "malformed hex",
        }),
        None => Ok(key.as_bytes().to_vec()),
    }
}

fn number_to_bvalue(n: &Number) -> Result<BValue, BencodeError> {
    if let Some(v) = n.as_i64() {
        Ok(BValue::from(v))
    } else if let Some(v) = n.as_u64() {
        Ok(BValue::from(v))
    } else {
        Err(BencodeError::UnsupportedType("float"))
    }
}

/// Recognizes `{"_bytes_hex": "<hex>"}` as raw bytes.
fn hex_bytes(map: &Map<String, Value>) -> Result<Option<Vec<u8>>, BencodeError> {
    if map.len() != 1 {
        return Ok(None);
    }
    match map.get(BYTES_HEX_KEY) {
        Some(Value::String(encoded)) => hex::decode(encoded)
            .map(Some)
            .map_err(|_| BencodeError::TypeMismatch {
                expected: "hex-encoded bytes",
                found: "malformed hex",
            }),
        _ => Ok(None),
    }
}

/// Encodes a JSON object as a bencoded document.
pub fn encode_json(value: &Value) -> Result<Vec<u8>, BencodeError> {
    encode_json_with(value, &EncodeOptions::default())
}

pub fn encode_json_with(value: &Value, opts: &EncodeOptions) -> Result<Vec<u8>, BencodeError> {
    let map = match value {
        Value::Object(map) => map,
        other => {
            return Err(BencodeError::TypeMismatch {
                expected: "dictionary",
                found: json_type_name(other),
            })
        }
    };
    let dict = json_object_to_dict(map)?;
    encode_with(&dict, opts)
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "dictionary",
    }
}
