use super::bvalue::{BDict, BValue};
use super::error::BencodeError;

/// Returns any integer value as a `u64`, else `TypeMismatch`.
///
/// Negative integers are reinterpreted bit for bit, so `-1` comes back as
/// `u64::MAX`. Use `BInteger::as_u64` when negatives must be refused.
pub fn get_u64(value: &BValue) -> Result<u64, BencodeError> {
    match value {
        BValue::Integer(i) => Ok(i.to_u64_bits()),
        other => Err(BencodeError::TypeMismatch {
            expected: "integer",
            found: other.type_name(),
        }),
    }
}

/// Looks up a key in the dictionary and returns a byte slice if the value is a ByteString.
/// Returns an error if the key is missing or the value is of the wrong type.
pub fn lookup_bytestring<'a>(dict: &'a BDict, key: &str) -> Result<&'a [u8], BencodeError> {
    match lookup(dict, key)? {
        BValue::ByteString(b) => Ok(b),
        other => Err(BencodeError::TypeMismatch {
            expected: "byte string",
            found: other.type_name(),
        }),
    }
}

/// Gets a ByteString from the dictionary and converts it into a UTF-8 String.
pub fn get_string(dict: &BDict, key: &str) -> Result<String, BencodeError> {
    let bytes = lookup_bytestring(dict, key)?;
    String::from_utf8(bytes.to_vec()).map_err(|_| BencodeError::TypeMismatch {
        expected: "UTF-8 string",
        found: "non-UTF-8 bytes",
    })
}

pub fn get_u64_field(dict: &BDict, key: &str) -> Result<u64, BencodeError> {
    get_u64(lookup(dict, key)?)
}

pub fn lookup_dict<'a>(dict: &'a BDict, key: &str) -> Result<&'a BDict, BencodeError> {
    match lookup(dict, key)? {
        BValue::Dict(d) => Ok(d),
        other => Err(BencodeError::TypeMismatch {
            expected: "dictionary",
            found: other.type_name(),
        }),
    }
}

fn lookup<'a>(dict: &'a BDict, key: &str) -> Result<&'a BValue, BencodeError> {
    dict.get(key.as_bytes())
        .ok_or_else(|| BencodeError::MissingKey(key.to_string()))
}
