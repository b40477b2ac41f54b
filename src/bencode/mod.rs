//! Bencode codec.
//!
//! | Type | Format | Example |
//! |------|--------|---------|
//! | Integer | `i<number>e` | `i42e` |
//! | Byte string | `<length>:<data>` | `4:spam` |
//! | List | `l<items>e` | `l4:spami42ee` |
//! | Dictionary | `d<key><value>...e` | `d3:bar4:spam3:fooi42ee` |
//!
//! A document is always a dictionary. Encoding is canonical: dictionary
//! keys are written in ascending byte order.

pub mod bvalue;
pub mod decode;
pub mod encode;
pub mod error;
pub mod helpers;
pub mod json;

pub(crate) const DICT_START: u8 = b'd';
pub(crate) const LIST_START: u8 = b'l';
pub(crate) const INT_START: u8 = b'i';
pub(crate) const END: u8 = b'e';
pub(crate) const STRING_SEPARATOR: u8 = b':';

pub use bvalue::{BDict, BInteger, BValue};   // re-export
pub use decode::{decode, decode_bytes, decode_value_with, decode_with, DecodeOptions, DuplicateKeys, DEFAULT_MAX_DEPTH};   // re-export
pub use encode::{encode, encode_to, encode_to_with, encode_value, encode_with, EncodeOptions};   // re-export
pub use error::{BencodeError, ErrorKind, Stage};
pub use helpers::{get_string, get_u64, get_u64_field, lookup_bytestring, lookup_dict};
pub use json::{bvalue_to_json, dict_to_json, encode_json, encode_json_with, json_to_bvalue};
