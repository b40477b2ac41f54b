use std::collections::HashMap;
use std::fmt;

use serde::{Serialize, Serializer};

/// Dictionary payload. Keys are raw byte strings; iteration order carries no
/// meaning, the encoder sorts keys before writing.
pub type BDict = HashMap<Vec<u8>, BValue>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BValue {
	ByteString(Vec<u8>), // raw bytes for any string
	Integer(BInteger),
	List(Vec<BValue>),
	Dict(BDict),
}

/// A bencode integer: anything from `i64::MIN` up to `u64::MAX`.
///
/// Values that fit in `i64` are always stored signed, so equality does not
/// depend on which constructor built the integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BInteger(Repr);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Repr {
	Signed(i64),
	// only values above i64::MAX
	Unsigned(u64),
}

impl BInteger {
	pub const fn from_i64(v: i64) -> Self {
		BInteger(Repr::Signed(v))
	}

	pub const fn from_u64(v: u64) -> Self {
		if v <= i64::MAX as u64 {
			BInteger(Repr::Signed(v as i64))
		} else {
			BInteger(Repr::Unsigned(v))
		}
	}

	pub fn as_i64(&self) -> Option<i64> {
		match self.0 {
			Repr::Signed(v) => Some(v),
			Repr::Unsigned(_) => None,
		}
	}

	pub fn as_u64(&self) -> Option<u64> {
		match self.0 {
			Repr::Signed(v) => u64::try_from(v).ok(),
			Repr::Unsigned(v) => Some(v),
		}
	}

	/// The raw 64-bit pattern as `u64`; negative values wrap (`-1` gives `u64::MAX`).
	pub fn to_u64_bits(&self) -> u64 {
		match self.0 {
			Repr::Signed(v) => v as u64,
			Repr::Unsigned(v) => v,
		}
	}

	pub fn is_negative(&self) -> bool {
		matches!(self.0, Repr::Signed(v) if v < 0)
	}
}

impl fmt::Display for BInteger {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self.0 {
			Repr::Signed(v) => write!(f, "{}", v),
			Repr::Unsigned(v) => write!(f, "{}", v),
		}
	}
}

impl Serialize for BInteger {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		match self.0 {
			Repr::Signed(v) => serializer.serialize_i64(v),
			Repr::Unsigned(v) => serializer.serialize_u64(v),
		}
	}
}

macro_rules! integer_from_signed {
	($($t:ty),*) => {$(
		impl From<$t> for BInteger {
			fn from(v: $t) -> Self {
				BInteger::from_i64(v as i64)
			}
		}

		impl From<$t> for BValue {
			fn from(v: $t) -> Self {
				BValue::Integer(v.into())
			}
		}
	)*};
}

macro_rules! integer_from_unsigned {
	($($t:ty),*) => {$(
		impl From<$t> for BInteger {
			fn from(v: $t) -> Self {
				BInteger::from_u64(v as u64)
			}
		}

		impl From<$t> for BValue {
			fn from(v: $t) -> Self {
				BValue::Integer(v.into())
			}
		}
	)*};
}

integer_from_signed!(i8, i16, i32, i64, isize);
integer_from_unsigned!(u8, u16, u32, u64, usize);

impl From<BInteger> for BValue {
	fn from(v: BInteger) -> Self {
		BValue::Integer(v)
	}
}

impl From<&str> for BValue {
	fn from(s: &str) -> Self {
		BValue::ByteString(s.as_bytes().to_vec())
	}
}

impl From<String> for BValue {
	fn from(s: String) -> Self {
		BValue::ByteString(s.into_bytes())
	}
}

impl From<&[u8]> for BValue {
	fn from(b: &[u8]) -> Self {
		BValue::ByteString(b.to_vec())
	}
}

impl From<Vec<u8>> for BValue {
	fn from(b: Vec<u8>) -> Self {
		BValue::ByteString(b)
	}
}

impl From<Vec<BValue>> for BValue {
	fn from(items: Vec<BValue>) -> Self {
		BValue::List(items)
	}
}

impl From<BDict> for BValue {
	fn from(dict: BDict) -> Self {
		BValue::Dict(dict)
	}
}

impl BValue {
	pub fn type_name(&self) -> &'static str {
		match self {
			BValue::ByteString(_) => "byte string",
			BValue::Integer(_) => "integer",
			BValue::List(_) => "list",
			BValue::Dict(_) => "dictionary",
		}
	}

	pub fn as_bytes(&self) -> Option<&[u8]> {
		match self {
			BValue::ByteString(b) => Some(b),
			_ => None,
		}
	}

	/// UTF-8 view of a byte string; `None` for other variants or invalid UTF-8.
	pub fn as_str(&self) -> Option<&str> {
		self.as_bytes().and_then(|b| std::str::from_utf8(b).ok())
	}

	pub fn as_integer(&self) -> Option<BInteger> {
		match self {
			BValue::Integer(i) => Some(*i),
			_ => None,
		}
	}

	pub fn as_list(&self) -> Option<&[BValue]> {
		match self {
			BValue::List(items) => Some(items),
			_ => None,
		}
	}

	pub fn as_dict(&self) -> Option<&BDict> {
		match self {
			BValue::Dict(d) => Some(d),
			_ => None,
		}
	}

	/// Looks up `key` if this value is a dictionary.
	pub fn get(&self, key: impl AsRef<[u8]>) -> Option<&BValue> {
		self.as_dict().and_then(|d| d.get(key.as_ref()))
	}
}
