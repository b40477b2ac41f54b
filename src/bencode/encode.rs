use std::io::Write;

use super::bvalue::{BDict, BInteger, BValue};
use super::decode::DEFAULT_MAX_DEPTH;
use super::error::{BencodeError, Stage};
use super::{DICT_START, END, INT_START, LIST_START, STRING_SEPARATOR};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodeOptions {
    /// Same depth accounting as `DecodeOptions::max_depth`.
    pub max_depth: usize,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// Encode a dictionary into its canonical bencoded form.
///
/// Keys are written in ascending byte order regardless of how the map was
/// built, so equal dictionaries always produce identical bytes.
pub fn encode(dict: &BDict) -> Result<Vec<u8>, BencodeError> {
    encode_with(dict, &EncodeOptions::default())
}

pub fn encode_with(dict: &BDict, opts: &EncodeOptions) -> Result<Vec<u8>, BencodeError> {
    let mut encoder = Encoder::new(opts);
    encoder.write_dict(dict, 1)?;
    Ok(encoder.out)
}

/// Encodes into `writer`. Nothing is written unless the whole tree encodes.
pub fn encode_to<W: Write>(dict: &BDict, writer: W) -> Result<(), BencodeError> {
    encode_to_with(dict, writer, &EncodeOptions::default())
}

pub fn encode_to_with<W: Write>(
    dict: &BDict,
    mut writer: W,
    opts: &EncodeOptions,
) -> Result<(), BencodeError> {
    let encoded = encode_with(dict, opts)?;
    writer
        .write_all(&encoded)
        .and_then(|_| writer.flush())
        .map_err(|e| BencodeError::io(Stage::Output, e))
}

/// Encodes a single value of any type.
pub fn encode_value(value: &BValue) -> Result<Vec<u8>, BencodeError> {
    let opts = EncodeOptions::default();
    let mut encoder = Encoder::new(&opts);
    encoder.write_value(value, 0)?;
    Ok(encoder.out)
}

struct Encoder {
    out: Vec<u8>,
    max_depth: usize,
}

impl Encoder {
    fn new(opts: &EncodeOptions) -> Self {
        Self {
            out: Vec::new(),
            max_depth: opts.max_depth,
        }
    }

    fn enter(&self, depth: usize) -> Result<(), BencodeError> {
        if depth > self.max_depth {
            return Err(BencodeError::DepthExceeded(self.max_depth));
        }
        Ok(())
    }

    fn write_value(&mut self, value: &BValue, depth: usize) -> Result<(), BencodeError> {
        match value {
            BValue::ByteString(bytes) => self.write_bytes(bytes),
            BValue::Integer(i) => self.write_integer(i),
            BValue::List(items) => self.write_list(items, depth + 1)?,
            BValue::Dict(dict) => self.write_dict(dict, depth + 1)?,
        }
        Ok(())
    }

    fn write_integer(&mut self, i: &BInteger) {
        self.out.push(INT_START);
        self.out.extend_from_slice(i.to_string().as_bytes());
        self.out.push(END);
    }

    fn write_bytes(&mut self, bytes: &[u8]) {
        self.out.extend_from_slice(bytes.len().to_string().as_bytes());
        self.out.push(STRING_SEPARATOR);
        self.out.extend_from_slice(bytes);
    }

    fn write_list(&mut self, items: &[BValue], depth: usize) -> Result<(), BencodeError> {
        self.enter(depth)?;
        self.out.push(LIST_START);
        for item in items {
            self.write_value(item, depth)?;
        }
        self.out.push(END);
        Ok(())
    }

    fn write_dict(&mut self, dict: &BDict, depth: usize) -> Result<(), BencodeError> {
        self.enter(depth)?;

        // Vec<u8> ordering is byte-wise unsigned, which is what bencode wants
        let mut sorted_keys: Vec<&Vec<u8>> = dict.keys().collect();
        sorted_keys.sort_unstable();

        self.out.push(DICT_START);
        for key in sorted_keys {
            self.write_bytes(key);
            self.write_value(&dict[key], depth)?;
        }
        self.out.push(END);
        Ok(())
    }
}
