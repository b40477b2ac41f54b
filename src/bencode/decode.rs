use std::io::{BufRead, Read};

use serde::{Deserialize, Serialize};

use super::bvalue::{BDict, BInteger, BValue};
use super::error::{BencodeError, Stage};
use super::{DICT_START, END, INT_START, LIST_START, STRING_SEPARATOR};

pub const DEFAULT_MAX_DEPTH: usize = 512;

// Cap on the up-front allocation for a string payload; the declared length
// is untrusted until the bytes have actually been read.
const PREALLOC_LIMIT: usize = 64 * 1024;

/// What to do when a dictionary repeats a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateKeys {
    Reject,
    LastWins,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Containers nested deeper than this fail with `DepthExceeded`.
    /// The root dictionary counts as depth 1.
    pub max_depth: usize,
    /// Reject `-0` and leading zeros in integers and length prefixes.
    pub strict_integers: bool,
    pub duplicate_keys: DuplicateKeys,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            strict_integers: false,
            duplicate_keys: DuplicateKeys::Reject,
        }
    }
}

/// Decodes one bencoded document from `reader`.
///
/// The document root must be a dictionary. Reading stops right after the
/// root's terminator, so passing `&mut reader` leaves any trailing bytes
/// in place for the caller.
pub fn decode<R: BufRead>(reader: R) -> Result<BDict, BencodeError> {
    decode_with(reader, &DecodeOptions::default())
}

pub fn decode_with<R: BufRead>(reader: R, opts: &DecodeOptions) -> Result<BDict, BencodeError> {
    let mut decoder = Decoder { reader, opts };

    let root_type = decoder.next_byte(Stage::RootType)?;
    if root_type != DICT_START {
        return Err(BencodeError::NotADocument);
    }

    decoder.read_dict(1)
}

pub fn decode_bytes(input: &[u8]) -> Result<BDict, BencodeError> {
    decode(input)
}

/// Decodes a single value of any type, e.g. a fragment cut out of a larger
/// document. Top-level containers count as depth 1.
pub fn decode_value_with<R: BufRead>(
    reader: R,
    opts: &DecodeOptions,
) -> Result<BValue, BencodeError> {
    let mut decoder = Decoder { reader, opts };
    decoder.read_value(0, Stage::Value)
}

struct Decoder<'o, R> {
    reader: R,
    opts: &'o DecodeOptions,
}

impl<R: BufRead> Decoder<'_, R> {
    fn peek(&mut self, stage: Stage) -> Result<Option<u8>, BencodeError> {
        let buf = self
            .reader
            .fill_buf()
            .map_err(|e| BencodeError::io(stage, e))?;
        Ok(buf.first().copied())
    }

    fn next_byte(&mut self, stage: Stage) -> Result<u8, BencodeError> {
        let byte = self
            .peek(stage)?
            .ok_or(BencodeError::UnexpectedEnd(stage))?;
        self.reader.consume(1);
        Ok(byte)
    }

    /// Reads up to and including `delim`, returning the bytes before it.
    fn read_token(&mut self, delim: u8, stage: Stage) -> Result<Vec<u8>, BencodeError> {
        let mut buf = Vec::new();
        self.reader
            .read_until(delim, &mut buf)
            .map_err(|e| BencodeError::io(stage, e))?;

        if buf.pop() != Some(delim) {
            return Err(BencodeError::UnexpectedEnd(stage));
        }
        Ok(buf)
    }

    fn enter(&self, depth: usize) -> Result<(), BencodeError> {
        if depth > self.opts.max_depth {
            return Err(BencodeError::DepthExceeded(self.opts.max_depth));
        }
        Ok(())
    }

    /// `depth` is the depth of the enclosing container.
    fn read_value(&mut self, depth: usize, stage: Stage) -> Result<BValue, BencodeError> {
        match self.peek(stage)? {
            None => Err(BencodeError::UnexpectedEnd(stage)),
            Some(DICT_START) => {
                self.reader.consume(1);
                self.read_dict(depth + 1).map(BValue::Dict)
            }
            Some(LIST_START) => {
                self.reader.consume(1);
                self.read_list(depth + 1).map(BValue::List)
            }
            Some(INT_START) => {
                self.reader.consume(1);
                self.read_integer().map(BValue::Integer)
            }
            Some(END) => Err(BencodeError::format(stage, "unexpected terminator")),
            // anything else must be the first digit of a length prefix
            Some(_) => self.read_string(stage).map(BValue::ByteString),
        }
    }

    fn read_integer(&mut self) -> Result<BInteger, BencodeError> {
        let raw = self.read_token(END, Stage::Integer)?;
        parse_integer(&raw, self.opts.strict_integers)
    }

    /// Reads `<length>:<bytes>`. `stage` is reported if the first byte
    /// cannot start a length prefix.
    fn read_string(&mut self, stage: Stage) -> Result<Vec<u8>, BencodeError> {
        match self.peek(stage)? {
            None => return Err(BencodeError::UnexpectedEnd(stage)),
            Some(b) if !b.is_ascii_digit() => {
                return Err(BencodeError::format(
                    stage,
                    format!("expected byte string, found byte {:?}", b as char),
                ));
            }
            Some(_) => {}
        }

        let length = self.read_length()?;

        let mut data = Vec::with_capacity(length.min(PREALLOC_LIMIT));
        (&mut self.reader)
            .take(length as u64)
            .read_to_end(&mut data)
            .map_err(|e| BencodeError::io(Stage::StringPayload, e))?;

        if data.len() != length {
            return Err(BencodeError::UnexpectedEnd(Stage::StringPayload));
        }
        Ok(data)
    }

    fn read_length(&mut self) -> Result<usize, BencodeError> {
        let raw = self.read_token(STRING_SEPARATOR, Stage::Length)?;
        let text = String::from_utf8_lossy(&raw);

        if raw.is_empty() || !raw.iter().all(u8::is_ascii_digit) {
            return Err(BencodeError::format(
                Stage::Length,
                format!("invalid string length {:?}", text),
            ));
        }
        if self.opts.strict_integers && raw.len() > 1 && raw[0] == b'0' {
            return Err(BencodeError::format(
                Stage::Length,
                format!("leading zeros are not allowed: {}", text),
            ));
        }

        let length = text.parse::<i64>().map_err(|e| {
            BencodeError::format(Stage::Length, format!("invalid string length {}: {}", text, e))
        })?;
        usize::try_from(length).map_err(|_| {
            BencodeError::format(Stage::Length, format!("string length {} too large", length))
        })
    }

    fn read_list(&mut self, depth: usize) -> Result<Vec<BValue>, BencodeError> {
        self.enter(depth)?;
        let mut items = Vec::new();

        loop {
            match self.peek(Stage::ListItem)? {
                None => return Err(BencodeError::UnexpectedEnd(Stage::ListItem)),
                Some(END) => {
                    self.reader.consume(1);
                    return Ok(items);
                }
                Some(_) => items.push(self.read_value(depth, Stage::ListItem)?),
            }
        }
    }

    fn read_dict(&mut self, depth: usize) -> Result<BDict, BencodeError> {
        self.enter(depth)?;
        let mut dict = BDict::new();

        loop {
            match self.peek(Stage::DictEnd)? {
                None => return Err(BencodeError::UnexpectedEnd(Stage::DictEnd)),
                Some(END) => {
                    self.reader.consume(1);
                    return Ok(dict);
                }
                Some(_) => {}
            }

            let key = self.read_string(Stage::Key)?;

            match self.peek(Stage::ValueType)? {
                None => return Err(BencodeError::UnexpectedEnd(Stage::ValueType)),
                Some(END) => {
                    return Err(BencodeError::format(
                        Stage::ValueType,
                        format!("missing value for key {:?}", String::from_utf8_lossy(&key)),
                    ));
                }
                Some(_) => {}
            }

            if self.opts.duplicate_keys == DuplicateKeys::Reject && dict.contains_key(&key) {
                return Err(BencodeError::DuplicateKey(
                    String::from_utf8_lossy(&key).into_owned(),
                ));
            }

            let value = self.read_value(depth, Stage::Value)?;
            dict.insert(key, value);
        }
    }
}

/// Parses the text between `i` and `e`. The wire format has no signed or
/// unsigned marker, so the value is tried as `i64` first, then as `u64`.
fn parse_integer(raw: &[u8], strict: bool) -> Result<BInteger, BencodeError> {
    let invalid = || BencodeError::InvalidInteger {
        stage: Stage::Integer,
        literal: String::from_utf8_lossy(raw).into_owned(),
    };

    let negative = raw.first() == Some(&b'-');
    let digits = if negative { &raw[1..] } else { raw };

    if digits.is_empty() || !digits.iter().all(u8::is_ascii_digit) {
        return Err(invalid());
    }
    if strict && digits[0] == b'0' && (digits.len() > 1 || negative) {
        return Err(invalid());
    }

    let text = std::str::from_utf8(raw).map_err(|_| invalid())?;
    if let Ok(v) = text.parse::<i64>() {
        return Ok(BInteger::from_i64(v));
    }
    text.parse::<u64>()
        .map(BInteger::from_u64)
        .map_err(|_| invalid())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bencode::error::ErrorKind;

    fn decode_one(input: &[u8]) -> Result<BValue, BencodeError> {
        decode_value_with(input, &DecodeOptions::default())
    }

    fn strict() -> DecodeOptions {
        DecodeOptions {
            strict_integers: true,
            ..DecodeOptions::default()
        }
    }

    fn bytes(s: &str) -> BValue {
        BValue::ByteString(s.as_bytes().to_vec())
    }

    #[test]
    fn test_decode_integer() {
        assert_eq!(decode_one(b"i42e").unwrap(), BValue::from(42));
        assert_eq!(decode_one(b"i-13e").unwrap(), BValue::from(-13));
        assert_eq!(decode_one(b"i0e").unwrap(), BValue::from(0));
    }

    #[test]
    fn test_decode_integer_boundaries() {
        assert_eq!(
            decode_one(b"i18446744073709551615e").unwrap(),
            BValue::from(u64::MAX)
        );
        assert_eq!(
            decode_one(b"i-9223372036854775808e").unwrap(),
            BValue::from(i64::MIN)
        );
        assert_eq!(
            decode_one(b"i9223372036854775808e").unwrap(),
            BValue::from(9223372036854775808u64)
        );

        let too_big = decode_one(b"i18446744073709551616e").unwrap_err();
        assert!(matches!(too_big, BencodeError::InvalidInteger { .. }));
        assert_eq!(too_big.kind(), ErrorKind::Format);

        let too_small = decode_one(b"i-9223372036854775809e").unwrap_err();
        assert_eq!(too_small.kind(), ErrorKind::Format);
    }

    #[test]
    fn test_decode_integer_grammar() {
        let inputs: [&[u8]; 6] = [b"ie", b"i-e", b"i+5e", b"i 5e", b"i4.2e", b"i--1e"];
        for input in inputs {
            let err = decode_one(input).unwrap_err();
            assert!(
                matches!(err, BencodeError::InvalidInteger { .. }),
                "{:?} gave {:?}",
                String::from_utf8_lossy(input),
                err
            );
        }
    }

    #[test]
    fn test_leading_zeros_lenient_by_default() {
        assert_eq!(decode_one(b"i0123e").unwrap(), BValue::from(123));
        assert_eq!(decode_one(b"i-0e").unwrap(), BValue::from(0));
        assert_eq!(decode_one(b"03:abc").unwrap(), bytes("abc"));
    }

    #[test]
    fn test_leading_zeros_rejected_when_strict() {
        let opts = strict();
        let inputs: [&[u8]; 4] = [b"i0123e", b"i-0e", b"i-01e", b"i00e"];
        for input in inputs {
            assert!(decode_value_with(input, &opts).is_err());
        }
        assert!(decode_value_with(&b"03:abc"[..], &opts).is_err());
        assert_eq!(
            decode_value_with(&b"i0e"[..], &opts).unwrap(),
            BValue::from(0)
        );
        assert_eq!(
            decode_value_with(&b"i-10e"[..], &opts).unwrap(),
            BValue::from(-10)
        );
        assert_eq!(decode_value_with(&b"0:"[..], &opts).unwrap(), bytes(""));
    }

    #[test]
    fn test_decode_string() {
        assert_eq!(decode_one(b"5:hello").unwrap(), bytes("hello"));
        assert_eq!(decode_one(b"0:").unwrap(), bytes(""));
        assert_eq!(
            decode_one(b"3:\x00\xffe").unwrap(),
            BValue::ByteString(vec![0x00, 0xff, b'e'])
        );
    }

    #[test]
    fn test_decode_string_errors() {
        let err = decode_one(b"5hello").unwrap_err();
        assert!(matches!(err, BencodeError::UnexpectedEnd(Stage::Length)));

        let err = decode_one(b"4:ab").unwrap_err();
        assert!(matches!(err, BencodeError::UnexpectedEnd(Stage::StringPayload)));

        let err = decode_one(b"1x:a").unwrap_err();
        assert_eq!(err.stage(), Some(Stage::Length));
        assert_eq!(err.kind(), ErrorKind::Format);

        let err = decode_one(b"99999999999999999999:a").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Format);

        // huge declared length against a short stream is a truncation
        let err = decode_one(b"9000000000000000000:abc").unwrap_err();
        assert!(matches!(err, BencodeError::UnexpectedEnd(Stage::StringPayload)));
    }

    #[test]
    fn test_decode_list() {
        assert_eq!(
            decode_one(b"l4:spami42ee").unwrap(),
            BValue::List(vec![bytes("spam"), BValue::from(42)])
        );
        assert_eq!(decode_one(b"le").unwrap(), BValue::List(vec![]));
    }

    #[test]
    fn test_decode_nested_list() {
        assert_eq!(
            decode_one(b"l4:spaml3:eggi3eee").unwrap(),
            BValue::List(vec![
                bytes("spam"),
                BValue::List(vec![bytes("egg"), BValue::from(3)]),
            ])
        );
    }

    #[test]
    fn test_decode_list_unclosed() {
        let err = decode_one(b"l4:spam").unwrap_err();
        assert!(matches!(err, BencodeError::UnexpectedEnd(Stage::ListItem)));
    }

    #[test]
    fn test_decode_dict() {
        let dict = decode(&b"d3:bar4:spam3:fooi42ee"[..]).unwrap();
        let mut expected = BDict::new();
        expected.insert(b"bar".to_vec(), bytes("spam"));
        expected.insert(b"foo".to_vec(), BValue::from(42));
        assert_eq!(dict, expected);
    }

    #[test]
    fn test_decode_empty_dict() {
        assert_eq!(decode_bytes(b"de").unwrap(), BDict::new());
    }

    #[test]
    fn test_decode_dict_with_nested_list() {
        let dict = decode_bytes(b"d3:fool4:spami1ee3:bar4:eggse").unwrap();
        assert_eq!(
            dict.get(&b"foo"[..]),
            Some(&BValue::List(vec![bytes("spam"), BValue::from(1)]))
        );
        assert_eq!(dict.get(&b"bar"[..]), Some(&bytes("eggs")));
    }

    #[test]
    fn test_decode_dict_binary_key() {
        let dict = decode_bytes(b"d2:\xff\x00i1ee").unwrap();
        assert_eq!(dict.get(&[0xffu8, 0x00][..]), Some(&BValue::from(1)));
    }

    #[test]
    fn test_root_must_be_dict() {
        let inputs: [&[u8]; 4] = [b"i42e", b"le", b"4:spam", b"e"];
        for input in inputs {
            assert!(matches!(
                decode_bytes(input).unwrap_err(),
                BencodeError::NotADocument
            ));
        }
        assert!(matches!(
            decode_bytes(b"").unwrap_err(),
            BencodeError::UnexpectedEnd(Stage::RootType)
        ));
    }

    #[test]
    fn test_truncated_dict() {
        let err = decode_bytes(b"d3:foo").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
        assert!(matches!(err, BencodeError::UnexpectedEnd(Stage::ValueType)));

        let err = decode_bytes(b"d3:foo4:spam").unwrap_err();
        assert!(matches!(err, BencodeError::UnexpectedEnd(Stage::DictEnd)));

        let err = decode_bytes(b"d").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
    }

    #[test]
    fn test_dict_key_not_string() {
        let err = decode_bytes(b"di42e4:spame").unwrap_err();
        assert_eq!(err.stage(), Some(Stage::Key));
        assert_eq!(err.kind(), ErrorKind::Format);
    }

    #[test]
    fn test_dict_key_without_value() {
        let err = decode_bytes(b"d3:fooe").unwrap_err();
        assert_eq!(err.stage(), Some(Stage::ValueType));
        assert_eq!(err.kind(), ErrorKind::Format);
    }

    #[test]
    fn test_duplicate_keys() {
        let input = b"d1:ai1e1:ai2ee";
        assert!(matches!(
            decode_bytes(input).unwrap_err(),
            BencodeError::DuplicateKey(k) if k == "a"
        ));

        let opts = DecodeOptions {
            duplicate_keys: DuplicateKeys::LastWins,
            ..DecodeOptions::default()
        };
        let dict = decode_with(&input[..], &opts).unwrap();
        assert_eq!(dict.len(), 1);
        assert_eq!(dict.get(&b"a"[..]), Some(&BValue::from(2)));
    }

    #[test]
    fn test_trailing_bytes_left_unconsumed() {
        let mut input = &b"d1:ai1eeTRAILER"[..];
        let dict = decode(&mut input).unwrap();
        assert_eq!(dict.len(), 1);
        assert_eq!(input, b"TRAILER");
    }

    #[test]
    fn test_depth_limit() {
        let opts = DecodeOptions {
            max_depth: 3,
            ..DecodeOptions::default()
        };
        // root + two lists = depth 3
        assert!(decode_with(&b"d1:alleee"[..], &opts).is_ok());

        let err = decode_with(&b"d1:allleeee"[..], &opts).unwrap_err();
        assert!(matches!(err, BencodeError::DepthExceeded(3)));
        assert_eq!(err.kind(), ErrorKind::Format);
    }

    #[test]
    fn test_deep_input_fails_cleanly_with_default_limit() {
        let mut input = b"d1:a".to_vec();
        input.extend(std::iter::repeat(b'l').take(100_000));
        input.extend(std::iter::repeat(b'e').take(100_000));
        input.push(b'e');

        let err = decode_bytes(&input).unwrap_err();
        assert!(matches!(err, BencodeError::DepthExceeded(DEFAULT_MAX_DEPTH)));
    }

    #[test]
    fn test_stray_terminator_in_value_position() {
        let err = decode_value_with(&b"e"[..], &DecodeOptions::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Format);
    }

    struct FailingReader {
        data: &'static [u8],
    }

    impl Read for FailingReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.data.is_empty() {
                return Err(std::io::Error::other("connection reset"));
            }
            let n = buf.len().min(self.data.len());
            buf[..n].copy_from_slice(&self.data[..n]);
            self.data = &self.data[n..];
            Ok(n)
        }
    }

    #[test]
    fn test_underlying_read_error() {
        let reader = std::io::BufReader::new(FailingReader { data: b"d3:foo" });
        let err = decode(reader).unwrap_err();
        assert!(matches!(
            err,
            BencodeError::Io { stage: Stage::ValueType, .. }
        ));
        assert_eq!(err.kind(), ErrorKind::Io);
        assert!(err.to_string().contains("connection reset"));
    }

    #[test]
    fn test_reads_through_bufreader() {
        let reader = std::io::BufReader::with_capacity(2, &b"d4:spaml1:a1:bee"[..]);
        let dict = decode(reader).unwrap();
        assert_eq!(
            dict.get(&b"spam"[..]),
            Some(&BValue::List(vec![bytes("a"), bytes("b")]))
        );
    }
}
