//! Canonical value encoder.

use chrono::SecondsFormat;

use crate::decimal::Decimal;
use crate::value::Value;

/// CBOR tag 0: RFC 3339 date/time string.
const TAG_DATE_TIME: u64 = 0;
/// CBOR tag 2: unsigned bignum.
const TAG_POS_BIGNUM: u64 = 2;
/// CBOR tag 3: negative bignum.
const TAG_NEG_BIGNUM: u64 = 3;
/// CBOR tag 4: decimal fraction `[exponent, mantissa]`.
const TAG_DECIMAL_FRACTION: u64 = 4;
/// CBOR tag 1004: RFC 3339 full-date string (RFC 8943).
const TAG_FULL_DATE: u64 = 1004;

/// Encode a value to its canonical bytes.
///
/// The encoding is a strict subset of CBOR (RFC 8949) using the
/// deterministic rules of Section 4.2.1:
/// - Integers and lengths use the shortest possible encoding
/// - No indefinite-length items
/// - Null is the single byte `0xf6`, which no other value starts with
/// - Decimals are normalized before encoding (tag 4)
/// - Dates use tag 1004, timestamps tag 0 with fixed nanosecond precision
///
/// Encoding cannot fail: every value has exactly one encoding.
pub fn to_canonical_bytes(value: &Value) -> Vec<u8> {
    let mut encoder = CanonicalEncoder::new();
    encoder.encode(value);
    encoder.into_bytes()
}

/// A canonical encoder.
///
/// Besides whole values, the encoder exposes the framing primitives
/// (array headers, text, integers) that fingerprint and layout digests are
/// built from, so every hashed byte goes through one encoding path.
pub struct CanonicalEncoder {
    buffer: Vec<u8>,
}

impl CanonicalEncoder {
    /// Create a new encoder.
    pub fn new() -> Self {
        Self { buffer: Vec::new() }
    }

    /// Create a new encoder with the specified capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
        }
    }

    /// Encode a value.
    pub fn encode(&mut self, value: &Value) {
        match value {
            Value::Null => self.encode_null(),
            Value::Bool(b) => self.encode_bool(*b),
            Value::Integer(n) => self.encode_integer(*n),
            Value::Decimal(d) => self.encode_decimal(d),
            Value::Text(s) => self.encode_text(s),
            Value::Date(d) => {
                self.encode_tag(TAG_FULL_DATE);
                self.encode_text(&d.format("%Y-%m-%d").to_string());
            }
            Value::Timestamp(t) => {
                self.encode_tag(TAG_DATE_TIME);
                self.encode_text(&t.to_rfc3339_opts(SecondsFormat::Nanos, true));
            }
        }
    }

    /// Consume this encoder and return the encoded bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }

    /// Get a reference to the encoded bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    /// Discard the encoded bytes, keeping the allocation.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    /// Encode the null sentinel.
    pub fn encode_null(&mut self) {
        // CBOR null is simple value 22 (0xf6)
        self.buffer.push(0xf6);
    }

    /// Encode a boolean.
    pub fn encode_bool(&mut self, b: bool) {
        // CBOR false is 0xf4, true is 0xf5
        self.buffer.push(if b { 0xf5 } else { 0xf4 });
    }

    /// Encode a signed integer.
    #[allow(clippy::cast_sign_loss)]
    pub fn encode_integer(&mut self, n: i64) {
        if n >= 0 {
            self.encode_unsigned(0, n as u64);
        } else {
            // CBOR negative integers encode -(n+1)
            // This is safe: for n in [-2^63, -1], -(n+1) is in [0, 2^63-1]
            let abs_minus_one = (-(n + 1)) as u64;
            self.encode_unsigned(1, abs_minus_one);
        }
    }

    /// Encode a UTF-8 text string.
    pub fn encode_text(&mut self, text: &str) {
        self.encode_unsigned(3, text.len() as u64);
        self.buffer.extend_from_slice(text.as_bytes());
    }

    /// Encode the header of a definite-length array of `len` items.
    pub fn encode_array_header(&mut self, len: usize) {
        self.encode_unsigned(4, len as u64);
    }

    fn encode_bytes(&mut self, bytes: &[u8]) {
        self.encode_unsigned(2, bytes.len() as u64);
        self.buffer.extend_from_slice(bytes);
    }

    fn encode_tag(&mut self, tag: u64) {
        self.encode_unsigned(6, tag);
    }

    fn encode_decimal(&mut self, d: &Decimal) {
        self.encode_tag(TAG_DECIMAL_FRACTION);
        self.encode_array_header(2);
        self.encode_integer(-i64::from(d.scale()));
        self.encode_big_integer(d.mantissa());
    }

    /// Integers outside the i64 range become tag 2/3 bignums with minimal
    /// big-endian magnitude bytes.
    #[allow(clippy::cast_sign_loss)]
    fn encode_big_integer(&mut self, n: i128) {
        if let Ok(small) = i64::try_from(n) {
            self.encode_integer(small);
            return;
        }
        let (tag, magnitude) = if n >= 0 {
            (TAG_POS_BIGNUM, n as u128)
        } else {
            (TAG_NEG_BIGNUM, (-1 - n) as u128)
        };
        let bytes = magnitude.to_be_bytes();
        let first = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
        self.encode_tag(tag);
        self.encode_bytes(&bytes[first..]);
    }

    #[allow(clippy::cast_possible_truncation)]
    fn encode_unsigned(&mut self, major_type: u8, value: u64) {
        let mt = major_type << 5;

        if value < 24 {
            self.buffer.push(mt | (value as u8));
        } else if u8::try_from(value).is_ok() {
            self.buffer.push(mt | 24);
            self.buffer.push(value as u8);
        } else if u16::try_from(value).is_ok() {
            self.buffer.push(mt | 25);
            self.buffer.extend_from_slice(&(value as u16).to_be_bytes());
        } else if u32::try_from(value).is_ok() {
            self.buffer.push(mt | 26);
            self.buffer.extend_from_slice(&(value as u32).to_be_bytes());
        } else {
            self.buffer.push(mt | 27);
            self.buffer.extend_from_slice(&value.to_be_bytes());
        }
    }
}

impl Default for CanonicalEncoder {
    fn default() -> Self {
        Self::new()
    }
}
