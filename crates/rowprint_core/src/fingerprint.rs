//! Row fingerprint engine.
//!
//! A fingerprint is a SHA-256 digest over the canonical encoding of a
//! snapshot's `(column, value)` pairs:
//!
//! ```text
//! SHA-256( domain_tag || array_header(n) || text(name_1) || value_1 || ... )
//! ```
//!
//! The domain tag is a published constant ([`DEFAULT_DOMAIN_TAG`]) rather
//! than a per-process seed, so the same snapshot yields the same fingerprint
//! in every process on every machine.

use std::borrow::Cow;
use std::fmt;

use rowprint_codec::{CanonicalEncoder, Value};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::config::{Config, DEFAULT_DOMAIN_TAG};
use crate::error::{CoreError, CoreResult};
use crate::schema::RecordSchema;
use crate::snapshot::RecordSnapshot;
use crate::source::SnapshotExtractor;
use crate::token::ConcurrencyToken;

/// Deterministic digest of a record snapshot.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    /// Length of a fingerprint in bytes.
    pub const LEN: usize = 32;

    /// Creates a fingerprint from raw digest bytes.
    #[inline]
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Returns the raw digest bytes.
    #[inline]
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lowercase hex form.
    #[must_use]
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }

    /// Parses the 64-digit hex form.
    ///
    /// Returns `None` if `hex` is not exactly 64 hex digits.
    #[must_use]
    pub fn from_hex(hex: &str) -> Option<Self> {
        if hex.len() != Self::LEN * 2 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        let mut bytes = [0u8; 32];
        for (byte, pair) in bytes.iter_mut().zip(hex.as_bytes().chunks(2)) {
            let pair = std::str::from_utf8(pair).ok()?;
            *byte = u8::from_str_radix(pair, 16).ok()?;
        }
        Some(Self(bytes))
    }

    /// First 8 bytes as a big-endian integer.
    ///
    /// For storage in a 64-bit checksum column. Collisions are far more
    /// likely than with the full digest, so prefer the full value where the
    /// schema allows it.
    #[must_use]
    pub fn to_u64(&self) -> u64 {
        let mut head = [0u8; 8];
        head.copy_from_slice(&self.0[..8]);
        u64::from_be_bytes(head)
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", self.to_hex())
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl TryFrom<String> for Fingerprint {
    type Error = CoreError;

    fn try_from(hex: String) -> CoreResult<Self> {
        Self::from_hex(&hex).ok_or_else(|| {
            CoreError::invalid_operation(format!("malformed fingerprint {hex:?}"))
        })
    }
}

impl From<Fingerprint> for String {
    fn from(fp: Fingerprint) -> Self {
        fp.to_hex()
    }
}

/// Result of checking a fingerprint against a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    /// The snapshot is unchanged since the fingerprint was taken.
    Match,
    /// The snapshot changed; a pending write must be rejected.
    Conflict,
}

impl Comparison {
    /// Returns true for [`Comparison::Match`].
    #[must_use]
    pub const fn is_match(self) -> bool {
        matches!(self, Comparison::Match)
    }

    /// Returns true for [`Comparison::Conflict`].
    #[must_use]
    pub const fn is_conflict(self) -> bool {
        matches!(self, Comparison::Conflict)
    }
}

/// Computes and compares fingerprints.
///
/// The engine is stateless apart from its domain tag; it can be cloned and
/// shared across threads freely.
#[derive(Debug, Clone)]
pub struct FingerprintEngine {
    domain_tag: Cow<'static, [u8]>,
}

impl Default for FingerprintEngine {
    fn default() -> Self {
        Self {
            domain_tag: Cow::Borrowed(DEFAULT_DOMAIN_TAG),
        }
    }
}

impl FingerprintEngine {
    /// Creates an engine with the default domain tag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an engine from configuration.
    #[must_use]
    pub fn with_config(config: &Config) -> Self {
        Self {
            domain_tag: config.domain_tag.clone(),
        }
    }

    /// The domain tag hashed before every snapshot.
    pub fn domain_tag(&self) -> &[u8] {
        &self.domain_tag
    }

    /// Fingerprints every pair of `snapshot`, in order.
    ///
    /// Pure and infallible: every value has a canonical encoding.
    pub fn fingerprint(&self, snapshot: &RecordSnapshot) -> Fingerprint {
        self.digest(snapshot.len(), snapshot.iter())
    }

    /// Recomputes the fingerprint of `actual` and compares it to `expected`.
    pub fn compare(&self, expected: &Fingerprint, actual: &RecordSnapshot) -> Comparison {
        if self.fingerprint(actual) == *expected {
            Comparison::Match
        } else {
            Comparison::Conflict
        }
    }

    /// Validates `snapshot` against `schema` and fingerprints its tracked
    /// columns.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot does not conform to the schema.
    pub fn fingerprint_with(
        &self,
        schema: &RecordSchema,
        snapshot: &RecordSnapshot,
    ) -> CoreResult<Fingerprint> {
        schema.validate(snapshot)?;
        Ok(self.digest(schema.tracked_count(), schema.tracked_entries(snapshot)))
    }

    /// Schema-checked [`compare`](Self::compare).
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot does not conform to the schema.
    pub fn compare_with(
        &self,
        schema: &RecordSchema,
        expected: &Fingerprint,
        actual: &RecordSnapshot,
    ) -> CoreResult<Comparison> {
        let fingerprint = self.fingerprint_with(schema, actual)?;
        Ok(if fingerprint == *expected {
            Comparison::Match
        } else {
            Comparison::Conflict
        })
    }

    /// Issues a concurrency token for a freshly loaded snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot does not conform to the schema.
    pub fn issue_token(
        &self,
        schema: &RecordSchema,
        snapshot: &RecordSnapshot,
    ) -> CoreResult<ConcurrencyToken> {
        let fingerprint = self.fingerprint_with(schema, snapshot)?;
        let key = schema.key_of(snapshot)?;
        Ok(ConcurrencyToken::new(
            schema.record_type(),
            key,
            *schema.layout(),
            fingerprint,
        ))
    }

    /// Checks a previously issued token against the current snapshot.
    ///
    /// # Errors
    ///
    /// A token issued for another record type, another column layout or
    /// another key is an integration defect and is reported as an error,
    /// never as a conflict.
    pub fn check_token(
        &self,
        schema: &RecordSchema,
        token: &ConcurrencyToken,
        actual: &RecordSnapshot,
    ) -> CoreResult<Comparison> {
        if token.record_type() != schema.record_type() {
            return Err(CoreError::RecordTypeMismatch {
                record_type: schema.record_type().to_string(),
                token_type: token.record_type().to_string(),
            });
        }
        if token.layout() != schema.layout() {
            return Err(CoreError::LayoutMismatch {
                record_type: schema.record_type().to_string(),
                schema_layout: schema.layout().to_hex(),
                token_layout: token.layout().to_hex(),
            });
        }
        let comparison = self.compare_with(schema, token.fingerprint(), actual)?;
        let key = schema.key_of(actual)?;
        if key != *token.key() {
            return Err(CoreError::invalid_operation(format!(
                "token for {} {} checked against {}",
                schema.record_type(),
                token.key(),
                key
            )));
        }

        if comparison.is_conflict() {
            debug!(
                record_type = %schema.record_type(),
                key = %key,
                expected = %token.fingerprint(),
                "fingerprint conflict"
            );
        }
        Ok(comparison)
    }

    /// Extracts a snapshot from `record` and fingerprints it.
    ///
    /// # Errors
    ///
    /// Returns an error if extraction fails or the extracted snapshot does
    /// not conform to the extractor's schema.
    pub fn fingerprint_record<T, E>(&self, extractor: &E, record: &T) -> CoreResult<Fingerprint>
    where
        T: ?Sized,
        E: SnapshotExtractor<T> + ?Sized,
    {
        let snapshot = extractor.extract(record)?;
        self.fingerprint_with(extractor.schema(), &snapshot)
    }

    fn digest<'a>(
        &self,
        len: usize,
        entries: impl Iterator<Item = (&'a str, &'a Value)>,
    ) -> Fingerprint {
        let mut hasher = Sha256::new();
        hasher.update(&self.domain_tag);

        let mut encoder = CanonicalEncoder::with_capacity(64);
        encoder.encode_array_header(len);
        for (name, value) in entries {
            encoder.encode_text(name);
            encoder.encode(value);
            hasher.update(encoder.as_bytes());
            encoder.clear();
        }
        hasher.update(encoder.as_bytes());

        let digest = hasher.finalize();
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&digest);
        Fingerprint(bytes)
    }
}

/// Fingerprints `snapshot` with the default engine.
pub fn fingerprint(snapshot: &RecordSnapshot) -> Fingerprint {
    FingerprintEngine::new().fingerprint(snapshot)
}

/// Compares `expected` against `actual` with the default engine.
pub fn compare(expected: &Fingerprint, actual: &RecordSnapshot) -> Comparison {
    FingerprintEngine::new().compare(expected, actual)
}
