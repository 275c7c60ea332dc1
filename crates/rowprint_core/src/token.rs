//! Concurrency tokens.

use serde::{Deserialize, Serialize};

use crate::fingerprint::Fingerprint;
use crate::snapshot::RecordKey;

/// A fingerprint captured at load time, carried with a record until it is
/// written back.
///
/// Besides the fingerprint, the token remembers which record it belongs to
/// and the column layout it was computed under, so that a token can never be
/// checked against the wrong kind of snapshot by accident. Tokens are
/// serializable and may round-trip through clients between read and write.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConcurrencyToken {
    record_type: String,
    key: RecordKey,
    layout: Fingerprint,
    fingerprint: Fingerprint,
}

impl ConcurrencyToken {
    /// Assembles a token.
    ///
    /// Tokens are normally issued by
    /// [`FingerprintEngine::issue_token`](crate::FingerprintEngine::issue_token).
    #[must_use]
    pub fn new(
        record_type: impl Into<String>,
        key: RecordKey,
        layout: Fingerprint,
        fingerprint: Fingerprint,
    ) -> Self {
        Self {
            record_type: record_type.into(),
            key,
            layout,
            fingerprint,
        }
    }

    /// Record type the token was issued for.
    pub fn record_type(&self) -> &str {
        &self.record_type
    }

    /// Key of the record.
    pub fn key(&self) -> &RecordKey {
        &self.key
    }

    /// Layout digest of the schema the token was issued under.
    pub fn layout(&self) -> &Fingerprint {
        &self.layout
    }

    /// Fingerprint of the record at load time.
    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }
}
