//! Engine and store configuration.

use std::borrow::Cow;

/// Published seed for fingerprint hashing.
///
/// Every fingerprint digest starts with these bytes. Changing it changes
/// every fingerprint ever issued, so it is versioned rather than edited.
pub const DEFAULT_DOMAIN_TAG: &[u8] = b"rowprint/fingerprint/v1";

/// Configuration for the fingerprint engine and record store.
#[derive(Debug, Clone)]
pub struct Config {
    /// Fixed prefix hashed before every snapshot.
    ///
    /// Applications sharing a token namespace may pick their own tag, but it
    /// must be a constant: fingerprints are only comparable under the same tag.
    pub domain_tag: Cow<'static, [u8]>,

    /// How many times [`RecordStore::modify`](crate::RecordStore::modify)
    /// runs a read-modify-write cycle before giving up on conflicts.
    pub max_write_attempts: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            domain_tag: Cow::Borrowed(DEFAULT_DOMAIN_TAG),
            max_write_attempts: 3,
        }
    }
}

impl Config {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the fingerprint domain tag.
    #[must_use]
    pub fn domain_tag(mut self, tag: impl Into<Cow<'static, [u8]>>) -> Self {
        self.domain_tag = tag.into();
        self
    }

    /// Sets the maximum number of read-modify-write attempts.
    #[must_use]
    pub const fn max_write_attempts(mut self, attempts: u32) -> Self {
        self.max_write_attempts = attempts;
        self
    }
}
