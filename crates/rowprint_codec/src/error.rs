//! Error types for the codec crate.

use thiserror::Error;

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors that can occur while constructing canonical values.
///
/// Encoding itself never fails: every [`Value`](crate::Value) has exactly
/// one canonical encoding. These errors come from building values out of
/// untrusted input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Text could not be parsed as a decimal number.
    #[error("invalid decimal {input:?}: {reason}")]
    InvalidDecimal {
        /// The rejected input.
        input: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Decimal scale exceeds the supported maximum.
    #[error("decimal scale {scale} exceeds the supported maximum")]
    ScaleOutOfRange {
        /// The requested scale.
        scale: u32,
    },

    /// Arithmetic overflowed the mantissa range.
    #[error("decimal overflow")]
    Overflow,

    /// Text could not be parsed as a date or timestamp.
    #[error("invalid {kind} {input:?}")]
    InvalidTemporal {
        /// `date` or `timestamp`.
        kind: &'static str,
        /// The rejected input.
        input: String,
    },
}

impl CodecError {
    /// Create an invalid decimal error.
    pub fn invalid_decimal(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidDecimal {
            input: input.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid temporal error.
    pub fn invalid_temporal(kind: &'static str, input: impl Into<String>) -> Self {
        Self::InvalidTemporal {
            kind,
            input: input.into(),
        }
    }
}
