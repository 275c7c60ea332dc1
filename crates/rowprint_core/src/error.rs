//! Error types for rowprint core.
//!
//! Every variant here is an integration or programming defect. A concurrent
//! modification is not an error: it is reported as
//! [`Comparison::Conflict`](crate::Comparison) or
//! [`WriteOutcome::Conflict`](crate::WriteOutcome).

use rowprint_codec::ValueKind;
use thiserror::Error;

use crate::snapshot::RecordKey;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in rowprint core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Codec error while building a value.
    #[error("codec error: {0}")]
    Codec(#[from] rowprint_codec::CodecError),

    /// Schema definition is invalid.
    #[error("invalid schema for {record_type}: {message}")]
    InvalidSchema {
        /// Record type being defined.
        record_type: String,
        /// Description of the problem.
        message: String,
    },

    /// Snapshot has the wrong number of columns.
    #[error("{record_type}: snapshot has {actual} columns, schema declares {expected}")]
    ColumnCountMismatch {
        /// Record type.
        record_type: String,
        /// Number of declared columns.
        expected: usize,
        /// Number of columns in the snapshot.
        actual: usize,
    },

    /// Snapshot columns are not in canonical order.
    #[error("{record_type}: column {position} is {found:?}, expected {expected:?}")]
    ColumnOrder {
        /// Record type.
        record_type: String,
        /// Zero-based column position.
        position: usize,
        /// Column name declared at this position.
        expected: String,
        /// Column name found in the snapshot.
        found: String,
    },

    /// Value kind does not match the declared column type.
    #[error("{record_type}.{column}: expected {expected}, found {found}")]
    TypeMismatch {
        /// Record type.
        record_type: String,
        /// Column name.
        column: String,
        /// Declared kind.
        expected: ValueKind,
        /// Kind found in the snapshot.
        found: ValueKind,
    },

    /// Null in a non-nullable column.
    #[error("{record_type}.{column}: null in non-nullable column")]
    NullViolation {
        /// Record type.
        record_type: String,
        /// Column name.
        column: String,
    },

    /// Column name not declared by the schema.
    #[error("{record_type}: unknown column {column:?}")]
    UnknownColumn {
        /// Record type.
        record_type: String,
        /// Column name.
        column: String,
    },

    /// Required column not supplied.
    #[error("{record_type}: missing value for non-nullable column {column:?}")]
    MissingColumn {
        /// Record type.
        record_type: String,
        /// Column name.
        column: String,
    },

    /// Token was issued for a different record type.
    #[error("token for {token_type} used with {record_type}")]
    RecordTypeMismatch {
        /// Record type the schema describes.
        record_type: String,
        /// Record type recorded in the token.
        token_type: String,
    },

    /// Token was issued against a different column layout.
    #[error("{record_type}: token layout {token_layout} does not match schema layout {schema_layout}")]
    LayoutMismatch {
        /// Record type.
        record_type: String,
        /// Layout digest of the schema.
        schema_layout: String,
        /// Layout digest recorded in the token.
        token_layout: String,
    },

    /// Derived field computation failed.
    #[error("{record_type}.{field}: derived field failed: {message}")]
    DerivedField {
        /// Record type.
        record_type: String,
        /// Derived field name.
        field: String,
        /// Description of the failure.
        message: String,
    },

    /// Record not found.
    #[error("{record_type} {key} not found")]
    RecordNotFound {
        /// Record type.
        record_type: String,
        /// Key that was not found.
        key: RecordKey,
    },

    /// A record with this key already exists.
    #[error("{record_type} {key} already exists")]
    DuplicateKey {
        /// Record type.
        record_type: String,
        /// Conflicting key.
        key: RecordKey,
    },

    /// Operation not permitted.
    #[error("invalid operation: {message}")]
    InvalidOperation {
        /// Description of why operation is invalid.
        message: String,
    },
}

impl CoreError {
    /// Creates an invalid schema error.
    pub fn invalid_schema(record_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidSchema {
            record_type: record_type.into(),
            message: message.into(),
        }
    }

    /// Creates a derived field error.
    pub fn derived_field(
        record_type: impl Into<String>,
        field: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::DerivedField {
            record_type: record_type.into(),
            field: field.into(),
            message: message.into(),
        }
    }

    /// Creates an invalid operation error.
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation {
            message: message.into(),
        }
    }
}
