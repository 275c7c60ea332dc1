//! Record schemas.
//!
//! A schema fixes, per record type, the canonical column order, the type of
//! each column, which columns identify the record, and which columns take
//! part in the fingerprint. Snapshots are checked against it before they are
//! fingerprinted, so a misordered or mistyped snapshot is reported instead of
//! silently producing a different digest.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use rowprint_codec::{CanonicalEncoder, Value, ValueKind};
use sha2::{Digest, Sha256};

use crate::error::{CoreError, CoreResult};
use crate::fingerprint::Fingerprint;
use crate::snapshot::{RecordKey, RecordSnapshot};

const LAYOUT_DOMAIN_TAG: &[u8] = b"rowprint/layout/v1";

/// Declared type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnType {
    /// 64-bit signed integer.
    Integer,
    /// Exact decimal.
    Decimal,
    /// UTF-8 text.
    Text,
    /// Boolean.
    Bool,
    /// Calendar date.
    Date,
    /// UTC timestamp.
    Timestamp,
}

impl ColumnType {
    /// The value kind stored in columns of this type.
    #[must_use]
    pub const fn kind(self) -> ValueKind {
        match self {
            ColumnType::Integer => ValueKind::Integer,
            ColumnType::Decimal => ValueKind::Decimal,
            ColumnType::Text => ValueKind::Text,
            ColumnType::Bool => ValueKind::Bool,
            ColumnType::Date => ValueKind::Date,
            ColumnType::Timestamp => ValueKind::Timestamp,
        }
    }

    /// Stable code used in layout digests. Never renumber.
    const fn code(self) -> i64 {
        match self {
            ColumnType::Integer => 1,
            ColumnType::Decimal => 2,
            ColumnType::Text => 3,
            ColumnType::Bool => 4,
            ColumnType::Date => 5,
            ColumnType::Timestamp => 6,
        }
    }
}

/// A persisted column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    name: String,
    ty: ColumnType,
    nullable: bool,
    key: bool,
    tracked: bool,
}

impl Column {
    /// A non-nullable, non-key, fingerprinted column.
    pub fn new(name: impl Into<String>, ty: ColumnType) -> Self {
        Self {
            name: name.into(),
            ty,
            nullable: false,
            key: false,
            tracked: true,
        }
    }

    /// Allows null values.
    #[must_use]
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Marks this column as part of the record key.
    #[must_use]
    pub fn key(mut self) -> Self {
        self.key = true;
        self
    }

    /// Excludes this column from fingerprints.
    ///
    /// Changes to untracked columns never cause conflicts. Use this for
    /// columns that are rewritten as a side effect of every access (audit
    /// stamps, counters maintained by the database).
    #[must_use]
    pub fn untracked(mut self) -> Self {
        self.tracked = false;
        self
    }

    /// Column name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared type.
    pub fn column_type(&self) -> ColumnType {
        self.ty
    }

    /// Whether nulls are allowed.
    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    /// Whether the column is part of the key.
    pub fn is_key(&self) -> bool {
        self.key
    }

    /// Whether the column is fingerprinted.
    pub fn is_tracked(&self) -> bool {
        self.tracked
    }

    fn accepts(&self, value: &Value) -> bool {
        match value {
            Value::Null => self.nullable,
            other => other.kind() == self.ty.kind(),
        }
    }
}

/// Computes a derived value from the owning record.
pub type DeriveFn = dyn Fn(&RecordSnapshot) -> CoreResult<Value> + Send + Sync;

/// A computed attribute, evaluated over a snapshot at load time.
///
/// Derived fields are never fingerprinted: they are functions of persisted
/// columns, so they cannot change unless a tracked column does.
#[derive(Clone)]
pub struct DerivedField {
    name: String,
    ty: ColumnType,
    compute: Arc<DeriveFn>,
}

impl DerivedField {
    /// Field name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Type of the computed value.
    pub fn column_type(&self) -> ColumnType {
        self.ty
    }
}

impl fmt::Debug for DerivedField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DerivedField")
            .field("name", &self.name)
            .field("ty", &self.ty)
            .finish_non_exhaustive()
    }
}

/// Column layout of one record type.
#[derive(Debug, Clone)]
pub struct RecordSchema {
    record_type: String,
    columns: Vec<Column>,
    derived: Vec<DerivedField>,
    layout: Fingerprint,
}

impl RecordSchema {
    /// Starts building a schema for `record_type`.
    pub fn builder(record_type: impl Into<String>) -> RecordSchemaBuilder {
        RecordSchemaBuilder {
            record_type: record_type.into(),
            columns: Vec::new(),
            derived: Vec::new(),
        }
    }

    /// Record type name.
    pub fn record_type(&self) -> &str {
        &self.record_type
    }

    /// Columns in canonical order.
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Looks up a column by name.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Derived fields in declaration order.
    pub fn derived_fields(&self) -> &[DerivedField] {
        &self.derived
    }

    /// Digest of the record type and the tracked columns' names, types and
    /// nullability.
    ///
    /// Tokens carry this digest; a token issued under one layout is rejected
    /// by a schema with another.
    pub fn layout(&self) -> &Fingerprint {
        &self.layout
    }

    /// Columns that take part in fingerprints.
    pub fn tracked_columns(&self) -> impl Iterator<Item = &Column> {
        self.columns.iter().filter(|c| c.tracked)
    }

    /// Checks that `snapshot` lists exactly this schema's columns, in
    /// canonical order, with values of the declared types.
    ///
    /// # Errors
    ///
    /// Reports the first mismatch found. Nothing is coerced.
    pub fn validate(&self, snapshot: &RecordSnapshot) -> CoreResult<()> {
        if snapshot.len() != self.columns.len() {
            return Err(CoreError::ColumnCountMismatch {
                record_type: self.record_type.clone(),
                expected: self.columns.len(),
                actual: snapshot.len(),
            });
        }

        for (position, (column, (name, value))) in
            self.columns.iter().zip(snapshot.iter()).enumerate()
        {
            if name != column.name {
                return Err(CoreError::ColumnOrder {
                    record_type: self.record_type.clone(),
                    position,
                    expected: column.name.clone(),
                    found: name.to_string(),
                });
            }
            if !column.accepts(value) {
                return Err(self.rejection(column, value));
            }
        }
        Ok(())
    }

    /// Starts building a snapshot of this record type.
    pub fn snapshot(&self) -> SnapshotBuilder<'_> {
        SnapshotBuilder {
            schema: self,
            values: vec![None; self.columns.len()],
        }
    }

    /// Extracts the key of `snapshot`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::MissingColumn`] if a key column is absent.
    pub fn key_of(&self, snapshot: &RecordSnapshot) -> CoreResult<RecordKey> {
        let values = self
            .columns
            .iter()
            .filter(|c| c.key)
            .map(|c| {
                snapshot
                    .get(&c.name)
                    .cloned()
                    .ok_or_else(|| CoreError::MissingColumn {
                        record_type: self.record_type.clone(),
                        column: c.name.clone(),
                    })
            })
            .collect::<CoreResult<Vec<_>>>()?;
        Ok(RecordKey::new(values))
    }

    /// Evaluates every derived field over `snapshot`.
    ///
    /// # Errors
    ///
    /// Propagates errors from the compute functions, and reports a
    /// [`CoreError::TypeMismatch`] if one returns a value of the wrong kind.
    pub fn derive(&self, snapshot: &RecordSnapshot) -> CoreResult<Vec<(String, Value)>> {
        self.derived
            .iter()
            .map(|field| {
                let value = (field.compute)(snapshot)?;
                if !value.is_null() && value.kind() != field.ty.kind() {
                    return Err(CoreError::TypeMismatch {
                        record_type: self.record_type.clone(),
                        column: field.name.clone(),
                        expected: field.ty.kind(),
                        found: value.kind(),
                    });
                }
                Ok((field.name.clone(), value))
            })
            .collect()
    }

    pub(crate) fn tracked_count(&self) -> usize {
        self.tracked_columns().count()
    }

    /// Tracked pairs of an already validated snapshot.
    pub(crate) fn tracked_entries<'a>(
        &'a self,
        snapshot: &'a RecordSnapshot,
    ) -> impl Iterator<Item = (&'a str, &'a Value)> {
        self.columns
            .iter()
            .zip(snapshot.iter())
            .filter(|(column, _)| column.tracked)
            .map(|(_, entry)| entry)
    }

    fn rejection(&self, column: &Column, value: &Value) -> CoreError {
        if value.is_null() {
            CoreError::NullViolation {
                record_type: self.record_type.clone(),
                column: column.name.clone(),
            }
        } else {
            CoreError::TypeMismatch {
                record_type: self.record_type.clone(),
                column: column.name.clone(),
                expected: column.ty.kind(),
                found: value.kind(),
            }
        }
    }
}

/// Builder for [`RecordSchema`].
#[derive(Debug)]
pub struct RecordSchemaBuilder {
    record_type: String,
    columns: Vec<Column>,
    derived: Vec<DerivedField>,
}

impl RecordSchemaBuilder {
    /// Appends a column. Declaration order is canonical order.
    #[must_use]
    pub fn column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }

    /// Registers a derived field.
    #[must_use]
    pub fn derived<F>(mut self, name: impl Into<String>, ty: ColumnType, compute: F) -> Self
    where
        F: Fn(&RecordSnapshot) -> CoreResult<Value> + Send + Sync + 'static,
    {
        self.derived.push(DerivedField {
            name: name.into(),
            ty,
            compute: Arc::new(compute),
        });
        self
    }

    /// Validates the definition and computes its layout digest.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidSchema`] if there are no columns, names
    /// repeat, no column is a key, a key column is nullable, or no column is
    /// tracked.
    pub fn build(self) -> CoreResult<RecordSchema> {
        let invalid = |message: &str| CoreError::invalid_schema(&self.record_type, message);

        if self.columns.is_empty() {
            return Err(invalid("no columns"));
        }
        let mut names = HashSet::new();
        let all_names = self
            .columns
            .iter()
            .map(|c| c.name.as_str())
            .chain(self.derived.iter().map(|d| d.name.as_str()));
        for name in all_names {
            if !names.insert(name) {
                return Err(invalid(&format!("duplicate name {name:?}")));
            }
        }
        if !self.columns.iter().any(|c| c.key) {
            return Err(invalid("no key column"));
        }
        if let Some(column) = self.columns.iter().find(|c| c.key && c.nullable) {
            return Err(invalid(&format!("key column {:?} is nullable", column.name)));
        }
        if !self.columns.iter().any(|c| c.tracked) {
            return Err(invalid("no tracked column"));
        }

        let layout = layout_digest(&self.record_type, &self.columns);
        Ok(RecordSchema {
            record_type: self.record_type,
            columns: self.columns,
            derived: self.derived,
            layout,
        })
    }
}

fn layout_digest(record_type: &str, columns: &[Column]) -> Fingerprint {
    let tracked: Vec<&Column> = columns.iter().filter(|c| c.tracked).collect();

    let mut encoder = CanonicalEncoder::new();
    encoder.encode_text(record_type);
    encoder.encode_array_header(tracked.len());
    for column in tracked {
        encoder.encode_array_header(3);
        encoder.encode_text(&column.name);
        encoder.encode_integer(column.ty.code());
        encoder.encode_bool(column.nullable);
    }

    let mut hasher = Sha256::new();
    hasher.update(LAYOUT_DOMAIN_TAG);
    hasher.update(encoder.as_bytes());
    let digest = hasher.finalize();
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&digest);
    Fingerprint::from_bytes(bytes)
}

/// Builds a snapshot in canonical column order.
///
/// Columns may be set in any order. Unset nullable columns become null.
#[derive(Debug)]
pub struct SnapshotBuilder<'a> {
    schema: &'a RecordSchema,
    values: Vec<Option<Value>>,
}

impl SnapshotBuilder<'_> {
    /// Sets a column value.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::UnknownColumn`] if the schema has no such column.
    pub fn set(mut self, name: &str, value: impl Into<Value>) -> CoreResult<Self> {
        let position = self
            .schema
            .columns
            .iter()
            .position(|c| c.name == name)
            .ok_or_else(|| CoreError::UnknownColumn {
                record_type: self.schema.record_type.clone(),
                column: name.to_string(),
            })?;
        self.values[position] = Some(value.into());
        Ok(self)
    }

    /// Finishes the snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::MissingColumn`] for an unset non-nullable column,
    /// or a type error if a value does not match its column.
    pub fn build(self) -> CoreResult<RecordSnapshot> {
        let mut snapshot = RecordSnapshot::new();
        for (column, value) in self.schema.columns.iter().zip(self.values) {
            let value = match value {
                Some(value) => value,
                None if column.nullable => Value::Null,
                None => {
                    return Err(CoreError::MissingColumn {
                        record_type: self.schema.record_type.clone(),
                        column: column.name.clone(),
                    })
                }
            };
            snapshot.push(column.name.clone(), value);
        }
        self.schema.validate(&snapshot)?;
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rowprint_codec::Decimal;

    fn employee() -> RecordSchema {
        RecordSchema::builder("Employee")
            .column(Column::new("Id", ColumnType::Integer).key())
            .column(Column::new("Name", ColumnType::Text))
            .column(Column::new("Salary", ColumnType::Decimal))
            .column(Column::new("ReportsTo", ColumnType::Integer).nullable())
            .column(Column::new("LastSeen", ColumnType::Timestamp).nullable().untracked())
            .derived("ProperSalary", ColumnType::Integer, |s| {
                let salary = s
                    .get("Salary")
                    .and_then(Value::as_decimal)
                    .copied()
                    .unwrap_or(Decimal::ZERO);
                let raised = salary.checked_mul(&"1.25".parse()?)?;
                Ok(Value::Integer(raised.trunc() as i64))
            })
            .build()
            .unwrap()
    }

    fn alice(schema: &RecordSchema) -> RecordSnapshot {
        schema
            .snapshot()
            .set("Salary", Value::decimal("1000.00").unwrap())
            .unwrap()
            .set("Name", "Alice")
            .unwrap()
            .set("Id", 1)
            .unwrap()
            .build()
            .unwrap()
    }

    #[test]
    fn builder_emits_canonical_order() {
        let schema = employee();
        let snapshot = alice(&schema);
        let names: Vec<&str> = snapshot.iter().map(|(n, _)| n).collect();
        assert_eq!(names, ["Id", "Name", "Salary", "ReportsTo", "LastSeen"]);
        assert_eq!(snapshot.get("ReportsTo"), Some(&Value::Null));
    }

    #[test]
    fn builder_rejects_unknown_and_missing() {
        let schema = employee();
        assert!(matches!(
            schema.snapshot().set("Bogus", 1),
            Err(CoreError::UnknownColumn { .. })
        ));
        let missing = schema.snapshot().set("Id", 1).unwrap().build();
        assert!(matches!(
            missing,
            Err(CoreError::MissingColumn { column, .. }) if column == "Name"
        ));
    }

    #[test]
    fn validate_reports_defects() {
        let schema = employee();
        let good = alice(&schema);
        schema.validate(&good).unwrap();

        let short = RecordSnapshot::from_pairs([("Id", 1)]);
        assert!(matches!(
            schema.validate(&short),
            Err(CoreError::ColumnCountMismatch { expected: 5, actual: 1, .. })
        ));

        let null_name = good.with_value("Name", Value::Null).unwrap();
        assert!(matches!(
            schema.validate(&null_name),
            Err(CoreError::NullViolation { .. })
        ));

        let float_like = good.with_value("Salary", "1000.00").unwrap();
        assert!(matches!(
            schema.validate(&float_like),
            Err(CoreError::TypeMismatch {
                expected: ValueKind::Decimal,
                found: ValueKind::Text,
                ..
            })
        ));
    }

    #[test]
    fn build_rejects_bad_definitions() {
        let no_key = RecordSchema::builder("T")
            .column(Column::new("A", ColumnType::Text))
            .build();
        assert!(matches!(no_key, Err(CoreError::InvalidSchema { .. })));

        let nullable_key = RecordSchema::builder("T")
            .column(Column::new("A", ColumnType::Text).key().nullable())
            .build();
        assert!(matches!(nullable_key, Err(CoreError::InvalidSchema { .. })));

        let duplicate = RecordSchema::builder("T")
            .column(Column::new("A", ColumnType::Integer).key())
            .derived("A", ColumnType::Integer, |_| Ok(Value::Null))
            .build();
        assert!(matches!(duplicate, Err(CoreError::InvalidSchema { .. })));

        let untracked = RecordSchema::builder("T")
            .column(Column::new("A", ColumnType::Integer).key().untracked())
            .build();
        assert!(matches!(untracked, Err(CoreError::InvalidSchema { .. })));

        assert!(RecordSchema::builder("T").build().is_err());
    }

    #[test]
    fn derived_fields() {
        let schema = employee();
        let derived = schema.derive(&alice(&schema)).unwrap();
        assert_eq!(derived, vec![("ProperSalary".to_string(), Value::Integer(1250))]);
    }

    #[test]
    fn derived_field_type_is_checked() {
        let schema = RecordSchema::builder("T")
            .column(Column::new("A", ColumnType::Integer).key())
            .derived("B", ColumnType::Integer, |_| Ok(Value::from("oops")))
            .build()
            .unwrap();
        let snapshot = schema.snapshot().set("A", 1).unwrap().build().unwrap();
        assert!(matches!(
            schema.derive(&snapshot),
            Err(CoreError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn layout_ignores_untracked_and_keys() {
        let a = RecordSchema::builder("T")
            .column(Column::new("A", ColumnType::Integer).key())
            .column(Column::new("B", ColumnType::Text))
            .build()
            .unwrap();
        let b = RecordSchema::builder("T")
            .column(Column::new("A", ColumnType::Integer))
            .column(Column::new("B", ColumnType::Text).key())
            .column(Column::new("Stamp", ColumnType::Timestamp).untracked())
            .build()
            .unwrap();
        let c = RecordSchema::builder("T")
            .column(Column::new("B", ColumnType::Text).key())
            .column(Column::new("A", ColumnType::Integer))
            .build()
            .unwrap();
        assert_eq!(a.layout(), b.layout());
        assert_ne!(a.layout(), c.layout());
    }

    #[test]
    fn key_extraction() {
        let schema = RecordSchema::builder("Location")
            .column(Column::new("country", ColumnType::Text).key())
            .column(Column::new("city", ColumnType::Text).key())
            .column(Column::new("notes", ColumnType::Text).nullable())
            .build()
            .unwrap();
        let snapshot = schema
            .snapshot()
            .set("city", "Ottawa")
            .unwrap()
            .set("country", "Canada")
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(schema.key_of(&snapshot).unwrap().to_string(), "Canada/Ottawa");
    }
}
