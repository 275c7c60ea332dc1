//! Seams to the data-access layer.
//!
//! The engine itself knows nothing about models or storage. Callers plug in
//! a [`SnapshotExtractor`] per record type to turn their own structs into
//! snapshots, and a [`RecordSource`] to read persisted rows by key.

use rowprint_codec::Value;
use tracing::debug;

use crate::error::CoreResult;
use crate::fingerprint::FingerprintEngine;
use crate::schema::RecordSchema;
use crate::snapshot::{RecordKey, RecordSnapshot};
use crate::token::ConcurrencyToken;

/// Turns an in-memory record of type `T` into a canonical snapshot.
pub trait SnapshotExtractor<T: ?Sized> {
    /// Schema of the snapshots this extractor produces.
    fn schema(&self) -> &RecordSchema;

    /// Extracts the persisted columns of `record`.
    ///
    /// # Errors
    ///
    /// Implementations report values that cannot be represented.
    fn extract(&self, record: &T) -> CoreResult<RecordSnapshot>;
}

/// A [`SnapshotExtractor`] backed by a closure.
pub struct FnExtractor<F> {
    schema: RecordSchema,
    extract: F,
}

impl<F> FnExtractor<F> {
    /// Pairs a schema with an extraction function.
    pub fn new(schema: RecordSchema, extract: F) -> Self {
        Self { schema, extract }
    }

    /// Schema of the snapshots this extractor produces.
    pub fn schema(&self) -> &RecordSchema {
        &self.schema
    }
}

impl<T, F> SnapshotExtractor<T> for FnExtractor<F>
where
    T: ?Sized,
    F: Fn(&RecordSchema, &T) -> CoreResult<RecordSnapshot>,
{
    fn schema(&self) -> &RecordSchema {
        &self.schema
    }

    fn extract(&self, record: &T) -> CoreResult<RecordSnapshot> {
        (self.extract)(&self.schema, record)
    }
}

/// Reads persisted rows of one record type.
pub trait RecordSource {
    /// Schema of the rows this source returns.
    fn schema(&self) -> &RecordSchema;

    /// Fetches the current snapshot of the row with `key`.
    ///
    /// # Errors
    ///
    /// Implementations report storage failures.
    fn fetch(&self, key: &RecordKey) -> CoreResult<Option<RecordSnapshot>>;
}

/// A row as handed to business logic: its snapshot, derived fields, and the
/// concurrency token to present when writing it back.
#[derive(Debug, Clone)]
pub struct LoadedRecord {
    snapshot: RecordSnapshot,
    derived: Vec<(String, Value)>,
    token: ConcurrencyToken,
}

impl LoadedRecord {
    /// Validates `snapshot`, stamps it with a token and evaluates derived
    /// fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot does not conform to the schema or a
    /// derived field fails.
    pub fn stamp(
        schema: &RecordSchema,
        engine: &FingerprintEngine,
        snapshot: RecordSnapshot,
    ) -> CoreResult<Self> {
        let token = engine.issue_token(schema, &snapshot)?;
        let derived = schema.derive(&snapshot)?;
        debug!(
            record_type = %schema.record_type(),
            key = %token.key(),
            fingerprint = %token.fingerprint(),
            "stamped fingerprint on load"
        );
        Ok(Self {
            snapshot,
            derived,
            token,
        })
    }

    /// The persisted columns.
    pub fn snapshot(&self) -> &RecordSnapshot {
        &self.snapshot
    }

    /// Looks up a derived field.
    pub fn derived(&self, name: &str) -> Option<&Value> {
        self.derived
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
    }

    /// All derived fields in declaration order.
    pub fn derived_values(&self) -> &[(String, Value)] {
        &self.derived
    }

    /// Token to present when writing this record back.
    pub fn token(&self) -> &ConcurrencyToken {
        &self.token
    }

    /// Splits into snapshot and token.
    pub fn into_parts(self) -> (RecordSnapshot, ConcurrencyToken) {
        (self.snapshot, self.token)
    }
}

/// Fetches `key` from `source` and stamps it.
///
/// # Errors
///
/// Propagates fetch errors and schema violations.
pub fn load<S>(
    source: &S,
    engine: &FingerprintEngine,
    key: &RecordKey,
) -> CoreResult<Option<LoadedRecord>>
where
    S: RecordSource + ?Sized,
{
    match source.fetch(key)? {
        Some(snapshot) => LoadedRecord::stamp(source.schema(), engine, snapshot).map(Some),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;
    use crate::schema::{Column, ColumnType};
    use std::collections::HashMap;

    struct Region {
        id: i64,
        description: Option<String>,
    }

    fn region_schema() -> RecordSchema {
        RecordSchema::builder("Region")
            .column(Column::new("Id", ColumnType::Integer).key())
            .column(Column::new("RegionDescription", ColumnType::Text).nullable())
            .derived("Label", ColumnType::Text, |s| {
                Ok(match s.get("RegionDescription") {
                    Some(Value::Text(d)) => Value::from(d.to_uppercase()),
                    _ => Value::from("UNNAMED"),
                })
            })
            .build()
            .unwrap()
    }

    struct MapSource {
        schema: RecordSchema,
        rows: HashMap<RecordKey, RecordSnapshot>,
    }

    impl RecordSource for MapSource {
        fn schema(&self) -> &RecordSchema {
            &self.schema
        }

        fn fetch(&self, key: &RecordKey) -> CoreResult<Option<RecordSnapshot>> {
            Ok(self.rows.get(key).cloned())
        }
    }

    #[test]
    fn extractor_feeds_engine() {
        let extractor = FnExtractor::new(region_schema(), |schema: &RecordSchema, r: &Region| {
            schema
                .snapshot()
                .set("Id", r.id)?
                .set("RegionDescription", r.description.clone())?
                .build()
        });
        let engine = FingerprintEngine::new();
        let east = Region {
            id: 1,
            description: Some("Eastern".into()),
        };
        let unnamed = Region {
            id: 1,
            description: None,
        };

        let a = engine.fingerprint_record(&extractor, &east).unwrap();
        let b = engine.fingerprint_record(&extractor, &unnamed).unwrap();
        assert_ne!(a, b);
        assert_eq!(a, engine.fingerprint_record(&extractor, &east).unwrap());
    }

    #[test]
    fn load_stamps_token_and_derived_fields() {
        let schema = region_schema();
        let row = schema
            .snapshot()
            .set("Id", 4)
            .unwrap()
            .set("RegionDescription", "Southern")
            .unwrap()
            .build()
            .unwrap();
        let source = MapSource {
            rows: HashMap::from([(RecordKey::from(4), row.clone())]),
            schema,
        };
        let engine = FingerprintEngine::new();

        let loaded = load(&source, &engine, &RecordKey::from(4)).unwrap().unwrap();
        assert_eq!(loaded.snapshot(), &row);
        assert_eq!(loaded.derived("Label"), Some(&Value::from("SOUTHERN")));
        assert_eq!(
            loaded.token().fingerprint(),
            &engine.fingerprint_with(source.schema(), &row).unwrap()
        );

        assert!(load(&source, &engine, &RecordKey::from(5)).unwrap().is_none());
    }

    #[test]
    fn load_rejects_malformed_rows() {
        let schema = region_schema();
        let source = MapSource {
            rows: HashMap::from([(
                RecordKey::from(9),
                RecordSnapshot::from_pairs([("RegionDescription", Value::Null), ("Id", Value::from(9))]),
            )]),
            schema,
        };
        let result = load(&source, &FingerprintEngine::new(), &RecordKey::from(9));
        assert!(matches!(result, Err(CoreError::ColumnOrder { .. })));
    }
}
