//! Benchmark utilities.

#![deny(unsafe_code)]
#![warn(missing_docs)]

use rand::Rng;
use rowprint_codec::{Decimal, Value};
use rowprint_core::{Column, ColumnType, CoreResult, RecordSchema, RecordSnapshot};

/// Generate random text of the specified length.
pub fn random_text(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len).map(|_| rng.gen_range('a'..='z')).collect()
}

/// Generate a random non-null value of the given column type.
pub fn random_value(ty: ColumnType) -> Value {
    let mut rng = rand::thread_rng();
    match ty {
        ColumnType::Integer => Value::Integer(rng.gen()),
        ColumnType::Decimal => Decimal::new(rng.gen_range(0..10_000_000), 2)
            .map(Value::Decimal)
            .unwrap_or(Value::Null),
        ColumnType::Text => Value::Text(random_text(24)),
        ColumnType::Bool => Value::Bool(rng.gen()),
        ColumnType::Date => date_from_days(rng.gen_range(0..20_000)),
        ColumnType::Timestamp => {
            Value::timestamp("2024-01-02T03:04:05.123456789Z").unwrap_or(Value::Null)
        }
    }
}

fn date_from_days(days: u32) -> Value {
    let year = 1970 + days / 365;
    let month = days % 12 + 1;
    let day = days % 28 + 1;
    Value::date(&format!("{year:04}-{month:02}-{day:02}")).unwrap_or(Value::Null)
}

/// A schema with `width` columns cycling through every column type.
pub fn wide_schema(width: usize) -> CoreResult<RecordSchema> {
    const TYPES: [ColumnType; 6] = [
        ColumnType::Integer,
        ColumnType::Decimal,
        ColumnType::Text,
        ColumnType::Bool,
        ColumnType::Date,
        ColumnType::Timestamp,
    ];
    let mut builder =
        RecordSchema::builder(format!("Wide{width}")).column(Column::new("Id", ColumnType::Integer).key());
    for i in 1..width {
        builder = builder.column(Column::new(format!("C{i}"), TYPES[i % TYPES.len()]));
    }
    builder.build()
}

/// A random row of `schema` with the given key.
pub fn random_row(schema: &RecordSchema, id: i64) -> RecordSnapshot {
    let mut snapshot = RecordSnapshot::new();
    for column in schema.columns() {
        let value = if column.is_key() {
            Value::Integer(id)
        } else {
            random_value(column.column_type())
        };
        snapshot.push(column.name(), value);
    }
    snapshot
}
