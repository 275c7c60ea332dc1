//! Property-based test generators using proptest.
//!
//! Provides strategies for generating column values and snapshots that
//! conform to the fixture schemas.

use chrono::{DateTime, NaiveDate, Utc};
use proptest::prelude::*;
use rowprint_codec::{Decimal, Value, MAX_SCALE};
use rowprint_core::{RecordSchema, RecordSnapshot};

/// Strategy for exact decimals, including mantissas beyond 64 bits.
pub fn decimal_strategy() -> impl Strategy<Value = Decimal> {
    let mantissa = prop_oneof![
        4 => any::<i64>().prop_map(i128::from),
        1 => any::<i128>().prop_map(|m| m / 1_000),
    ];
    (mantissa, 0..=MAX_SCALE).prop_filter_map("scale out of range", |(m, s)| {
        Decimal::new(m, s).ok()
    })
}

/// Strategy for calendar dates between years 1 and 9999.
pub fn date_strategy() -> impl Strategy<Value = NaiveDate> {
    (1i32..=9999, 1u32..=12, 1u32..=28)
        .prop_filter_map("invalid date", |(y, m, d)| NaiveDate::from_ymd_opt(y, m, d))
}

/// Strategy for UTC timestamps with nanosecond precision.
pub fn timestamp_strategy() -> impl Strategy<Value = DateTime<Utc>> {
    (0i64..=253_402_300_799, 0u32..1_000_000_000)
        .prop_filter_map("invalid timestamp", |(secs, nanos)| {
            DateTime::from_timestamp(secs, nanos)
        })
}

/// Strategy for any non-null value.
pub fn non_null_value_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::Integer),
        decimal_strategy().prop_map(Value::Decimal),
        ".{0,32}".prop_map(Value::Text),
        date_strategy().prop_map(Value::Date),
        timestamp_strategy().prop_map(Value::Timestamp),
    ]
}

/// Strategy for any value, null included.
pub fn value_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        1 => Just(Value::Null),
        6 => non_null_value_strategy(),
    ]
}

/// Strategy for column names.
pub fn column_name_strategy() -> impl Strategy<Value = String> {
    "[A-Z][A-Za-z0-9_]{0,15}"
}

/// Strategy for schema-free snapshots with distinct column names.
pub fn snapshot_strategy(max_columns: usize) -> impl Strategy<Value = RecordSnapshot> {
    prop::collection::btree_map(column_name_strategy(), value_strategy(), 0..=max_columns)
        .prop_map(|columns| RecordSnapshot::from_pairs(columns))
}

/// Strategy for rows of `Employee`, as built by
/// [`employee_schema`](crate::fixtures::employee_schema).
pub fn employee_row_strategy(schema: RecordSchema) -> impl Strategy<Value = RecordSnapshot> {
    (
        1i64..1_000_000,
        "[A-Z][a-z]{1,12} [A-Z][a-z]{1,12}",
        (0i64..100_000_000, 0u32..=2),
        prop::option::of(1i64..50),
        date_strategy(),
        any::<bool>(),
    )
        .prop_filter_map(
            "row rejected by schema",
            move |(id, name, (cents, scale), department, hired, active)| {
                schema
                    .snapshot()
                    .set("Id", id)
                    .and_then(|b| b.set("Name", name))
                    .and_then(|b| b.set("Salary", Decimal::new(i128::from(cents), scale)?))
                    .and_then(|b| b.set("DepartmentId", department))
                    .and_then(|b| b.set("HireDate", hired))
                    .and_then(|b| b.set("Active", active))
                    .and_then(|b| b.build())
                    .ok()
            },
        )
}

/// Configuration for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases to run.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 256,
            max_shrink_iters: 1000,
        }
    }
}

impl PropTestConfig {
    /// Creates a configuration for quick tests.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 32,
            max_shrink_iters: 100,
        }
    }

    /// Creates a configuration for thorough tests.
    #[must_use]
    pub fn thorough() -> Self {
        Self {
            cases: 1024,
            max_shrink_iters: 10000,
        }
    }

    /// Converts to proptest config.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}
