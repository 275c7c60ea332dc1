//! Property tests for fingerprint determinism and sensitivity.

use proptest::prelude::*;
use rowprint_codec::Value;
use rowprint_core::{compare, fingerprint, Comparison, FingerprintEngine, RecordSnapshot};
use rowprint_testkit::{
    employee_row_strategy, employee_schema, non_null_value_strategy, snapshot_strategy,
    value_strategy, PropTestConfig,
};

proptest! {
    #![proptest_config(PropTestConfig::default().to_proptest_config())]

    #[test]
    fn fingerprint_is_deterministic(snapshot in snapshot_strategy(12)) {
        prop_assert_eq!(fingerprint(&snapshot), fingerprint(&snapshot.clone()));
        prop_assert_eq!(compare(&fingerprint(&snapshot), &snapshot), Comparison::Match);
    }

    #[test]
    fn null_never_collides(value in non_null_value_strategy()) {
        let with_null = RecordSnapshot::from_pairs([("Id", Value::from(1)), ("Name", Value::Null)]);
        let with_value = RecordSnapshot::from_pairs([("Id", Value::from(1)), ("Name", value)]);
        prop_assert_ne!(fingerprint(&with_null), fingerprint(&with_value));
    }

    #[test]
    fn changed_value_conflicts(a in value_strategy(), b in value_strategy()) {
        prop_assume!(a != b);
        let before = RecordSnapshot::from_pairs([("Id", Value::from(1)), ("Col", a)]);
        let after = RecordSnapshot::from_pairs([("Id", Value::from(1)), ("Col", b)]);
        prop_assert_eq!(compare(&fingerprint(&before), &after), Comparison::Conflict);
    }

    #[test]
    fn swapped_values_conflict(a in any::<i64>(), b in any::<i64>()) {
        prop_assume!(a != b);
        let ab = RecordSnapshot::from_pairs([("A", a), ("B", b)]);
        let ba = RecordSnapshot::from_pairs([("A", b), ("B", a)]);
        prop_assert_ne!(fingerprint(&ab), fingerprint(&ba));
    }

    #[test]
    fn decimal_representation_is_irrelevant(units in any::<i32>(), zeros in 0usize..6) {
        let plain = Value::decimal(&units.to_string()).unwrap();
        let padded = Value::decimal(&format!("{units}.{}", "0".repeat(zeros))).unwrap();
        let a = RecordSnapshot::from_pairs([("Price", plain)]);
        let b = RecordSnapshot::from_pairs([("Price", padded)]);
        prop_assert_eq!(fingerprint(&a), fingerprint(&b));
    }

    #[test]
    fn schema_checked_rows_token_roundtrip(row in employee_row_strategy(employee_schema().unwrap())) {
        let schema = employee_schema().unwrap();
        let engine = FingerprintEngine::new();
        let token = engine.issue_token(&schema, &row).unwrap();
        prop_assert_eq!(engine.check_token(&schema, &token, &row).unwrap(), Comparison::Match);

        let toggled = row
            .with_value("Active", !row.get("Active").and_then(Value::as_bool).unwrap())
            .unwrap();
        prop_assert_eq!(
            engine.check_token(&schema, &token, &toggled).unwrap(),
            Comparison::Conflict
        );
    }
}
