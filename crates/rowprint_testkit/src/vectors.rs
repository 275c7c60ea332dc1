//! Cross-run fingerprint test vectors.
//!
//! Each vector pins the fingerprint of a fixed snapshot under the default
//! domain tag. A digest that changes between builds, processes or machines
//! breaks every token already handed out, so these values must never be
//! regenerated to make a test pass.

use rowprint_codec::Value;
use rowprint_core::RecordSnapshot;
use serde::{Deserialize, Serialize};

/// A fingerprint test vector that can be shared across implementations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FingerprintVector {
    /// Unique identifier for this vector.
    pub id: String,
    /// Human-readable description.
    pub description: String,
    /// Input snapshot.
    pub snapshot: RecordSnapshot,
    /// Expected fingerprint (lowercase hex).
    pub expected_hex: String,
}

impl FingerprintVector {
    fn new(id: &str, description: &str, snapshot: RecordSnapshot, expected_hex: &str) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            snapshot,
            expected_hex: expected_hex.into(),
        }
    }
}

/// A canonical value encoding test vector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodingVector {
    /// Unique identifier for this vector.
    pub id: String,
    /// Input value.
    pub value: Value,
    /// Expected canonical bytes (lowercase hex).
    pub expected_hex: String,
}

fn value(result: Result<Value, rowprint_codec::CodecError>) -> Value {
    result.expect("vector literal must parse")
}

/// Fingerprint vectors under [`DEFAULT_DOMAIN_TAG`](rowprint_core::DEFAULT_DOMAIN_TAG).
pub fn fingerprint_vectors() -> Vec<FingerprintVector> {
    vec![
        FingerprintVector::new(
            "widgets",
            "Two columns, integer key and text",
            RecordSnapshot::from_pairs([("Id", Value::from(1)), ("Name", Value::from("Widgets"))]),
            "b153c21aab57c50147cf7d402ce7d1a5fa01d3893b557b4d5af0a35d7e2309eb",
        ),
        FingerprintVector::new(
            "null_name",
            "Null column value",
            RecordSnapshot::from_pairs([("Id", Value::from(1)), ("Name", Value::Null)]),
            "9a50b2fbd56971f87c11d11907a463baae752ecfecdab5abb1cd478d84876bfd",
        ),
        FingerprintVector::new(
            "price_two",
            "Decimal with trailing zeros, normalized to 2",
            RecordSnapshot::from_pairs([("Price", value(Value::decimal("2.00")))]),
            "b0598fb0347a6b98dc7ed9714e604894db7286fea5ec0c23a9d7a4ff4894e523",
        ),
        FingerprintVector::new(
            "empty",
            "Snapshot without columns",
            RecordSnapshot::new(),
            "d4109001b1a664bcb249ca9028507bf0279a3c32e4ed8135b5a484b60d5a7ff6",
        ),
        FingerprintVector::new(
            "employee",
            "Employee row with null department, date and bool",
            RecordSnapshot::from_pairs([
                ("Id", Value::from(7)),
                ("Name", Value::from("Nancy Davolio")),
                ("Salary", value(Value::decimal("2954.55"))),
                ("DepartmentId", Value::Null),
                ("HireDate", value(Value::date("1992-05-01"))),
                ("Active", Value::from(true)),
            ]),
            "2dedb97fc8c0269d93e912054162bc8ad7d3b309d4f418ec8fb63722d173fd0c",
        ),
        FingerprintVector::new(
            "mixed",
            "Negative integer, bignum decimals, timestamp, false, non-ASCII text",
            RecordSnapshot::from_pairs([
                ("Delta", Value::from(-100)),
                ("Big", value(Value::decimal("12345678901234567890.123"))),
                ("NegBig", value(Value::decimal("-98765432109876543210"))),
                ("Seen", value(Value::timestamp("2024-01-02T03:04:05Z"))),
                ("Flag", Value::from(false)),
                ("Unicode", Value::from("Zürich")),
            ]),
            "7d0c70dfe4352838dd6ab2f3e6213a3aedd2c82e82d4792c25cb354543cc9204",
        ),
    ]
}

/// Canonical encoding vectors for individual values.
pub fn encoding_vectors() -> Vec<EncodingVector> {
    let v = |id: &str, value: Value, hex: &str| EncodingVector {
        id: id.into(),
        value,
        expected_hex: hex.into(),
    };
    vec![
        v("null", Value::Null, "f6"),
        v("false", Value::from(false), "f4"),
        v("true", Value::from(true), "f5"),
        v("int_0", Value::from(0), "00"),
        v("int_24", Value::from(24), "1818"),
        v("int_neg100", Value::from(-100), "3863"),
        v("int_13", Value::from(13), "0d"),
        v("text_empty", Value::from(""), "60"),
        v("text_hello", Value::from("hello"), "6568656c6c6f"),
        v("decimal_2", value(Value::decimal("2.00")), "c4820002"),
        v(
            "decimal_bignum",
            value(Value::decimal("12345678901234567890.123")),
            "c48222c24a029d42b64e76714244cb",
        ),
        v(
            "date",
            value(Value::date("1992-05-01")),
            "d903ec6a313939322d30352d3031",
        ),
    ]
}

/// Lowercase hex encoding.
pub fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Generate all test vectors as JSON for cross-language use.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn all_vectors_json() -> serde_json::Result<String> {
    let vectors = AllTestVectors {
        fingerprint: fingerprint_vectors(),
        encoding: encoding_vectors(),
    };
    serde_json::to_string_pretty(&vectors)
}

#[derive(Debug, Serialize, Deserialize)]
struct AllTestVectors {
    fingerprint: Vec<FingerprintVector>,
    encoding: Vec<EncodingVector>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rowprint_codec::to_canonical_bytes;
    use rowprint_core::fingerprint;

    #[test]
    fn test_fingerprint_vectors() {
        for vector in fingerprint_vectors() {
            assert_eq!(
                fingerprint(&vector.snapshot).to_hex(),
                vector.expected_hex,
                "Vector {} failed: {}",
                vector.id,
                vector.description
            );
        }
    }

    #[test]
    fn test_encoding_vectors() {
        for vector in encoding_vectors() {
            assert_eq!(
                hex_encode(&to_canonical_bytes(&vector.value)),
                vector.expected_hex,
                "Vector {} failed",
                vector.id
            );
        }
    }

    #[test]
    fn test_vector_literals_are_not_null() {
        let parsed = ["Price", "Salary", "HireDate", "Big", "NegBig", "Seen"];
        for vector in fingerprint_vectors() {
            for (name, v) in vector.snapshot.iter() {
                if parsed.contains(&name) {
                    assert!(!v.is_null(), "Vector {} column {name} is null", vector.id);
                }
            }
        }
        for vector in encoding_vectors().iter().filter(|v| v.id != "null") {
            assert!(!vector.value.is_null(), "Vector {} is null", vector.id);
        }
    }

    #[test]
    #[should_panic(expected = "vector literal must parse")]
    fn test_bad_vector_literal_panics() {
        value(Value::decimal("2,00"));
    }

    #[test]
    fn test_null_differs_from_thirteen() {
        let vectors = encoding_vectors();
        let hex = |id: &str| {
            vectors
                .iter()
                .find(|v| v.id == id)
                .map(|v| v.expected_hex.clone())
                .unwrap()
        };
        assert_ne!(hex("null"), hex("int_13"));
    }

    #[test]
    fn test_all_vectors_json() {
        let json = all_vectors_json().unwrap();
        assert!(json.contains("fingerprint"));
        assert!(json.contains("b153c21aab57c50147cf7d402ce7d1a5fa01d3893b557b4d5af0a35d7e2309eb"));

        let back: AllTestVectors = serde_json::from_str(&json).unwrap();
        assert_eq!(back.fingerprint, fingerprint_vectors());
        assert_eq!(back.encoding, encoding_vectors());
    }
}
