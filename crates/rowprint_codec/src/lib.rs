//! # rowprint Codec
//!
//! Canonical encoding of column values for rowprint fingerprints.
//!
//! This crate provides deterministic value encoding that ensures:
//! - Identical values produce identical bytes
//! - Cross-platform and cross-process consistency
//! - Stable hashing
//!
//! ## Canonical Rules
//!
//! - A strict subset of CBOR (RFC 8949, Section 4.2.1 deterministic encoding)
//! - Integers use shortest encoding
//! - No floats; exact decimals are normalized (`2.0 == 2.00 == 2`)
//! - Strings must be UTF-8
//! - No indefinite-length items
//! - Null is a dedicated sentinel that no real value can produce
//!
//! ## Usage
//!
//! ```
//! use rowprint_codec::{to_canonical_bytes, Value};
//!
//! let price = Value::decimal("2.00").unwrap();
//! let same = Value::decimal("2").unwrap();
//! assert_eq!(to_canonical_bytes(&price), to_canonical_bytes(&same));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod decimal;
mod encoder;
mod error;
mod value;

pub use decimal::{Decimal, MAX_SCALE};
pub use encoder::{to_canonical_bytes, CanonicalEncoder};
pub use error::{CodecError, CodecResult};
pub use value::{Value, ValueKind};

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn enc(value: &Value) -> Vec<u8> {
        to_canonical_bytes(value)
    }

    proptest! {
        #[test]
        fn equal_decimals_encode_identically(m in -1_000_000i64..1_000_000, extra in 0u32..6) {
            let plain = Value::Decimal(Decimal::from(m));
            let padded = Value::decimal(&format!("{m}.{}", "0".repeat(extra as usize + 1))).unwrap();
            prop_assert_eq!(enc(&plain), enc(&padded));
        }

        #[test]
        fn distinct_integers_encode_distinctly(a in any::<i64>(), b in any::<i64>()) {
            prop_assume!(a != b);
            prop_assert_ne!(enc(&Value::Integer(a)), enc(&Value::Integer(b)));
        }

        #[test]
        fn text_never_collides_with_null(s in ".*") {
            prop_assert_ne!(enc(&Value::Text(s)), enc(&Value::Null));
        }
    }

    #[test]
    fn kinds_do_not_collide() {
        // same logical "2" in different kinds must encode differently
        let encodings = [
            enc(&Value::Integer(2)),
            enc(&Value::decimal("2").unwrap()),
            enc(&Value::from("2")),
            enc(&Value::Bool(true)),
        ];
        for (i, a) in encodings.iter().enumerate() {
            for b in &encodings[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }
}
