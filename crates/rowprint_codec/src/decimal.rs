//! Exact base-10 numbers with a single canonical representation.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{CodecError, CodecResult};

/// Largest supported number of fractional digits.
pub const MAX_SCALE: u32 = 28;

/// An exact decimal number `mantissa * 10^-scale`.
///
/// Values are always normalized: trailing fractional zeros are stripped and
/// zero has scale 0. Two decimals that are numerically equal are therefore
/// structurally equal, so `2.0`, `2.00` and `2` compare, hash and encode
/// identically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Decimal {
    mantissa: i128,
    scale: u32,
}

impl Decimal {
    /// The number zero.
    pub const ZERO: Decimal = Decimal {
        mantissa: 0,
        scale: 0,
    };

    /// Create a decimal from a mantissa and scale, normalizing it.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::ScaleOutOfRange`] if the normalized scale
    /// still exceeds [`MAX_SCALE`].
    pub fn new(mantissa: i128, scale: u32) -> CodecResult<Self> {
        let (mantissa, scale) = normalize(mantissa, scale);
        if scale > MAX_SCALE {
            return Err(CodecError::ScaleOutOfRange { scale });
        }
        Ok(Self { mantissa, scale })
    }

    /// The normalized mantissa.
    #[must_use]
    pub const fn mantissa(&self) -> i128 {
        self.mantissa
    }

    /// The normalized number of fractional digits.
    #[must_use]
    pub const fn scale(&self) -> u32 {
        self.scale
    }

    /// Returns true if this decimal has no fractional part.
    #[must_use]
    pub const fn is_integer(&self) -> bool {
        self.scale == 0
    }

    /// Returns true if this decimal is negative.
    #[must_use]
    pub const fn is_negative(&self) -> bool {
        self.mantissa < 0
    }

    /// Exact multiplication.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Overflow`] if the product mantissa does not fit
    /// in 128 bits, or [`CodecError::ScaleOutOfRange`] if the exact product
    /// needs more than [`MAX_SCALE`] fractional digits.
    pub fn checked_mul(&self, other: &Decimal) -> CodecResult<Decimal> {
        let mantissa = self
            .mantissa
            .checked_mul(other.mantissa)
            .ok_or(CodecError::Overflow)?;
        Decimal::new(mantissa, self.scale + other.scale)
    }

    /// The integer part, truncated toward zero.
    #[must_use]
    pub fn trunc(&self) -> i128 {
        // scale <= MAX_SCALE, so the power always fits in i128
        self.mantissa / 10i128.pow(self.scale)
    }
}

fn normalize(mut mantissa: i128, mut scale: u32) -> (i128, u32) {
    if mantissa == 0 {
        return (0, 0);
    }
    while scale > 0 && mantissa % 10 == 0 {
        mantissa /= 10;
        scale -= 1;
    }
    (mantissa, scale)
}

impl FromStr for Decimal {
    type Err = CodecError;

    fn from_str(input: &str) -> CodecResult<Self> {
        let (negative, body) = match input.as_bytes().first() {
            Some(b'-') => (true, &input[1..]),
            Some(b'+') => (false, &input[1..]),
            _ => (false, input),
        };
        let (int_part, frac_part) = body.split_once('.').unwrap_or((body, ""));

        if int_part.is_empty() && frac_part.is_empty() {
            return Err(CodecError::invalid_decimal(input, "no digits"));
        }
        if let Some(bad) = int_part
            .chars()
            .chain(frac_part.chars())
            .find(|c| !c.is_ascii_digit())
        {
            return Err(CodecError::invalid_decimal(
                input,
                format!("unexpected character {bad:?}"),
            ));
        }

        // zeros that cannot change the value never reach the accumulator
        let int_part = int_part.trim_start_matches('0');
        let frac_part = frac_part.trim_end_matches('0');

        let mut magnitude: u128 = 0;
        for digit in int_part.bytes().chain(frac_part.bytes()) {
            magnitude = magnitude
                .checked_mul(10)
                .and_then(|m| m.checked_add(u128::from(digit - b'0')))
                .ok_or_else(|| CodecError::invalid_decimal(input, "mantissa overflow"))?;
        }
        let mantissa = if negative {
            0i128.checked_sub_unsigned(magnitude)
        } else {
            i128::try_from(magnitude).ok()
        }
        .ok_or_else(|| CodecError::invalid_decimal(input, "mantissa overflow"))?;

        let scale = u32::try_from(frac_part.len())
            .map_err(|_| CodecError::invalid_decimal(input, "too many fractional digits"))?;
        Decimal::new(mantissa, scale)
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.scale == 0 {
            return write!(f, "{}", self.mantissa);
        }
        let scale = self.scale as usize;
        let digits = self.mantissa.unsigned_abs().to_string();
        let digits = format!("{digits:0>width$}", width = scale + 1);
        let (int_part, frac_part) = digits.split_at(digits.len() - scale);
        let sign = if self.mantissa < 0 { "-" } else { "" };
        write!(f, "{sign}{int_part}.{frac_part}")
    }
}

impl From<i64> for Decimal {
    fn from(n: i64) -> Self {
        Self {
            mantissa: i128::from(n),
            scale: 0,
        }
    }
}

impl From<i32> for Decimal {
    fn from(n: i32) -> Self {
        Self::from(i64::from(n))
    }
}

impl TryFrom<String> for Decimal {
    type Error = CodecError;

    fn try_from(s: String) -> CodecResult<Self> {
        s.parse()
    }
}

impl From<Decimal> for String {
    fn from(d: Decimal) -> Self {
        d.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn trailing_zeros_are_stripped() {
        assert_eq!(dec("2.0"), dec("2.00"));
        assert_eq!(dec("2.00"), dec("2"));
        assert_eq!(dec("2.50").mantissa(), 25);
        assert_eq!(dec("2.50").scale(), 1);
    }

    #[test]
    fn integer_trailing_zeros_are_kept() {
        let d = dec("200");
        assert_eq!(d.mantissa(), 200);
        assert_eq!(d.scale(), 0);
    }

    #[test]
    fn zero_is_unique() {
        assert_eq!(dec("0"), Decimal::ZERO);
        assert_eq!(dec("-0.000"), Decimal::ZERO);
        assert_eq!(dec(".0"), Decimal::ZERO);
    }

    #[test]
    fn display_is_canonical() {
        assert_eq!(dec("1.2500").to_string(), "1.25");
        assert_eq!(dec("-0.05").to_string(), "-0.05");
        assert_eq!(dec("+7.").to_string(), "7");
        assert_eq!(dec("123").to_string(), "123");
    }

    #[test]
    fn rejects_malformed_input() {
        for bad in ["", "-", ".", "1.2.3", "1e3", " 1", "abc", "--1"] {
            assert!(
                matches!(bad.parse::<Decimal>(), Err(CodecError::InvalidDecimal { .. })),
                "accepted {bad:?}"
            );
        }
    }

    #[test]
    fn rejects_excess_scale() {
        let s = format!("0.{}1", "0".repeat(28));
        assert_eq!(
            s.parse::<Decimal>(),
            Err(CodecError::ScaleOutOfRange { scale: 29 })
        );
        // trailing zeros beyond the limit are fine, they normalize away
        let s = format!("1.{}", "0".repeat(30));
        assert_eq!(s.parse::<Decimal>().unwrap(), Decimal::from(1));
    }

    #[test]
    fn rejects_mantissa_overflow() {
        let s = "9".repeat(40);
        assert!(matches!(
            s.parse::<Decimal>(),
            Err(CodecError::InvalidDecimal { .. })
        ));
    }

    #[test]
    fn long_zero_runs_canonicalize() {
        let padded = format!("1.{}", "0".repeat(40));
        assert_eq!(padded.parse::<Decimal>(), Ok(dec("1.0")));
        let leading = format!("-{}42.5", "0".repeat(50));
        assert_eq!(dec(&leading), dec("-42.50"));
        assert_eq!(dec(&"0".repeat(60)), Decimal::ZERO);
    }

    #[test]
    fn display_parses_back_at_mantissa_bounds() {
        for mantissa in [i128::MIN, i128::MIN + 1, i128::MAX] {
            for scale in [0, 5, MAX_SCALE] {
                let d = Decimal::new(mantissa, scale).unwrap();
                assert_eq!(d.to_string().parse::<Decimal>(), Ok(d), "{d}");
            }
        }
        let too_big = format!("{}0", i128::MAX);
        assert!(too_big.parse::<Decimal>().is_err());
        let just_below = format!("-{}", i128::MAX.unsigned_abs() + 2);
        assert!(just_below.parse::<Decimal>().is_err());
    }

    #[test]
    fn sign_and_integer_predicates() {
        assert!(dec("-0.5").is_negative());
        assert!(!dec("-0.000").is_negative());
        assert!(dec("12.000").is_integer());
        assert!(!dec("12.5").is_integer());
    }

    #[test]
    fn multiplication_and_truncation() {
        let salary = dec("95000.50");
        let factor = dec("1.25");
        let raised = salary.checked_mul(&factor).unwrap();
        assert_eq!(raised, dec("118750.625"));
        assert_eq!(raised.trunc(), 118_750);
        assert_eq!(dec("-2.9").trunc(), -2);
    }

    #[test]
    fn multiplication_overflow() {
        let big = Decimal::new(i128::MAX / 2, 0).unwrap();
        assert_eq!(big.checked_mul(&dec("3")), Err(CodecError::Overflow));
    }

    #[test]
    fn serde_uses_canonical_string() {
        let json = serde_json::to_string(&dec("2.50")).unwrap();
        assert_eq!(json, "\"2.5\"");
        let back: Decimal = serde_json::from_str("\"2.500\"").unwrap();
        assert_eq!(back, dec("2.5"));
        assert!(serde_json::from_str::<Decimal>("\"2,5\"").is_err());
    }
}
