//! Exact and high-precision arithmetic helpers
//!
//! Rationals are exact. Logarithms and exponentials cannot be, so they are
//! evaluated on big integers scaled by `10^(digits + GUARD_DIGITS)`, which
//! keeps the evaluation error tens of orders of magnitude below anything the
//! checked encodings can resolve.

use core::fmt;

use num_bigint::{BigInt, BigUint};
use num_integer::Integer;
use num_rational::BigRational;
use num_traits::{One, Signed, ToPrimitive, Zero};
use serde::{Serialize, Serializer};

use crate::error::{LedgerError, Result};

/// Extra digits carried through series evaluation
const GUARD_DIGITS: u32 = 10;

// ============================================================================
// Integer helpers
// ============================================================================

/// 10^exp
pub fn pow10(exp: u32) -> BigUint {
    BigUint::from(10u32).pow(exp)
}

/// 2^bits - 1, the largest value a `bits`-wide field holds
pub fn field_max(bits: u32) -> BigUint {
    (BigUint::one() << bits as usize) - 1u32
}

/// Number of decimal digits of `n` (one for zero)
pub fn decimal_digits(n: &BigUint) -> u32 {
    n.to_str_radix(10).len() as u32
}

/// floor(log10(n / 10^shift)) for n > 0, computed exactly
pub fn floor_log10(n: &BigUint, shift: u32) -> i64 {
    decimal_digits(n) as i64 - 1 - shift as i64
}

pub fn ratio(numer: &BigUint, denom: &BigUint) -> BigRational {
    BigRational::new(BigInt::from(numer.clone()), BigInt::from(denom.clone()))
}

/// floor(numer / denom) for non-negative rationals
pub fn floor_to_biguint(value: &BigRational) -> BigUint {
    value.floor().to_integer().to_biguint().unwrap_or_default()
}

// ============================================================================
// Decimal value
// ============================================================================

/// Exact rational value with decimal rendering
///
/// Formatting honours `{:.N}` (default six places) and rounds half away from
/// zero. Serializes as a twelve-place decimal string so reports compare
/// textually without float noise.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Decimal(BigRational);

impl Decimal {
    pub fn from_ratio(value: BigRational) -> Self {
        Self(value)
    }

    pub fn from_integer(value: i64) -> Self {
        Self(BigRational::from_integer(BigInt::from(value)))
    }

    /// numer / denom; panics on a zero denominator like any division
    pub fn new(numer: i64, denom: i64) -> Self {
        Self(BigRational::new(BigInt::from(numer), BigInt::from(denom)))
    }

    pub fn as_ratio(&self) -> &BigRational {
        &self.0
    }

    pub fn into_ratio(self) -> BigRational {
        self.0
    }

    pub fn is_positive(&self) -> bool {
        self.0.is_positive()
    }

    /// Value multiplied by 100
    pub fn to_percent(&self) -> Decimal {
        Decimal(&self.0 * BigRational::from_integer(BigInt::from(100)))
    }

    pub fn to_fixed(&self, places: usize) -> String {
        let scale = BigInt::from(10u32).pow(places as u32);
        let scaled = (&self.0 * BigRational::from_integer(scale)).round().to_integer();
        let sign = if scaled.is_negative() { "-" } else { "" };
        let digits = scaled.abs().to_str_radix(10);
        if places == 0 {
            return format!("{sign}{digits}");
        }
        let padded = format!("{:0>width$}", digits, width = places + 1);
        let (whole, frac) = padded.split_at(padded.len() - places);
        format!("{sign}{whole}.{frac}")
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_fixed(f.precision().unwrap_or(6)))
    }
}

impl Serialize for Decimal {
    fn serialize<S: Serializer>(&self, serializer: S) -> core::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_fixed(12))
    }
}

// ============================================================================
// Fixed-point transcendental functions
// ============================================================================

/// Fixed-point context for ln/exp at a chosen number of digits
#[derive(Debug, Clone)]
pub struct Precise {
    scale: BigInt,
    ln2: BigInt,
}

impl Precise {
    pub fn new(digits: u32) -> Self {
        let scale = BigInt::from(pow10(digits + GUARD_DIGITS));
        // ln(2) = 2 * atanh(1/3)
        let third = &scale / BigInt::from(3);
        let ln2 = atanh(&third, &scale) * 2u32;
        Self { scale, ln2 }
    }

    pub fn scale(&self) -> &BigInt {
        &self.scale
    }

    /// Fixed-point value back to an exact rational
    pub fn to_decimal(&self, value: &BigInt) -> Decimal {
        Decimal(BigRational::new(value.clone(), self.scale.clone()))
    }

    /// Rational to fixed point, truncating toward zero
    pub fn from_ratio(&self, value: &BigRational) -> BigInt {
        (value.numer() * &self.scale) / value.denom()
    }

    /// Natural logarithm of a positive rational
    ///
    /// Reduces x = 2^k * m with m in [1, 2), then ln(m) = 2 atanh((m-1)/(m+1)).
    pub fn ln(&self, x: &BigRational) -> Result<BigInt> {
        if !x.is_positive() {
            return Err(LedgerError::InvalidParam {
                name: "ln argument",
                reason: format!("{x} is not positive"),
            });
        }
        let numer = x.numer().magnitude();
        let denom = x.denom().magnitude();
        let scale = self.scale.magnitude();

        let mut k = numer.bits() as i64 - denom.bits() as i64;
        let mut mantissa = scaled_shift(numer, denom, scale, k);
        if &mantissa < scale {
            k -= 1;
            mantissa = scaled_shift(numer, denom, scale, k);
        }

        let m = BigInt::from(mantissa);
        let z = (&m - &self.scale) * &self.scale / (&m + &self.scale);
        Ok(&self.ln2 * k + atanh(&z, &self.scale) * 2u32)
    }

    /// e^y for a fixed-point y
    ///
    /// Decomposes y = q ln2 + r with |r| <= ln2/2 so the Taylor series for
    /// e^r converges quickly, then shifts by q.
    pub fn exp(&self, y: &BigInt) -> BigInt {
        let two_ln2 = &self.ln2 * 2u32;
        let q = (y * 2u32 + &self.ln2).div_floor(&two_ln2);
        let r = y - &q * &self.ln2;

        let mut sum = self.scale.clone();
        let mut term = self.scale.clone();
        let mut n = 1u32;
        loop {
            term = &term * &r / (&self.scale * n);
            if term.is_zero() {
                break;
            }
            sum += &term;
            n += 1;
        }

        let shift = q.magnitude().to_usize().unwrap_or(usize::MAX);
        if q.is_negative() {
            sum >> shift
        } else {
            sum << shift
        }
    }

    /// log10 of a positive rational as a decimal
    pub fn log10(&self, x: &BigRational) -> Result<Decimal> {
        let ten = BigRational::from_integer(BigInt::from(10));
        let ln_x = self.ln(x)?;
        let ln_10 = self.ln(&ten)?;
        Ok(Decimal(BigRational::new(ln_x, ln_10)))
    }
}

/// floor(numer * scale / (denom * 2^k)) for signed k
fn scaled_shift(numer: &BigUint, denom: &BigUint, scale: &BigUint, k: i64) -> BigUint {
    if k >= 0 {
        (numer * scale) / (denom << k as usize)
    } else {
        ((numer * scale) << (-k) as usize) / denom
    }
}

/// atanh(z) for fixed-point |z| < 1
fn atanh(z: &BigInt, scale: &BigInt) -> BigInt {
    let z2 = z * z / scale;
    let mut term = z.clone();
    let mut sum = z.clone();
    let mut n = 1u32;
    loop {
        term = &term * &z2 / scale;
        n += 2;
        let step = &term / n;
        if step.is_zero() {
            break;
        }
        sum += step;
    }
    sum
}

#[cfg(test)]
mod tests {
    use super::*;

    fn r(numer: i64, denom: i64) -> BigRational {
        BigRational::new(BigInt::from(numer), BigInt::from(denom))
    }

    #[test]
    fn test_field_max_and_digits() {
        assert_eq!(field_max(8), BigUint::from(255u32));
        assert_eq!(decimal_digits(&BigUint::zero()), 1);
        assert_eq!(decimal_digits(&pow10(12)), 13);
        // 2^144 - 1 ~ 2.2e43, minus 30 digits of scaling
        assert_eq!(floor_log10(&field_max(144), 30), 13);
    }

    #[test]
    fn test_decimal_formatting() {
        assert_eq!(Decimal::new(1, 3).to_fixed(4), "0.3333");
        assert_eq!(Decimal::new(2, 3).to_fixed(2), "0.67");
        assert_eq!(Decimal::new(-1, 8).to_fixed(3), "-0.125");
        assert_eq!(Decimal::from_integer(42).to_fixed(0), "42");
        assert_eq!(format!("{:.1}", Decimal::new(1, 4).to_percent()), "25.0");
    }

    #[test]
    fn test_ln_of_known_values() {
        let p = Precise::new(40);
        let ln2 = p.to_decimal(&p.ln(&r(2, 1)).unwrap());
        assert_eq!(ln2.to_fixed(20), "0.69314718055994530942");

        let ln10 = p.to_decimal(&p.ln(&r(10, 1)).unwrap());
        assert_eq!(ln10.to_fixed(20), "2.30258509299404568402");

        let ln_half = p.to_decimal(&p.ln(&r(1, 2)).unwrap());
        assert_eq!(ln_half.to_fixed(20), "-0.69314718055994530942");

        assert!(p.ln(&r(1, 1)).unwrap().abs() < BigInt::from(10));
        assert!(p.ln(&r(0, 1)).is_err());
    }

    #[test]
    fn test_exp_of_known_values() {
        let p = Precise::new(40);
        let e = p.to_decimal(&p.exp(p.scale()));
        assert_eq!(e.to_fixed(20), "2.71828182845904523536");

        let one = p.to_decimal(&p.exp(&BigInt::zero()));
        assert_eq!(one.to_fixed(30), "1.000000000000000000000000000000");

        let inv_e = p.to_decimal(&p.exp(&-p.scale().clone()));
        assert_eq!(inv_e.to_fixed(20), "0.36787944117144232160");
    }

    #[test]
    fn test_exp_inverts_ln() {
        let p = Precise::new(50);
        let x = r(4_722_366_482_869, 1_000);
        let back = p.to_decimal(&p.exp(&p.ln(&x).unwrap()));
        let err = (back.as_ratio() - &x).abs();
        assert!(err < r(1, 1_000_000_000_000));
    }

    #[test]
    fn test_log10() {
        let p = Precise::new(30);
        let value = p.log10(&ratio(&pow10(12), &BigUint::one())).unwrap();
        assert_eq!(value.to_fixed(10), "12.0000000000");
    }
}
