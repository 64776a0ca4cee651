//! Exact Q96 liquidity math
//!
//! Every intermediate is an exact rational; only the final amounts are
//! truncated, so the result does not depend on evaluation order.

use core::fmt;

use num_bigint::{BigInt, BigUint};
use num_rational::BigRational;
use num_traits::{One, Pow, Signed, Zero};

use crate::{LiquidityError, Result, Q96_BITS, WORD_BITS};

/// Largest accepted decimal exponent
const MAX_EXPONENT: i64 = 4096;

fn q96() -> BigRational {
    BigRational::from_integer(BigInt::one() << Q96_BITS)
}

fn malformed(input: &str) -> LiquidityError {
    LiquidityError::Malformed {
        input: input.to_string(),
    }
}

/// Parse `[+-]digits[.digits][e[+-]digits]` into an exact rational
///
/// Negative values are rejected; `-0` parses as zero.
pub fn parse_decimal(input: &str) -> Result<BigRational> {
    let text = input.trim();
    let (negative, unsigned) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };

    let (mantissa, exponent) = match unsigned.find(['e', 'E']) {
        Some(pos) => {
            let exponent: i64 = unsigned[pos + 1..].parse().map_err(|_| malformed(input))?;
            (&unsigned[..pos], exponent)
        }
        None => (unsigned, 0),
    };
    if exponent.abs() > MAX_EXPONENT {
        return Err(malformed(input));
    }

    let (whole, fraction) = mantissa.split_once('.').unwrap_or((mantissa, ""));
    let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if whole.len() + fraction.len() == 0 || !all_digits(whole) || !all_digits(fraction) {
        return Err(malformed(input));
    }

    let digits = format!("{whole}{fraction}");
    let value = BigInt::parse_bytes(digits.as_bytes(), 10).ok_or_else(|| malformed(input))?;
    if negative && !value.is_zero() {
        return Err(LiquidityError::Negative {
            input: input.to_string(),
        });
    }

    let shift = exponent - fraction.len() as i64;
    let ten = BigInt::from(10u32);
    let power: BigInt = Pow::pow(&ten, shift.unsigned_abs());
    Ok(if shift >= 0 {
        BigRational::from_integer(value * power)
    } else {
        BigRational::new(value, power)
    })
}

/// Token amounts held by a position
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Amounts {
    pub value0: BigUint,
    pub value1: BigUint,
}

impl Amounts {
    /// `0x` followed by two zero-padded 64-digit words
    pub fn to_hex(&self) -> String {
        format!("0x{:064x}{:064x}", self.value0, self.value1)
    }
}

impl fmt::Display for Amounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

fn truncate(token: &'static str, value: &BigRational) -> Result<BigUint> {
    let whole = value.to_integer().magnitude().clone();
    if whole.bits() > WORD_BITS {
        return Err(LiquidityError::Overflow {
            token,
            bits: whole.bits(),
        });
    }
    Ok(whole)
}

/// Amounts of token0 and token1 for `liquidity` in `[sqrt_lower, sqrt_upper]`
///
/// Below the range the position is all token0, above it all token1, and
/// inside it splits at `sqrt_price`.
pub fn amounts(
    sqrt_price: &BigRational,
    sqrt_lower: &BigRational,
    sqrt_upper: &BigRational,
    liquidity: &BigRational,
) -> Result<Amounts> {
    for value in [sqrt_price, sqrt_lower, sqrt_upper, liquidity] {
        if value.is_negative() {
            return Err(LiquidityError::Negative {
                input: value.to_string(),
            });
        }
    }
    if sqrt_lower.is_zero() {
        return Err(LiquidityError::ZeroBound { bound: "lower" });
    }
    if sqrt_upper.is_zero() {
        return Err(LiquidityError::ZeroBound { bound: "upper" });
    }
    if sqrt_lower > sqrt_upper {
        return Err(LiquidityError::InvertedRange {
            lower: sqrt_lower.to_string(),
            upper: sqrt_upper.to_string(),
        });
    }

    let q96 = q96();
    let zero = BigRational::zero();
    let (value0, value1) = if sqrt_price <= sqrt_lower {
        let full = liquidity * &q96 * (sqrt_upper - sqrt_lower) / sqrt_upper / sqrt_lower;
        (full * sqrt_price / &q96 * sqrt_price / &q96, zero)
    } else if sqrt_price < sqrt_upper {
        let v0 = liquidity * &q96 * (sqrt_upper - sqrt_price) / sqrt_upper / &q96 * sqrt_price / &q96;
        let v1 = liquidity * (sqrt_price - sqrt_lower) / &q96;
        (v0, v1)
    } else {
        (zero, liquidity * (sqrt_upper - sqrt_lower) / &q96)
    };

    Ok(Amounts {
        value0: truncate("token0", &value0)?,
        value1: truncate("token1", &value1)?,
    })
}
