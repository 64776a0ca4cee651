//! Base/amount conversion with floor rounding
//!
//! Accounts store compact "base" units; the owed amount is
//! `base * index / scaler`. Both directions floor, exactly as the contract
//! does, so the functions here reproduce its rounding bit for bit.

use num_bigint::BigUint;
use num_rational::BigRational;
use num_traits::Zero;

use crate::error::{LedgerError, Result};

/// Output precision of a conversion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precision {
    /// Amount in raw asset units
    Raw,
    /// Amount carrying the accrual factor's extra digits
    Scaled,
}

fn magnitudes(scaler: &BigRational) -> (BigUint, BigUint) {
    (
        scaler.numer().magnitude().clone(),
        scaler.denom().magnitude().clone(),
    )
}

/// base -> amount
///
/// Raw: `floor(base * index / scaler)`.
/// Scaled: `floor(base * index * accrual_scaler / scaler)`.
pub fn to_amount(
    base: &BigUint,
    index: &BigUint,
    scaler: &BigRational,
    accrual_scaler: &BigUint,
    precision: Precision,
) -> Result<BigUint> {
    if index.is_zero() {
        return Err(LedgerError::ZeroIndex);
    }
    let (s_numer, s_denom) = magnitudes(scaler);
    let product = base * index * s_denom;
    let numer = match precision {
        Precision::Raw => product,
        Precision::Scaled => product * accrual_scaler,
    };
    Ok(numer / s_numer)
}

/// amount -> base, the approximate inverse of [`to_amount`]
///
/// Raw: `floor(amount * scaler / index)`.
/// Scaled: `floor(amount * scaler / (index * accrual_scaler))`.
pub fn to_base(
    amount: &BigUint,
    index: &BigUint,
    scaler: &BigRational,
    accrual_scaler: &BigUint,
    precision: Precision,
) -> Result<BigUint> {
    if index.is_zero() {
        return Err(LedgerError::ZeroIndex);
    }
    let (s_numer, s_denom) = magnitudes(scaler);
    let divisor = match precision {
        Precision::Raw => index * s_denom,
        Precision::Scaled => index * s_denom * accrual_scaler,
    };
    Ok(amount * s_numer / divisor)
}
