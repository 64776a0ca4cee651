//! Numeric envelope implied by an allocation
//!
//! Derives the time horizon, the scaling constants and the representable
//! yield range, and rejects the candidate as soon as one of them misses its
//! requirement.

use num_bigint::{BigInt, BigUint};
use num_rational::BigRational;
use num_traits::{ToPrimitive, Zero};

use crate::error::{LedgerError, Result};
use crate::fixed::{field_max, floor_log10, floor_to_biguint, pow10, ratio, Decimal, Precise};
use crate::layout::{Field, FieldAllocation, FieldRole};
use crate::params::CheckParams;

// ============================================================================
// Time horizon
// ============================================================================

/// Guaranteed lifetime before the timestamp field overflows
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeHorizon {
    seconds: BigUint,
    years: BigRational,
}

impl TimeHorizon {
    /// Horizon of a `bits`-wide timestamp seen from `reference_time`
    pub fn new(bits: u32, reference_time: u64, params: &CheckParams) -> Result<Self> {
        params.validate()?;
        let max = field_max(bits);
        let now = BigUint::from(reference_time);
        if now >= max {
            return Err(LedgerError::HorizonTooShort {
                years: "0".to_string(),
                min: params.min_horizon_years,
            });
        }

        let seconds = max - now;
        let years = ratio(&seconds, &BigUint::from(params.seconds_per_year));
        let horizon = Self { seconds, years };

        let min = BigRational::from_integer(BigInt::from(params.min_horizon_years));
        if horizon.years < min {
            return Err(LedgerError::HorizonTooShort {
                years: horizon.years().to_fixed(2),
                min: params.min_horizon_years,
            });
        }
        Ok(horizon)
    }

    /// Horizon of the allocation's timestamp field
    pub fn for_allocation(
        allocation: &FieldAllocation,
        reference_time: u64,
        params: &CheckParams,
    ) -> Result<Self> {
        let timestamp = allocation.require_role(FieldRole::Timestamp)?;
        Self::new(timestamp.bits, reference_time, params)
    }

    pub fn seconds(&self) -> &BigUint {
        &self.seconds
    }

    pub fn years(&self) -> Decimal {
        Decimal::from_ratio(self.years.clone())
    }
}

// ============================================================================
// Scaling constants
// ============================================================================

/// Constants derived from bit widths and precisions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScalingConstants {
    /// 10^accrual_factor_precision
    pub accrual_scaler: BigUint,
    /// Smallest non-zero per-step growth, (scaler + 1) / scaler
    pub growth_factor: BigRational,
    /// Initial borrow index, 10^index_precision
    pub index_min: BigUint,
    pub index_max: BigUint,
    /// index_min * max(account borrows) / max(total borrows)
    pub borrows_scaler: BigRational,
}

impl ScalingConstants {
    pub fn derive(allocation: &FieldAllocation) -> Result<Self> {
        let index = allocation.require_role(FieldRole::BorrowIndex)?;
        let total = allocation.require_role(FieldRole::TotalBorrows)?;
        let account = allocation.require_role(FieldRole::AccountBorrows)?;

        let accrual_scaler = pow10(allocation.accrual_factor_precision);
        let growth_factor = ratio(&(&accrual_scaler + 1u32), &accrual_scaler);
        let index_min = pow10(index.precision_or_zero());
        let index_max = field_max(index.bits);

        let borrows_scaler = ratio(
            &(&index_min * field_max(account.bits)),
            &field_max(total.bits),
        );

        Ok(Self {
            accrual_scaler,
            growth_factor,
            index_min,
            index_max,
            borrows_scaler,
        })
    }

    /// floor(index * growth_factor), the next index after one minimal accrual
    pub fn grow(&self, index: &BigUint) -> BigUint {
        index + index / &self.accrual_scaler
    }

    /// floor(index / growth_factor), the index one minimal accrual below
    pub fn shrink(&self, index: &BigUint) -> BigUint {
        (index * &self.accrual_scaler) / (&self.accrual_scaler + 1u32)
    }

    /// Apply [`grow`](Self::grow) `steps` times
    ///
    /// While floor(index / scaler) is unchanged every step adds the same
    /// increment, so each such run is advanced in one multiplication.
    pub fn compound(&self, start: &BigUint, steps: u64) -> BigUint {
        self.compound_until(start, steps, None)
    }

    /// Like [`compound`](Self::compound), but stops at the first step that
    /// reaches `limit` and returns that index
    pub fn compound_until(&self, start: &BigUint, steps: u64, limit: Option<&BigUint>) -> BigUint {
        let mut index = start.clone();
        let mut remaining = steps;
        while remaining > 0 {
            if limit.is_some_and(|limit| &index >= limit) {
                break;
            }
            let increment = &index / &self.accrual_scaler;
            if increment.is_zero() {
                break;
            }
            let boundary = (&increment + 1u32) * &self.accrual_scaler;
            let mut run = (&boundary - &index + &increment - 1u32) / &increment;
            if let Some(limit) = limit {
                let to_limit = (limit - &index + &increment - 1u32) / &increment;
                run = run.min(to_limit);
            }
            let run = run.to_u64().unwrap_or(u64::MAX).min(remaining);
            index += &increment * run;
            remaining -= run;
        }
        index
    }

    /// Integer scaler constant as it would be written into contract code
    pub fn borrows_scaler_floor(&self) -> BigUint {
        floor_to_biguint(&self.borrows_scaler)
    }
}

// ============================================================================
// Bound derivation
// ============================================================================

/// Largest value of a range-checked field, in asset units
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRange {
    pub field: String,
    pub role: FieldRole,
    /// floor(field max / 10^(precision + decimals)), whole asset units
    pub max_units: BigUint,
    /// floor(log10(max units)), exact
    pub oom: i64,
    /// log10(max units) for display
    pub log10: Decimal,
}

/// Everything derived from one candidate
#[derive(Debug, Clone)]
pub struct Bounds {
    pub horizon: TimeHorizon,
    pub constants: ScalingConstants,
    pub ranges: Vec<FieldRange>,
    pub apr_max: Decimal,
    pub apy_max: Decimal,
    pub apy_min: Decimal,
    /// Smallest non-zero interest a minimal accrual adds to total borrows
    pub min_accrued_interest: BigUint,
    /// Index one minimal accrual above the initial index
    pub index_after_min: BigUint,
    /// Index one minimal accrual below the maximum
    pub index_before_max: BigUint,
}

/// Range check of one field against `10^min_oom` asset units
pub fn field_range(
    field: &Field,
    asset_decimals: u32,
    params: &CheckParams,
    precise: &Precise,
) -> Result<FieldRange> {
    let shift = field.precision_or_zero() + asset_decimals;
    let max = field_max(field.bits);
    let oom = floor_log10(&max, shift);
    let log10 = precise.log10(&ratio(&max, &pow10(shift)))?;

    if oom < params.min_oom {
        return Err(LedgerError::Range {
            field: field.name.clone(),
            oom,
            required: params.min_oom,
        });
    }
    log::debug!("`{}` holds up to 10^{:.1} asset units", field.name, log10);

    Ok(FieldRange {
        field: field.name.clone(),
        role: field.role,
        max_units: &max / pow10(shift),
        oom,
        log10,
    })
}

/// Maximum APY the index range can express over the horizon
///
/// apr = ln(index_max / index_min) / years, apy = e^apr - 1
pub fn max_yield(
    constants: &ScalingConstants,
    horizon: &TimeHorizon,
    precise: &Precise,
) -> Result<(Decimal, Decimal)> {
    let growth = ratio(&constants.index_max, &constants.index_min);
    let ln_growth = precise.ln(&growth)?;
    let apr = ln_growth * horizon.years.denom() / horizon.years.numer();
    let apy = precise.exp(&apr) - precise.scale();
    Ok((precise.to_decimal(&apr), precise.to_decimal(&apy)))
}

/// Yield of one year of minimal accruals, compounded with floor per step
///
/// Compounding stops once the yield reaches `ceiling`; the value returned
/// then is the first one at or above it.
pub fn min_yield(constants: &ScalingConstants, blocks_per_year: u64, ceiling: &Decimal) -> Decimal {
    let start = &constants.index_min;
    let headroom = (BigRational::from_integer(BigInt::from(start.clone())) * ceiling.as_ratio()).ceil();
    let limit = start + headroom.to_integer().to_biguint().unwrap_or_default();
    let end = constants.compound_until(start, blocks_per_year, Some(&limit));
    Decimal::from_ratio(ratio(&(end - start), start))
}

/// Derive and check the envelope of `allocation` for one asset precision
pub fn derive_bounds(
    allocation: &FieldAllocation,
    asset_decimals: u32,
    params: &CheckParams,
    horizon: TimeHorizon,
) -> Result<Bounds> {
    params.validate()?;
    if asset_decimals > params.max_asset_decimals {
        return Err(LedgerError::AssetDecimals {
            decimals: asset_decimals,
            max: params.max_asset_decimals,
        });
    }

    let precise = Precise::new(params.math_digits);
    let index = allocation.require_role(FieldRole::BorrowIndex)?;
    let total = allocation.require_role(FieldRole::TotalBorrows)?;
    let constants = ScalingConstants::derive(allocation)?;

    // Total borrows first, then the supply-side fields
    let mut ranges = vec![field_range(total, asset_decimals, params, &precise)?];
    for field in allocation
        .fields()
        .filter(|f| f.role.is_range_checked() && f.role != FieldRole::TotalBorrows)
    {
        ranges.push(field_range(field, asset_decimals, params, &precise)?);
    }

    let (apr_max, apy_max) = max_yield(&constants, &horizon, &precise)?;
    if apy_max <= params.apy_floor() {
        return Err(LedgerError::RateCeiling {
            field: index.name.clone(),
            max_apy: apy_max.to_percent().to_fixed(2),
            floor: params.apy_floor().to_percent().to_fixed(2),
        });
    }

    let index_after_min = constants.grow(&constants.index_min);
    if index_after_min <= constants.index_min {
        return Err(LedgerError::Quantization {
            field: index.name.clone(),
            detail: format!(
                "index {} does not grow when the accrual factor is only 1",
                constants.index_min
            ),
        });
    }

    let min_accrued_interest = pow10(total.precision_or_zero()) / &constants.accrual_scaler;
    if min_accrued_interest.is_zero() {
        return Err(LedgerError::Quantization {
            field: total.name.clone(),
            detail: "accrued interest is zero when the accrual factor is only 1".to_string(),
        });
    }

    let apy_min = min_yield(&constants, params.blocks_per_year(), &params.apy_ceiling());
    if apy_min >= params.apy_ceiling() {
        return Err(LedgerError::RateFloor {
            field: index.name.clone(),
            min_apy: apy_min.to_percent().to_fixed(6),
            ceiling: params.apy_ceiling().to_percent().to_fixed(6),
        });
    }

    let index_before_max = constants.shrink(&constants.index_max);
    log::debug!(
        "apy range [{:.6}%, {:.2}%] over {:.2} years",
        apy_min.to_percent(),
        apy_max.to_percent(),
        horizon.years()
    );

    Ok(Bounds {
        horizon,
        constants,
        ranges,
        apr_max,
        apy_max,
        apy_min,
        min_accrued_interest,
        index_after_min,
        index_before_max,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 2023-11-14T22:13:20Z
    const REFERENCE_TIME: u64 = 1_700_000_000;

    #[test]
    fn test_horizon_of_32_bit_timestamp() {
        let params = CheckParams::default();
        let horizon = TimeHorizon::new(32, REFERENCE_TIME, &params).unwrap();
        assert_eq!(horizon.seconds(), &BigUint::from(2_594_967_295u64));
        assert_eq!(horizon.years().to_fixed(2), "82.29");
    }

    #[test]
    fn test_horizon_too_short() {
        let params = CheckParams::default();
        // 2^32 - 1 is in 2106; nine years before that is too close
        let late = (1u64 << 32) - 1 - 9 * params.seconds_per_year;
        assert!(matches!(
            TimeHorizon::new(32, late, &params),
            Err(LedgerError::HorizonTooShort { min: 10, .. })
        ));
        assert!(matches!(
            TimeHorizon::new(32, u32::MAX as u64, &params),
            Err(LedgerError::HorizonTooShort { .. })
        ));
    }

    #[test]
    fn test_grow_and_shrink() {
        let constants = ScalingConstants::derive(&FieldAllocation::v1()).unwrap();
        let min = constants.index_min.clone();
        assert_eq!(constants.grow(&min), &min + 1u32);
        assert_eq!(constants.shrink(&(&min + 1u32)), min);
        assert!(constants.shrink(&constants.index_max) < constants.index_max);
    }

    #[test]
    fn test_compound_matches_stepwise() {
        let mut allocation = FieldAllocation::v1();
        allocation.accrual_factor_precision = 3;
        let constants = ScalingConstants::derive(&allocation).unwrap();

        let start = BigUint::from(1_500u32);
        let mut stepwise = start.clone();
        for _ in 0..5_000 {
            stepwise = constants.grow(&stepwise);
        }
        assert_eq!(constants.compound(&start, 5_000), stepwise);
    }

    #[test]
    fn test_compound_stalls_below_scaler() {
        let constants = ScalingConstants::derive(&FieldAllocation::v1()).unwrap();
        let small = BigUint::from(999u32);
        assert_eq!(constants.compound(&small, 1_000_000), small);
    }

    #[test]
    fn test_compound_until_stops_at_limit() {
        let mut allocation = FieldAllocation::v1();
        allocation.accrual_factor_precision = 3;
        let constants = ScalingConstants::derive(&allocation).unwrap();

        let start = BigUint::from(1_500u32);
        let limit = BigUint::from(2_000u32);
        let mut stepwise = start.clone();
        while stepwise < limit {
            stepwise = constants.grow(&stepwise);
        }
        assert_eq!(constants.compound_until(&start, 1_000_000, Some(&limit)), stepwise);
        // no limit reached within the step budget
        assert_eq!(
            constants.compound_until(&start, 10, Some(&limit)),
            constants.compound(&start, 10)
        );
    }

    #[test]
    fn test_coarse_accrual_hits_rate_floor() {
        // one step at precision 1 adds a tenth of the index
        let params = CheckParams::default();
        for accrual_digits in [0, 1, 2] {
            let mut allocation = FieldAllocation::v1();
            allocation.accrual_factor_precision = accrual_digits;
            let constants = ScalingConstants::derive(&allocation).unwrap();
            let apy_min = min_yield(&constants, params.blocks_per_year(), &params.apy_ceiling());
            assert!(apy_min >= params.apy_ceiling());
            assert!(apy_min <= Decimal::from_integer(1));

            let horizon = TimeHorizon::for_allocation(&allocation, REFERENCE_TIME, &params).unwrap();
            assert!(matches!(
                derive_bounds(&allocation, 6, &params, horizon),
                Err(LedgerError::RateFloor { .. })
            ));
        }
    }

    #[test]
    fn test_borrows_scaler_v2() {
        // 10^12 * (2^256 - 1) / (2^184 - 1) floors to 10^12 * 2^72
        let constants = ScalingConstants::derive(&FieldAllocation::v2()).unwrap();
        assert_eq!(constants.borrows_scaler_floor(), pow10(12) << 72usize);
    }

    #[test]
    fn test_field_range_oom() {
        let params = CheckParams::default();
        let precise = Precise::new(params.math_digits);
        let field = Field::new("totalBorrows", 144, FieldRole::TotalBorrows).with_precision(12);

        let range = field_range(&field, 18, &params, &precise).unwrap();
        assert_eq!(range.max_units, BigUint::from(22_300_745_198_530u64));
        assert_eq!(range.oom, 13);
        assert_eq!(range.log10.to_fixed(1), "13.3");

        let narrow = Field::new("totalBorrows", 96, FieldRole::TotalBorrows).with_precision(12);
        assert!(matches!(
            field_range(&narrow, 6, &params, &precise),
            Err(LedgerError::Range { oom: 10, .. })
        ));
    }

    #[test]
    fn test_derive_bounds_v1() {
        let params = CheckParams::default();
        let allocation = FieldAllocation::v1();
        let horizon = TimeHorizon::for_allocation(&allocation, REFERENCE_TIME, &params).unwrap();
        let bounds = derive_bounds(&allocation, 6, &params, horizon).unwrap();

        assert!(bounds.apy_max > params.apy_floor());
        assert!(bounds.apy_min < params.apy_ceiling());
        assert_eq!(bounds.min_accrued_interest, BigUint::from(1u32));
        // one increment per block from 10^12
        assert_eq!(
            bounds.apy_min,
            Decimal::new(params.blocks_per_year() as i64, 1_000_000_000_000)
        );
    }

    #[test]
    fn test_unusable_params_rejected_before_math() {
        let allocation = FieldAllocation::v1();
        let horizon =
            TimeHorizon::for_allocation(&allocation, REFERENCE_TIME, &CheckParams::default()).unwrap();
        let params = CheckParams {
            apy_floor: [1, 0],
            ..CheckParams::default()
        };
        assert!(matches!(
            derive_bounds(&allocation, 6, &params, horizon),
            Err(LedgerError::InvalidParam { name: "apy_floor denominator", .. })
        ));

        let params = CheckParams {
            seconds_per_year: 0,
            ..CheckParams::default()
        };
        assert!(matches!(
            TimeHorizon::new(32, REFERENCE_TIME, &params),
            Err(LedgerError::InvalidParam { name: "seconds_per_year", .. })
        ));
    }

    #[test]
    fn test_asset_decimals_limit() {
        let params = CheckParams::default();
        let allocation = FieldAllocation::v1();
        let horizon = TimeHorizon::for_allocation(&allocation, REFERENCE_TIME, &params).unwrap();
        assert!(matches!(
            derive_bounds(&allocation, 19, &params, horizon),
            Err(LedgerError::AssetDecimals { decimals: 19, max: 18 })
        ));
    }
}
