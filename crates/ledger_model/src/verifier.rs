//! Property verifier: monotonicity sweep and reserve growth
//!
//! Bound inspection cannot show that every index step stays visible to
//! account balances, so the sweep checks both domain boundaries exactly and
//! a seeded sample of the interior. The sample is evidence, not proof; its
//! size and seed are part of the report.

use num_bigint::{BigUint, RandBigInt};
use num_traits::{One, Zero};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;

use crate::bounds::{Bounds, ScalingConstants};
use crate::conversion::{to_base, Precision};
use crate::error::{LedgerError, Result};
use crate::fixed::{field_max, pow10};
use crate::layout::{Field, FieldAllocation, FieldRole};
use crate::params::CheckParams;

/// Draws between progress notifications
pub const PROGRESS_INTERVAL: u64 = 1024;

/// Receives sweep progress; closures work directly
pub trait SweepObserver {
    fn on_progress(&mut self, done: u64, total: u64);
}

impl<F: FnMut(u64, u64)> SweepObserver for F {
    fn on_progress(&mut self, done: u64, total: u64) {
        self(done, total)
    }
}

/// Observer that ignores progress
pub struct Silent;

impl SweepObserver for Silent {
    fn on_progress(&mut self, _done: u64, _total: u64) {}
}

// ============================================================================
// Monotonicity under minimal index growth
// ============================================================================

/// What the sweep covered
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonotonicitySummary {
    pub samples: u64,
    pub seed: u64,
    /// Lowest index the sweep could draw
    pub domain_low: String,
    /// Highest index the sweep could draw
    pub domain_high: String,
}

/// Where an index under test came from
#[derive(Debug, Clone, Copy)]
enum Origin {
    LowerBoundary,
    UpperBoundary,
    Sample { ordinal: u64, seed: u64 },
}

impl Origin {
    fn describe(self) -> String {
        match self {
            Origin::LowerBoundary => "lower boundary".to_string(),
            Origin::UpperBoundary => "upper boundary".to_string(),
            Origin::Sample { ordinal, seed } => format!("sample #{ordinal} (seed {seed})"),
        }
    }
}

struct StepCheck<'a> {
    constants: &'a ScalingConstants,
    index_field: &'a str,
    borrows_field: &'a str,
    unit: BigUint,
}

impl StepCheck<'_> {
    /// `next` must be a larger index that maps one amount unit to fewer base units
    fn check(&self, index: &BigUint, next: &BigUint, origin: Origin) -> Result<()> {
        if next <= index {
            return Err(LedgerError::Quantization {
                field: self.index_field.to_string(),
                detail: format!("{} index {index} does not grow", origin.describe()),
            });
        }

        let c = self.constants;
        let before = to_base(&self.unit, index, &c.borrows_scaler, &c.accrual_scaler, Precision::Raw)?;
        let after = to_base(&self.unit, next, &c.borrows_scaler, &c.accrual_scaler, Precision::Raw)?;
        if after >= before {
            return Err(LedgerError::Quantization {
                field: self.borrows_field.to_string(),
                detail: format!(
                    "{} index {index} -> {next} leaves base units at {before}",
                    origin.describe()
                ),
            });
        }
        Ok(())
    }
}

/// Uniform bit length, then uniform value within that octave, clamped to [lo, hi]
fn draw_index(rng: &mut ChaCha8Rng, lo: &BigUint, hi: &BigUint) -> BigUint {
    let bits = rng.gen_range(lo.bits()..=hi.bits());
    let octave_lo = BigUint::one() << (bits - 1) as usize;
    let octave_hi = (BigUint::one() << bits as usize) - 1u32;
    let low = if &octave_lo < lo { lo.clone() } else { octave_lo };
    let high = if &octave_hi > hi { hi.clone() } else { octave_hi };
    rng.gen_biguint_range(&low, &(high + 1u32))
}

/// Check that one minimal accrual always changes the base units of an amount
pub fn verify_monotonicity(
    allocation: &FieldAllocation,
    bounds: &Bounds,
    params: &CheckParams,
    observer: &mut dyn SweepObserver,
) -> Result<MonotonicitySummary> {
    let index_field = allocation.require_role(FieldRole::BorrowIndex)?;
    let borrows_field = allocation.require_role(FieldRole::AccountBorrows)?;
    let constants = &bounds.constants;
    let step = StepCheck {
        constants,
        index_field: &index_field.name,
        borrows_field: &borrows_field.name,
        unit: BigUint::one(),
    };

    step.check(&constants.index_min, &bounds.index_after_min, Origin::LowerBoundary)?;
    step.check(&bounds.index_before_max, &constants.index_max, Origin::UpperBoundary)?;

    let lo = &constants.index_min;
    let hi = &bounds.index_before_max;
    let mut drawn = 0;
    if hi >= lo {
        let mut rng = ChaCha8Rng::seed_from_u64(params.seed);
        for ordinal in 0..params.samples {
            let index = draw_index(&mut rng, lo, hi);
            // floor(index * g) is the index the ledger stores, stricter than the exact product
            let next = constants.grow(&index);
            step.check(&index, &next, Origin::Sample { ordinal, seed: params.seed })?;

            drawn = ordinal + 1;
            if drawn % PROGRESS_INTERVAL == 0 || drawn == params.samples {
                observer.on_progress(drawn, params.samples);
            }
        }
    } else {
        log::warn!("index domain [{lo}, {hi}] is empty, only boundaries checked");
    }

    log::debug!("monotonicity holds on both boundaries and {drawn} samples");
    Ok(MonotonicitySummary {
        samples: drawn,
        seed: params.seed,
        domain_low: lo.to_string(),
        domain_high: hi.to_string(),
    })
}

// ============================================================================
// Reserve growth under minimal interest
// ============================================================================

/// One reserve mint: ts * (inv + i) / (inv + i - floor(i / divisor)), floored
pub fn reserve_step(
    total_supply: &BigUint,
    inventory: &BigUint,
    interest: &BigUint,
    divisor: u64,
) -> BigUint {
    let reserve = interest / divisor;
    let gross = inventory + interest;
    let net = &gross - reserve;
    if net.is_zero() {
        return total_supply.clone();
    }
    total_supply * gross / net
}

/// Smallest interest at which a reserve mint increases total supply
///
/// floor(ts') > ts reduces to r (ts + 1) >= inv + i with r = floor(i / d).
/// For a fixed r the left side is constant and the right grows with i, so
/// the first hit is at i = r d, and that needs r (ts + 1 - d) >= inv.
pub fn first_supply_growth(
    total_supply: &BigUint,
    inventory: &BigUint,
    divisor: u64,
) -> Option<BigUint> {
    if total_supply.is_zero() {
        return None;
    }
    let headroom = total_supply + 1u32;
    let divisor_big = BigUint::from(divisor);
    let multiple = if headroom > divisor_big {
        let gap = &headroom - &divisor_big;
        let needed = (inventory + &gap - 1u32) / &gap;
        if needed.is_zero() {
            BigUint::one()
        } else {
            needed
        }
    } else if headroom == divisor_big && inventory.is_zero() {
        BigUint::one()
    } else {
        return None;
    };

    let interest = multiple * divisor;
    // net inventory of zero leaves the supply unchanged however large r gets
    if reserve_step(total_supply, inventory, &interest, divisor) <= *total_supply {
        return None;
    }
    debug_assert!(
        interest.is_one()
            || reserve_step(total_supply, inventory, &(&interest - 1u32), divisor) <= *total_supply
    );
    Some(interest)
}

/// First growth interest of both reserve scenarios
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReserveGrowth {
    pub reserve_divisor: u64,
    /// Raw units of interest, total supply at the field's full precision
    pub full_precision: String,
    /// Raw units of interest, total supply reduced by the erosion factor
    pub eroded_precision: String,
}

fn check_scenario(
    name: &str,
    total_supply: &BigUint,
    inventory: &BigUint,
    limit: &BigUint,
    params: &CheckParams,
) -> Result<BigUint> {
    let interest = first_supply_growth(total_supply, inventory, params.reserve_divisor).ok_or_else(
        || LedgerError::ReserveStall {
            scenario: name.to_string(),
            detail: format!(
                "total supply {total_supply} never grows with reserve divisor {}",
                params.reserve_divisor
            ),
        },
    )?;

    // interest < 10^d / limit
    if &interest * params.reserve_growth_limit >= *limit {
        return Err(LedgerError::ReserveStall {
            scenario: name.to_string(),
            detail: format!(
                "first growth needs {interest} raw units of interest, at least 1/{} of an asset unit",
                params.reserve_growth_limit
            ),
        });
    }
    log::debug!("reserve mint ({name}) first grows supply at {interest} raw units");
    Ok(interest)
}

/// Total supply minted against `inventory` at the field's precision, capped by its width
fn minted_supply(supply: &Field, inventory: &BigUint) -> BigUint {
    let minted = inventory * pow10(supply.precision_or_zero());
    minted.min(field_max(supply.bits))
}

/// Check that reserve mints grow total supply before interest is visible
///
/// `supply` is the total-supply field: its precision sets how many supply
/// units one raw asset unit mints. The eroded scenario divides that supply by
/// the erosion factor, as if share value had grown that much.
pub fn verify_reserve_growth(
    supply: &Field,
    asset_decimals: u32,
    params: &CheckParams,
) -> Result<ReserveGrowth> {
    let one_unit = pow10(asset_decimals);
    let inventory = &one_unit * params.reserve_inventory_units;
    let full_supply = minted_supply(supply, &inventory);
    let eroded_supply = &full_supply / params.reserve_erosion_factor;
    log::debug!("`{}` starts reserve checks at {full_supply}", supply.name);

    let full = check_scenario("full precision", &full_supply, &inventory, &one_unit, params)?;
    let eroded = check_scenario("eroded precision", &eroded_supply, &inventory, &one_unit, params)?;

    Ok(ReserveGrowth {
        reserve_divisor: params.reserve_divisor,
        full_precision: full.to_string(),
        eroded_precision: eroded.to_string(),
    })
}
