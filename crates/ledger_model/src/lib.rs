//! Ledger Model - design-time feasibility checks for packed lending state
//!
//! A lending ledger packs its interest-accrual state (total borrows, a
//! compounding borrow index, supply and per-account units) into 256-bit
//! slots. Bit widths are frozen once deployed, so this crate checks a
//! candidate allocation before that happens:
//!
//! 1. [`layout`] - every slot is filled exactly to capacity
//! 2. [`bounds`] - range, max/min yield and minimal-step envelope
//! 3. [`conversion`] - base/amount rounding model
//! 4. [`verifier`] - monotonicity sweep and reserve growth
//!
//! All arithmetic is exact or carried at a configurable number of digits;
//! no step goes through `f64`.

#![forbid(unsafe_code)]

pub mod bounds;
pub mod conversion;
pub mod error;
pub mod fixed;
pub mod layout;
pub mod params;
pub mod report;
pub mod verifier;

pub use bounds::{derive_bounds, Bounds, ScalingConstants, TimeHorizon};
pub use conversion::{to_amount, to_base, Precision};
pub use error::{ErrorKind, LedgerError, Result};
pub use fixed::Decimal;
pub use layout::{validate_layout, Field, FieldAllocation, FieldRole, Generation, Slot};
pub use params::CheckParams;
pub use report::FeasibilityReport;
pub use verifier::{Silent, SweepObserver};

/// Asset precisions checked when none are given
pub const DEFAULT_ASSET_DECIMALS: [u32; 3] = [6, 8, 18];

/// Run every stage for one asset precision
///
/// Stops at the first violated requirement; there is no partial report.
pub fn check_candidate(
    allocation: &FieldAllocation,
    asset_decimals: u32,
    params: &CheckParams,
    reference_time: u64,
    observer: &mut dyn SweepObserver,
) -> Result<FeasibilityReport> {
    params.validate()?;
    validate_layout(allocation)?;

    let horizon = TimeHorizon::for_allocation(allocation, reference_time, params)?;
    let bounds = derive_bounds(allocation, asset_decimals, params, horizon)?;
    let monotonicity = verifier::verify_monotonicity(allocation, &bounds, params, observer)?;

    let reserve_growth = match allocation.find_role(FieldRole::TotalSupply)? {
        Some(supply) => Some(verifier::verify_reserve_growth(supply, asset_decimals, params)?),
        None => None,
    };

    log::info!(
        "candidate with {} asset decimals accepted (max APY {:.2}%)",
        asset_decimals,
        bounds.apy_max.to_percent()
    );
    Ok(FeasibilityReport::new(
        &allocation.name,
        asset_decimals,
        &bounds,
        monotonicity,
        reserve_growth,
    ))
}
