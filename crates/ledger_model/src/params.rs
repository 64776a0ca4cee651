//! Global constants of a check run

use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, Result};
use crate::fixed::Decimal;

pub const SECONDS_PER_YEAR: u64 = 365 * 24 * 60 * 60;
pub const SECONDS_PER_BLOCK: u64 = 13;

/// Protocol-level requirements and verifier tuning
///
/// Yields are fractions expressed as `numer / denom` pairs so configuration
/// files never round-trip through floats.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckParams {
    pub seconds_per_year: u64,
    /// Expected time between accruals
    pub seconds_per_block: u64,
    /// Minimum guaranteed lifetime before the timestamp field overflows
    pub min_horizon_years: u32,
    /// Required order of magnitude of range-checked fields, in asset units
    pub min_oom: i64,
    /// Highest APY the index must express, as [numer, denom]
    pub apy_floor: [u64; 2],
    /// Lowest APY the index must express, as [numer, denom]
    pub apy_ceiling: [u64; 2],
    /// Fraction of interest minted to reserves is 1 / reserve_divisor
    pub reserve_divisor: u64,
    /// Reserve growth must start below 10^decimals / this
    pub reserve_growth_limit: u64,
    /// Inventory used for the reserve scenarios, in whole asset units
    pub reserve_inventory_units: u64,
    /// Factor by which total supply is reduced in the eroded scenario
    pub reserve_erosion_factor: u64,
    pub max_asset_decimals: u32,
    /// Monte-Carlo draws for the monotonicity sweep
    pub samples: u64,
    pub seed: u64,
    /// Working digits for ln/exp
    pub math_digits: u32,
}

impl Default for CheckParams {
    fn default() -> Self {
        Self {
            seconds_per_year: SECONDS_PER_YEAR,
            seconds_per_block: SECONDS_PER_BLOCK,
            min_horizon_years: 10,
            min_oom: 12,
            apy_floor: [25, 100],     // 25%
            apy_ceiling: [5, 10_000], // 0.05%
            reserve_divisor: 8,
            reserve_growth_limit: 1_000,
            reserve_inventory_units: 1_000_000,
            reserve_erosion_factor: 10,
            max_asset_decimals: 18,
            samples: 100_000,
            seed: 0,
            math_digits: 60,
        }
    }
}

impl CheckParams {
    pub fn blocks_per_year(&self) -> u64 {
        self.seconds_per_year / self.seconds_per_block
    }

    pub fn apy_floor(&self) -> Decimal {
        Decimal::new(self.apy_floor[0] as i64, self.apy_floor[1] as i64)
    }

    pub fn apy_ceiling(&self) -> Decimal {
        Decimal::new(self.apy_ceiling[0] as i64, self.apy_ceiling[1] as i64)
    }

    /// Reject constants no candidate could be checked against
    pub fn validate(&self) -> Result<()> {
        let nonzero: [(&'static str, u64); 8] = [
            ("seconds_per_year", self.seconds_per_year),
            ("seconds_per_block", self.seconds_per_block),
            ("apy_floor denominator", self.apy_floor[1]),
            ("apy_ceiling denominator", self.apy_ceiling[1]),
            ("reserve_divisor", self.reserve_divisor),
            ("reserve_growth_limit", self.reserve_growth_limit),
            ("reserve_inventory_units", self.reserve_inventory_units),
            ("reserve_erosion_factor", self.reserve_erosion_factor),
        ];
        for (name, value) in nonzero {
            if value == 0 {
                return Err(LedgerError::InvalidParam {
                    name,
                    reason: "must be non-zero".to_string(),
                });
            }
        }
        if self.seconds_per_block > self.seconds_per_year {
            return Err(LedgerError::InvalidParam {
                name: "seconds_per_block",
                reason: "longer than a year".to_string(),
            });
        }
        if self.apy_floor[0] > i64::MAX as u64
            || self.apy_floor[1] > i64::MAX as u64
            || self.apy_ceiling[0] > i64::MAX as u64
            || self.apy_ceiling[1] > i64::MAX as u64
        {
            return Err(LedgerError::InvalidParam {
                name: "apy bounds",
                reason: "components must fit in i64".to_string(),
            });
        }
        if self.math_digits < 20 {
            return Err(LedgerError::InvalidParam {
                name: "math_digits",
                reason: format!("{} is too coarse, use at least 20", self.math_digits),
            });
        }
        Ok(())
    }
}
