//! Feasibility report produced for an accepted candidate

use serde::Serialize;

use crate::bounds::{Bounds, FieldRange};
use crate::fixed::Decimal;
use crate::verifier::{MonotonicitySummary, ReserveGrowth};

/// Representable maximum of one range-checked field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldMaximum {
    pub field: String,
    pub role: &'static str,
    /// Largest whole amount in asset units
    pub max_units: String,
    pub oom: i64,
    pub log10: Decimal,
}

impl From<&FieldRange> for FieldMaximum {
    fn from(range: &FieldRange) -> Self {
        Self {
            field: range.field.clone(),
            role: range.role.label(),
            max_units: range.max_units.to_string(),
            oom: range.oom,
            log10: range.log10.clone(),
        }
    }
}

/// Bounds of one accepted candidate; informational only
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeasibilityReport {
    /// Name of the checked allocation
    pub layout: String,
    pub asset_decimals: u32,
    pub horizon_years: Decimal,
    /// Percent
    pub min_apy: Decimal,
    /// Percent
    pub max_apy: Decimal,
    /// Percent
    pub max_apr: Decimal,
    pub max_total_borrows_units: String,
    /// Total borrows first, then supply-side fields
    pub field_maxima: Vec<FieldMaximum>,
    pub min_accrued_interest: String,
    pub init_borrow_index: String,
    pub borrows_scaler: String,
    pub monotonicity: MonotonicitySummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reserve_growth: Option<ReserveGrowth>,
}

impl FeasibilityReport {
    pub fn new(
        layout: &str,
        asset_decimals: u32,
        bounds: &Bounds,
        monotonicity: MonotonicitySummary,
        reserve_growth: Option<ReserveGrowth>,
    ) -> Self {
        let field_maxima: Vec<FieldMaximum> = bounds.ranges.iter().map(FieldMaximum::from).collect();
        let max_total_borrows_units = field_maxima
            .first()
            .map(|m| m.max_units.clone())
            .unwrap_or_default();
        Self {
            layout: layout.to_string(),
            asset_decimals,
            horizon_years: bounds.horizon.years(),
            min_apy: bounds.apy_min.to_percent(),
            max_apy: bounds.apy_max.to_percent(),
            max_apr: bounds.apr_max.to_percent(),
            max_total_borrows_units,
            field_maxima,
            min_accrued_interest: bounds.min_accrued_interest.to_string(),
            init_borrow_index: bounds.constants.index_min.to_string(),
            borrows_scaler: bounds.constants.borrows_scaler_floor().to_string(),
            monotonicity,
            reserve_growth,
        }
    }

    /// Order of magnitude of total borrows in asset units
    pub fn max_total_borrows_oom(&self) -> Option<i64> {
        self.field_maxima.first().map(|m| m.oom)
    }

    /// Named metrics in display order
    pub fn metrics(&self) -> Vec<(String, String)> {
        let mut out = vec![
            ("layout".to_string(), self.layout.clone()),
            ("min APY".to_string(), format!("{:.6}%", self.min_apy)),
            ("max APY".to_string(), format!("{:.2}%", self.max_apy)),
        ];
        for max in &self.field_maxima {
            out.push((
                format!("max {}", max.field),
                format!("{} units (10^{:.1})", max.max_units, max.log10),
            ));
        }
        out.push(("min accruedInterest".to_string(), self.min_accrued_interest.clone()));
        out.push(("init borrowIndex".to_string(), self.init_borrow_index.clone()));
        out.push(("borrows scaler".to_string(), self.borrows_scaler.clone()));
        out.push(("horizon".to_string(), format!("{:.2} years", self.horizon_years)));
        out.push((
            "monotonic samples".to_string(),
            format!("{} (seed {})", self.monotonicity.samples, self.monotonicity.seed),
        ));
        if let Some(growth) = &self.reserve_growth {
            out.push((
                "reserve growth at".to_string(),
                format!(
                    "{} / {} raw units",
                    growth.full_precision, growth.eroded_precision
                ),
            ));
        }
        out
    }
}
