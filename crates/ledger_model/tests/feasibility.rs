//! End-to-end feasibility checks over the built-in layouts
//! Run with: cargo test -p ledger_model

use ledger_model::*;
use num_bigint::BigUint;

/// 2023-11-14T22:13:20Z, keeps horizons reproducible
const REFERENCE_TIME: u64 = 1_700_000_000;

fn quick_params() -> CheckParams {
    CheckParams {
        samples: 10_000,
        seed: 42,
        ..CheckParams::default()
    }
}

fn check(allocation: &FieldAllocation, decimals: u32, params: &CheckParams) -> Result<FeasibilityReport> {
    check_candidate(allocation, decimals, params, REFERENCE_TIME, &mut Silent)
}

fn percent(numer: i64, denom: i64) -> Decimal {
    Decimal::new(numer, denom)
}

// ============================================================================
// Accepted candidates
// ============================================================================

#[test]
fn test_v2_six_decimals_full_sweep() {
    let params = CheckParams::default();
    assert_eq!(params.samples, 100_000);

    let report = check(&FieldAllocation::v2(), 6, &params).unwrap();

    assert!(report.min_apy < percent(5, 100), "min APY {}", report.min_apy);
    assert!(report.max_apy > percent(25, 1), "max APY {}", report.max_apy);
    assert!(report.max_total_borrows_oom().unwrap() >= 12);
    assert_ne!(report.min_accrued_interest, "0");
    assert_eq!(report.init_borrow_index, "1000000000000");
    assert_eq!(report.monotonicity.samples, 100_000);

    // 10^12 * 2^72
    let scaler = BigUint::from(1_000_000_000_000u64) << 72usize;
    assert_eq!(report.borrows_scaler, scaler.to_string());
}

#[test]
fn test_v2_reports_supply_side_fields() {
    let report = check(&FieldAllocation::v2(), 18, &quick_params()).unwrap();

    let names: Vec<&str> = report.field_maxima.iter().map(|m| m.field.as_str()).collect();
    assert_eq!(names, ["borrowBase", "totalSupply", "lastBalance"]);
    assert_eq!(report.field_maxima[1].oom, 15);

    let growth = report.reserve_growth.expect("v2 has a supply field");
    assert_eq!(growth.reserve_divisor, 8);
    assert_eq!(growth.full_precision, "16");
    assert_eq!(growth.eroded_precision, "88");
}

#[test]
fn test_total_supply_precision_reaches_reserve_check() {
    let params = quick_params();
    let plain = check(&FieldAllocation::v2(), 6, &params).unwrap();

    let mut allocation = FieldAllocation::v2();
    allocation.field_mut("totalSupply").unwrap().precision = Some(6);
    let precise = check(&allocation, 6, &params).unwrap();

    assert_ne!(plain.reserve_growth, precise.reserve_growth);
    let growth = precise.reserve_growth.unwrap();
    assert_eq!(growth.full_precision, "8");
    assert_eq!(growth.eroded_precision, "8");
}

#[test]
fn test_v1_all_default_decimals() {
    let params = quick_params();
    for decimals in DEFAULT_ASSET_DECIMALS {
        let report = check(&FieldAllocation::v1(), decimals, &params).unwrap();
        assert!(report.reserve_growth.is_none());
        assert!(report.max_apy > percent(25, 1));
        assert_eq!(report.min_accrued_interest, "1");
        // one increment per block from 10^12
        assert_eq!(
            report.min_apy,
            Decimal::new(params.blocks_per_year() as i64, 10_000_000_000)
        );
    }
}

#[test]
fn test_v1_total_borrows_magnitude() {
    let report = check(&FieldAllocation::v1(), 18, &quick_params()).unwrap();
    let total = &report.field_maxima[0];
    assert_eq!(total.field, "totalBorrows");
    assert_eq!(total.oom, 13);
    assert_eq!(format!("{:.1}", total.log10), "13.3");
    // (2^144 - 1) / 10^30
    assert_eq!(total.max_units, "22300745198530");
    assert_eq!(report.max_total_borrows_units, total.max_units);
    assert_eq!(report.layout, "v1");
}

#[test]
fn test_report_serializes_to_json() {
    let report = check(&FieldAllocation::v2(), 8, &quick_params()).unwrap();
    let json = serde_json::to_value(&report).unwrap();

    assert_eq!(json["layout"], "v2");
    assert_eq!(json["asset_decimals"], 8);
    assert!(json["max_total_borrows_units"].is_string());
    assert!(json["field_maxima"][0]["max_units"].is_string());
    assert!(json["max_apy"].as_str().unwrap().starts_with("31."));
    assert_eq!(json["monotonicity"]["seed"], 42);
    assert!(json["reserve_growth"].is_object());
}

#[test]
fn test_metrics_in_display_order() {
    let report = check(&FieldAllocation::v1(), 6, &quick_params()).unwrap();
    let metrics = report.metrics();
    assert_eq!(metrics[0], ("layout".to_string(), "v1".to_string()));
    assert_eq!(metrics[1].0, "min APY");
    assert_eq!(metrics[2].0, "max APY");
    assert_eq!(metrics[3].0, "max totalBorrows");
    assert!(metrics[3].1.starts_with("22300745198530623141535718 units"), "{}", metrics[3].1);
    assert!(metrics.iter().any(|(name, value)| name == "init borrowIndex" && value == "1000000000000"));
}

#[test]
fn test_same_seed_same_report() {
    let params = quick_params();
    let a = check(&FieldAllocation::v2(), 6, &params).unwrap();
    let b = check(&FieldAllocation::v2(), 6, &params).unwrap();
    assert_eq!(a, b);
}

// ============================================================================
// Rejected candidates
// ============================================================================

#[test]
fn test_narrow_index_hits_rate_ceiling() {
    let mut allocation = FieldAllocation::v2();
    allocation.field_mut("borrowBase").unwrap().bits = 192;
    allocation.field_mut("borrowIndex").unwrap().bits = 64;

    let err = check(&allocation, 6, &quick_params()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::RateCeiling);
    assert_eq!(err.field(), Some("borrowIndex"));
    assert!(err.remediation().contains("borrowIndex"));
}

#[test]
fn test_unbalanced_slot_is_layout_error() {
    let mut allocation = FieldAllocation::v1();
    allocation.field_mut("borrowIndex").unwrap().bits = 81;

    let err = check(&allocation, 6, &quick_params()).unwrap_err();
    assert_eq!(
        err,
        LedgerError::Layout {
            slot: "packed".into(),
            used: 257,
            capacity: 256
        }
    );
}

#[test]
fn test_overscaled_total_borrows_is_range_error() {
    let mut allocation = FieldAllocation::v1();
    allocation.field_mut("totalBorrows").unwrap().precision = Some(20);

    let err = check(&allocation, 18, &quick_params()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Range);
    assert_eq!(err.field(), Some("totalBorrows"));
}

#[test]
fn test_coarse_index_hits_rate_floor() {
    let mut allocation = FieldAllocation::v2();
    allocation.field_mut("borrowIndex").unwrap().precision = Some(6);
    allocation.accrual_factor_precision = 6;

    let err = check(&allocation, 6, &quick_params()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::RateFloor);
    assert_eq!(err.field(), Some("borrowIndex"));
}

#[test]
fn test_fine_accrual_zeroes_accrued_interest() {
    let mut allocation = FieldAllocation::v1();
    allocation.field_mut("borrowIndex").unwrap().precision = Some(15);
    allocation.accrual_factor_precision = 13;

    let err = check(&allocation, 6, &quick_params()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Quantization);
    assert_eq!(err.field(), Some("totalBorrows"));
}

#[test]
fn test_low_decimals_stall_reserve() {
    let err = check(&FieldAllocation::v2(), 2, &quick_params()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ReserveStall);
}

#[test]
fn test_missing_timestamp_is_config_error() {
    let mut allocation = FieldAllocation::v1();
    allocation.field_mut("borrowIndexTimestamp").unwrap().role = FieldRole::Other;

    let err = check(&allocation, 6, &quick_params()).unwrap_err();
    assert_eq!(err, LedgerError::MissingField { role: "timestamp" });
}

#[test]
fn test_late_reference_time_is_misconfiguration() {
    let params = quick_params();
    let late = u32::MAX as u64 - 5 * params.seconds_per_year;
    let err = check_candidate(&FieldAllocation::v2(), 6, &params, late, &mut Silent).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Config);
    assert!(matches!(err, LedgerError::HorizonTooShort { .. }));
}
