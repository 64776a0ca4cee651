//! Feasibility check and layout commands

use anyhow::{Context, Result};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use ledger_model::{
    check_candidate, validate_layout, CheckParams, ErrorKind, FeasibilityReport, FieldAllocation,
    LedgerError, SweepObserver,
};
use serde::Serialize;

use crate::config::Config;

/// Overrides taken from the command line
#[derive(Debug, Default)]
pub struct CheckArgs {
    pub asset_decimals: Vec<u32>,
    pub samples: Option<u64>,
    pub seed: Option<u64>,
    pub reference_time: Option<u64>,
    pub json: bool,
    pub keep_going: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum CheckError {
    #[error("{rejected} of {total} candidates rejected")]
    Rejected { rejected: usize, total: usize },
}

/// Outcome of one candidate, as printed with `--json`
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Accepted { report: FeasibilityReport },
    Rejected {
        asset_decimals: u32,
        kind: ErrorKind,
        #[serde(skip_serializing_if = "Option::is_none")]
        field: Option<String>,
        error: String,
        remediation: String,
    },
}

impl Outcome {
    fn rejected(asset_decimals: u32, err: &LedgerError) -> Self {
        Outcome::Rejected {
            asset_decimals,
            kind: err.kind(),
            field: err.field().map(str::to_string),
            error: err.to_string(),
            remediation: err.remediation(),
        }
    }
}

// ============================================================================
// Progress
// ============================================================================

/// Progress bar over the monotonicity sweep
struct SweepProgress {
    bar: ProgressBar,
}

impl SweepProgress {
    fn new(samples: u64, visible: bool) -> Self {
        if !visible {
            return Self {
                bar: ProgressBar::hidden(),
            };
        }
        let bar = ProgressBar::new(samples);
        let style = ProgressStyle::with_template("  sweep [{bar:30.cyan/blue}] {pos}/{len} ({eta})")
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        bar.set_style(style.progress_chars("=> "));
        Self { bar }
    }
}

impl SweepObserver for SweepProgress {
    fn on_progress(&mut self, done: u64, _total: u64) {
        self.bar.set_position(done);
    }
}

// ============================================================================
// Commands
// ============================================================================

/// Unix time the horizon is measured from
pub fn reference_time(args: &CheckArgs, config: &Config) -> u64 {
    args.reference_time
        .or(config.reference_time)
        .unwrap_or_else(|| u64::try_from(chrono::Utc::now().timestamp()).unwrap_or(0))
}

fn effective_params(args: &CheckArgs, config: &Config) -> CheckParams {
    let mut params = config.constants.clone();
    if let Some(samples) = args.samples {
        params.samples = samples;
    }
    if let Some(seed) = args.seed {
        params.seed = seed;
    }
    params
}

/// Check every candidate precision against the configured allocation
pub fn run_check(config: &Config, args: &CheckArgs) -> Result<()> {
    let allocation = config.allocation();
    let params = effective_params(args, config);
    let now = reference_time(args, config);
    let candidates = if args.asset_decimals.is_empty() {
        config.asset_decimals.clone()
    } else {
        args.asset_decimals.clone()
    };

    log::info!(
        "checking {} candidate(s), reference time {}",
        candidates.len(),
        chrono::DateTime::from_timestamp(now as i64, 0)
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| now.to_string())
    );

    let mut outcomes = Vec::with_capacity(candidates.len());
    for &decimals in &candidates {
        if !args.json {
            println!(
                "\n{}",
                format!("=== Candidate: {} asset decimals ===", decimals)
                    .bright_green()
                    .bold()
            );
        }

        let mut progress = SweepProgress::new(params.samples, !args.json);
        let result = check_candidate(&allocation, decimals, &params, now, &mut progress);
        progress.bar.finish_and_clear();

        let outcome = match result {
            Ok(report) => {
                if !args.json {
                    print_report(&report);
                }
                Outcome::Accepted { report }
            }
            Err(err) => {
                log::debug!("candidate {} rejected: {:?}", decimals, err);
                if !args.json {
                    print_rejection(&err);
                }
                Outcome::rejected(decimals, &err)
            }
        };

        let rejected = matches!(outcome, Outcome::Rejected { .. });
        outcomes.push(outcome);
        if rejected && !args.keep_going {
            break;
        }
    }

    if args.json {
        let json = serde_json::to_string_pretty(&outcomes).context("Failed to serialize reports")?;
        println!("{}", json);
    }

    let rejected = outcomes
        .iter()
        .filter(|o| matches!(o, Outcome::Rejected { .. }))
        .count();
    if rejected > 0 {
        return Err(CheckError::Rejected {
            rejected,
            total: candidates.len(),
        }
        .into());
    }

    if !args.json {
        println!(
            "\n{} all {} candidate(s) accepted",
            "✓".bright_green(),
            candidates.len()
        );
    }
    Ok(())
}

fn print_report(report: &FeasibilityReport) {
    for (name, value) in report.metrics() {
        println!("{:<22} {}", format!("{}:", name).bright_cyan(), value);
    }
    println!("{} all requirements hold", "✓".bright_green());
}

fn print_rejection(err: &LedgerError) {
    println!("{} {:?}: {}", "✗".bright_red(), err.kind(), err);
    println!("  {} {}", "remediation:".yellow(), err.remediation());
}

/// Print the allocation and whether each slot is full
pub fn print_layout(allocation: &FieldAllocation) -> Result<()> {
    println!("{}", "=== Field Allocation ===".bright_green().bold());
    println!("{} {}", "Layout:".bright_cyan(), allocation.name);
    println!(
        "{} {}",
        "Accrual factor precision:".bright_cyan(),
        allocation.accrual_factor_precision
    );

    for slot in &allocation.slots {
        let used = slot.used_bits();
        let mark = if used == slot.capacity {
            "✓".bright_green()
        } else {
            "✗".bright_red()
        };
        println!(
            "\n{} {} ({} / {} bits)",
            mark,
            slot.name.bold(),
            used,
            slot.capacity
        );
        for field in &slot.fields {
            let precision = field
                .precision
                .map(|p| format!("p={}", p))
                .unwrap_or_default();
            println!(
                "    {:<24} {:>4} bits  {:<6} {}",
                field.name,
                field.bits,
                precision,
                field.role.label().dimmed()
            );
        }
    }

    validate_layout(allocation).map_err(|err| {
        println!("\n{} {}", "remediation:".yellow(), err.remediation());
        anyhow::Error::new(err)
    })
}
