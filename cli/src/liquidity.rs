//! Liquidity position amounts

use anyhow::{Context, Result};
use colored::Colorize;
use liquidity_model::{amounts, parse_decimal, Amounts};

/// Positional inputs of the amounts command, Q96 sqrt prices
pub struct PositionArgs {
    pub sqrt_price: String,
    pub sqrt_lower: String,
    pub sqrt_upper: String,
    pub liquidity: String,
}

pub fn position_amounts(args: &PositionArgs) -> Result<Amounts> {
    let parse = |name: &str, value: &str| {
        parse_decimal(value).with_context(|| format!("Invalid {}: {}", name, value))
    };
    let sqrt_price = parse("sqrt price", &args.sqrt_price)?;
    let sqrt_lower = parse("lower sqrt price", &args.sqrt_lower)?;
    let sqrt_upper = parse("upper sqrt price", &args.sqrt_upper)?;
    let liquidity = parse("liquidity", &args.liquidity)?;

    let out = amounts(&sqrt_price, &sqrt_lower, &sqrt_upper, &liquidity)
        .context("Failed to compute position amounts")?;
    log::debug!("value0 = {}, value1 = {}", out.value0, out.value1);
    Ok(out)
}

/// Print the hex pair; `verbose` adds the decimal values
pub fn print_amounts(args: &PositionArgs, verbose: bool) -> Result<()> {
    let out = position_amounts(args)?;
    if verbose {
        println!("{}", "=== Position Amounts ===".bright_green().bold());
        println!("{} {}", "value0:".bright_cyan(), out.value0);
        println!("{} {}", "value1:".bright_cyan(), out.value1);
    }
    println!("{}", out.to_hex());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(sp: &str, sl: &str, su: &str, l: &str) -> PositionArgs {
        PositionArgs {
            sqrt_price: sp.to_string(),
            sqrt_lower: sl.to_string(),
            sqrt_upper: su.to_string(),
            liquidity: l.to_string(),
        }
    }

    #[test]
    fn test_at_lower_bound() {
        let q96 = "79228162514264337593543950336";
        let out = position_amounts(&args(q96, q96, "158456325028528675187087900672", "1e3")).unwrap();
        assert_eq!(out.value0.to_string(), "500");
        assert_eq!(out.value1.to_string(), "0");
    }

    #[test]
    fn test_bad_input_names_argument() {
        let err = position_amounts(&args("1", "x", "2", "1")).unwrap_err();
        assert!(err.to_string().contains("lower sqrt price"));
    }
}
