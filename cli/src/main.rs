//! Ledger Bounds CLI - design-time checks for packed lending ledgers
//!
//! Checks a candidate storage layout for a lending pool against the
//! protocol's numeric requirements before it is frozen into a contract, and
//! computes concentrated-liquidity position amounts for test harnesses.

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use ledger_model::Generation;

mod check;
mod config;
mod liquidity;

use check::CheckArgs;
use config::{Config, CONFIG_ENV};
use liquidity::PositionArgs;

#[derive(Parser)]
#[command(name = "ledger-bounds")]
#[command(about = "Feasibility checks for packed fixed-point lending ledgers", long_about = None)]
#[command(version)]
struct Cli {
    /// Config file (TOML)
    #[arg(short, long, global = true, env = CONFIG_ENV)]
    config: Option<String>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check the allocation for each asset precision
    Check {
        /// Asset decimals to check (comma separated, defaults to config)
        #[arg(short, long, value_delimiter = ',')]
        decimals: Vec<u32>,

        /// Built-in layout generation (v1, v2), overrides config
        #[arg(short, long)]
        generation: Option<Generation>,

        /// Monte-Carlo samples for the monotonicity sweep
        #[arg(long)]
        samples: Option<u64>,

        /// Sweep seed
        #[arg(long)]
        seed: Option<u64>,

        /// Unix time the horizon is measured from (defaults to now)
        #[arg(long)]
        reference_time: Option<u64>,

        /// Print reports as JSON
        #[arg(long)]
        json: bool,

        /// Check remaining candidates after a rejection
        #[arg(long)]
        keep_going: bool,
    },

    /// Token amounts of a concentrated-liquidity position, as a hex pair
    Amounts {
        /// Current sqrt price (Q96)
        sqrt_price: String,

        /// Lower sqrt price of the range (Q96)
        sqrt_lower: String,

        /// Upper sqrt price of the range (Q96)
        sqrt_upper: String,

        /// Position liquidity
        liquidity: String,
    },

    /// Show the field allocation under check
    Layout {
        /// Built-in layout generation (v1, v2), overrides config
        #[arg(short, long)]
        generation: Option<Generation>,
    },

    /// Write a default config file
    InitConfig {
        /// Output path
        #[arg(default_value = "ledger-bounds.toml")]
        path: String,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

fn load_config(path: Option<&str>, generation: Option<Generation>) -> Result<Config> {
    let mut config = Config::load(path)?;
    if let Some(generation) = generation {
        config.generation = generation;
        config.slots.clear();
    }
    Ok(config)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if cli.verbose {
        if let Some(path) = &cli.config {
            println!("{} {}", "Config:".bright_cyan(), path);
        }
    }

    match cli.command {
        Commands::Check {
            decimals,
            generation,
            samples,
            seed,
            reference_time,
            json,
            keep_going,
        } => {
            let config = load_config(cli.config.as_deref(), generation)?;
            let args = CheckArgs {
                asset_decimals: decimals,
                samples,
                seed,
                reference_time,
                json,
                keep_going,
            };
            check::run_check(&config, &args)?;
        }
        Commands::Amounts {
            sqrt_price,
            sqrt_lower,
            sqrt_upper,
            liquidity,
        } => {
            let args = PositionArgs {
                sqrt_price,
                sqrt_lower,
                sqrt_upper,
                liquidity,
            };
            liquidity::print_amounts(&args, cli.verbose)?;
        }
        Commands::Layout { generation } => {
            let config = load_config(cli.config.as_deref(), generation)?;
            check::print_layout(&config.allocation())?;
        }
        Commands::InitConfig { path, force } => {
            let target = config::expand_path(&path)?;
            if target.exists() && !force {
                anyhow::bail!(
                    "Config file already exists: {}\n\
                     Use --force to overwrite it",
                    target.display()
                );
            }
            let written = Config::write_default(&path)?;
            println!("{} {}", "Wrote default config to".bright_green(), written.display());
        }
    }

    Ok(())
}
