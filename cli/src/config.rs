//! Checker configuration

use anyhow::{Context, Result};
use ledger_model::{CheckParams, FieldAllocation, Generation, Slot, DEFAULT_ASSET_DECIMALS};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Environment variable naming the config file
pub const CONFIG_ENV: &str = "LEDGER_BOUNDS_CONFIG";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Built-in layout used when no slots are given
    pub generation: Generation,

    /// Asset precisions checked in order
    pub asset_decimals: Vec<u32>,

    /// Unix time the horizon is measured from; wall clock when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_time: Option<u64>,

    /// Accrual factor digits of a custom layout
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accrual_factor_precision: Option<u32>,

    /// Protocol constants and sweep settings
    pub constants: CheckParams,

    /// Custom layout, replaces `generation` when non-empty
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub slots: Vec<Slot>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            generation: Generation::V2,
            asset_decimals: DEFAULT_ASSET_DECIMALS.to_vec(),
            reference_time: None,
            accrual_factor_precision: None,
            constants: CheckParams::default(),
            slots: Vec::new(),
        }
    }
}

/// `~` and `$VAR` expanded path
pub fn expand_path(path: &str) -> Result<PathBuf> {
    let expanded = shellexpand::full(path).with_context(|| format!("Failed to expand path: {}", path))?;
    Ok(PathBuf::from(expanded.as_ref()))
}

impl Config {
    /// Load configuration from the given path, else from `LEDGER_BOUNDS_CONFIG`
    ///
    /// Without either the built-in defaults apply.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.to_string(),
            None => match std::env::var(CONFIG_ENV) {
                Ok(p) => p,
                Err(_) => return Ok(Self::default()),
            },
        };
        Self::from_file(&config_path)
    }

    pub fn from_file(path: &str) -> Result<Self> {
        let config_path = expand_path(path)?;
        let config_str = std::fs::read_to_string(&config_path)
            .context(format!("Failed to read config file: {}", config_path.display()))?;

        let config: Config = toml::from_str(&config_str)
            .context(format!("Failed to parse config TOML: {}", config_path.display()))?;

        log::debug!("loaded config from {}", config_path.display());
        Ok(config)
    }

    /// Write default config to file
    pub fn write_default(path: &str) -> Result<PathBuf> {
        let config_path = expand_path(path)?;
        let toml_str = toml::to_string_pretty(&Self::default()).context("Failed to serialize config")?;

        std::fs::write(&config_path, toml_str)
            .context(format!("Failed to write config to {}", config_path.display()))?;

        log::info!("Created default config at {}", config_path.display());
        Ok(config_path)
    }

    /// Allocation under check: custom slots if given, else the generation
    pub fn allocation(&self) -> FieldAllocation {
        if self.slots.is_empty() {
            let mut allocation = self.generation.allocation();
            if let Some(precision) = self.accrual_factor_precision {
                allocation.accrual_factor_precision = precision;
            }
            return allocation;
        }
        FieldAllocation {
            name: "custom".to_string(),
            slots: self.slots.clone(),
            accrual_factor_precision: self
                .accrual_factor_precision
                .unwrap_or(self.generation.allocation().accrual_factor_precision),
        }
    }
}
