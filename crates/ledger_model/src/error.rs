//! Error taxonomy for feasibility checks
//!
//! Every variant is a rejected design choice, never a transient fault, so
//! nothing here is retried. Each error knows which requirement it violates
//! and what to change to fix it.

use serde::Serialize;
use thiserror::Error;

/// Requirement class a [`LedgerError`] belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Slot widths do not add up to the slot capacity
    Layout,
    /// A field cannot hold the required magnitude
    Range,
    /// Index range too narrow for the required maximum yield
    RateCeiling,
    /// Index step too coarse for the required minimum yield
    RateFloor,
    /// Adjacent index states collapse under floor division
    Quantization,
    /// Reserve mint rounds to zero for too long
    ReserveStall,
    /// Inputs or global constants are unusable regardless of the candidate
    Config,
}

/// Feasibility check failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("slot `{slot}` is {} ({used} of {capacity} used)", layout_gap(.used, .capacity))]
    Layout {
        slot: String,
        used: u32,
        capacity: u32,
    },

    #[error("field `{field}` in slot `{slot}` has zero width")]
    EmptyField { slot: String, field: String },

    #[error("allocation has no field with role {role}")]
    MissingField { role: &'static str },

    #[error("allocation has more than one field with role {role} (`{first}`, `{second}`)")]
    DuplicateField {
        role: &'static str,
        first: String,
        second: String,
    },

    #[error("asset decimals {decimals} is unreasonably large (max {max})")]
    AssetDecimals { decimals: u32, max: u32 },

    #[error("time horizon is {years} years, at least {min} required")]
    HorizonTooShort { years: String, min: u32 },

    #[error("`{field}` should hold at least 10^{required} units of asset, current max is 10^{oom}")]
    Range {
        field: String,
        oom: i64,
        required: i64,
    },

    #[error("`{field}` should allow at least {floor}% APY over the protocol's lifetime, current max is {max_apy}%")]
    RateCeiling {
        field: String,
        max_apy: String,
        floor: String,
    },

    #[error("`{field}` should allow APY as low as {ceiling}%, current min is {min_apy}%")]
    RateFloor {
        field: String,
        min_apy: String,
        ceiling: String,
    },

    #[error("`{field}` should change with the smallest change in borrow index ({detail})")]
    Quantization { field: String, detail: String },

    #[error("total supply stalls under minimal interest ({scenario}): {detail}")]
    ReserveStall { scenario: String, detail: String },

    #[error("borrow index must be non-zero")]
    ZeroIndex,

    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParam { name: &'static str, reason: String },
}

impl LedgerError {
    /// Requirement class of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::Layout { .. } | LedgerError::EmptyField { .. } => ErrorKind::Layout,
            LedgerError::Range { .. } => ErrorKind::Range,
            LedgerError::RateCeiling { .. } => ErrorKind::RateCeiling,
            LedgerError::RateFloor { .. } => ErrorKind::RateFloor,
            LedgerError::Quantization { .. } | LedgerError::ZeroIndex => ErrorKind::Quantization,
            LedgerError::ReserveStall { .. } => ErrorKind::ReserveStall,
            LedgerError::MissingField { .. }
            | LedgerError::DuplicateField { .. }
            | LedgerError::AssetDecimals { .. }
            | LedgerError::HorizonTooShort { .. }
            | LedgerError::InvalidParam { .. } => ErrorKind::Config,
        }
    }

    /// Name of the field this error implicates, if any
    pub fn field(&self) -> Option<&str> {
        match self {
            LedgerError::EmptyField { field, .. }
            | LedgerError::Range { field, .. }
            | LedgerError::RateCeiling { field, .. }
            | LedgerError::RateFloor { field, .. }
            | LedgerError::Quantization { field, .. } => Some(field.as_str()),
            LedgerError::Layout { slot, .. } => Some(slot.as_str()),
            _ => None,
        }
    }

    /// Suggested change to the allocation that would clear this error
    pub fn remediation(&self) -> String {
        match self {
            LedgerError::Layout { slot, used, capacity } if used < capacity => {
                format!("widen fields in `{slot}` until they add up to {capacity} bits")
            }
            LedgerError::Layout { slot, capacity, .. } => {
                format!("narrow fields in `{slot}` until they add up to {capacity} bits")
            }
            LedgerError::EmptyField { field, .. } => {
                format!("give `{field}` a positive width or remove it")
            }
            LedgerError::MissingField { role } => format!("declare exactly one {role} field"),
            LedgerError::DuplicateField { role, .. } => {
                format!("keep a single {role} field")
            }
            LedgerError::AssetDecimals { .. } => "decrease asset decimals".to_string(),
            LedgerError::HorizonTooShort { .. } => {
                "increase the timestamp width".to_string()
            }
            LedgerError::Range { field, .. } => {
                format!("increase `{field}` bits or decrease its precision")
            }
            LedgerError::RateCeiling { field, .. } => format!(
                "increase `{field}` bits, decrease its precision, or decrease the timestamp width"
            ),
            LedgerError::RateFloor { field, .. } => {
                format!("increase `{field}` precision")
            }
            LedgerError::Quantization { field, .. } => format!(
                "increase `{field}` precision or decrease accrual factor precision"
            ),
            LedgerError::ReserveStall { .. } => {
                "increase total supply precision or decrease the reserve divisor".to_string()
            }
            LedgerError::ZeroIndex => "start the borrow index at 10^precision".to_string(),
            LedgerError::InvalidParam { name, .. } => format!("fix `{name}`"),
        }
    }
}

fn layout_gap(used: &u32, capacity: &u32) -> String {
    if used < capacity {
        format!("short by {} bits", capacity - used)
    } else {
        format!("over by {} bits", used - capacity)
    }
}

pub type Result<T> = core::result::Result<T, LedgerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_message_says_short_or_over() {
        let short = LedgerError::Layout {
            slot: "packed".into(),
            used: 255,
            capacity: 256,
        };
        assert_eq!(short.to_string(), "slot `packed` is short by 1 bits (255 of 256 used)");
        assert!(short.remediation().starts_with("widen"));

        let over = LedgerError::Layout {
            slot: "packed".into(),
            used: 257,
            capacity: 256,
        };
        assert!(over.to_string().contains("over by 1"));
        assert!(over.remediation().starts_with("narrow"));
    }

    #[test]
    fn test_kind_and_field() {
        let err = LedgerError::RateCeiling {
            field: "borrowIndex".into(),
            max_apy: "22.50".into(),
            floor: "25".into(),
        };
        assert_eq!(err.kind(), ErrorKind::RateCeiling);
        assert_eq!(err.field(), Some("borrowIndex"));
        assert!(err.remediation().contains("borrowIndex"));
    }
}
