//! Packed storage layout and the slot-capacity check
//!
//! A [`FieldAllocation`] describes how the ledger state is packed into
//! 256-bit slots. Fields carry a role so later stages can find the borrow
//! index, the timestamp and friends without caring about slot order.

use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, Result};

/// Width of an EVM storage slot
pub const SLOT_BITS: u32 = 256;

/// What a packed field stores
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldRole {
    /// Pool-level borrowed quantity, scaled by `10^precision`
    TotalBorrows,
    /// Compounding index, starts at `10^precision`
    BorrowIndex,
    /// Last accrual time in seconds
    Timestamp,
    /// Receipt token supply
    TotalSupply,
    /// Last recorded asset balance of the pool
    Inventory,
    /// Per-account stored borrow units
    AccountBorrows,
    /// Anything the checker does not reason about
    Other,
}

impl FieldRole {
    pub fn label(self) -> &'static str {
        match self {
            FieldRole::TotalBorrows => "total_borrows",
            FieldRole::BorrowIndex => "borrow_index",
            FieldRole::Timestamp => "timestamp",
            FieldRole::TotalSupply => "total_supply",
            FieldRole::Inventory => "inventory",
            FieldRole::AccountBorrows => "account_borrows",
            FieldRole::Other => "other",
        }
    }

    /// Roles whose maximum must cover the required asset magnitude
    pub fn is_range_checked(self) -> bool {
        matches!(
            self,
            FieldRole::TotalBorrows | FieldRole::TotalSupply | FieldRole::Inventory
        )
    }
}

/// One packed field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub bits: u32,
    /// Implied fractional digits on top of the asset's own decimals
    #[serde(default)]
    pub precision: Option<u32>,
    #[serde(default = "default_role")]
    pub role: FieldRole,
}

fn default_role() -> FieldRole {
    FieldRole::Other
}

impl Field {
    pub fn new(name: &str, bits: u32, role: FieldRole) -> Self {
        Self {
            name: name.to_string(),
            bits,
            precision: None,
            role,
        }
    }

    pub fn with_precision(mut self, precision: u32) -> Self {
        self.precision = Some(precision);
        self
    }

    /// Precision or zero when the field stores whole units
    pub fn precision_or_zero(&self) -> u32 {
        self.precision.unwrap_or(0)
    }
}

/// A fixed-capacity storage slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub name: String,
    #[serde(default = "default_capacity")]
    pub capacity: u32,
    pub fields: Vec<Field>,
}

fn default_capacity() -> u32 {
    SLOT_BITS
}

impl Slot {
    pub fn new(name: &str, fields: Vec<Field>) -> Self {
        Self {
            name: name.to_string(),
            capacity: SLOT_BITS,
            fields,
        }
    }

    pub fn used_bits(&self) -> u32 {
        self.fields.iter().map(|f| f.bits).sum()
    }
}

/// Built-in layout generations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Generation {
    /// totalBorrows, borrowIndex and its timestamp share one slot
    V1,
    /// Supply slot plus a borrowBase/borrowIndex slot
    V2,
}

impl Generation {
    pub fn allocation(self) -> FieldAllocation {
        match self {
            Generation::V1 => FieldAllocation::v1(),
            Generation::V2 => FieldAllocation::v2(),
        }
    }
}

impl std::str::FromStr for Generation {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "v1" | "1" => Ok(Generation::V1),
            "v2" | "2" => Ok(Generation::V2),
            other => Err(format!("unknown generation `{other}` (expected v1 or v2)")),
        }
    }
}

/// Complete candidate layout
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldAllocation {
    /// Label carried into reports
    #[serde(default = "default_allocation_name")]
    pub name: String,
    pub slots: Vec<Slot>,
    /// Digits of the per-step accrual factor
    pub accrual_factor_precision: u32,
}

fn default_allocation_name() -> String {
    "custom".to_string()
}

impl FieldAllocation {
    /// First-generation layout: one packed slot plus per-account borrows
    pub fn v1() -> Self {
        Self {
            name: "v1".to_string(),
            slots: vec![
                Slot::new(
                    "packed",
                    vec![
                        Field::new("totalBorrows", 144, FieldRole::TotalBorrows).with_precision(12),
                        Field::new("borrowIndex", 80, FieldRole::BorrowIndex).with_precision(12),
                        Field::new("borrowIndexTimestamp", 32, FieldRole::Timestamp),
                    ],
                ),
                Slot::new(
                    "borrows",
                    vec![Field::new("borrows", 256, FieldRole::AccountBorrows)],
                ),
            ],
            accrual_factor_precision: 12,
        }
    }

    /// Second-generation layout with receipt-token supply
    pub fn v2() -> Self {
        Self {
            name: "v2".to_string(),
            slots: vec![
                Slot::new(
                    "supply",
                    vec![
                        Field::new("totalSupply", 112, FieldRole::TotalSupply),
                        Field::new("lastBalance", 112, FieldRole::Inventory),
                        Field::new("lastAccrualTime", 32, FieldRole::Timestamp),
                    ],
                ),
                Slot::new(
                    "borrow",
                    vec![
                        Field::new("borrowBase", 184, FieldRole::TotalBorrows).with_precision(12),
                        Field::new("borrowIndex", 72, FieldRole::BorrowIndex).with_precision(12),
                    ],
                ),
                Slot::new(
                    "borrows",
                    vec![Field::new("borrows", 256, FieldRole::AccountBorrows)],
                ),
            ],
            accrual_factor_precision: 12,
        }
    }

    pub fn fields(&self) -> impl Iterator<Item = &Field> {
        self.slots.iter().flat_map(|s| s.fields.iter())
    }

    pub fn field_mut(&mut self, name: &str) -> Option<&mut Field> {
        self.slots
            .iter_mut()
            .flat_map(|s| s.fields.iter_mut())
            .find(|f| f.name == name)
    }

    /// Field holding `role`, if exactly one does
    pub fn find_role(&self, role: FieldRole) -> Result<Option<&Field>> {
        let mut found: Option<&Field> = None;
        for field in self.fields().filter(|f| f.role == role) {
            if let Some(first) = found {
                return Err(LedgerError::DuplicateField {
                    role: role.label(),
                    first: first.name.clone(),
                    second: field.name.clone(),
                });
            }
            found = Some(field);
        }
        Ok(found)
    }

    /// Field holding `role`; absence is an error
    pub fn require_role(&self, role: FieldRole) -> Result<&Field> {
        self.find_role(role)?
            .ok_or(LedgerError::MissingField { role: role.label() })
    }
}

/// Check that every slot is filled exactly to capacity
pub fn validate_layout(allocation: &FieldAllocation) -> Result<()> {
    for slot in &allocation.slots {
        if let Some(field) = slot.fields.iter().find(|f| f.bits == 0) {
            return Err(LedgerError::EmptyField {
                slot: slot.name.clone(),
                field: field.name.clone(),
            });
        }

        let used = slot.used_bits();
        if used != slot.capacity {
            return Err(LedgerError::Layout {
                slot: slot.name.clone(),
                used,
                capacity: slot.capacity,
            });
        }
        log::debug!("slot `{}` packs {} fields into {} bits", slot.name, slot.fields.len(), used);
    }
    Ok(())
}
