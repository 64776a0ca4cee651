//! Liquidity Model - token amounts of a concentrated-liquidity position
//!
//! Sqrt prices are Q96 fixed point (`sqrt(price) * 2^96`). Given the current
//! sqrt price, the position's sqrt price range and its liquidity, the helper
//! returns how much of each token the position holds, exactly as a test
//! harness expects it: a `0x`-prefixed pair of 256-bit words.

#![forbid(unsafe_code)]

pub mod math;

pub use math::{amounts, parse_decimal, Amounts};

/// Q96 fixed-point exponent
pub const Q96_BITS: usize = 96;

/// Width of each output word
pub const WORD_BITS: u64 = 256;

/// Error types for liquidity amount calculation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LiquidityError {
    /// Input is not a plain decimal number
    #[error("`{input}` is not a decimal number")]
    Malformed { input: String },
    /// Input is below zero
    #[error("`{input}` is negative")]
    Negative { input: String },
    /// A bound sqrt price is zero, the range would divide by it
    #[error("{bound} sqrt price is zero")]
    ZeroBound { bound: &'static str },
    /// Lower bound above upper bound
    #[error("sqrt price range is inverted (lower {lower} > upper {upper})")]
    InvertedRange { lower: String, upper: String },
    /// Result does not fit in a 256-bit word
    #[error("{token} amount needs {bits} bits, more than 256")]
    Overflow { token: &'static str, bits: u64 },
}

pub type Result<T> = std::result::Result<T, LiquidityError>;
