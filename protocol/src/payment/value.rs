//! Monetary values in wei.
//!
//! Money never touches floating point in this crate. On the wire, amounts
//! travel as hex-encoded integer strings (`"0xde0b6b3a7640000"`); in memory
//! they are a [`Wei`] newtype over `u128`, which comfortably holds any
//! plausible balance. The codec passes the wire strings through untouched —
//! the interpretation done here happens strictly downstream of parsing.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Error parsing a wei string.
#[derive(Debug, Error)]
pub enum WeiParseError {
    /// The input was neither `0x`-hex nor a decimal integer.
    #[error("not a valid wei amount: {0:?}")]
    Malformed(String),

    /// The amount does not fit in 128 bits. Nobody holds this much.
    #[error("wei amount out of range: {0:?}")]
    OutOfRange(String),
}

/// An amount of the smallest indivisible currency unit.
///
/// # Examples
///
/// ```
/// use sofa_protocol::payment::Wei;
///
/// let one_eth = Wei::parse("0xde0b6b3a7640000").unwrap();
/// assert_eq!(one_eth, Wei::new(1_000_000_000_000_000_000));
/// assert_eq!(one_eth.to_hex(), "0xde0b6b3a7640000");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Wei(u128);

impl Wei {
    /// Zero wei.
    pub const ZERO: Wei = Wei(0);

    /// Wrap a raw wei count.
    pub const fn new(value: u128) -> Self {
        Wei(value)
    }

    /// The raw wei count.
    pub const fn value(&self) -> u128 {
        self.0
    }

    /// Parse a wire amount: `0x`-prefixed hex, or bare decimal digits.
    ///
    /// Both spellings occur in the wild; hex is what we emit.
    pub fn parse(s: &str) -> Result<Self, WeiParseError> {
        let trimmed = s.trim();
        let parsed = if let Some(hex) = trimmed.strip_prefix("0x") {
            u128::from_str_radix(hex, 16)
        } else {
            trimmed.parse::<u128>()
        };
        parsed.map(Wei).map_err(|e| match *e.kind() {
            std::num::IntErrorKind::PosOverflow => WeiParseError::OutOfRange(s.to_string()),
            _ => WeiParseError::Malformed(s.to_string()),
        })
    }

    /// Lenient parse for display paths: malformed input reads as zero.
    ///
    /// Never use this on the payment-authorization path — approving a
    /// request whose amount silently became zero is how money goes missing.
    pub fn parse_or_zero(s: &str) -> Self {
        Self::parse(s).unwrap_or(Wei::ZERO)
    }

    /// The canonical wire encoding: `0x` + lowercase hex, no padding.
    pub fn to_hex(&self) -> String {
        format!("0x{:x}", self.0)
    }

    /// Checked addition, for fee totals.
    pub fn checked_add(&self, other: Wei) -> Option<Wei> {
        self.0.checked_add(other.0).map(Wei)
    }

    /// Checked multiplication, for `gas * gasPrice`.
    pub fn checked_mul(&self, other: Wei) -> Option<Wei> {
        self.0.checked_mul(other.0).map(Wei)
    }
}

impl fmt::Display for Wei {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} wei", self.0)
    }
}

impl TryFrom<String> for Wei {
    type Error = WeiParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Wei::parse(&s)
    }
}

impl From<Wei> for String {
    fn from(w: Wei) -> String {
        w.to_hex()
    }
}
