//! # Addresses — Public Key Fingerprints
//!
//! An address is the human-facing, routable fingerprint of a public key:
//!
//! ```text
//! public_key (32 bytes)
//!     -> BLAKE3(public_key) -> 32 bytes
//!     -> keep the last 20 bytes
//!     -> "0x" + lowercase hex -> 0x8ba1f109551bd432803012645ac136ddd64dba72
//! ```
//!
//! The 20-byte/`0x`-hex shape matches what the payment backend, QR scanners,
//! and every wallet UI in this ecosystem already parse. Hashing the key
//! (rather than exposing it raw) keeps the address length fixed even if the
//! key scheme ever changes, and adds a layer of indirection between the
//! routing identifier and the verification key.
//!
//! Addresses are invariant under re-derivation: the same seed always yields
//! the same two addresses, on every platform, in every process.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::config::{ADDRESS_BYTE_LENGTH, ADDRESS_STRING_LENGTH};
use crate::crypto::keys::SofaPublicKey;

/// Errors that can occur when parsing an address string.
#[derive(Debug, Error)]
pub enum AddressError {
    /// The string does not start with the `0x` prefix.
    #[error("address must start with '0x': {0:?}")]
    MissingPrefix(String),

    /// The string has the wrong length.
    #[error("address must be {expected} characters, got {got}")]
    InvalidLength {
        /// The canonical address length.
        expected: usize,
        /// Length of the offending input.
        got: usize,
    },

    /// The payload contains non-hex characters.
    #[error("address contains non-hex characters: {0:?}")]
    InvalidHex(String),
}

/// A canonical account address: `0x` followed by 40 lowercase hex characters.
///
/// Internally stored as the canonical string, so `as_str()` is free and the
/// type can be handed straight to wire fields and display layers. Parsing
/// accepts mixed-case hex and canonicalizes to lowercase; equality is
/// therefore case-insensitive by construction.
///
/// # Examples
///
/// ```
/// use sofa_protocol::identity::Address;
///
/// let addr: Address = "0x8BA1f109551bD432803012645Ac136ddd64DBA72".parse().unwrap();
/// assert_eq!(addr.as_str(), "0x8ba1f109551bd432803012645ac136ddd64dba72");
/// assert!("garbage".parse::<Address>().is_err());
/// ```
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(String);

impl Address {
    /// Derive the address of a public key.
    ///
    /// Deterministic: the same key always maps to the same address.
    pub fn from_public_key(pk: &SofaPublicKey) -> Self {
        let digest = blake3::hash(pk.as_bytes());
        let fingerprint = &digest.as_bytes()[32 - ADDRESS_BYTE_LENGTH..];
        Self(format!("0x{}", hex::encode(fingerprint)))
    }

    /// Parse and canonicalize an address string.
    ///
    /// Validation happens here and nowhere else — everything downstream can
    /// assume an `Address` is well-formed.
    pub fn parse(s: &str) -> Result<Self, AddressError> {
        if !s.starts_with("0x") {
            return Err(AddressError::MissingPrefix(s.to_string()));
        }
        if s.len() != ADDRESS_STRING_LENGTH {
            return Err(AddressError::InvalidLength {
                expected: ADDRESS_STRING_LENGTH,
                got: s.len(),
            });
        }
        if !s[2..].chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(AddressError::InvalidHex(s.to_string()));
        }
        Ok(Self(s.to_lowercase()))
    }

    /// The canonical string form.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Address {
    type Error = AddressError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<Address> for String {
    fn from(addr: Address) -> String {
        addr.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.0)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
