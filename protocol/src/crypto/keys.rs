//! # Key Management
//!
//! Ed25519 keypairs for SOFA client identities. Every client holds two
//! (see [`crate::identity::keychain`]): one authenticates messages, one
//! authorizes payments. This module only knows about a single keypair.
//!
//! Ed25519 because the signing here must be reproducible: the same key and
//! message always give the same 64-byte signature, so re-deriving a
//! keychain on a second device produces interchangeable signers. No nonce
//! to get wrong, no randomness at signing time.
//!
//! Secret material is confined to [`SofaKeypair`], which neither serializes
//! nor prints itself. Only the mnemonic leaves the process, and that goes
//! through the host's secret store, not through here.

use ed25519_dalek::{
    Signature as DalekSignature, Signer, SigningKey, Verifier, VerifyingKey, SECRET_KEY_LENGTH,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors from key construction and parsing.
///
/// Deliberately short on detail: an error message that describes the bad
/// key material is an error message that leaks it.
#[derive(Debug, Error)]
pub enum KeyError {
    /// The bytes handed in cannot be used as a secret key.
    #[error("secret key bytes rejected")]
    InvalidSecretKey,

    /// The bytes or hex handed in do not decode to an Ed25519 public key.
    #[error("public key bytes rejected")]
    InvalidPublicKey,
}

/// One signing identity, wrapping an Ed25519 signing key.
///
/// Always built from 32 bytes of KDF output via [`from_seed`](Self::from_seed);
/// there is deliberately no `generate()` on this type. Randomness enters the
/// system once, when the mnemonic is minted, and every key after that is a
/// pure function of it.
///
/// No `Serialize`/`Deserialize` on purpose. Persist the mnemonic, re-derive
/// the key.
pub struct SofaKeypair {
    signing_key: SigningKey,
}

/// The shareable half: a 32-byte Ed25519 verifying key.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SofaPublicKey {
    bytes: [u8; 32],
}

/// A detached Ed25519 signature, 64 bytes when well-formed.
///
/// Kept as a byte buffer rather than a checked curve point so that
/// signatures received off the wire can be held and compared without
/// validation; a malformed one simply fails `verify`, it never panics.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SofaSignature {
    bytes: Vec<u8>,
}

impl SofaKeypair {
    /// Build a keypair from 32 bytes of derived seed material.
    ///
    /// The bytes become the secret scalar directly, so they must come from
    /// a KDF ([`crate::crypto::hash::derive_key_material`]) — never from
    /// user-supplied input.
    pub fn from_seed(seed: &[u8; SECRET_KEY_LENGTH]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(seed),
        }
    }

    /// The public half of this keypair.
    pub fn public_key(&self) -> SofaPublicKey {
        SofaPublicKey {
            bytes: self.signing_key.verifying_key().to_bytes(),
        }
    }

    /// Raw public key bytes. Free to share anywhere.
    pub fn public_key_bytes(&self) -> [u8; 32] {
        self.signing_key.verifying_key().to_bytes()
    }

    /// Sign a message. Deterministic: same key + same message = same
    /// signature, always.
    pub fn sign(&self, message: &[u8]) -> SofaSignature {
        SofaSignature {
            bytes: self.signing_key.sign(message).to_bytes().to_vec(),
        }
    }

    /// Check a signature against this keypair's own public key.
    pub fn verify(&self, message: &[u8], signature: &SofaSignature) -> bool {
        self.public_key().verify(message, signature)
    }

    /// Public key as lowercase hex, for display and directory registration.
    pub fn public_key_hex(&self) -> String {
        hex::encode(self.public_key_bytes())
    }
}

impl Clone for SofaKeypair {
    // Each clone is one more copy of secret material to account for. Needed
    // so the keychain can be rebuilt wholesale, but keep copies scarce.
    fn clone(&self) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(&self.signing_key.to_bytes()),
        }
    }
}

impl fmt::Debug for SofaKeypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Public half only. The secret never reaches a formatter.
        write!(f, "SofaKeypair(pub={})", self.public_key_hex())
    }
}

impl PartialEq for SofaKeypair {
    /// Equality by public key. That is the identity; comparing secret bytes
    /// would add a timing side channel for nothing.
    fn eq(&self, other: &Self) -> bool {
        self.public_key_bytes() == other.public_key_bytes()
    }
}

impl Eq for SofaKeypair {}

// ---------------------------------------------------------------------------
// SofaPublicKey
// ---------------------------------------------------------------------------

impl SofaPublicKey {
    /// Wrap raw key bytes without validating them; an invalid point will
    /// surface as `verify` returning `false`.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self { bytes }
    }

    /// Borrow the raw bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.bytes
    }

    /// Check a signature over `message` against this key.
    ///
    /// Yes/no by design: the callers are authentication gates, and every
    /// failure mode (bad point, wrong length, wrong signature) means the
    /// same thing to them — reject.
    pub fn verify(&self, message: &[u8], signature: &SofaSignature) -> bool {
        let Ok(key) = VerifyingKey::from_bytes(&self.bytes) else {
            return false;
        };
        let Ok(sig_bytes) = <[u8; 64]>::try_from(signature.bytes.as_slice()) else {
            return false;
        };
        key.verify(message, &DalekSignature::from_bytes(&sig_bytes))
            .is_ok()
    }

    /// Lowercase hex form, 64 characters.
    pub fn to_hex(&self) -> String {
        hex::encode(self.bytes)
    }

    /// Parse the hex form back into a key.
    pub fn from_hex(s: &str) -> Result<Self, KeyError> {
        let decoded = hex::decode(s).map_err(|_| KeyError::InvalidPublicKey)?;
        let bytes: [u8; 32] = decoded
            .try_into()
            .map_err(|_| KeyError::InvalidPublicKey)?;
        Ok(Self { bytes })
    }
}

impl fmt::Display for SofaPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for SofaPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SofaPublicKey({}..)", &self.to_hex()[..16])
    }
}

// ---------------------------------------------------------------------------
// SofaSignature
// ---------------------------------------------------------------------------

impl SofaSignature {
    /// Wrap a 64-byte signature.
    pub fn from_bytes(bytes: [u8; 64]) -> Self {
        Self {
            bytes: bytes.to_vec(),
        }
    }

    /// Borrow the raw bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Lowercase hex form, 128 characters for a well-formed signature.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.bytes)
    }

    /// Parse the hex form, enforcing the 64-byte length.
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let bytes = hex::decode(s)?;
        if bytes.len() != crate::config::SIGNATURE_LENGTH {
            return Err(hex::FromHexError::OddLength);
        }
        Ok(Self { bytes })
    }
}

impl fmt::Display for SofaSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for SofaSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hex_str = self.to_hex();
        if hex_str.len() >= 128 {
            write!(f, "SofaSignature({}..{})", &hex_str[..8], &hex_str[120..])
        } else {
            write!(f, "SofaSignature({})", hex_str)
        }
    }
}
