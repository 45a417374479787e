//! # Cryptographic Primitives
//!
//! Low-level building blocks for the SOFA client core. Nothing in here knows
//! about envelopes, payments, or chat threads — just keys, signatures, and
//! hashes. The identity layer composes these into the two named keypairs
//! the rest of the client uses.
//!
//! Don't roll your own. Everything here delegates to audited crates:
//! `ed25519-dalek` for signatures, `sha2` for content digests, `blake3`
//! for domain-separated key derivation.

pub mod hash;
pub mod keys;

pub use hash::{derive_key_material, sha256, sha256_hex};
pub use keys::{KeyError, SofaKeypair, SofaPublicKey, SofaSignature};
