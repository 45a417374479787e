//! # Hashing Utilities
//!
//! Two hash functions, two jobs, and we refuse to support more without a
//! very good reason:
//!
//! - **SHA-256** — content digests that appear on the wire or in signed
//!   request headers. Chosen for interoperability: every collaborator in
//!   this ecosystem can compute it.
//!
//! - **BLAKE3 `derive_key`** — child-key derivation from the mnemonic seed.
//!   Domain separation is built into the construction, which is exactly
//!   what "two independent identities from one seed" needs. Internal to
//!   this client, so we get to use the fast one.

use sha2::{Digest, Sha256};

/// Compute the SHA-256 hash of the input data.
///
/// Returns a 32-byte digest as a fixed-size array. Used for content
/// fingerprints and signed request payloads.
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let result = hasher.finalize();
    let mut output = [0u8; 32];
    output.copy_from_slice(&result);
    output
}

/// SHA-256 as a lowercase hex string, `0x`-prefixed.
///
/// This is the digest format the payment backend expects in signed request
/// headers, and the one exposed as the client's generic content hash. Pure
/// function, no side effects.
///
/// # Example
///
/// ```
/// use sofa_protocol::crypto::sha256_hex;
///
/// let digest = sha256_hex(b"");
/// assert_eq!(
///     digest,
///     "0xe3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
/// );
/// ```
pub fn sha256_hex(data: &[u8]) -> String {
    format!("0x{}", hex::encode(sha256(data)))
}

/// Derive 32 bytes of key material from a seed under a context string.
///
/// Uses BLAKE3's built-in `derive_key` mode, which is the proper way to do
/// domain separation — don't try to prepend a tag manually. Two different
/// context strings over the same seed produce unrelated outputs by
/// construction, which is the property the identity/payment key split
/// depends on.
pub fn derive_key_material(context: &str, seed: &[u8]) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new_derive_key(context);
    hasher.update(seed);
    *hasher.finalize().as_bytes()
}
