//! # Keychain — Deterministic Dual-Identity Derivation
//!
//! One mnemonic, two keypairs:
//!
//! ```text
//! BIP-39 mnemonic (12 words)
//!     -> PBKDF2 seed (64 bytes, handled by the bip39 crate)
//!     -> BLAKE3 derive_key("sofa/v1/identity-key", seed) -> identity keypair
//!     -> BLAKE3 derive_key("sofa/v1/payment-key",  seed) -> payment keypair
//! ```
//!
//! The derivation is a pure function of the mnemonic: the same words yield
//! byte-identical keys on every call, on every platform. Losing the mnemonic
//! loses both identities — there is no recovery path that bypasses it.
//!
//! The two contexts are fixed and distinct, so the identity and payment keys
//! are cryptographically unrelated despite sharing a seed. Compromise of one
//! reveals nothing about the other.
//!
//! Derivation is CPU-bound and synchronous. A `Keychain` is immutable after
//! construction, so it is safe to share across threads behind an `Arc`
//! without locking.

use bip39::Mnemonic;
use rand::RngCore;
use thiserror::Error;
use tracing::debug;

use crate::config::{
    IDENTITY_DERIVATION_CONTEXT, PAYMENT_DERIVATION_CONTEXT, SEED_ENTROPY_BYTES,
};
use crate::crypto::hash::{derive_key_material, sha256_hex};
use crate::crypto::keys::{SofaKeypair, SofaSignature};
use crate::identity::address::Address;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur during keychain operations.
#[derive(Debug, Error)]
pub enum KeychainError {
    /// The mnemonic did not decode to valid entropy: unknown words, wrong
    /// word count, or a bad checksum. Fatal at startup — no identity can
    /// be derived, and there is nothing to retry.
    #[error("invalid seed mnemonic: {0}")]
    InvalidSeed(String),

    /// A hex payload handed to [`Keychain::sign_hex`] was not valid hex.
    /// This is a precondition violation by the caller, not a runtime
    /// condition to recover from.
    #[error("payload is not valid hex: {0}")]
    InvalidPayload(String),
}

// ---------------------------------------------------------------------------
// KeyRole
// ---------------------------------------------------------------------------

/// Which of the two derived identities an operation should use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyRole {
    /// The messaging identity: authenticates the client to peers and signs
    /// RPC request headers.
    Identity,
    /// The wallet identity: authorizes on-chain transactions. Its address
    /// is the receive-address peers send funds to.
    Payment,
}

// ---------------------------------------------------------------------------
// Keychain
// ---------------------------------------------------------------------------

/// The client's signing context: both derived keypairs plus their addresses.
///
/// Construct exactly one at startup from the secret store's mnemonic and
/// thread it through constructors — the coordinator, the init-handshake
/// responder, and the RPC header signer all borrow it. No ambient global.
///
/// # Examples
///
/// ```
/// use sofa_protocol::identity::{Keychain, KeyRole};
///
/// let (keychain, words) = Keychain::generate();
///
/// // Re-deriving from the saved words yields the same identities.
/// let restored = Keychain::from_mnemonic(&words).unwrap();
/// assert_eq!(
///     keychain.address(KeyRole::Payment),
///     restored.address(KeyRole::Payment)
/// );
/// ```
pub struct Keychain {
    identity: SofaKeypair,
    payment: SofaKeypair,
    identity_address: Address,
    payment_address: Address,
}

impl Keychain {
    /// Derive both identities from a BIP-39 mnemonic phrase.
    ///
    /// Fails with [`KeychainError::InvalidSeed`] if the words do not decode
    /// to valid entropy (unknown word, wrong count, checksum mismatch).
    pub fn from_mnemonic(words: &str) -> Result<Self, KeychainError> {
        let mnemonic: Mnemonic = words
            .parse()
            .map_err(|e: bip39::Error| KeychainError::InvalidSeed(e.to_string()))?;
        let seed = mnemonic.to_seed("");

        let identity =
            SofaKeypair::from_seed(&derive_key_material(IDENTITY_DERIVATION_CONTEXT, &seed));
        let payment =
            SofaKeypair::from_seed(&derive_key_material(PAYMENT_DERIVATION_CONTEXT, &seed));

        let identity_address = Address::from_public_key(&identity.public_key());
        let payment_address = Address::from_public_key(&payment.public_key());

        debug!(
            identity = %identity_address,
            payment = %payment_address,
            "keychain derived"
        );

        Ok(Self {
            identity,
            payment,
            identity_address,
            payment_address,
        })
    }

    /// Generate a fresh mnemonic and derive a keychain from it.
    ///
    /// Returns the keychain together with the phrase; the caller hands the
    /// phrase to the secret store for persistence. This is the only place
    /// randomness enters the identity layer.
    pub fn generate() -> (Self, String) {
        let mut entropy = [0u8; SEED_ENTROPY_BYTES];
        rand::rngs::OsRng.fill_bytes(&mut entropy);

        let mnemonic = Mnemonic::from_entropy(&entropy)
            .expect("16 bytes of entropy is always a valid BIP-39 size");
        let words = mnemonic.to_string();

        let keychain = Self::from_mnemonic(&words)
            .expect("a freshly generated mnemonic always decodes");
        (keychain, words)
    }

    /// The stable address of one of the derived identities.
    ///
    /// `KeyRole::Payment` is the wallet receive-address used in payment
    /// requests and the init handshake; `KeyRole::Identity` is the routing
    /// identifier registered with the directory.
    pub fn address(&self, role: KeyRole) -> &Address {
        match role {
            KeyRole::Identity => &self.identity_address,
            KeyRole::Payment => &self.payment_address,
        }
    }

    /// Sign arbitrary bytes with one of the derived keys.
    ///
    /// Deterministic Ed25519; used for message-level authentication, not
    /// for transactions (those go through [`sign_hex`](Self::sign_hex)).
    pub fn sign(&self, role: KeyRole, message: &[u8]) -> SofaSignature {
        self.keypair(role).sign(message)
    }

    /// Sign a hex-encoded payload, returning a `0x`-prefixed hex signature.
    ///
    /// The payload is decoded (an optional `0x` prefix is accepted) and the
    /// raw bytes are signed. This is the operation the payment coordinator
    /// uses to authorize an unsigned transaction with the payment key.
    ///
    /// Malformed hex is a programmer error at the call site and surfaces as
    /// [`KeychainError::InvalidPayload`].
    pub fn sign_hex(&self, role: KeyRole, payload: &str) -> Result<String, KeychainError> {
        let stripped = payload.strip_prefix("0x").unwrap_or(payload);
        let bytes =
            hex::decode(stripped).map_err(|e| KeychainError::InvalidPayload(e.to_string()))?;
        let signature = self.keypair(role).sign(&bytes);
        Ok(format!("0x{}", signature.to_hex()))
    }

    /// Verify a signature produced by one of this keychain's identities.
    pub fn verify(&self, role: KeyRole, message: &[u8], signature: &SofaSignature) -> bool {
        self.keypair(role).verify(message, signature)
    }

    /// SHA-256 content digest as a `0x`-prefixed hex string.
    ///
    /// Pure function, kept on the keychain because it travels with signing
    /// in the request-header flow below.
    pub fn digest(&self, content: &str) -> String {
        sha256_hex(content.as_bytes())
    }

    /// Build the authentication headers for a signed RPC request.
    ///
    /// The backend authenticates mutating calls by a signature over
    /// `"{METHOD}\n{path}\n{timestamp}\n{sha256(body)}"`. Returns
    /// `(address, signature, timestamp)` tuples ready to be attached as
    /// headers by the RPC collaborator.
    pub fn auth_headers(
        &self,
        role: KeyRole,
        method: &str,
        path: &str,
        timestamp: i64,
        body: &str,
    ) -> (String, String, String) {
        let payload = format!("{}\n{}\n{}\n{}", method, path, timestamp, self.digest(body));
        let signature = self.sign(role, payload.as_bytes());
        (
            self.address(role).to_string(),
            format!("0x{}", signature.to_hex()),
            timestamp.to_string(),
        )
    }

    fn keypair(&self, role: KeyRole) -> &SofaKeypair {
        match role {
            KeyRole::Identity => &self.identity,
            KeyRole::Payment => &self.payment,
        }
    }
}

impl std::fmt::Debug for Keychain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Addresses only. The keypairs redact themselves, but there's no
        // reason to print them at all here.
        f.debug_struct("Keychain")
            .field("identity", &self.identity_address)
            .field("payment", &self.payment_address)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
