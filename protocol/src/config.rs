//! # Protocol Configuration & Constants
//!
//! Every magic number in the SOFA client core lives here. If you're
//! hardcoding a constant somewhere else, you're doing it wrong and you owe
//! the team coffee.
//!
//! Most of these values are wire-visible: the envelope tags, the init-field
//! names, the address shape. Changing them breaks compatibility with every
//! peer already deployed, so treat this file as frozen protocol surface.

// ---------------------------------------------------------------------------
// Seed & Key Derivation
// ---------------------------------------------------------------------------

/// Entropy used when generating a fresh mnemonic seed: 16 bytes gives a
/// 12-word BIP-39 phrase. Enough for a 128-bit security level, short enough
/// that users will actually write it down.
pub const SEED_ENTROPY_BYTES: usize = 16;

/// Derivation context for the *identity* keypair — the one that signs
/// message-level authentication payloads and RPC request headers.
pub const IDENTITY_DERIVATION_CONTEXT: &str = "sofa/v1/identity-key";

/// Derivation context for the *payment* keypair — the one that authorizes
/// on-chain transactions. Deliberately distinct from the identity context
/// so the two keys share nothing but the seed.
pub const PAYMENT_DERIVATION_CONTEXT: &str = "sofa/v1/payment-key";

/// Ed25519 signature length in bytes. Always 64. If yours isn't, something
/// has gone terribly wrong.
pub const SIGNATURE_LENGTH: usize = 64;

// ---------------------------------------------------------------------------
// Addresses
// ---------------------------------------------------------------------------

/// Number of fingerprint bytes kept from the hashed public key when forming
/// an address. 20 bytes, hex-encoded with a `0x` prefix: the shape every
/// wallet UI and QR scanner in this ecosystem already understands.
pub const ADDRESS_BYTE_LENGTH: usize = 20;

/// Full length of a canonical address string: `0x` + 40 hex characters.
pub const ADDRESS_STRING_LENGTH: usize = 2 + ADDRESS_BYTE_LENGTH * 2;

// ---------------------------------------------------------------------------
// Init Handshake
// ---------------------------------------------------------------------------

/// Field name a remote party uses to request our wallet receive-address.
pub const INIT_FIELD_PAYMENT_ADDRESS: &str = "paymentAddress";

/// Field name a remote party uses to request our locale identifier.
pub const INIT_FIELD_LANGUAGE: &str = "language";

/// The complete set of init-request fields this client recognizes. Anything
/// not in this list is silently dropped from the response — we never echo
/// back field names we don't understand.
pub const KNOWN_INIT_FIELDS: &[&str] = &[INIT_FIELD_PAYMENT_ADDRESS, INIT_FIELD_LANGUAGE];

/// Locale reported when the host application hasn't told us otherwise.
pub const DEFAULT_LOCALE: &str = "en";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derivation_contexts_are_distinct() {
        // The whole point of two contexts is two unrelated keys.
        assert_ne!(IDENTITY_DERIVATION_CONTEXT, PAYMENT_DERIVATION_CONTEXT);
    }

    #[test]
    fn address_string_length_matches_byte_length() {
        assert_eq!(ADDRESS_STRING_LENGTH, 42);
    }

    #[test]
    fn known_init_fields_contains_both_names() {
        assert!(KNOWN_INIT_FIELDS.contains(&INIT_FIELD_PAYMENT_ADDRESS));
        assert!(KNOWN_INIT_FIELDS.contains(&INIT_FIELD_LANGUAGE));
    }
}
