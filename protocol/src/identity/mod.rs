//! # Identity Layer
//!
//! Turns one secret mnemonic into the two keypairs the client lives by:
//!
//! - the **identity** key, which authenticates the client to its messaging
//!   peers and signs RPC request headers, and
//! - the **payment** key, which authorizes on-chain transactions and whose
//!   address is the wallet receive-address peers send money to.
//!
//! The [`Keychain`] is an explicit context object. Construct it once at
//! startup from the secret store's mnemonic and pass it to whatever needs
//! signing — there is deliberately no process-wide singleton here.

pub mod address;
pub mod keychain;

pub use address::{Address, AddressError};
pub use keychain::{KeyRole, Keychain, KeychainError};
