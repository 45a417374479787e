//! # External Collaborator Interfaces
//!
//! The client core talks to four outside parties, and this module is the
//! complete list of what it asks of them. Everything here is a trait plus
//! the wire shapes its methods exchange — the implementations (HTTP
//! clients, the chat stack, the OS keychain) live in the host application.
//!
//! | Collaborator  | Job                                                  |
//! |---------------|------------------------------------------------------|
//! | `ChainClient` | Build unsigned transactions, broadcast signed ones, report balances |
//! | `Directory`   | Resolve human usernames to wallet addresses          |
//! | `Transport`   | Deliver opaque message bodies into chat threads      |
//! | `SecretStore` | Persist and hand back the mnemonic seed              |
//!
//! All network-facing methods are async and carry no ordering guarantee
//! between independent calls; sequencing inside one payment is enforced by
//! the coordinator, not here.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::identity::Address;
use crate::payment::value::Wei;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failure reported by an external collaborator.
#[derive(Debug, Error)]
pub enum RpcError {
    /// The call never completed: connection refused, timeout, DNS, etc.
    #[error("transport failure: {0}")]
    Transport(String),

    /// The collaborator answered with an error status.
    #[error("backend returned status {status}: {message}")]
    Status {
        /// HTTP-style status code.
        status: u16,
        /// Backend-provided error text, possibly empty.
        message: String,
    },

    /// The response arrived but lacked a field we need.
    #[error("response missing required field '{0}'")]
    MissingField(&'static str),
}

/// Failure delivering a message body into a chat thread.
#[derive(Debug, Error)]
pub enum SendError {
    /// The transport could not deliver the message.
    #[error("message delivery failed: {0}")]
    DeliveryFailed(String),

    /// The thread handle no longer refers to a live conversation.
    #[error("unknown thread: {0}")]
    UnknownThread(String),
}

// ---------------------------------------------------------------------------
// Wire shapes
// ---------------------------------------------------------------------------

/// An unsigned transaction skeleton returned by the chain backend.
///
/// The `tx` payload is an opaque hex string — this client signs it, it does
/// not interpret it. `gas` and `gas_price` are hex wei strings used only
/// for fee display before approval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionSkeleton {
    /// Hex-encoded unsigned transaction payload.
    pub tx: String,

    /// Gas limit as a hex wei string, when the backend provides it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas: Option<String>,

    /// Gas price as a hex wei string, when the backend provides it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_price: Option<String>,
}

/// The chain backend's acknowledgment of a broadcast transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitReceipt {
    /// Hash of the now-in-flight transaction.
    pub tx_hash: String,
}

/// An opaque handle naming one chat conversation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ThreadHandle(pub String);

/// One raw message delivered by the transport. The body is opaque here;
/// giving it structure is the envelope codec's job.
#[derive(Debug, Clone, PartialEq)]
pub struct IncomingMessage {
    /// The raw message body, possibly (but not necessarily) an envelope.
    pub body: String,
    /// Transport-level identifier of the sender.
    pub sender_id: String,
    /// When the transport received the message.
    pub timestamp: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Collaborator traits
// ---------------------------------------------------------------------------

/// The blockchain RPC collaborator.
///
/// `submit_signed_transaction` is the only call in this crate with an
/// externally-irreversible effect; the coordinator guarantees it is
/// attempted at most once per user-initiated send. Implementations must
/// not retry it internally either.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Ask the backend to build an unsigned transaction moving `value`
    /// from `from` to `to`.
    async fn create_unsigned_transaction(
        &self,
        from: &Address,
        to: &Address,
        value: Wei,
    ) -> Result<TransactionSkeleton, RpcError>;

    /// Broadcast a signed transaction: the original skeleton payload plus
    /// the `0x`-hex signature over it.
    async fn submit_signed_transaction(
        &self,
        original_tx: &str,
        signature: &str,
    ) -> Result<SubmitReceipt, RpcError>;

    /// Authoritative balance for `address`, fetched from the network.
    async fn fresh_balance(&self, address: &Address) -> Result<Wei, RpcError>;

    /// Immediately-available, possibly-stale balance from the local cache.
    /// `None` when nothing has been cached yet.
    fn cached_balance(&self, address: &Address) -> Option<Wei>;
}

/// The username directory collaborator.
#[async_trait]
pub trait Directory: Send + Sync {
    /// Resolve a human identifier to a wallet address. `Ok(None)` means the
    /// lookup succeeded and found nobody — distinct from a lookup failure.
    async fn resolve_address(&self, username: &str) -> Result<Option<Address>, RpcError>;
}

/// The message-transport collaborator. Delivery/retry semantics are its
/// problem; we hand it fully-serialized envelope bodies and it hands us
/// raw ones back.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send an opaque message body into a thread.
    async fn send(&self, body: &str, thread: &ThreadHandle) -> Result<(), SendError>;

    /// Subscribe to the messages arriving in a thread, in delivery order.
    fn incoming(&self, thread: &ThreadHandle) -> BoxStream<'static, IncomingMessage>;
}

/// The secret-seed provider. Storage mechanism is out of scope here —
/// could be an OS keychain, an encrypted file, a hardware token.
pub trait SecretStore: Send + Sync {
    /// Return the stored mnemonic phrase, creating and persisting a fresh
    /// one if none exists yet.
    fn load_or_create_seed(&self) -> String;
}
