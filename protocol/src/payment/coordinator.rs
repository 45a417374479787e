//! # Payment Coordinator
//!
//! The one place in the client allowed to move money. A send walks a fixed
//! pipeline:
//!
//! ```text
//! validate inputs → fetch unsigned skeleton → sign locally → submit → announce
//! ```
//!
//! Two rules shape everything here:
//!
//! - **At-most-once submission.** `submit_signed_transaction` is attempted
//!   exactly once per user-initiated send. Any failure before it means zero
//!   submissions; any failure after it does not resubmit, and the error
//!   carries the transaction hash so the caller can still reconcile.
//! - **Keys stay home.** The chain backend builds the transaction but never
//!   sees a private key; signing happens in-process via the [`Keychain`].
//!
//! Every error names the stage it came from, so callers can tell "nothing
//! happened" apart from "money moved but the announcement broke".

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::envelope::{CodecError, Envelope, PaymentRequestFields};
use crate::identity::{Address, AddressError, KeyRole, Keychain, KeychainError};
use crate::payment::state::{PaymentLedger, PaymentState, TransitionError};
use crate::payment::value::{Wei, WeiParseError};
use crate::rpc::{ChainClient, Directory, RpcError};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Where in the pipeline a payment error occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentStage {
    /// Resolving a username to an address.
    Resolve,
    /// Validating the destination and amount.
    Validate,
    /// Fetching the unsigned transaction skeleton.
    Build,
    /// Signing the skeleton locally.
    Sign,
    /// Broadcasting the signed transaction.
    Submit,
    /// Work after a successful broadcast.
    AfterSubmit,
    /// Fetching a balance.
    Balance,
}

/// A payment pipeline failure, tagged with the stage that produced it.
///
/// Everything up to and including [`SubmissionFailed`](Self::SubmissionFailed)
/// means no value moved. [`AfterSubmission`](Self::AfterSubmission) is the
/// one exception: the transaction is on the network and the embedded
/// `tx_hash` is the caller's handle on it.
#[derive(Debug, Error)]
pub enum PaymentError {
    /// The destination is not a well-formed address.
    #[error("invalid destination address: {0}")]
    InvalidAddress(#[from] AddressError),

    /// The amount string did not parse as wei.
    #[error("invalid payment value: {0}")]
    InvalidValue(#[from] WeiParseError),

    /// The directory found nobody under that name.
    #[error("no address registered for '{0}'")]
    UnknownRecipient(String),

    /// The backend could not produce an unsigned transaction.
    #[error("could not build unsigned transaction: {0}")]
    UnsignedTxFetchFailed(#[source] RpcError),

    /// Local signing failed (malformed skeleton payload).
    #[error("could not sign transaction: {0}")]
    SigningFailed(#[from] KeychainError),

    /// The broadcast itself failed. Nothing was submitted.
    #[error("transaction submission failed: {0}")]
    SubmissionFailed(#[source] RpcError),

    /// The transaction is on the network but post-submit work failed.
    /// Never retry the submission; use `tx_hash` to reconcile.
    #[error("payment {tx_hash} submitted, but follow-up failed: {source}")]
    AfterSubmission {
        /// Hash of the already-broadcast transaction.
        tx_hash: String,
        /// What went wrong after the broadcast.
        #[source]
        source: CodecError,
    },

    /// A balance fetch failed.
    #[error("balance fetch failed: {0}")]
    BalanceFetchFailed(#[source] RpcError),
}

impl PaymentError {
    /// The pipeline stage this error belongs to.
    pub fn stage(&self) -> PaymentStage {
        match self {
            PaymentError::UnknownRecipient(_) => PaymentStage::Resolve,
            PaymentError::InvalidAddress(_) | PaymentError::InvalidValue(_) => {
                PaymentStage::Validate
            }
            PaymentError::UnsignedTxFetchFailed(_) => PaymentStage::Build,
            PaymentError::SigningFailed(_) => PaymentStage::Sign,
            PaymentError::SubmissionFailed(_) => PaymentStage::Submit,
            PaymentError::AfterSubmission { .. } => PaymentStage::AfterSubmit,
            PaymentError::BalanceFetchFailed(_) => PaymentStage::Balance,
        }
    }

    /// Whether the signed transaction reached the network despite the error.
    pub fn transaction_submitted(&self) -> bool {
        matches!(self, PaymentError::AfterSubmission { .. })
    }
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// Everything a completed send produces.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentReceipt {
    /// Hash of the broadcast transaction.
    pub tx_hash: String,
    /// The outgoing `Payment` announcement, typed.
    pub envelope: Envelope,
    /// The same announcement serialized, ready for the transport.
    pub body: String,
}

/// A fee estimate derived from an unsigned transaction skeleton.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeEstimate {
    /// Gas limit the backend expects the transaction to need.
    pub gas: Wei,
    /// Price per gas unit.
    pub gas_price: Wei,
    /// `gas * gas_price`, saturating at the top of the range.
    pub total: Wei,
}

// ---------------------------------------------------------------------------
// Coordinator
// ---------------------------------------------------------------------------

/// Orchestrates the payment pipeline over the chain and directory
/// collaborators. Cheap to share behind an `Arc`; holds no per-payment
/// state of its own.
pub struct PaymentCoordinator<C, D> {
    chain: C,
    directory: D,
    keychain: Arc<Keychain>,
}

impl<C: ChainClient, D: Directory> PaymentCoordinator<C, D> {
    /// Assemble a coordinator from its collaborators.
    pub fn new(chain: C, directory: D, keychain: Arc<Keychain>) -> Self {
        Self {
            chain,
            directory,
            keychain,
        }
    }

    /// This client's own payment address, the `from` of every send.
    pub fn payment_address(&self) -> &Address {
        self.keychain.address(KeyRole::Payment)
    }

    /// The chain collaborator, for callers that need direct access (balance
    /// caches, test instrumentation).
    pub fn chain(&self) -> &C {
        &self.chain
    }

    /// Send `value` to a raw destination address string.
    ///
    /// Validation happens before any network call: a bad address or amount
    /// returns immediately with nothing submitted.
    pub async fn send_payment(
        &self,
        destination: &str,
        value: Wei,
    ) -> Result<PaymentReceipt, PaymentError> {
        let to = Address::parse(destination)?;
        self.send_to_address(&to, value).await
    }

    /// Send `value` to a username, resolving it through the directory first.
    pub async fn send_payment_to_username(
        &self,
        username: &str,
        value: Wei,
    ) -> Result<PaymentReceipt, PaymentError> {
        let resolved = self
            .directory
            .resolve_address(username)
            .await
            .map_err(|e| {
                warn!(username, error = %e, "directory lookup failed");
                PaymentError::UnknownRecipient(username.to_string())
            })?
            .ok_or_else(|| PaymentError::UnknownRecipient(username.to_string()))?;
        debug!(username, address = %resolved, "resolved recipient");
        self.send_to_address(&resolved, value).await
    }

    /// The pipeline proper. `to` and `value` are already validated.
    async fn send_to_address(
        &self,
        to: &Address,
        value: Wei,
    ) -> Result<PaymentReceipt, PaymentError> {
        let from = self.payment_address().clone();
        debug!(%from, %to, %value, "building unsigned transaction");

        let skeleton = self
            .chain
            .create_unsigned_transaction(&from, to, value)
            .await
            .map_err(PaymentError::UnsignedTxFetchFailed)?;

        // Signing is local and deterministic; the backend never sees a key.
        let signature = self.keychain.sign_hex(KeyRole::Payment, &skeleton.tx)?;

        // The single irreversible step. Reached exactly once per send:
        // everything above returns early on failure, nothing below retries.
        let receipt = self
            .chain
            .submit_signed_transaction(&skeleton.tx, &signature)
            .await
            .map_err(PaymentError::SubmissionFailed)?;

        info!(tx_hash = %receipt.tx_hash, %to, %value, "payment submitted");

        let envelope = Envelope::Payment(crate::envelope::PaymentFields::unconfirmed(
            receipt.tx_hash.clone(),
            value.to_hex(),
            &from,
            to,
        ));
        let body = envelope.to_wire().map_err(|source| {
            // Money already moved; surface the hash alongside the failure.
            PaymentError::AfterSubmission {
                tx_hash: receipt.tx_hash.clone(),
                source,
            }
        })?;

        Ok(PaymentReceipt {
            tx_hash: receipt.tx_hash,
            envelope,
            body,
        })
    }

    /// Approve an incoming payment request, driving the lifecycle ledger in
    /// lockstep with the pipeline: pending before the send, approved or
    /// failed after it.
    ///
    /// The ledger transition also serves as the double-tap guard — a second
    /// approval while one is in flight is refused before any network call.
    pub async fn approve_request(
        &self,
        ledger: &PaymentLedger,
        message_id: &str,
        request: &PaymentRequestFields,
    ) -> Result<PaymentReceipt, ApprovalError> {
        let destination = request
            .destination_address
            .as_deref()
            .ok_or(ApprovalError::NoDestination)?;
        let value = Wei::parse(&request.value)
            .map_err(PaymentError::from)
            .map_err(ApprovalError::Payment)?;

        ledger.begin_approval(message_id)?;
        let result = self.send_payment(destination, value).await;
        // An in-pipeline error can't race this record_outcome call: the id is
        // PendingConfirmation and only we hold it there.
        let outcome = ledger
            .record_outcome(message_id, result.is_ok())
            .unwrap_or(PaymentState::Failed);
        debug!(message_id, ?outcome, "request approval settled");
        result.map_err(ApprovalError::Payment)
    }

    /// Estimate the network fee for a prospective send without submitting
    /// anything. The backend builds the same skeleton a real send would;
    /// we read its fee fields and discard it.
    pub async fn estimate_fees(&self, to: &Address, value: Wei) -> Result<FeeEstimate, PaymentError> {
        let from = self.payment_address();
        let skeleton = self
            .chain
            .create_unsigned_transaction(from, to, value)
            .await
            .map_err(PaymentError::UnsignedTxFetchFailed)?;

        let gas = skeleton
            .gas
            .as_deref()
            .ok_or(PaymentError::UnsignedTxFetchFailed(RpcError::MissingField(
                "gas",
            )))
            .and_then(|s| Wei::parse(s).map_err(PaymentError::InvalidValue))?;
        let gas_price = skeleton
            .gas_price
            .as_deref()
            .ok_or(PaymentError::UnsignedTxFetchFailed(RpcError::MissingField(
                "gasPrice",
            )))
            .and_then(|s| Wei::parse(s).map_err(PaymentError::InvalidValue))?;

        Ok(FeeEstimate {
            gas,
            gas_price,
            total: gas.checked_mul(gas_price).unwrap_or(Wei::new(u128::MAX)),
        })
    }

    /// Fetch this client's balance, cached-then-fresh.
    ///
    /// If a cached value exists, `on_cached` fires with it immediately so
    /// the UI has something to show; the returned value is always the
    /// authoritative network answer.
    pub async fn fetch_balance(
        &self,
        on_cached: impl FnOnce(Wei),
    ) -> Result<Wei, PaymentError> {
        let address = self.payment_address();
        if let Some(cached) = self.chain.cached_balance(address) {
            on_cached(cached);
        }
        self.chain
            .fresh_balance(address)
            .await
            .map_err(PaymentError::BalanceFetchFailed)
    }
}

/// Failure of a request approval: either the request itself is unusable,
/// the ledger refused the transition, or the pipeline failed.
#[derive(Debug, Error)]
pub enum ApprovalError {
    /// The request carries no destination address to pay.
    #[error("payment request has no destination address")]
    NoDestination,

    /// The lifecycle ledger refused the transition (already decided, or an
    /// approval is already in flight).
    #[error(transparent)]
    Transition(#[from] TransitionError),

    /// The payment pipeline failed; see [`PaymentError::stage`].
    #[error(transparent)]
    Payment(PaymentError),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
