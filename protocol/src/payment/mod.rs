//! # Payments
//!
//! Three layers, smallest first:
//!
//! - [`value`] — [`Wei`], the integer money type and its wire spellings.
//! - [`state`] — the per-message lifecycle ledger (none → pending →
//!   approved/rejected, failed recoverable).
//! - [`coordinator`] — the pipeline that actually moves value, built on the
//!   collaborator traits in [`crate::rpc`].
//!
//! The split keeps the invariants independently testable: the ledger knows
//! nothing about networks, the coordinator holds no state machine of its
//! own, and `Wei` arithmetic never sees a float.

pub mod coordinator;
pub mod state;
pub mod value;

pub use coordinator::{
    ApprovalError, FeeEstimate, PaymentCoordinator, PaymentError, PaymentReceipt, PaymentStage,
};
pub use state::{PaymentLedger, PaymentState, TransitionError};
pub use value::{Wei, WeiParseError};
