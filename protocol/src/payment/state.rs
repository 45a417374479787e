//! # Payment Lifecycle State Machine
//!
//! Every message carrying a `PaymentRequest` or `Payment` envelope has a
//! lifecycle state, tracked per message id:
//!
//! ```text
//!            approve                submit ok
//!   None ───────────────▶ PendingConfirmation ─────▶ Approved   (terminal)
//!    │ ▲                        │
//!    │ └────────── retry        │ submit failed
//!    │ reject        │          ▼
//!    └─────▶ Rejected└─────── Failed   (recoverable)
//! ```
//!
//! `Approved` and `Rejected` are decisions; once either is reached the
//! other is unreachable forever. `Failed` is not a decision — the user may
//! retry, which routes back through `PendingConfirmation`.
//!
//! This state is orthogonal to message-delivery status (sent/delivered),
//! which belongs to the transport collaborator. Persistence of the map is
//! the message store's job; this is the in-process authority on what
//! transitions are legal.
//!
//! Concurrency: transitions go through [`DashMap::entry`], which holds the
//! shard lock for the duration of the read-modify-write. Two concurrent
//! calls for the same message id serialize; calls for different ids don't
//! contend (beyond shard granularity).

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use thiserror::Error;
use tracing::info;

/// The lifecycle state of a payment or payment-request message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PaymentState {
    /// Freshly parsed, no decision recorded. The implicit state of any
    /// message the ledger has never heard of.
    #[default]
    None,
    /// The user approved and a submission is in flight.
    PendingConfirmation,
    /// Submission succeeded. Terminal.
    Approved,
    /// The user declined. Terminal, no network effect.
    Rejected,
    /// Submission failed. The user may retry.
    Failed,
}

/// A transition that the state machine's rules forbid.
#[derive(Debug, Error)]
#[error("message {message_id}: cannot {event} from {from:?}")]
pub struct TransitionError {
    /// The message whose transition was refused.
    pub message_id: String,
    /// The state the message was in.
    pub from: PaymentState,
    /// Human-readable name of the attempted event.
    pub event: &'static str,
}

#[derive(Debug, Clone)]
struct Entry {
    state: PaymentState,
    updated_at: DateTime<Utc>,
}

/// The per-message payment state map.
///
/// All mutation goes through the three transition methods — there is no
/// `set_state`. That keeps the invariants ("approved and rejected never
/// flip into each other") checkable in one place.
#[derive(Debug, Default)]
pub struct PaymentLedger {
    entries: DashMap<String, Entry>,
}

impl PaymentLedger {
    /// An empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state for a message. Unknown ids read as `None`.
    pub fn state(&self, message_id: &str) -> PaymentState {
        self.entries
            .get(message_id)
            .map(|e| e.state)
            .unwrap_or_default()
    }

    /// When the message's state last changed, if it ever has.
    pub fn updated_at(&self, message_id: &str) -> Option<DateTime<Utc>> {
        self.entries.get(message_id).map(|e| e.updated_at)
    }

    /// The user approved: `None | Failed → PendingConfirmation`.
    ///
    /// Call this *before* dispatching the coordinator, and feed the
    /// coordinator's result to [`record_outcome`](Self::record_outcome).
    pub fn begin_approval(&self, message_id: &str) -> Result<(), TransitionError> {
        self.transition(message_id, "approve", |state| {
            matches!(state, PaymentState::None | PaymentState::Failed)
                .then_some(PaymentState::PendingConfirmation)
        })
    }

    /// Submission finished: `PendingConfirmation → Approved | Failed`.
    pub fn record_outcome(
        &self,
        message_id: &str,
        success: bool,
    ) -> Result<PaymentState, TransitionError> {
        let next = if success {
            PaymentState::Approved
        } else {
            PaymentState::Failed
        };
        self.transition(message_id, "record outcome", |state| {
            matches!(state, PaymentState::PendingConfirmation).then_some(next)
        })?;
        Ok(next)
    }

    /// The user declined: `None → Rejected`. No network effect.
    pub fn reject(&self, message_id: &str) -> Result<(), TransitionError> {
        self.transition(message_id, "reject", |state| {
            matches!(state, PaymentState::None).then_some(PaymentState::Rejected)
        })
    }

    /// Shared transition plumbing: look up (or implicitly create at `None`)
    /// the entry, ask the rule for the next state, refuse if it declines.
    /// The entry lock is held across the whole read-modify-write.
    fn transition(
        &self,
        message_id: &str,
        event: &'static str,
        rule: impl FnOnce(PaymentState) -> Option<PaymentState>,
    ) -> Result<(), TransitionError> {
        let mut entry = self
            .entries
            .entry(message_id.to_string())
            .or_insert_with(|| Entry {
                state: PaymentState::None,
                updated_at: Utc::now(),
            });

        let from = entry.state;
        let next = rule(from).ok_or(TransitionError {
            message_id: message_id.to_string(),
            from,
            event,
        })?;

        entry.state = next;
        entry.updated_at = Utc::now();
        info!(message_id, ?from, to = ?next, "payment state transition");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_message_reads_as_none() {
        let ledger = PaymentLedger::new();
        assert_eq!(ledger.state("m1"), PaymentState::None);
        assert!(ledger.updated_at("m1").is_none());
    }

    #[test]
    fn happy_path_approval() {
        let ledger = PaymentLedger::new();
        ledger.begin_approval("m1").unwrap();
        assert_eq!(ledger.state("m1"), PaymentState::PendingConfirmation);
        let state = ledger.record_outcome("m1", true).unwrap();
        assert_eq!(state, PaymentState::Approved);
        assert_eq!(ledger.state("m1"), PaymentState::Approved);
    }

    #[test]
    fn failed_submission_is_retryable() {
        let ledger = PaymentLedger::new();
        ledger.begin_approval("m1").unwrap();
        ledger.record_outcome("m1", false).unwrap();
        assert_eq!(ledger.state("m1"), PaymentState::Failed);

        // Retry: Failed → PendingConfirmation → Approved.
        ledger.begin_approval("m1").unwrap();
        ledger.record_outcome("m1", true).unwrap();
        assert_eq!(ledger.state("m1"), PaymentState::Approved);
    }

    #[test]
    fn reject_only_from_none() {
        let ledger = PaymentLedger::new();
        ledger.reject("m1").unwrap();
        assert_eq!(ledger.state("m1"), PaymentState::Rejected);

        // A second reject has nothing to decide.
        assert!(ledger.reject("m1").is_err());
    }

    #[test]
    fn approved_and_rejected_are_mutually_exclusive() {
        let ledger = PaymentLedger::new();

        // Approved message cannot be rejected.
        ledger.begin_approval("a").unwrap();
        ledger.record_outcome("a", true).unwrap();
        assert!(ledger.reject("a").is_err());
        assert!(ledger.begin_approval("a").is_err());
        assert_eq!(ledger.state("a"), PaymentState::Approved);

        // Rejected message cannot be approved.
        ledger.reject("r").unwrap();
        assert!(ledger.begin_approval("r").is_err());
        assert_eq!(ledger.state("r"), PaymentState::Rejected);
    }

    #[test]
    fn outcome_requires_pending() {
        let ledger = PaymentLedger::new();
        assert!(ledger.record_outcome("m1", true).is_err());

        ledger.reject("m2").unwrap();
        assert!(ledger.record_outcome("m2", true).is_err());
    }

    #[test]
    fn double_approval_is_refused_while_pending() {
        // Guards against double-submission from a double-tap: the second
        // approve sees PendingConfirmation and is refused.
        let ledger = PaymentLedger::new();
        ledger.begin_approval("m1").unwrap();
        let err = ledger.begin_approval("m1").unwrap_err();
        assert_eq!(err.from, PaymentState::PendingConfirmation);
    }

    #[test]
    fn transitions_record_timestamps() {
        let ledger = PaymentLedger::new();
        ledger.begin_approval("m1").unwrap();
        let first = ledger.updated_at("m1").unwrap();
        ledger.record_outcome("m1", true).unwrap();
        let second = ledger.updated_at("m1").unwrap();
        assert!(second >= first);
    }

    #[test]
    fn ids_are_independent() {
        let ledger = PaymentLedger::new();
        ledger.begin_approval("m1").unwrap();
        ledger.reject("m2").unwrap();
        assert_eq!(ledger.state("m1"), PaymentState::PendingConfirmation);
        assert_eq!(ledger.state("m2"), PaymentState::Rejected);
        assert_eq!(ledger.state("m3"), PaymentState::None);
    }

    #[test]
    fn concurrent_decisions_serialize_per_id() {
        use std::sync::Arc;
        use std::thread;

        // Many threads race approve/reject on one id; exactly one decision
        // may win and the rest must be refused.
        let ledger = Arc::new(PaymentLedger::new());
        let mut handles = Vec::new();
        for i in 0..16 {
            let ledger = Arc::clone(&ledger);
            handles.push(thread::spawn(move || {
                if i % 2 == 0 {
                    ledger.begin_approval("contested").is_ok()
                } else {
                    ledger.reject("contested").is_ok()
                }
            }));
        }
        let wins = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(wins, 1);
        assert!(matches!(
            ledger.state("contested"),
            PaymentState::PendingConfirmation | PaymentState::Rejected
        ));
    }
}
