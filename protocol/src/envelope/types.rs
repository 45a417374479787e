//! Per-variant field payloads for the envelope codec.
//!
//! Each struct here maps one-to-one onto the JSON object that follows an
//! envelope tag on the wire. Wire keys are camelCase; missing fields fall
//! back to defaults instead of failing the parse — that leniency is part of
//! the wire contract, and it lives here and in [`super::codec`], nowhere
//! else. Downstream code treats a defaulted field as absent, not as an
//! error.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::config::KNOWN_INIT_FIELDS;
use crate::identity::Address;

// ---------------------------------------------------------------------------
// Controls (buttons offered inside a Message)
// ---------------------------------------------------------------------------

/// An interactive control offered by a remote party inside a `Message`.
///
/// Buttons carry a machine-readable `value` that comes back to the sender
/// verbatim inside a `Command` envelope when the user taps them; `action`
/// values are handled locally and never leave the client. Groups nest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Control {
    /// A single tappable button.
    Button {
        /// Human-visible caption.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        label: Option<String>,
        /// Sent back verbatim in the resulting `Command`. Opaque to us.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<Value>,
        /// Handled locally (e.g. open a webview). Never sent anywhere.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        action: Option<Value>,
    },
    /// A submenu of controls.
    Group {
        /// Human-visible caption for the submenu.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        label: Option<String>,
        /// Nested controls.
        #[serde(default)]
        controls: Vec<Control>,
    },
}

// ---------------------------------------------------------------------------
// Variant payloads
// ---------------------------------------------------------------------------

/// Payload of a `SOFA::Message:` envelope — ordinary chat text, optionally
/// with controls for the recipient to act on.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageFields {
    /// The visible message text. Empty when the message is controls-only.
    #[serde(default)]
    pub body: String,

    /// Buttons/groups offered alongside the text.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub controls: Vec<Control>,

    /// Whether the sender wants the text keyboard open on arrival.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_keyboard: Option<bool>,
}

/// Payload of a `SOFA::Command:` envelope — the machine-actionable reply to
/// a previously-offered button. Carries the same `(body, value)` shape as
/// the button that generated it so the remote party can disambiguate.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandFields {
    /// The button's label, echoed for human-readable logs on the far side.
    #[serde(default)]
    pub body: String,

    /// The button's opaque value, echoed verbatim.
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub value: Value,
}

/// Payload of a `SOFA::InitRequest:` envelope — the opening half of the
/// capability handshake. Lists the field names the remote party wants.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitRequestFields {
    /// Requested field names, e.g. `["paymentAddress", "language"]`.
    #[serde(default)]
    pub values: Vec<String>,
}

/// Payload of a `SOFA::Init:` envelope — the answering half of the
/// handshake. A flat map from requested field name to its live value.
///
/// `BTreeMap` keeps serialization deterministic, which makes the
/// serialize-then-parse round trip byte-stable.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InitResponseFields {
    /// Resolved field values, keyed by the names from the request.
    pub fields: BTreeMap<String, String>,
}

/// Payload of a `SOFA::PaymentRequest:` envelope.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequestFields {
    /// Free-text justification for the request. Defaults to empty; the
    /// *display layer* substitutes its fallback string, not the codec.
    #[serde(default)]
    pub body: String,

    /// Requested amount as a hex-encoded wei string (`"0x..."`). Carried
    /// as an opaque string — numeric interpretation happens downstream.
    #[serde(default)]
    pub value: String,

    /// Where the requester wants the funds sent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination_address: Option<String>,
}

/// On-chain status carried inside a `Payment` envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    /// Broadcast but not yet mined. The status every outgoing payment
    /// envelope starts with.
    #[default]
    Unconfirmed,
    /// Mined and confirmed by the network.
    Confirmed,
    /// Rejected or dropped by the network.
    Error,
}

/// Payload of a `SOFA::Payment:` envelope — notification that a transaction
/// was submitted (or confirmed) on-chain.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentFields {
    /// Lifecycle status of the transaction.
    #[serde(default, deserialize_with = "lenient_status")]
    pub status: PaymentStatus,

    /// Transaction hash returned by the chain on submission.
    #[serde(default)]
    pub tx_hash: String,

    /// Amount as a hex-encoded wei string. Opaque to the codec.
    #[serde(default)]
    pub value: String,

    /// Sender's wallet address, when the notifier knows it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_address: Option<String>,

    /// Recipient's wallet address, when the notifier knows it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_address: Option<String>,
}

/// An unknown status string degrades to `Unconfirmed` rather than failing
/// the whole parse. Peers running newer protocol revisions may send states
/// we don't know yet; treating them as "not confirmed" is the safe reading.
fn lenient_status<'de, D: Deserializer<'de>>(deserializer: D) -> Result<PaymentStatus, D::Error> {
    let raw = String::deserialize(deserializer)?;
    Ok(match raw.as_str() {
        "confirmed" => PaymentStatus::Confirmed,
        "error" => PaymentStatus::Error,
        _ => PaymentStatus::Unconfirmed,
    })
}

// ---------------------------------------------------------------------------
// Handshake & construction helpers
// ---------------------------------------------------------------------------

impl InitRequestFields {
    /// Answer the handshake with the subset of requested fields we
    /// recognize, resolved against *live* state passed in by the caller.
    ///
    /// Never cache these values: the remote party is explicitly asking for
    /// the current wallet address and current locale, and a stale payment
    /// address misroutes money. Unrecognized field names are dropped, not
    /// echoed.
    pub fn respond(&self, payment_address: &Address, locale: &str) -> InitResponseFields {
        use crate::config::{INIT_FIELD_LANGUAGE, INIT_FIELD_PAYMENT_ADDRESS};

        let mut fields = BTreeMap::new();
        for name in &self.values {
            if !KNOWN_INIT_FIELDS.contains(&name.as_str()) {
                continue;
            }
            let value = if name == INIT_FIELD_PAYMENT_ADDRESS {
                payment_address.to_string()
            } else if name == INIT_FIELD_LANGUAGE {
                locale.to_string()
            } else {
                continue;
            };
            fields.insert(name.clone(), value);
        }
        InitResponseFields { fields }
    }
}

impl CommandFields {
    /// Build the command that answers a tapped button.
    ///
    /// Returns `None` for buttons without a `value` (pure-`action` buttons
    /// are handled locally and produce no outgoing traffic) and for groups,
    /// which aren't directly tappable.
    pub fn from_control(control: &Control) -> Option<Self> {
        match control {
            Control::Button {
                label,
                value: Some(value),
                ..
            } => Some(Self {
                body: label.clone().unwrap_or_default(),
                value: value.clone(),
            }),
            _ => None,
        }
    }
}

impl PaymentFields {
    /// The envelope payload for a just-submitted payment: status starts at
    /// `Unconfirmed`; confirmation arrives later as a separate message.
    pub fn unconfirmed(tx_hash: impl Into<String>, value_hex: impl Into<String>, from: &Address, to: &Address) -> Self {
        Self {
            status: PaymentStatus::Unconfirmed,
            tx_hash: tx_hash.into(),
            value: value_hex.into(),
            from_address: Some(from.to_string()),
            to_address: Some(to.to_string()),
        }
    }

    /// Best-effort check that this payment is a confirmation addressed to
    /// us: status `Confirmed` and `toAddress` equal to our wallet address.
    ///
    /// Linking a confirmation back to the outstanding request is done by
    /// address + thread context, not by a stable request id, so with
    /// multiple concurrent requests to the same address this is ambiguous.
    /// Callers treat a `true` here as a display hint, never as a strict
    /// state transition.
    pub fn confirms_receipt_for(&self, own_payment_address: &Address) -> bool {
        if self.status != PaymentStatus::Confirmed {
            return false;
        }
        match &self.to_address {
            Some(to) => Address::parse(to)
                .map(|to| &to == own_payment_address)
                .unwrap_or(false),
            None => false,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
