//! The envelope codec: tag classification, parse, and serialize.
//!
//! A serialized envelope is a fixed string tag immediately followed by a
//! JSON object: `SOFA::Message:{"body":"hi"}`. Parsing is **total** — any
//! input, including empty strings and random bytes, maps to some
//! [`Envelope`], with `Envelope::None` as the catch-all. Nothing past this
//! boundary ever sees a parse error; a body that fails to parse is content
//! to render as plain/unknown, not a crash.
//!
//! Serialization is the exact inverse for every non-`None` variant:
//! `Envelope::from_wire(e.to_wire()?) == e`.

use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::debug;

use super::types::{
    CommandFields, Control, InitRequestFields, InitResponseFields, MessageFields, PaymentFields,
    PaymentRequestFields,
};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors surfaced by the serialize side of the codec.
///
/// The parse side deliberately has no error type: malformed input degrades
/// (unknown tag → `None`, bad JSON → default-valued fields) and the
/// degradation is logged, not thrown.
#[derive(Debug, Error)]
pub enum CodecError {
    /// `Envelope::None` has no wire form. Attempting to serialize it is a
    /// bug at the call site, not a runtime condition.
    #[error("Envelope::None has no serialized form")]
    EmptyEnvelope,

    /// The variant's fields failed to encode as JSON. Should be unreachable
    /// for the types in this crate, but crypto-adjacent code doesn't get to
    /// assume things are fine.
    #[error("envelope field encoding failed: {0}")]
    Json(#[from] serde_json::Error),
}

// ---------------------------------------------------------------------------
// SofaType — the tag set
// ---------------------------------------------------------------------------

/// The closed set of envelope tags.
///
/// Tags are mutually prefix-free (note `SOFA::Init:` vs `SOFA::InitRequest:`
/// — the colon after `Init` keeps them disjoint), so classification order
/// cannot change the result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SofaType {
    /// Not a SOFA envelope (empty or unrecognized input).
    None,
    /// Ordinary chat text, possibly with controls.
    Message,
    /// Machine-actionable reply to an offered button.
    Command,
    /// Capability-handshake request.
    InitRequest,
    /// Capability-handshake response.
    InitResponse,
    /// A request for payment.
    PaymentRequest,
    /// Notification of a submitted/confirmed payment.
    Payment,
}

impl SofaType {
    /// All taggable types, in classification order.
    const TAGGED: [SofaType; 6] = [
        SofaType::Message,
        SofaType::Command,
        SofaType::InitRequest,
        SofaType::InitResponse,
        SofaType::PaymentRequest,
        SofaType::Payment,
    ];

    /// The literal wire tag for this type. `None` has no tag.
    pub const fn tag(&self) -> &'static str {
        match self {
            SofaType::None => "",
            SofaType::Message => "SOFA::Message:",
            SofaType::Command => "SOFA::Command:",
            SofaType::InitRequest => "SOFA::InitRequest:",
            SofaType::InitResponse => "SOFA::Init:",
            SofaType::PaymentRequest => "SOFA::PaymentRequest:",
            SofaType::Payment => "SOFA::Payment:",
        }
    }

    /// Classify a raw message body by its tag prefix.
    ///
    /// Total: anything that doesn't start with a known tag — including the
    /// empty string — is [`SofaType::None`].
    pub fn classify(raw: &str) -> SofaType {
        for ty in Self::TAGGED {
            if raw.starts_with(ty.tag()) {
                return ty;
            }
        }
        SofaType::None
    }
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// A typed SOFA envelope: one of the fixed set of structured message kinds
/// multiplexed over the plain-text chat transport.
///
/// Envelopes are immutable value types created per message. Pattern-match
/// exhaustively — there is intentionally no "other" escape hatch beyond
/// `None`.
///
/// # Examples
///
/// ```
/// use sofa_protocol::envelope::{Envelope, SofaType};
///
/// let envelope = Envelope::from_wire(r#"SOFA::Message:{"body":"hi"}"#);
/// assert!(matches!(&envelope, Envelope::Message(m) if m.body == "hi"));
/// assert_eq!(envelope.to_wire().unwrap(), r#"SOFA::Message:{"body":"hi"}"#);
///
/// assert_eq!(Envelope::from_wire("garbage"), Envelope::None);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Envelope {
    /// Unrecognized or empty input. Has no wire form.
    None,
    /// `SOFA::Message:` — chat text and optional controls.
    Message(MessageFields),
    /// `SOFA::Command:` — button reply.
    Command(CommandFields),
    /// `SOFA::InitRequest:` — handshake request.
    InitRequest(InitRequestFields),
    /// `SOFA::Init:` — handshake response.
    InitResponse(InitResponseFields),
    /// `SOFA::PaymentRequest:` — request for funds.
    PaymentRequest(PaymentRequestFields),
    /// `SOFA::Payment:` — payment notification.
    Payment(PaymentFields),
}

impl Envelope {
    /// Parse a raw message body into a typed envelope. Never fails.
    ///
    /// Unknown tag or empty input yields [`Envelope::None`]. A recognized
    /// tag followed by malformed JSON yields that variant with all fields
    /// defaulted — lenient by wire contract, and the single place where
    /// that leniency is applied.
    pub fn from_wire(raw: &str) -> Envelope {
        let ty = SofaType::classify(raw);
        let body = &raw[ty.tag().len()..];
        match ty {
            SofaType::None => Envelope::None,
            SofaType::Message => Envelope::Message(lenient_fields(ty, body)),
            SofaType::Command => Envelope::Command(lenient_fields(ty, body)),
            SofaType::InitRequest => Envelope::InitRequest(lenient_fields(ty, body)),
            SofaType::InitResponse => Envelope::InitResponse(lenient_fields(ty, body)),
            SofaType::PaymentRequest => Envelope::PaymentRequest(lenient_fields(ty, body)),
            SofaType::Payment => Envelope::Payment(lenient_fields(ty, body)),
        }
    }

    /// Serialize to the wire form: tag + JSON object.
    ///
    /// `Envelope::None` is rejected with [`CodecError::EmptyEnvelope`]; a
    /// caller holding `None` has nothing to send and should not be here.
    pub fn to_wire(&self) -> Result<String, CodecError> {
        let json = match self {
            Envelope::None => return Err(CodecError::EmptyEnvelope),
            Envelope::Message(fields) => serde_json::to_string(fields)?,
            Envelope::Command(fields) => serde_json::to_string(fields)?,
            Envelope::InitRequest(fields) => serde_json::to_string(fields)?,
            Envelope::InitResponse(fields) => serde_json::to_string(fields)?,
            Envelope::PaymentRequest(fields) => serde_json::to_string(fields)?,
            Envelope::Payment(fields) => serde_json::to_string(fields)?,
        };
        Ok(format!("{}{}", self.sofa_type().tag(), json))
    }

    /// The tag classification of this envelope.
    pub fn sofa_type(&self) -> SofaType {
        match self {
            Envelope::None => SofaType::None,
            Envelope::Message(_) => SofaType::Message,
            Envelope::Command(_) => SofaType::Command,
            Envelope::InitRequest(_) => SofaType::InitRequest,
            Envelope::InitResponse(_) => SofaType::InitResponse,
            Envelope::PaymentRequest(_) => SofaType::PaymentRequest,
            Envelope::Payment(_) => SofaType::Payment,
        }
    }

    /// Convenience constructor for a plain text message.
    pub fn message(body: impl Into<String>) -> Envelope {
        Envelope::Message(MessageFields {
            body: body.into(),
            ..Default::default()
        })
    }

    /// Build the `Command` envelope answering a tapped button, if the
    /// button produces outgoing traffic at all.
    pub fn command_from_control(control: &Control) -> Option<Envelope> {
        CommandFields::from_control(control).map(Envelope::Command)
    }
}

/// Parse a variant's JSON body, defaulting every field on failure.
///
/// Missing fields inside *valid* JSON are already defaulted by serde; this
/// handles the other failure mode, where the JSON itself is malformed or a
/// field has the wrong shape. Degradations are logged so leniency stays
/// observable.
fn lenient_fields<T: Default + DeserializeOwned>(ty: SofaType, body: &str) -> T {
    serde_json::from_str(body).unwrap_or_else(|error| {
        debug!(tag = ty.tag(), %error, "malformed envelope body, defaulting fields");
        T::default()
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
