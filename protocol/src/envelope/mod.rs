//! # SOFA Envelopes — the Typed Sub-Protocol
//!
//! Chat transports move opaque strings. This module gives those strings
//! structure: a small tagged-union wire protocol where each message body is
//! a fixed string tag followed by a JSON object,
//!
//! ```text
//! SOFA::Message:{"body":"hi"}
//! SOFA::PaymentRequest:{"body":"Lunch","value":"0xde0b6b3a7640000",...}
//! ```
//!
//! The design is a closed enum with an explicit parse/serialize pair —
//! no subclass hierarchies, no runtime type sniffing beyond the one tag
//! comparison at the parse boundary. See [`codec::Envelope`] for the
//! variant set and [`types`] for each variant's payload.
//!
//! Two properties the rest of the client leans on:
//!
//! - **Total parsing.** `from_wire` never fails; unrecognized input is
//!   `Envelope::None` and malformed JSON degrades to defaulted fields.
//! - **Exact round trips.** For every non-`None` envelope `e`,
//!   `from_wire(&to_wire(&e)?) == e`.

pub mod codec;
pub mod types;

pub use codec::{CodecError, Envelope, SofaType};
pub use types::{
    CommandFields, Control, InitRequestFields, InitResponseFields, MessageFields, PaymentFields,
    PaymentRequestFields, PaymentStatus,
};
