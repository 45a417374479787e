// Copyright (c) 2026 SOFA Contributors. MIT License.
// See LICENSE for details.

//! # SOFA Protocol — Client Core
//!
//! The core of a payments-aware chat client: a typed sub-protocol carried
//! inside ordinary chat messages, deterministic key material behind it, and
//! a payment pipeline that treats "submit a transaction" with the respect
//! an irreversible operation deserves.
//!
//! The wire idea is almost embarrassingly simple — each structured message
//! body is a fixed tag plus a JSON object:
//!
//! ```text
//! SOFA::PaymentRequest:{"body":"Lunch?","value":"0xde0b6b3a7640000",...}
//! ```
//!
//! Everything else in the crate exists to make that simple idea safe to
//! build a money-moving client on.
//!
//! ## Architecture
//!
//! The modules mirror the actual concerns of the client core:
//!
//! - **envelope** — The tagged-union codec. Total parsing, exact round trips.
//! - **crypto** — Signing, verification, and hashing primitives.
//! - **identity** — The dual keychain (identity + payment) and addresses,
//!   both derived deterministically from one mnemonic seed.
//! - **payment** — Wei arithmetic, the per-message lifecycle state machine,
//!   and the at-most-once payment coordinator.
//! - **rpc** — The traits the host application implements: chain backend,
//!   username directory, message transport, seed storage.
//! - **config** — Protocol constants and derivation contexts.
//!
//! ## Design Philosophy
//!
//! 1. Parsing never panics; unknown input degrades, it doesn't explode.
//! 2. Private keys never leave the process. The backend signs nothing.
//! 3. One approval, one submission. There is no retry on the money path.
//! 4. If it touches money, it has tests. Plural.

pub mod config;
pub mod crypto;
pub mod envelope;
pub mod identity;
pub mod payment;
pub mod rpc;
