// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Blue Protocol: Core Library
//!
//! Blue records two kinds of financial intent on a permissioned ledger:
//! a direct transfer (`send`) and a standing trade intent (`offer`). This
//! crate holds everything that happens *before* a transaction reaches the
//! ledger contract: shaping requests, signing envelopes, pushing them over
//! the transport, and surviving the transport's bad days.
//!
//! ## Architecture
//!
//! - **config**: Protocol constants: function names, timeouts, retry bounds.
//! - **clock**: Ledger-local timestamps in a fixed time zone.
//! - **transaction**: The signed envelope, ledger responses, decimal values.
//! - **identity**: Enrollment and per-transaction certificates (Ed25519).
//! - **network**: Transport traits, the HTTP transport, the peer session
//!   and the retrying [`network::TransactionSubmitter`].
//! - **gateway**: Request validation and the send/offer entry points.
//!
//! ## Control Flow
//!
//! ```text
//! Gateway ─► TransactionSubmitter ─► PeerSession ─► PeerChannel ─► ledger
//!    ▲               │ (retry + reconnect)                            │
//!    └───────────────┴──────────────── Response ◄─────────────────────┘
//! ```
//!
//! The ledger side (tables, record handler, dispatcher) lives in the
//! `blue-contracts` crate.

pub mod clock;
pub mod config;
pub mod gateway;
pub mod identity;
pub mod network;
pub mod transaction;
