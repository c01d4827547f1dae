//! # Identity Module
//!
//! Who is signing. The gateway enrolls once at startup and signs every
//! transaction through the resulting [`CryptoClient`].
//!
//! The stack is layered:
//!
//! 1. **Membership**: Registers `(id, secret)` pairs and hands out clients.
//! 2. **CryptoClient**: Holds the Ed25519 enrollment key for one id.
//! 3. **TransactionHandler**: A one-time transaction key plus the
//!    certificate binding it to the enrollment key. Builds deploy, invoke
//!    and query envelopes.
//!
//! Keys come from `ed25519-dalek`; one-time keys are drawn from `OsRng`.

pub mod client;
pub mod membership;

pub use client::{CryptoClient, TransactionHandler};
pub use membership::{IdentityError, Membership};
