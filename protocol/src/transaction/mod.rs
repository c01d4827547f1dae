//! # Transaction Module
//!
//! What travels between the gateway and the ledger.
//!
//! ```text
//! types.rs  : Chaincode addressing, call input, confidentiality, Response
//! signed.rs : Certificate and SignedTransaction with Ed25519 verification
//! amount.rs : Positive decimal amounts and `<value><CODE>` asset amounts
//! ```
//!
//! Envelopes are built by [`crate::identity::TransactionHandler`] and checked
//! by the ledger host with [`SignedTransaction::verify`].

pub mod amount;
pub mod signed;
pub mod types;

pub use amount::{Amount, AssetAmount, ValueError};
pub use signed::{Certificate, SignedTransaction, VerificationError};
pub use types::{
    ChaincodeId, ChaincodeInput, ChaincodeSpec, ConfidentialityLevel, Response, TransactionKind,
};
