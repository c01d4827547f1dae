//! Errors returned by the Blue chaincode.
//!
//! None of these are retried by anyone. The host renders them into a
//! status-500 [`blue_protocol::transaction::Response`] whose message is the
//! `Display` string below, which is also what the gateway client finally
//! sees.

use blue_protocol::transaction::ValueError;
use thiserror::Error;

use crate::store::TableError;

#[derive(Debug, Error)]
pub enum ContractError {
    #[error("incorrect number of arguments for '{function}': expected {expected}, got {got}")]
    ArgumentCount {
        function: String,
        expected: usize,
        got: usize,
    },

    #[error("received unknown function {kind} invocation with function '{function}'")]
    UnknownFunction {
        /// Lifecycle call the function arrived through (`invoke`, `query`).
        kind: &'static str,
        function: String,
    },

    #[error("invalid argument '{name}': {source}")]
    InvalidArgument {
        name: &'static str,
        #[source]
        source: ValueError,
    },

    /// Fatal for `init`: the contract instance is unusable.
    #[error("failed creating tables: {0}")]
    SchemaCreation(#[source] TableError),

    #[error("duplicate record in table '{table}'")]
    DuplicateRecord { table: String },

    #[error("storage error: {0}")]
    Storage(#[from] TableError),
}
