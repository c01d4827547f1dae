//! Core type definitions for ledger transactions.
//!
//! These types are the vocabulary shared by the gateway and the ledger:
//! what a transaction targets, what it asks for, and what comes back.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

// ---------------------------------------------------------------------------
// ConfidentialityLevel
// ---------------------------------------------------------------------------

/// Marking that tells the ledger whether the payload is confidential.
///
/// The gateway picks one level at startup and stamps it on every
/// transaction it builds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidentialityLevel {
    /// Plaintext payload.
    #[default]
    Public,
    /// Payload to be encrypted at the ledger layer.
    Confidential,
}

impl ConfidentialityLevel {
    pub fn from_flag(confidential: bool) -> Self {
        if confidential {
            Self::Confidential
        } else {
            Self::Public
        }
    }
}

impl fmt::Display for ConfidentialityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Public => write!(f, "public"),
            Self::Confidential => write!(f, "confidential"),
        }
    }
}

// ---------------------------------------------------------------------------
// TransactionKind
// ---------------------------------------------------------------------------

/// Which contract lifecycle call a transaction triggers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    /// Instantiates the contract (`Init`).
    Deploy,
    /// State-changing call (`Invoke`).
    Invoke,
    /// Read-only call (`Query`).
    Query,
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Deploy => write!(f, "deploy"),
            Self::Invoke => write!(f, "invoke"),
            Self::Query => write!(f, "query"),
        }
    }
}

// ---------------------------------------------------------------------------
// Chaincode addressing
// ---------------------------------------------------------------------------

/// Identifies the deployed contract a transaction is addressed to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChaincodeId {
    /// Source path the contract was deployed from.
    pub path: String,
    /// Deployed name: hex SHA-256 of the path.
    pub name: String,
}

impl ChaincodeId {
    /// Derives the deployed name from a chaincode path. Deterministic, so
    /// the gateway and the peer agree on the name without talking.
    pub fn from_path(path: impl Into<String>) -> Self {
        let path = path.into();
        let name = hex::encode(Sha256::digest(path.as_bytes()));
        Self { path, name }
    }
}

/// The call itself: a function name and its operands.
///
/// The function name travels in its own field. `args` holds operands only,
/// never a leading function-name element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChaincodeInput {
    pub function: String,
    pub args: Vec<String>,
}

impl ChaincodeInput {
    pub fn new(function: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            function: function.into(),
            args,
        }
    }
}

/// Everything the ledger needs to route and execute a call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChaincodeSpec {
    pub chaincode_id: ChaincodeId,
    pub input: ChaincodeInput,
    pub confidentiality: ConfidentialityLevel,
}

// ---------------------------------------------------------------------------
// Response
// ---------------------------------------------------------------------------

/// The ledger's answer to a transaction.
///
/// A `Response` always means the transport did its job. Whether the
/// contract accepted the call is carried in `status`: anything other than
/// [`Response::OK`] is an application-level rejection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub status: i32,
    pub message: String,
}

impl Response {
    pub const OK: i32 = 200;
    pub const BAD_REQUEST: i32 = 400;
    pub const NOT_FOUND: i32 = 404;
    pub const FAILURE: i32 = 500;

    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: Self::OK,
            message: message.into(),
        }
    }

    /// The contract ran and returned an error.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            status: Self::FAILURE,
            message: message.into(),
        }
    }

    /// The ledger refused the transaction before running the contract.
    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            status: Self::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: Self::NOT_FOUND,
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == Self::OK
    }
}
