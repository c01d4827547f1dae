//! The signed transaction envelope.
//!
//! A [`SignedTransaction`] pairs a [`ChaincodeSpec`] with a one-time
//! transaction key. The key is vouched for by a [`Certificate`] signed with
//! the submitter's enrollment key, so the ledger can check both who sent the
//! transaction and that nobody touched it on the way.

use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::types::{ChaincodeSpec, TransactionKind};

/// Errors produced by [`SignedTransaction::verify`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerificationError {
    #[error("transaction id is empty")]
    MissingId,

    #[error("malformed {field}: {reason}")]
    Malformed { field: &'static str, reason: String },

    #[error("certificate for '{holder}' is not signed by its enrollment key")]
    InvalidCertificate { holder: String },

    #[error("transaction {id} signature does not verify")]
    InvalidSignature { id: String },
}

// ---------------------------------------------------------------------------
// Certificate
// ---------------------------------------------------------------------------

/// Binds a one-time transaction key to an enrolled identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Certificate {
    /// Enrollment id of the submitter.
    pub holder: String,
    /// Hex-encoded Ed25519 enrollment public key.
    pub enrollment_key: String,
    /// Hex-encoded Ed25519 public key of the one-time transaction key.
    pub transaction_key: String,
    /// Enrollment-key signature over [`Certificate::signable_bytes`], hex.
    pub signature: String,
}

impl Certificate {
    /// `holder || 0x00 || transaction_key`
    pub fn signable_bytes(holder: &str, transaction_key: &str) -> Vec<u8> {
        let mut buf = Vec::with_capacity(holder.len() + transaction_key.len() + 1);
        buf.extend_from_slice(holder.as_bytes());
        buf.push(0x00);
        buf.extend_from_slice(transaction_key.as_bytes());
        buf
    }

    /// Checks the enrollment signature and returns the transaction key it
    /// vouches for.
    pub fn verify(&self) -> Result<VerifyingKey, VerificationError> {
        let enrollment = decode_key("enrollment_key", &self.enrollment_key)?;
        let signature = decode_signature("certificate signature", &self.signature)?;
        enrollment
            .verify(
                &Self::signable_bytes(&self.holder, &self.transaction_key),
                &signature,
            )
            .map_err(|_| VerificationError::InvalidCertificate {
                holder: self.holder.clone(),
            })?;
        decode_key("transaction_key", &self.transaction_key)
    }
}

// ---------------------------------------------------------------------------
// SignedTransaction
// ---------------------------------------------------------------------------

/// A transaction ready to be handed to a peer.
///
/// `id` is the nonce the submitter drew for this transaction. Retries resend
/// the same envelope, so the ledger sees one id however many times the
/// transport stumbles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedTransaction {
    pub id: String,
    pub kind: TransactionKind,
    pub spec: ChaincodeSpec,
    /// Unix timestamp in milliseconds when the envelope was built.
    pub timestamp: u64,
    pub certificate: Certificate,
    /// Transaction-key signature over [`SignedTransaction::signable_bytes`], hex.
    pub signature: String,
}

impl SignedTransaction {
    /// Canonical bytes covered by the transaction signature.
    ///
    /// Fields are null-separated; integers are little-endian. The signature
    /// itself is excluded.
    pub fn signable_bytes(
        id: &str,
        kind: TransactionKind,
        spec: &ChaincodeSpec,
        timestamp: u64,
        certificate: &Certificate,
    ) -> Vec<u8> {
        let mut buf = Vec::with_capacity(256);

        buf.extend_from_slice(id.as_bytes());
        buf.push(0x00);

        buf.push(match kind {
            TransactionKind::Deploy => 0,
            TransactionKind::Invoke => 1,
            TransactionKind::Query => 2,
        });

        buf.extend_from_slice(spec.chaincode_id.path.as_bytes());
        buf.push(0x00);
        buf.extend_from_slice(spec.chaincode_id.name.as_bytes());
        buf.push(0x00);
        buf.extend_from_slice(spec.input.function.as_bytes());
        buf.push(0x00);

        buf.extend_from_slice(&(spec.input.args.len() as u32).to_le_bytes());
        for arg in &spec.input.args {
            buf.extend_from_slice(&(arg.len() as u32).to_le_bytes());
            buf.extend_from_slice(arg.as_bytes());
        }

        buf.extend_from_slice(spec.confidentiality.to_string().as_bytes());
        buf.push(0x00);

        buf.extend_from_slice(&timestamp.to_le_bytes());

        buf.extend_from_slice(certificate.holder.as_bytes());
        buf.push(0x00);
        buf.extend_from_slice(certificate.transaction_key.as_bytes());

        buf
    }

    /// Verifies the certificate chain and the transaction signature.
    pub fn verify(&self) -> Result<(), VerificationError> {
        if self.id.is_empty() {
            return Err(VerificationError::MissingId);
        }

        let transaction_key = self.certificate.verify()?;
        let signature = decode_signature("signature", &self.signature)?;
        let message = Self::signable_bytes(
            &self.id,
            self.kind,
            &self.spec,
            self.timestamp,
            &self.certificate,
        );

        transaction_key
            .verify(&message, &signature)
            .map_err(|_| VerificationError::InvalidSignature {
                id: self.id.clone(),
            })
    }
}

fn decode_key(field: &'static str, hex_key: &str) -> Result<VerifyingKey, VerificationError> {
    let malformed = |reason: String| VerificationError::Malformed { field, reason };
    let bytes = hex::decode(hex_key).map_err(|e| malformed(e.to_string()))?;
    let bytes: [u8; 32] = bytes
        .try_into()
        .map_err(|b: Vec<u8>| malformed(format!("expected 32 bytes, got {}", b.len())))?;
    VerifyingKey::from_bytes(&bytes).map_err(|e| malformed(e.to_string()))
}

fn decode_signature(field: &'static str, hex_sig: &str) -> Result<Signature, VerificationError> {
    let malformed = |reason: String| VerificationError::Malformed { field, reason };
    let bytes = hex::decode(hex_sig).map_err(|e| malformed(e.to_string()))?;
    let bytes: [u8; 64] = bytes
        .try_into()
        .map_err(|b: Vec<u8>| malformed(format!("expected 64 bytes, got {}", b.len())))?;
    Ok(Signature::from_bytes(&bytes))
}
