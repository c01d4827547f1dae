//! Enrolled crypto client and per-transaction handlers.

use chrono::Utc;
use ed25519_dalek::{Signer, SigningKey};
use rand::rngs::OsRng;
use std::fmt;

use crate::transaction::{Certificate, ChaincodeSpec, SignedTransaction, TransactionKind};

/// Signing identity of an enrolled user.
///
/// Holds the enrollment key. Each transaction is signed with a fresh
/// one-time key obtained through [`CryptoClient::new_transaction_handler`].
pub struct CryptoClient {
    id: String,
    enrollment: SigningKey,
}

impl CryptoClient {
    pub(crate) fn from_seed(id: &str, seed: &[u8; 32]) -> Self {
        Self {
            id: id.to_string(),
            enrollment: SigningKey::from_bytes(seed),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Hex-encoded enrollment public key.
    pub fn enrollment_key(&self) -> String {
        hex::encode(self.enrollment.verifying_key().as_bytes())
    }

    /// Draws a one-time transaction key and certifies it with the
    /// enrollment key.
    pub fn new_transaction_handler(&self) -> TransactionHandler {
        let key = SigningKey::generate(&mut OsRng);
        let transaction_key = hex::encode(key.verifying_key().as_bytes());
        let signature = self
            .enrollment
            .sign(&Certificate::signable_bytes(&self.id, &transaction_key));

        TransactionHandler {
            key,
            certificate: Certificate {
                holder: self.id.clone(),
                enrollment_key: self.enrollment_key(),
                transaction_key,
                signature: hex::encode(signature.to_bytes()),
            },
        }
    }
}

// Key bytes never reach logs.
impl fmt::Debug for CryptoClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CryptoClient")
            .field("id", &self.id)
            .field("enrollment_key", &self.enrollment_key())
            .finish()
    }
}

/// Builds signed envelopes with one certified transaction key.
pub struct TransactionHandler {
    key: SigningKey,
    certificate: Certificate,
}

impl TransactionHandler {
    pub fn certificate(&self) -> &Certificate {
        &self.certificate
    }

    pub fn build_invocation(&self, spec: ChaincodeSpec, nonce: String) -> SignedTransaction {
        self.build(TransactionKind::Invoke, spec, nonce)
    }

    pub fn build_deploy(&self, spec: ChaincodeSpec, nonce: String) -> SignedTransaction {
        self.build(TransactionKind::Deploy, spec, nonce)
    }

    pub fn build_query(&self, spec: ChaincodeSpec, nonce: String) -> SignedTransaction {
        self.build(TransactionKind::Query, spec, nonce)
    }

    /// Signs an envelope of the given kind.
    pub fn build(
        &self,
        kind: TransactionKind,
        spec: ChaincodeSpec,
        nonce: String,
    ) -> SignedTransaction {
        let timestamp = Utc::now().timestamp_millis().max(0) as u64;
        let message =
            SignedTransaction::signable_bytes(&nonce, kind, &spec, timestamp, &self.certificate);
        let signature = self.key.sign(&message);

        SignedTransaction {
            id: nonce,
            kind,
            spec,
            timestamp,
            certificate: self.certificate.clone(),
            signature: hex::encode(signature.to_bytes()),
        }
    }
}

impl fmt::Debug for TransactionHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransactionHandler")
            .field("certificate", &self.certificate)
            .finish()
    }
}
