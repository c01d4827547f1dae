//! Enrollment registry.
//!
//! Before the gateway can sign anything it has to enroll: register an
//! `(id, secret)` pair and obtain a [`CryptoClient`] for that id. The
//! registry keeps only a SHA-256 digest of each secret.

use parking_lot::RwLock;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, info};

use super::client::CryptoClient;

/// Errors from enrollment and client initialization.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityError {
    #[error("enrollment id must not be empty")]
    EmptyId,

    #[error("'{0}' is already registered with a different secret")]
    AlreadyRegistered(String),

    #[error("'{0}' is not registered")]
    NotRegistered(String),
}

/// In-process membership service.
#[derive(Debug, Default)]
pub struct Membership {
    members: RwLock<HashMap<String, [u8; 32]>>,
}

impl Membership {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an enrollment id.
    ///
    /// Registering the same `(id, secret)` twice is a no-op. Registering a
    /// known id with a different secret fails.
    pub fn register(&self, id: &str, secret: &str) -> Result<(), IdentityError> {
        if id.is_empty() {
            return Err(IdentityError::EmptyId);
        }

        let digest: [u8; 32] = Sha256::digest(secret.as_bytes()).into();
        let mut members = self.members.write();

        match members.get(id) {
            Some(existing) if *existing == digest => {
                debug!(id, "enrollment id already registered");
                Ok(())
            }
            Some(_) => Err(IdentityError::AlreadyRegistered(id.to_string())),
            None => {
                members.insert(id.to_string(), digest);
                info!(id, "registered enrollment id");
                Ok(())
            }
        }
    }

    /// Produces the crypto client for a registered id.
    ///
    /// The enrollment key is derived from the id and the secret digest, so a
    /// restarted gateway enrolling with the same credentials signs with the
    /// same enrollment key.
    pub fn init_client(&self, id: &str) -> Result<CryptoClient, IdentityError> {
        let members = self.members.read();
        let digest = members
            .get(id)
            .ok_or_else(|| IdentityError::NotRegistered(id.to_string()))?;

        let mut hasher = Sha256::new();
        hasher.update(id.as_bytes());
        hasher.update([0x00]);
        hasher.update(digest);
        let seed: [u8; 32] = hasher.finalize().into();

        Ok(CryptoClient::from_seed(id, &seed))
    }

    pub fn is_registered(&self, id: &str) -> bool {
        self.members.read().contains_key(id)
    }
}
