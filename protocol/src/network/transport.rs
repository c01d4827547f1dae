//! Transport abstractions between the gateway and a ledger peer.
//!
//! A [`Connector`] knows how to reach a peer; each successful `connect`
//! yields a fresh [`PeerChannel`]. The submitter never talks to a connector
//! directly. It goes through a [`super::PeerSession`], which owns the current
//! channel and replaces it when it breaks.

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

use crate::transaction::{Response, SignedTransaction};

/// Connection-level failures. Every variant is eligible for retry.
///
/// A peer that answers with a non-200 [`Response`] is *not* a transport
/// error: the transport worked and the ledger said no.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    Connect(String),

    #[error("timed out: {0}")]
    Timeout(String),

    #[error("peer returned HTTP {status}")]
    Http { status: u16 },

    #[error("undecodable peer response: {0}")]
    Decode(String),

    #[error("channel closed: {0}")]
    Closed(String),
}

/// An established channel to a peer.
#[async_trait]
pub trait PeerChannel: Send + Sync {
    /// Hands a signed transaction to the peer and waits for its verdict.
    async fn process_transaction(
        &self,
        tx: &SignedTransaction,
    ) -> Result<Response, TransportError>;
}

/// Opens channels to a peer.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self) -> Result<Arc<dyn PeerChannel>, TransportError>;
}
