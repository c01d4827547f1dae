//! The shared peer session.
//!
//! One session per gateway process, shared by every request. Callers read
//! the current channel together with its generation number; after a
//! failure they ask for a reconnect *of the generation they observed*. If
//! somebody else already replaced that generation, the call is a no-op, so
//! a burst of failing requests produces one reconnect, not one per request.

use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::transport::{Connector, PeerChannel, TransportError};

pub struct PeerSession {
    connector: Arc<dyn Connector>,
    current: RwLock<(u64, Arc<dyn PeerChannel>)>,
    /// Serialises reconnects. Held across the connector's await point.
    reconnect_lock: Mutex<()>,
    reconnects: AtomicU64,
}

impl PeerSession {
    /// Opens the first channel.
    pub async fn connect(connector: Arc<dyn Connector>) -> Result<Self, TransportError> {
        let channel = connector.connect().await?;
        Ok(Self {
            connector,
            current: RwLock::new((0, channel)),
            reconnect_lock: Mutex::new(()),
            reconnects: AtomicU64::new(0),
        })
    }

    /// The current channel and its generation.
    pub fn channel(&self) -> (u64, Arc<dyn PeerChannel>) {
        let guard = self.current.read();
        (guard.0, Arc::clone(&guard.1))
    }

    pub fn generation(&self) -> u64 {
        self.current.read().0
    }

    /// Reconnect attempts made so far, successful or not. Skipped
    /// (already-replaced) reconnects are not counted.
    pub fn reconnects(&self) -> u64 {
        self.reconnects.load(Ordering::Relaxed)
    }

    /// Replaces the channel of generation `observed`.
    ///
    /// Returns `Ok(false)` when another caller already replaced it.
    pub async fn reconnect(&self, observed: u64) -> Result<bool, TransportError> {
        let _guard = self.reconnect_lock.lock().await;

        if self.generation() != observed {
            debug!(observed, "channel already replaced, skipping reconnect");
            return Ok(false);
        }

        self.reconnects.fetch_add(1, Ordering::Relaxed);
        let channel = self.connector.connect().await?;

        let mut current = self.current.write();
        current.0 += 1;
        current.1 = channel;
        info!(generation = current.0, "reconnected to peer");
        Ok(true)
    }
}

impl std::fmt::Debug for PeerSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PeerSession")
            .field("generation", &self.generation())
            .field("reconnects", &self.reconnects())
            .finish()
    }
}
