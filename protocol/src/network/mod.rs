//! # Network Module
//!
//! Everything between a built transaction and the ledger peer.
//!
//! ## Architecture
//!
//! ```text
//! transport.rs : PeerChannel / Connector traits and TransportError
//! http.rs      : reqwest-backed connector for a remote peer
//! session.rs   : Shared channel holder with generation-checked reconnect
//! submitter.rs : Build, sign, send, retry
//! ```
//!
//! ## Design Decisions
//!
//! - The session is an explicit object owned by the submitter and shared by
//!   reference, never a global. Reconnects are serialised by an async mutex
//!   and keyed on the generation the caller saw fail.
//! - The submitter applies its own `tokio::time::timeout` around every send,
//!   so in-process and HTTP transports are bounded the same way.
//! - Transport traits use `async-trait` so they can live behind `Arc<dyn _>`.

pub mod http;
pub mod session;
pub mod submitter;
pub mod transport;

pub use http::HttpConnector;
pub use session::PeerSession;
pub use submitter::{SubmitError, SubmitterConfig, TransactionSubmitter};
pub use transport::{Connector, PeerChannel, TransportError};
