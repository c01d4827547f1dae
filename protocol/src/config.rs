//! # Protocol Configuration & Constants
//!
//! Every magic number Blue relies on lives here. The gateway binary exposes
//! most of them as CLI flags, but these are the defaults everybody gets when
//! they don't care.

use std::time::Duration;

// ---------------------------------------------------------------------------
// Protocol Version
// ---------------------------------------------------------------------------

/// Crate-level protocol version reported by `blue-node version`.
pub const PROTOCOL_VERSION: &str = "0.1.0";

// ---------------------------------------------------------------------------
// Contract Functions
// ---------------------------------------------------------------------------

/// Function carried by the deploy transaction. The contract ignores the
/// name and only checks that no arguments were passed.
pub const FUNCTION_INIT: &str = "init";

/// Invoke function that records a transfer.
pub const FUNCTION_SEND: &str = "send";

/// Invoke function that records a trade intent.
pub const FUNCTION_OFFER: &str = "offer";

/// Operand count for `send`: sender, receiver, amount, currency, timestamp.
pub const SEND_ARG_COUNT: usize = 5;

/// Operand count for `offer`: sender, takerGets, takerPays, timestamp.
pub const OFFER_ARG_COUNT: usize = 4;

/// Chaincode path deployed when none is configured. The chaincode name is
/// derived from it, so gateway and peer must agree on this value.
pub const DEFAULT_CHAINCODE_PATH: &str = "github.com/wutongtree/blue/chaincode";

// ---------------------------------------------------------------------------
// Submission
// ---------------------------------------------------------------------------

/// Total submission attempts per transaction, the first one included.
pub const DEFAULT_MAX_SUBMIT_ATTEMPTS: u32 = 3;

/// How long we wait for a TCP connection to the peer.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(3);

/// How long we wait for the peer to answer a transaction.
pub const RESPONSE_TIMEOUT: Duration = Duration::from_secs(60);

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

/// Executed transactions a contract host remembers for replay. Once full,
/// the oldest entry is forgotten first.
pub const DEFAULT_REPLAY_CAPACITY: usize = 100_000;

// ---------------------------------------------------------------------------
// Network Parameters
// ---------------------------------------------------------------------------

/// Default port for the client-facing gateway API.
pub const DEFAULT_GATEWAY_PORT: u16 = 5000;

/// Default port for the ledger peer's transaction endpoint.
pub const DEFAULT_PEER_PORT: u16 = 7051;

/// Default port for the Prometheus metrics endpoint.
pub const DEFAULT_METRICS_PORT: u16 = 9090;

// ---------------------------------------------------------------------------
// Time
// ---------------------------------------------------------------------------

/// UTC offset of the ledger-local clock, in minutes. +08:00 (China Standard Time).
pub const DEFAULT_UTC_OFFSET_MINUTES: i32 = 8 * 60;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_function_names_are_distinct() {
        assert_ne!(FUNCTION_SEND, FUNCTION_OFFER);
        assert_ne!(FUNCTION_SEND, FUNCTION_INIT);
        assert_ne!(FUNCTION_OFFER, FUNCTION_INIT);
    }

    #[test]
    fn test_timeout_constants_sanity() {
        // Connecting must be quicker than waiting for an answer, or the
        // connect timeout is meaningless.
        assert!(CONNECT_TIMEOUT < RESPONSE_TIMEOUT);
        assert!(CONNECT_TIMEOUT.as_millis() > 0);
    }

    #[test]
    fn test_submit_attempts_allow_a_retry() {
        assert!(DEFAULT_MAX_SUBMIT_ATTEMPTS > 1);
    }

    #[test]
    fn test_ports_are_distinct() {
        assert_ne!(DEFAULT_GATEWAY_PORT, DEFAULT_PEER_PORT);
        assert_ne!(DEFAULT_GATEWAY_PORT, DEFAULT_METRICS_PORT);
        assert_ne!(DEFAULT_PEER_PORT, DEFAULT_METRICS_PORT);
    }

    #[test]
    fn test_utc_offset_is_within_a_day() {
        assert!(DEFAULT_UTC_OFFSET_MINUTES.abs() < 24 * 60);
    }
}
