//! # CLI Interface
//!
//! Command-line structure for `blue-node`, built with `clap` derive. Every
//! setting also reads a `BLUE_*` environment variable.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use blue_protocol::config::{
    DEFAULT_CHAINCODE_PATH, DEFAULT_GATEWAY_PORT, DEFAULT_MAX_SUBMIT_ATTEMPTS,
    DEFAULT_METRICS_PORT, DEFAULT_PEER_PORT, DEFAULT_REPLAY_CAPACITY, DEFAULT_UTC_OFFSET_MINUTES,
    RESPONSE_TIMEOUT,
};

use crate::logging::LogFormat;

/// Blue gateway and ledger peer.
///
/// The gateway accepts send and offer requests over HTTP and submits them
/// to a ledger peer, which records them in the Blue contract's tables.
#[derive(Parser, Debug)]
#[command(
    name = "blue-node",
    about = "Blue send/offer gateway and ledger peer",
    version,
    propagate_version = true
)]
pub struct BlueNodeCli {
    /// Log output format.
    #[arg(long, global = true, value_enum, env = "BLUE_LOG_FORMAT", default_value_t)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Host the Blue contract and accept signed transactions over HTTP.
    Peer(PeerArgs),
    /// Serve the client-facing send/offer API.
    Gateway(GatewayArgs),
    /// Print version information and exit.
    Version,
}

#[derive(Args, Debug)]
pub struct PeerArgs {
    /// Port for the transaction endpoint.
    #[arg(long, short = 'p', env = "BLUE_PEER_PORT", default_value_t = DEFAULT_PEER_PORT)]
    pub port: u16,

    /// Directory for the table store. A temporary store is used when
    /// omitted, and its contents are lost on exit.
    #[arg(long, short = 'd', env = "BLUE_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Chaincode path this peer answers for.
    #[arg(long, env = "BLUE_CHAINCODE_PATH", default_value = DEFAULT_CHAINCODE_PATH)]
    pub chaincode_path: String,

    /// Executed transactions remembered for replaying resends.
    #[arg(
        long,
        env = "BLUE_REPLAY_CAPACITY",
        default_value_t = DEFAULT_REPLAY_CAPACITY,
        value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..)
    )]
    pub replay_capacity: usize,
}

#[derive(Args, Debug)]
pub struct GatewayArgs {
    /// Port for the send/offer API.
    #[arg(long, short = 'p', env = "BLUE_GATEWAY_PORT", default_value_t = DEFAULT_GATEWAY_PORT)]
    pub port: u16,

    /// Base URL of a ledger peer, e.g. `http://127.0.0.1:7051`.
    ///
    /// When omitted the contract runs inside the gateway on an in-memory
    /// store.
    #[arg(long, env = "BLUE_PEER_URL")]
    pub peer_url: Option<String>,

    /// Enrollment id used to sign transactions.
    #[arg(long, env = "BLUE_ENROLL_ID", default_value = "lukas")]
    pub enroll_id: String,

    /// Enrollment secret for `--enroll-id`.
    #[arg(
        long,
        env = "BLUE_ENROLL_SECRET",
        default_value = "NPKYL39uKbkj",
        hide_env_values = true
    )]
    pub enroll_secret: String,

    /// Chaincode path to deploy and invoke.
    #[arg(long, env = "BLUE_CHAINCODE_PATH", default_value = DEFAULT_CHAINCODE_PATH)]
    pub chaincode_path: String,

    /// Mark every transaction as confidential.
    #[arg(long, env = "BLUE_CONFIDENTIAL")]
    pub confidential: bool,

    /// Total submission attempts per transaction, the first included.
    #[arg(long, env = "BLUE_MAX_ATTEMPTS", default_value_t = DEFAULT_MAX_SUBMIT_ATTEMPTS)]
    pub max_attempts: u32,

    /// Seconds to wait for the peer to answer one attempt.
    #[arg(
        long,
        env = "BLUE_RESPONSE_TIMEOUT_SECS",
        default_value_t = RESPONSE_TIMEOUT.as_secs()
    )]
    pub response_timeout_secs: u64,

    /// Do not deploy the contract before serving.
    #[arg(long, env = "BLUE_SKIP_DEPLOY")]
    pub skip_deploy: bool,

    /// Port for the Prometheus metrics endpoint.
    #[arg(long, env = "BLUE_METRICS_PORT", default_value_t = DEFAULT_METRICS_PORT)]
    pub metrics_port: u16,

    /// Offset east of UTC, in minutes, for record timestamps.
    #[arg(
        long,
        env = "BLUE_UTC_OFFSET_MINUTES",
        default_value_t = DEFAULT_UTC_OFFSET_MINUTES,
        allow_negative_numbers = true,
        value_parser = clap::value_parser!(i32).range(-1439..=1439)
    )]
    pub utc_offset_minutes: i32,
}
