// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Blue Node
//!
//! Entry point for the `blue-node` binary.
//!
//! - `peer`   : host the Blue contract behind an HTTP transaction endpoint
//! - `gateway`: serve the send/offer API, submitting to a peer
//! - `version`: print build version information

mod api;
mod cli;
mod logging;
mod metrics;
mod peer;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;

use blue_contracts::store::{MemoryTableStore, SledTableStore, TableStore};
use blue_contracts::{ContractHost, LocalConnector};
use blue_protocol::clock::SystemClock;
use blue_protocol::config::{FUNCTION_INIT, PROTOCOL_VERSION};
use blue_protocol::gateway::Gateway;
use blue_protocol::identity::Membership;
use blue_protocol::network::{
    Connector, HttpConnector, PeerSession, SubmitterConfig, TransactionSubmitter,
};
use blue_protocol::transaction::{ChaincodeId, ConfidentialityLevel};

use cli::{BlueNodeCli, Commands, GatewayArgs, PeerArgs};
use metrics::GatewayMetrics;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = BlueNodeCli::parse();

    match cli.command {
        Commands::Peer(args) => {
            logging::init_logging(logging::DEFAULT_FILTER, cli.log_format);
            run_peer(args).await
        }
        Commands::Gateway(args) => {
            logging::init_logging(logging::DEFAULT_FILTER, cli.log_format);
            run_gateway(args).await
        }
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

/// Hosts the contract over HTTP until a shutdown signal arrives.
async fn run_peer(args: PeerArgs) -> Result<()> {
    let store: Arc<dyn TableStore> = match &args.data_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("failed to create data directory: {}", dir.display()))?;
            let store = SledTableStore::open(dir)
                .with_context(|| format!("failed to open table store at {}", dir.display()))?;
            tracing::info!(path = %dir.display(), "table store opened");
            Arc::new(store)
        }
        None => {
            tracing::warn!("no data directory given, records will not survive a restart");
            Arc::new(SledTableStore::open_temporary().context("failed to open temporary store")?)
        }
    };

    let host = Arc::new(
        ContractHost::blue(&args.chaincode_path, store).with_replay_capacity(args.replay_capacity),
    );
    tracing::info!(
        chaincode_path = %args.chaincode_path,
        chaincode = %host.chaincode_id().name,
        replay_capacity = args.replay_capacity,
        port = args.port,
        "starting blue-node peer"
    );

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind peer listener on {addr}"))?;
    tracing::info!("peer listening on {addr}");

    axum::serve(listener, peer::create_router(host))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("peer server error")?;

    tracing::info!("blue-node peer stopped");
    Ok(())
}

/// Enrolls, connects, deploys and serves the gateway API.
async fn run_gateway(args: GatewayArgs) -> Result<()> {
    let clock = SystemClock::with_offset_minutes(args.utc_offset_minutes)
        .ok_or_else(|| anyhow!("invalid UTC offset: {} minutes", args.utc_offset_minutes))?;
    let chaincode = ChaincodeId::from_path(&args.chaincode_path);

    // --- Identity ---
    let membership = Membership::new();
    membership
        .register(&args.enroll_id, &args.enroll_secret)
        .context("failed to register enrollment id")?;
    let client = membership
        .init_client(&args.enroll_id)
        .context("failed to initialize crypto client")?;
    tracing::info!(enroll_id = %args.enroll_id, "enrolled");

    // --- Peer session ---
    let connector: Arc<dyn Connector> = match &args.peer_url {
        Some(url) => {
            tracing::info!(peer = %url, "submitting to remote peer");
            Arc::new(HttpConnector::new(url.as_str()))
        }
        None => {
            tracing::info!("no peer url given, hosting the contract in-process");
            let host = ContractHost::blue(&args.chaincode_path, Arc::new(MemoryTableStore::new()));
            Arc::new(LocalConnector::new(Arc::new(host)))
        }
    };
    let session = PeerSession::connect(connector)
        .await
        .context("failed to connect to peer")?;

    let confidentiality = ConfidentialityLevel::from_flag(args.confidential);
    let config = SubmitterConfig::new(chaincode)
        .with_confidentiality(confidentiality)
        .with_max_attempts(args.max_attempts)
        .with_response_timeout(Duration::from_secs(args.response_timeout_secs));
    let submitter = Arc::new(TransactionSubmitter::new(
        Arc::new(session),
        Arc::new(client),
        config,
    ));

    // --- Deploy ---
    if args.skip_deploy {
        tracing::info!("skipping contract deploy");
    } else {
        let response = submitter
            .deploy(FUNCTION_INIT, Vec::new())
            .await
            .context("contract deploy failed")?;
        if response.is_success() {
            tracing::info!(chaincode = %args.chaincode_path, "contract deployed");
        } else {
            tracing::warn!(
                status = response.status,
                message = %response.message,
                "contract deploy rejected, serving anyway"
            );
        }
    }

    // --- Metrics ---
    let gateway_metrics = Arc::new(GatewayMetrics::new().context("failed to create metrics")?);
    let metrics_router = axum::Router::new()
        .route("/metrics", axum::routing::get(metrics::metrics_handler))
        .with_state(Arc::clone(&gateway_metrics));
    let metrics_addr = format!("0.0.0.0:{}", args.metrics_port);
    let metrics_listener = tokio::net::TcpListener::bind(&metrics_addr)
        .await
        .with_context(|| format!("failed to bind metrics listener on {metrics_addr}"))?;
    tracing::info!("metrics server listening on {metrics_addr}");

    // --- API ---
    let state = api::AppState {
        gateway: Arc::new(Gateway::new(submitter, Arc::new(clock))),
        metrics: gateway_metrics,
    };
    let api_addr = format!("0.0.0.0:{}", args.port);
    let api_listener = tokio::net::TcpListener::bind(&api_addr)
        .await
        .with_context(|| format!("failed to bind gateway listener on {api_addr}"))?;
    tracing::info!(
        confidentiality = %confidentiality,
        max_attempts = args.max_attempts,
        "gateway listening on {api_addr}"
    );

    tokio::select! {
        res = axum::serve(api_listener, api::create_router(state)) => {
            if let Err(e) = res {
                tracing::error!(error = %e, "gateway server error");
            }
        }
        res = axum::serve(metrics_listener, metrics_router) => {
            if let Err(e) = res {
                tracing::error!(error = %e, "metrics server error");
            }
        }
        _ = shutdown_signal() => {
            tracing::info!("shutdown signal received");
        }
    }

    tracing::info!("blue-node gateway stopped");
    Ok(())
}

fn print_version() {
    println!("blue-node {}", env!("CARGO_PKG_VERSION"));
    println!("protocol  {PROTOCOL_VERSION}");
}

/// Waits for SIGINT (Ctrl+C) or SIGTERM, whichever comes first.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
