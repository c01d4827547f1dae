//! HTTP transport integration tests.
//!
//! A throwaway axum peer is bound to an ephemeral port so the real reqwest
//! connector, the session and the submitter are exercised over a socket.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};

use blue_protocol::identity::Membership;
use blue_protocol::network::{
    Connector, HttpConnector, PeerSession, SubmitError, SubmitterConfig, TransactionSubmitter,
    TransportError,
};
use blue_protocol::transaction::{ChaincodeId, Response, SignedTransaction};

// ---------------------------------------------------------------------------
// Test Helpers
// ---------------------------------------------------------------------------

#[derive(Default)]
struct PeerState {
    /// Number of leading `/transactions` calls answered with HTTP 503.
    failures: usize,
    calls: AtomicUsize,
    health_checks: AtomicUsize,
}

async fn health(State(state): State<Arc<PeerState>>) -> StatusCode {
    state.health_checks.fetch_add(1, Ordering::SeqCst);
    StatusCode::OK
}

async fn transactions(
    State(state): State<Arc<PeerState>>,
    Json(tx): Json<SignedTransaction>,
) -> Result<Json<Response>, StatusCode> {
    let n = state.calls.fetch_add(1, Ordering::SeqCst);
    if n < state.failures {
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    }
    if tx.verify().is_err() {
        return Ok(Json(Response::rejected("bad signature")));
    }
    if tx.spec.input.function == "reject" {
        return Ok(Json(Response::failure("contract said no")));
    }
    Ok(Json(Response::success(tx.id)))
}

async fn spawn_peer(failures: usize) -> (SocketAddr, Arc<PeerState>) {
    let state = Arc::new(PeerState {
        failures,
        ..Default::default()
    });
    let app = Router::new()
        .route("/health", get(health))
        .route("/transactions", post(transactions))
        .with_state(Arc::clone(&state));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, state)
}

async fn submitter(addr: SocketAddr, max_attempts: u32) -> TransactionSubmitter {
    let connector = HttpConnector::new(format!("http://{addr}"))
        .with_timeouts(Duration::from_secs(1), Duration::from_secs(5));
    let session = PeerSession::connect(Arc::new(connector)).await.unwrap();

    let membership = Membership::new();
    membership.register("lukas", "pw").unwrap();
    let client = membership.init_client("lukas").unwrap();

    TransactionSubmitter::new(
        Arc::new(session),
        Arc::new(client),
        SubmitterConfig::new(ChaincodeId::from_path("github.com/acme/blue"))
            .with_max_attempts(max_attempts),
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn connect_probes_health() {
    let (addr, state) = spawn_peer(0).await;
    HttpConnector::new(format!("http://{addr}"))
        .connect()
        .await
        .unwrap();
    assert_eq!(state.health_checks.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn signed_transaction_round_trips_over_http() {
    let (addr, state) = spawn_peer(0).await;
    let s = submitter(addr, 3).await;

    let tx = s.build(
        blue_protocol::transaction::TransactionKind::Invoke,
        "send",
        vec!["a".into(), "b".into(), "10".into(), "USD".into(), "t".into()],
    );
    let response = s.process_transaction(&tx).await.unwrap();

    assert!(response.is_success());
    assert_eq!(response.message, tx.id);
    assert_eq!(state.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn http_errors_are_retried_with_reconnect() {
    let (addr, state) = spawn_peer(2).await;
    let s = submitter(addr, 3).await;

    let response = s.submit("send", vec![]).await.unwrap();

    assert!(response.is_success());
    assert_eq!(state.calls.load(Ordering::SeqCst), 3);
    assert_eq!(s.session().reconnects(), 2);
    // One probe for the initial connect, one per reconnect.
    assert_eq!(state.health_checks.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn persistent_http_errors_exhaust_the_submitter() {
    let (addr, _state) = spawn_peer(usize::MAX).await;
    let s = submitter(addr, 2).await;

    let err = s.submit("send", vec![]).await.unwrap_err();
    assert_eq!(
        err,
        SubmitError::Exhausted {
            attempts: 2,
            last: TransportError::Http { status: 503 },
        }
    );
}

#[tokio::test]
async fn contract_failure_is_a_response_not_a_transport_error() {
    let (addr, state) = spawn_peer(0).await;
    let s = submitter(addr, 3).await;

    let response = s.submit("reject", vec![]).await.unwrap();

    assert_eq!(response.status, Response::FAILURE);
    assert_eq!(state.calls.load(Ordering::SeqCst), 1);
    assert_eq!(s.session().reconnects(), 0);
}
