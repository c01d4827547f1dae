//! # Ledger Peer API
//!
//! HTTP face of a [`ContractHost`], spoken by
//! [`blue_protocol::network::HttpConnector`].
//!
//! | Method | Path            | Body                                   |
//! |--------|-----------------|----------------------------------------|
//! | GET    | `/health`       |                                        |
//! | POST   | `/transactions` | `SignedTransaction` in, `Response` out |
//!
//! Contract outcomes, rejections included, travel as HTTP 200 with the
//! ledger status inside the body. A non-2xx status means the transaction
//! never reached the contract, and the submitter treats it as a transport
//! failure.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use blue_contracts::ContractHost;
use blue_protocol::transaction::SignedTransaction;

pub fn create_router(host: Arc<ContractHost>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/transactions", post(transaction_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(host)
}

async fn health_handler(State(host): State<Arc<ContractHost>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "chaincode": host.chaincode_id().name,
        "processed": host.processed_count(),
    }))
}

/// `POST /transactions`
///
/// Execution may touch disk, so it runs on the blocking pool.
async fn transaction_handler(
    State(host): State<Arc<ContractHost>>,
    Json(tx): Json<SignedTransaction>,
) -> Response {
    let tx_id = tx.id.clone();
    match tokio::task::spawn_blocking(move || host.process(&tx)).await {
        Ok(response) => Json(response).into_response(),
        Err(e) => {
            tracing::error!(tx_id = %tx_id, error = %e, "transaction execution panicked");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
