//! # Gateway HTTP API
//!
//! The client-facing router. Request bodies are
//! `application/x-www-form-urlencoded`; every answer is a JSON object with a
//! single `status` field.
//!
//! ## Endpoints
//!
//! | Method | Path        | Fields                              |
//! |--------|-------------|-------------------------------------|
//! | POST   | `/tx/send`  | sender, receiver, amount, currency  |
//! | POST   | `/tx/offer` | sender, takerGets, takerPays        |
//! | GET    | `/health`   |                                     |
//!
//! Every failure is a 400 except unknown routes, which are 404.

use axum::{
    extract::{rejection::FormRejection, State},
    http::{
        header::{
            ACCEPT, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_ORIGIN, CONTENT_TYPE,
        },
        HeaderValue, Method, StatusCode,
    },
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use blue_protocol::config::{FUNCTION_OFFER, FUNCTION_SEND};
use blue_protocol::gateway::{Gateway, GatewayError, OfferRequest, SendRequest};

use crate::metrics::SharedMetrics;

/// Shared state for the gateway handlers.
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<Gateway>,
    pub metrics: SharedMetrics,
}

/// Body of every gateway response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlueResponse {
    pub status: String,
}

impl BlueResponse {
    fn reply(code: StatusCode, status: impl Into<String>) -> Response {
        (
            code,
            Json(BlueResponse {
                status: status.into(),
            }),
        )
            .into_response()
    }
}

// ---------------------------------------------------------------------------
// Router Construction
// ---------------------------------------------------------------------------

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([ACCEPT, CONTENT_TYPE]);

    Router::new()
        .route("/tx/send", post(send_handler))
        .route("/tx/offer", post(offer_handler))
        .route("/health", get(health_handler))
        .fallback(not_found_handler)
        .layer(middleware::map_response(response_headers))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// JSON content type and permissive CORS on every response, preflight or not.
async fn response_headers(mut response: Response) -> Response {
    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(
        ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("accept, content-type"),
    );
    response
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// `POST /tx/send`
async fn send_handler(
    State(state): State<AppState>,
    form: Result<Form<SendRequest>, FormRejection>,
) -> Response {
    let started = Instant::now();
    let result = match form {
        Ok(Form(req)) => state.gateway.send(req).await,
        Err(rejection) => {
            tracing::debug!(error = %rejection, "unreadable send form");
            Err(GatewayError::MissingParams)
        }
    };
    finish(&state, FUNCTION_SEND, started, result)
}

/// `POST /tx/offer`
async fn offer_handler(
    State(state): State<AppState>,
    form: Result<Form<OfferRequest>, FormRejection>,
) -> Response {
    let started = Instant::now();
    let result = match form {
        Ok(Form(req)) => state.gateway.offer(req).await,
        Err(rejection) => {
            tracing::debug!(error = %rejection, "unreadable offer form");
            Err(GatewayError::MissingParams)
        }
    };
    finish(&state, FUNCTION_OFFER, started, result)
}

/// `GET /health`
async fn health_handler() -> Response {
    BlueResponse::reply(StatusCode::OK, "ok")
}

async fn not_found_handler() -> Response {
    BlueResponse::reply(StatusCode::NOT_FOUND, "Blue endpoint not found.")
}

/// Maps a gateway outcome onto the wire and records it.
fn finish(
    state: &AppState,
    operation: &str,
    started: Instant,
    result: Result<(), GatewayError>,
) -> Response {
    let (outcome, submitted) = match &result {
        Ok(()) => ("success", true),
        Err(e) if e.is_validation() => ("params_error", false),
        Err(GatewayError::Rejected { .. }) => ("rejected", true),
        Err(_) => ("submit_error", true),
    };
    state
        .metrics
        .observe_request(operation, outcome, submitted.then(|| started.elapsed()));
    state.metrics.peer_reconnects.set(state.gateway.reconnects() as i64);

    match result {
        Ok(()) => BlueResponse::reply(StatusCode::OK, "success"),
        Err(e) if e.is_validation() => {
            tracing::warn!(operation, error = %e, "rejected request");
            BlueResponse::reply(StatusCode::BAD_REQUEST, e.to_string())
        }
        Err(e) => {
            let status = format!("{operation} error: {e}");
            tracing::error!(operation, error = %e, "{status}");
            BlueResponse::reply(StatusCode::BAD_REQUEST, status)
        }
    }
}
