//! # Prometheus Metrics
//!
//! Gateway metrics, scraped at `/metrics` on the metrics port. Everything is
//! registered in a dedicated [`prometheus::Registry`] under the `blue`
//! namespace.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};
use std::sync::Arc;
use std::time::Duration;

/// Handles for every gateway metric. Clones share the underlying series.
#[derive(Clone)]
pub struct GatewayMetrics {
    registry: Registry,
    /// Requests by `operation` (`send`, `offer`) and `outcome`.
    pub requests_total: IntCounterVec,
    /// Reconnect attempts made by the peer session since start.
    pub peer_reconnects: IntGauge,
    /// Time from validated request to ledger answer, by `operation`.
    pub submission_latency_seconds: HistogramVec,
}

impl GatewayMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new_custom(Some("blue".into()), None)?;

        let requests_total = IntCounterVec::new(
            Opts::new("gateway_requests_total", "Gateway requests by operation and outcome"),
            &["operation", "outcome"],
        )?;
        registry.register(Box::new(requests_total.clone()))?;

        let peer_reconnects = IntGauge::new(
            "peer_reconnects",
            "Reconnect attempts made by the peer session",
        )?;
        registry.register(Box::new(peer_reconnects.clone()))?;

        let submission_latency_seconds = HistogramVec::new(
            HistogramOpts::new(
                "submission_latency_seconds",
                "Submission latency including retries, in seconds",
            )
            .buckets(vec![
                0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 30.0, 60.0,
            ]),
            &["operation"],
        )?;
        registry.register(Box::new(submission_latency_seconds.clone()))?;

        Ok(Self {
            registry,
            requests_total,
            peer_reconnects,
            submission_latency_seconds,
        })
    }

    /// Records one finished request.
    pub fn observe_request(&self, operation: &str, outcome: &str, submitted: Option<Duration>) {
        self.requests_total
            .with_label_values(&[operation, outcome])
            .inc();
        if let Some(elapsed) = submitted {
            self.submission_latency_seconds
                .with_label_values(&[operation])
                .observe(elapsed.as_secs_f64());
        }
    }

    /// Encodes all registered metrics in the Prometheus text format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

pub type SharedMetrics = Arc<GatewayMetrics>;

/// `GET /metrics`
pub async fn metrics_handler(State(metrics): State<SharedMetrics>) -> impl IntoResponse {
    match metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "failed to encode metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, "metrics encoding failed").into_response()
        }
    }
}
