//! HTTP transport to a `blue-node peer`.
//!
//! `connect` builds a fresh `reqwest` client and probes `GET /health`, so a
//! reconnect really does drop the old connection pool. Transactions are
//! posted as JSON to `POST /transactions`; the peer answers with a JSON
//! [`Response`] whatever the contract decided.

use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use super::transport::{Connector, PeerChannel, TransportError};
use crate::config::{CONNECT_TIMEOUT, RESPONSE_TIMEOUT};
use crate::transaction::{Response, SignedTransaction};

/// Connector for a peer reachable over HTTP.
#[derive(Debug, Clone)]
pub struct HttpConnector {
    base_url: String,
    connect_timeout: Duration,
    response_timeout: Duration,
}

impl HttpConnector {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            connect_timeout: CONNECT_TIMEOUT,
            response_timeout: RESPONSE_TIMEOUT,
        }
    }

    pub fn with_timeouts(mut self, connect: Duration, response: Duration) -> Self {
        self.connect_timeout = connect;
        self.response_timeout = response;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl Connector for HttpConnector {
    async fn connect(&self) -> Result<Arc<dyn PeerChannel>, TransportError> {
        let client = Client::builder()
            .connect_timeout(self.connect_timeout)
            .timeout(self.response_timeout)
            .build()
            .map_err(|e| TransportError::Connect(e.to_string()))?;

        let health = format!("{}/health", self.base_url);
        let response = client.get(&health).send().await.map_err(classify)?;
        if !response.status().is_success() {
            return Err(TransportError::Http {
                status: response.status().as_u16(),
            });
        }

        debug!(peer = %self.base_url, "connected to peer");
        Ok(Arc::new(HttpChannel {
            client,
            endpoint: format!("{}/transactions", self.base_url),
        }))
    }
}

struct HttpChannel {
    client: Client,
    endpoint: String,
}

#[async_trait]
impl PeerChannel for HttpChannel {
    async fn process_transaction(
        &self,
        tx: &SignedTransaction,
    ) -> Result<Response, TransportError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(tx)
            .send()
            .await
            .map_err(classify)?;

        if !response.status().is_success() {
            return Err(TransportError::Http {
                status: response.status().as_u16(),
            });
        }

        response
            .json::<Response>()
            .await
            .map_err(|e| TransportError::Decode(e.to_string()))
    }
}

fn classify(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout(err.to_string())
    } else if err.is_connect() {
        TransportError::Connect(err.to_string())
    } else if err.is_decode() {
        TransportError::Decode(err.to_string())
    } else if let Some(status) = err.status() {
        TransportError::Http {
            status: status.as_u16(),
        }
    } else {
        TransportError::Closed(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slash_is_dropped() {
        let c = HttpConnector::new("http://127.0.0.1:7051/");
        assert_eq!(c.base_url(), "http://127.0.0.1:7051");
    }

    #[tokio::test]
    async fn unreachable_peer_is_a_transport_error() {
        // Port 9 (discard) is closed on any sane test host.
        let c = HttpConnector::new("http://127.0.0.1:9")
            .with_timeouts(Duration::from_millis(500), Duration::from_secs(1));
        assert!(c.connect().await.is_err());
    }
}
