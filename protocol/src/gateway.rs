//! # Gateway Request Handlers
//!
//! One client request, one submission. The handlers here are HTTP-agnostic:
//! the node binary extracts form fields into [`SendRequest`] /
//! [`OfferRequest`] and maps [`GatewayError`] onto status codes.
//!
//! Order of operations per request:
//!
//! 1. Every required field must be non-empty (`"params error"`).
//! 2. Amounts must parse as positive decimals.
//! 3. Timestamp from the ledger-local [`Clock`].
//! 4. Exactly one call to the [`TransactionSubmitter`].
//!
//! Nothing is built or sent when steps 1 or 2 fail.

use serde::Deserialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use crate::clock::Clock;
use crate::config::{FUNCTION_OFFER, FUNCTION_SEND};
use crate::network::{SubmitError, TransactionSubmitter};
use crate::transaction::{Amount, AssetAmount, Response, ValueError};

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// A direct transfer. Missing form fields deserialize as empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SendRequest {
    pub sender: String,
    pub receiver: String,
    pub amount: String,
    pub currency: String,
}

/// A standing trade intent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct OfferRequest {
    pub sender: String,
    #[serde(rename = "takerGets")]
    pub taker_gets: String,
    #[serde(rename = "takerPays")]
    pub taker_pays: String,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// A required field was empty or absent.
    #[error("params error")]
    MissingParams,

    #[error("params error: {0}")]
    InvalidParams(#[from] ValueError),

    #[error(transparent)]
    Submission(#[from] SubmitError),

    /// The ledger answered with a non-200 status.
    #[error("ledger rejected transaction (status {status}): {message}")]
    Rejected { status: i32, message: String },
}

impl GatewayError {
    /// Validation failures never reached the submitter.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::MissingParams | Self::InvalidParams(_))
    }
}

// ---------------------------------------------------------------------------
// Gateway
// ---------------------------------------------------------------------------

pub struct Gateway {
    submitter: Arc<TransactionSubmitter>,
    clock: Arc<dyn Clock>,
}

impl Gateway {
    pub fn new(submitter: Arc<TransactionSubmitter>, clock: Arc<dyn Clock>) -> Self {
        Self { submitter, clock }
    }

    pub fn submitter(&self) -> &Arc<TransactionSubmitter> {
        &self.submitter
    }

    /// Reconnect attempts made by the shared peer session.
    pub fn reconnects(&self) -> u64 {
        self.submitter.session().reconnects()
    }

    /// Records a transfer of `amount` `currency` from `sender` to `receiver`.
    pub async fn send(&self, req: SendRequest) -> Result<(), GatewayError> {
        info!(
            sender = %req.sender,
            receiver = %req.receiver,
            amount = %req.amount,
            currency = %req.currency,
            "send"
        );

        if [&req.sender, &req.receiver, &req.amount, &req.currency]
            .iter()
            .any(|f| f.is_empty())
        {
            return Err(GatewayError::MissingParams);
        }
        let amount: Amount = req.amount.parse()?;

        let args = vec![
            req.sender,
            req.receiver,
            amount.to_string(),
            req.currency,
            self.clock.timestamp(),
        ];
        self.submit(FUNCTION_SEND, args).await
    }

    /// Records that `sender` offers `taker_pays` in exchange for `taker_gets`.
    pub async fn offer(&self, req: OfferRequest) -> Result<(), GatewayError> {
        info!(
            sender = %req.sender,
            taker_gets = %req.taker_gets,
            taker_pays = %req.taker_pays,
            "offer"
        );

        if [&req.sender, &req.taker_gets, &req.taker_pays]
            .iter()
            .any(|f| f.is_empty())
        {
            return Err(GatewayError::MissingParams);
        }
        let gets: AssetAmount = req.taker_gets.parse()?;
        let pays: AssetAmount = req.taker_pays.parse()?;

        let args = vec![
            req.sender,
            gets.to_string(),
            pays.to_string(),
            self.clock.timestamp(),
        ];
        self.submit(FUNCTION_OFFER, args).await
    }

    async fn submit(&self, function: &str, args: Vec<String>) -> Result<(), GatewayError> {
        let Response { status, message } = self.submitter.submit(function, args).await?;
        if status != Response::OK {
            warn!(function, status, %message, "ledger rejected transaction");
            return Err(GatewayError::Rejected { status, message });
        }
        info!(function, "transaction recorded");
        Ok(())
    }
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway")
            .field("submitter", &self.submitter)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::identity::Membership;
    use crate::network::{Connector, PeerChannel, PeerSession, SubmitterConfig, TransportError};
    use crate::transaction::{ChaincodeId, SignedTransaction};
    use async_trait::async_trait;
    use chrono::{FixedOffset, TimeZone};
    use parking_lot::Mutex;

    /// Records every transaction and answers with a canned response.
    struct Recorder {
        seen: Mutex<Vec<SignedTransaction>>,
        answer: Response,
    }

    #[async_trait]
    impl PeerChannel for Recorder {
        async fn process_transaction(
            &self,
            tx: &SignedTransaction,
        ) -> Result<Response, TransportError> {
            self.seen.lock().push(tx.clone());
            Ok(self.answer.clone())
        }
    }

    struct Fixed(Arc<Recorder>);

    #[async_trait]
    impl Connector for Fixed {
        async fn connect(&self) -> Result<Arc<dyn PeerChannel>, TransportError> {
            Ok(self.0.clone())
        }
    }

    const TS: &str = "2026-10-16 09:30:00.000000000 +0800";

    async fn gateway(answer: Response) -> (Gateway, Arc<Recorder>) {
        let recorder = Arc::new(Recorder {
            seen: Mutex::new(Vec::new()),
            answer,
        });
        let session = PeerSession::connect(Arc::new(Fixed(recorder.clone())))
            .await
            .unwrap();

        let membership = Membership::new();
        membership.register("lukas", "pw").unwrap();
        let client = membership.init_client("lukas").unwrap();

        let submitter = TransactionSubmitter::new(
            Arc::new(session),
            Arc::new(client),
            SubmitterConfig::new(ChaincodeId::from_path("github.com/acme/blue")),
        );
        let at = FixedOffset::east_opt(8 * 3600)
            .unwrap()
            .with_ymd_and_hms(2026, 10, 16, 9, 30, 0)
            .unwrap();

        (
            Gateway::new(Arc::new(submitter), Arc::new(FixedClock::new(at))),
            recorder,
        )
    }

    fn send_req() -> SendRequest {
        SendRequest {
            sender: "alice".into(),
            receiver: "bob".into(),
            amount: "10.00".into(),
            currency: "USD".into(),
        }
    }

    #[tokio::test]
    async fn send_submits_operands_with_trailing_timestamp() {
        let (gw, rec) = gateway(Response::success("")).await;
        gw.send(send_req()).await.unwrap();

        let seen = rec.seen.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].spec.input.function, "send");
        assert_eq!(seen[0].spec.input.args, vec!["alice", "bob", "10", "USD", TS]);
    }

    #[tokio::test]
    async fn offer_submits_normalized_asset_amounts() {
        let (gw, rec) = gateway(Response::success("")).await;
        gw.offer(OfferRequest {
            sender: "alice".into(),
            taker_gets: "10XRP".into(),
            taker_pays: "5.0 usd".into(),
        })
        .await
        .unwrap();

        let seen = rec.seen.lock();
        assert_eq!(seen[0].spec.input.function, "offer");
        assert_eq!(seen[0].spec.input.args, vec!["alice", "10XRP", "5USD", TS]);
    }

    #[tokio::test]
    async fn empty_field_is_rejected_before_submission() {
        let (gw, rec) = gateway(Response::success("")).await;

        for blank in 0..4 {
            let mut req = send_req();
            match blank {
                0 => req.sender.clear(),
                1 => req.receiver.clear(),
                2 => req.amount.clear(),
                _ => req.currency.clear(),
            }
            assert_eq!(gw.send(req).await, Err(GatewayError::MissingParams));
        }

        let err = gw.offer(OfferRequest::default()).await.unwrap_err();
        assert_eq!(err.to_string(), "params error");
        assert!(rec.seen.lock().is_empty());
    }

    #[tokio::test]
    async fn malformed_amount_is_rejected_before_submission() {
        let (gw, rec) = gateway(Response::success("")).await;
        let mut req = send_req();
        req.amount = "lots".into();

        let err = gw.send(req).await.unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().starts_with("params error: invalid amount"));
        assert!(rec.seen.lock().is_empty());
    }

    #[tokio::test]
    async fn non_200_response_is_a_rejection() {
        let (gw, rec) = gateway(Response::failure("duplicate record in table 'send'")).await;

        let err = gw.send(send_req()).await.unwrap_err();
        assert_eq!(
            err,
            GatewayError::Rejected {
                status: 500,
                message: "duplicate record in table 'send'".into()
            }
        );
        assert!(!err.is_validation());
        assert_eq!(rec.seen.lock().len(), 1);
    }

    #[test]
    fn offer_request_uses_camel_case_field_names() {
        let req: OfferRequest =
            serde_json::from_str(r#"{"sender":"a","takerGets":"1XRP"}"#).unwrap();
        assert_eq!(req.taker_gets, "1XRP");
        assert_eq!(req.taker_pays, "");
    }
}
