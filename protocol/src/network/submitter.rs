//! # Transaction Submitter
//!
//! Turns a function name and operand list into a signed ledger transaction
//! and gets it to the peer, riding out transient transport failures.
//!
//! ## Retry policy
//!
//! Up to `max_attempts` sends of the *same* signed envelope (the first send
//! included). After every transport failure the session reconnects before
//! the next send, and once more after the final failure, so the number of
//! reconnect attempts always equals the number of failed sends. Any decoded
//! [`Response`] ends the loop immediately, whatever its status: a ledger
//! rejection is an answer, not a transport problem.
//!
//! Resending an identical envelope is only safe because the ledger host
//! remembers the ids it has processed and replays the recorded response.

use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::session::PeerSession;
use super::transport::TransportError;
use crate::config::{DEFAULT_MAX_SUBMIT_ATTEMPTS, RESPONSE_TIMEOUT};
use crate::identity::CryptoClient;
use crate::transaction::{
    ChaincodeId, ChaincodeInput, ChaincodeSpec, ConfidentialityLevel, Response, SignedTransaction,
    TransactionKind,
};

/// Errors surfaced by the submitter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitError {
    /// Every attempt failed at the transport level.
    #[error("submission failed after {attempts} attempt(s): {last}")]
    Exhausted {
        attempts: u32,
        #[source]
        last: TransportError,
    },
}

/// Submitter settings, fixed for the lifetime of the process.
#[derive(Debug, Clone)]
pub struct SubmitterConfig {
    pub chaincode: ChaincodeId,
    pub confidentiality: ConfidentialityLevel,
    pub max_attempts: u32,
    /// Upper bound on each individual send, whatever the transport.
    pub response_timeout: Duration,
}

impl SubmitterConfig {
    pub fn new(chaincode: ChaincodeId) -> Self {
        Self {
            chaincode,
            confidentiality: ConfidentialityLevel::Public,
            max_attempts: DEFAULT_MAX_SUBMIT_ATTEMPTS,
            response_timeout: RESPONSE_TIMEOUT,
        }
    }

    pub fn with_confidentiality(mut self, level: ConfidentialityLevel) -> Self {
        self.confidentiality = level;
        self
    }

    /// Zero is treated as one: every transaction gets at least one send.
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn with_response_timeout(mut self, response_timeout: Duration) -> Self {
        self.response_timeout = response_timeout;
        self
    }
}

/// Builds, signs and submits ledger transactions.
#[derive(Debug)]
pub struct TransactionSubmitter {
    session: Arc<PeerSession>,
    client: Arc<CryptoClient>,
    config: SubmitterConfig,
}

impl TransactionSubmitter {
    pub fn new(
        session: Arc<PeerSession>,
        client: Arc<CryptoClient>,
        config: SubmitterConfig,
    ) -> Self {
        Self {
            session,
            client,
            config,
        }
    }

    pub fn session(&self) -> &Arc<PeerSession> {
        &self.session
    }

    pub fn config(&self) -> &SubmitterConfig {
        &self.config
    }

    /// Signs a fresh envelope: new transaction handler, new UUID nonce.
    pub fn build(
        &self,
        kind: TransactionKind,
        function: &str,
        args: Vec<String>,
    ) -> SignedTransaction {
        let spec = ChaincodeSpec {
            chaincode_id: self.config.chaincode.clone(),
            input: ChaincodeInput::new(function, args),
            confidentiality: self.config.confidentiality,
        };
        let nonce = Uuid::new_v4().to_string();
        self.client.new_transaction_handler().build(kind, spec, nonce)
    }

    /// Submits an `Invoke` of `function` with `args`.
    pub async fn submit(
        &self,
        function: &str,
        args: Vec<String>,
    ) -> Result<Response, SubmitError> {
        let tx = self.build(TransactionKind::Invoke, function, args);
        self.process_transaction(&tx).await
    }

    /// Submits a `Deploy`, which runs the contract's `init`.
    pub async fn deploy(
        &self,
        function: &str,
        args: Vec<String>,
    ) -> Result<Response, SubmitError> {
        let tx = self.build(TransactionKind::Deploy, function, args);
        info!(
            chaincode = %self.config.chaincode.path,
            tx_id = %tx.id,
            "deploying chaincode"
        );
        self.process_transaction(&tx).await
    }

    /// Sends `tx` to the peer, retrying transport failures.
    pub async fn process_transaction(
        &self,
        tx: &SignedTransaction,
    ) -> Result<Response, SubmitError> {
        let max_attempts = self.config.max_attempts.max(1);
        let started = Instant::now();
        let mut attempt = 0;

        loop {
            attempt += 1;
            let (generation, channel) = self.session.channel();

            let outcome = match timeout(
                self.config.response_timeout,
                channel.process_transaction(tx),
            )
            .await
            {
                Ok(outcome) => outcome,
                Err(_) => Err(TransportError::Timeout(format!(
                    "no response within {:?}",
                    self.config.response_timeout
                ))),
            };

            let err = match outcome {
                Ok(response) => {
                    debug!(
                        tx_id = %tx.id,
                        attempt,
                        status = response.status,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "transaction processed"
                    );
                    return Ok(response);
                }
                Err(err) => err,
            };

            warn!(
                tx_id = %tx.id,
                attempt,
                max_attempts,
                error = %err,
                "transport failure, reconnecting"
            );

            if let Err(reconnect_err) = self.session.reconnect(generation).await {
                warn!(tx_id = %tx.id, error = %reconnect_err, "reconnect failed");
            }

            if attempt >= max_attempts {
                error!(
                    tx_id = %tx.id,
                    attempts = attempt,
                    error = %err,
                    "giving up on transaction"
                );
                return Err(SubmitError::Exhausted {
                    attempts: attempt,
                    last: err,
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::Membership;
    use crate::network::transport::{Connector, PeerChannel};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::VecDeque;

    /// What the scripted channel does on one send.
    #[derive(Clone)]
    enum Step {
        Fail,
        Hang,
        Answer(Response),
    }

    /// One script shared across every channel the connector hands out, so
    /// reconnects do not reset it.
    #[derive(Default)]
    struct Script {
        steps: Mutex<VecDeque<Step>>,
        seen_ids: Mutex<Vec<String>>,
        /// Which channel (1-based, in connect order) carried each send.
        seen_channels: Mutex<Vec<usize>>,
        opened: Mutex<usize>,
        /// Only the first connect succeeds.
        refuse_reconnects: bool,
    }

    struct ScriptedChannel {
        script: Arc<Script>,
        index: usize,
    }

    #[async_trait]
    impl PeerChannel for ScriptedChannel {
        async fn process_transaction(
            &self,
            tx: &SignedTransaction,
        ) -> Result<Response, TransportError> {
            self.script.seen_ids.lock().push(tx.id.clone());
            self.script.seen_channels.lock().push(self.index);
            let step = self
                .script
                .steps
                .lock()
                .pop_front()
                .unwrap_or(Step::Answer(Response::success("")));
            match step {
                Step::Fail => Err(TransportError::Connect("refused".into())),
                Step::Hang => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Ok(Response::success("late"))
                }
                Step::Answer(r) => Ok(r),
            }
        }
    }

    struct ScriptedConnector(Arc<Script>);

    #[async_trait]
    impl Connector for ScriptedConnector {
        async fn connect(&self) -> Result<Arc<dyn PeerChannel>, TransportError> {
            let mut opened = self.0.opened.lock();
            if *opened > 0 && self.0.refuse_reconnects {
                return Err(TransportError::Connect("peer down".into()));
            }
            *opened += 1;
            Ok(Arc::new(ScriptedChannel {
                script: Arc::clone(&self.0),
                index: *opened,
            }))
        }
    }

    async fn submitter(
        steps: Vec<Step>,
        max_attempts: u32,
    ) -> (TransactionSubmitter, Arc<Script>) {
        let script = Script {
            steps: Mutex::new(steps.into()),
            ..Default::default()
        };
        submitter_over(script, max_attempts).await
    }

    async fn submitter_over(
        script: Script,
        max_attempts: u32,
    ) -> (TransactionSubmitter, Arc<Script>) {
        let script = Arc::new(script);
        let session = PeerSession::connect(Arc::new(ScriptedConnector(Arc::clone(&script))))
            .await
            .unwrap();

        let membership = Membership::new();
        membership.register("lukas", "pw").unwrap();
        let client = membership.init_client("lukas").unwrap();

        let config = SubmitterConfig::new(ChaincodeId::from_path("github.com/acme/blue"))
            .with_max_attempts(max_attempts);
        (
            TransactionSubmitter::new(Arc::new(session), Arc::new(client), config),
            script,
        )
    }

    fn args() -> Vec<String> {
        vec!["a".into(), "b".into(), "10".into(), "USD".into(), "t".into()]
    }

    #[tokio::test]
    async fn succeeds_first_time_without_reconnect() {
        let (s, _) = submitter(vec![], 3).await;
        let r = s.submit("send", args()).await.unwrap();
        assert!(r.is_success());
        assert_eq!(s.session().reconnects(), 0);
    }

    #[tokio::test]
    async fn recovers_when_failures_stay_below_the_bound() {
        let (s, script) = submitter(vec![Step::Fail, Step::Fail], 3).await;
        let r = s.submit("send", args()).await.unwrap();

        assert!(r.is_success());
        assert_eq!(s.session().reconnects(), 2);
        assert_eq!(script.seen_ids.lock().len(), 3);
    }

    #[tokio::test]
    async fn exhausts_when_failures_reach_the_bound() {
        let (s, script) = submitter(vec![Step::Fail, Step::Fail, Step::Fail], 3).await;
        let err = s.submit("send", args()).await.unwrap_err();

        let SubmitError::Exhausted { attempts, last } = err;
        assert_eq!(attempts, 3);
        assert_eq!(last, TransportError::Connect("refused".into()));
        assert_eq!(s.session().reconnects(), 3);
        assert_eq!(script.seen_ids.lock().len(), 3);
    }

    #[tokio::test]
    async fn failed_reconnect_keeps_the_old_channel_and_moves_on() {
        let script = Script {
            steps: Mutex::new(vec![Step::Fail, Step::Fail].into()),
            refuse_reconnects: true,
            ..Default::default()
        };
        let (s, script) = submitter_over(script, 3).await;
        let r = s.submit("send", args()).await.unwrap();

        assert!(r.is_success());
        // Both reconnects were refused, so every attempt went out on the
        // first channel.
        assert_eq!(*script.seen_channels.lock(), vec![1, 1, 1]);
        assert_eq!(s.session().generation(), 0);
        assert_eq!(s.session().reconnects(), 2);
    }

    #[tokio::test]
    async fn failed_reconnects_do_not_extend_the_attempt_bound() {
        let script = Script {
            steps: Mutex::new(vec![Step::Fail; 5].into()),
            refuse_reconnects: true,
            ..Default::default()
        };
        let (s, script) = submitter_over(script, 3).await;

        let SubmitError::Exhausted { attempts, .. } = s.submit("send", args()).await.unwrap_err();
        assert_eq!(attempts, 3);
        assert_eq!(script.seen_channels.lock().len(), 3);
        assert_eq!(s.session().reconnects(), 3);
        assert_eq!(*script.opened.lock(), 1);
    }

    #[tokio::test]
    async fn retries_resend_the_same_transaction() {
        let (s, script) = submitter(vec![Step::Fail, Step::Fail], 3).await;
        s.submit("send", args()).await.unwrap();

        let ids = script.seen_ids.lock();
        assert_eq!(ids.len(), 3);
        assert!(ids.iter().all(|id| id == &ids[0]));
    }

    #[tokio::test]
    async fn application_rejection_is_not_retried() {
        let rejection = Response::failure("duplicate record in table 'send'");
        let (s, script) = submitter(vec![Step::Answer(rejection.clone())], 3).await;

        let r = s.submit("send", args()).await.unwrap();
        assert_eq!(r, rejection);
        assert_eq!(s.session().reconnects(), 0);
        assert_eq!(script.seen_ids.lock().len(), 1);
    }

    #[tokio::test]
    async fn zero_attempts_still_sends_once() {
        let (s, script) = submitter(vec![Step::Fail], 0).await;
        assert_eq!(s.config().max_attempts, 1);
        assert!(s.submit("send", args()).await.is_err());
        assert_eq!(script.seen_ids.lock().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn hung_peer_times_out_and_is_retried() {
        let (s, script) = submitter(vec![Step::Hang], 3).await;
        let r = s.submit("send", args()).await.unwrap();

        assert!(r.is_success());
        assert_eq!(s.session().reconnects(), 1);
        assert_eq!(script.seen_ids.lock().len(), 2);
    }

    #[tokio::test]
    async fn every_submission_gets_a_fresh_nonce() {
        let (s, script) = submitter(vec![], 3).await;
        s.submit("send", args()).await.unwrap();
        s.submit("send", args()).await.unwrap();

        let ids = script.seen_ids.lock();
        assert_ne!(ids[0], ids[1]);
    }

    #[tokio::test]
    async fn deploy_builds_a_deploy_transaction() {
        let (s, _) = submitter(vec![], 3).await;
        let tx = s.build(TransactionKind::Deploy, "init", vec![]);
        assert_eq!(tx.kind, TransactionKind::Deploy);
        assert!(tx.spec.input.args.is_empty());
        assert!(s.deploy("init", vec![]).await.unwrap().is_success());
    }
}
