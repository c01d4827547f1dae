//! # Contract Host
//!
//! The ledger-side runtime around a [`Chaincode`]: verifies incoming
//! transactions, serialises execution, and remembers what it already ran.
//!
//! ## Processing order
//!
//! 1. Signature and certificate must verify (otherwise status 400).
//! 2. The chaincode name must match the hosted one (otherwise 404).
//! 3. A transaction id seen before returns the recorded response without
//!    executing again, provided the signature matches the one recorded.
//!    The submitter resends the same envelope after transport failures, and
//!    this is what keeps those resends harmless. A different transaction
//!    reusing a known id is rejected with 400.
//! 4. `Deploy` runs `init`, `Invoke` runs `invoke`, `Query` runs `query`,
//!    all under one host-wide lock.
//! 5. `Ok` maps to status 200, `Err` to status 500 with the error text.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tracing::{debug, info, warn};

use blue_protocol::config::DEFAULT_REPLAY_CAPACITY;
use blue_protocol::network::{Connector, PeerChannel, TransportError};
use blue_protocol::transaction::{ChaincodeId, Response, SignedTransaction, TransactionKind};

use crate::chaincode::{BlueChaincode, Chaincode};
use crate::store::TableStore;

// ---------------------------------------------------------------------------
// Replay cache
// ---------------------------------------------------------------------------

struct Executed {
    /// Hex signature of the envelope that ran. Resends carry the same one.
    signature: String,
    response: Response,
}

/// Executed transactions by id, forgotten oldest-first once `capacity` is
/// reached.
struct ReplayCache {
    capacity: usize,
    entries: HashMap<String, Executed>,
    order: VecDeque<String>,
}

impl ReplayCache {
    fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn get(&self, id: &str) -> Option<&Executed> {
        self.entries.get(id)
    }

    /// `id` must not be present yet.
    fn insert(&mut self, id: String, executed: Executed) {
        while self.entries.len() >= self.capacity {
            let Some(oldest) = self.order.pop_front() else {
                break;
            };
            self.entries.remove(&oldest);
            debug!(tx_id = %oldest, "forgot oldest executed transaction");
        }
        self.order.push_back(id.clone());
        self.entries.insert(id, executed);
    }
}

// ---------------------------------------------------------------------------
// Host
// ---------------------------------------------------------------------------

pub struct ContractHost {
    chaincode_id: ChaincodeId,
    chaincode: Box<dyn Chaincode>,
    store: Arc<dyn TableStore>,
    /// The mutex doubles as the execution lock.
    processed: Mutex<ReplayCache>,
}

impl ContractHost {
    pub fn new(
        chaincode_id: ChaincodeId,
        chaincode: Box<dyn Chaincode>,
        store: Arc<dyn TableStore>,
    ) -> Self {
        Self {
            chaincode_id,
            chaincode,
            store,
            processed: Mutex::new(ReplayCache::new(DEFAULT_REPLAY_CAPACITY)),
        }
    }

    /// Caps how many executed transactions are remembered for replay
    /// (at least one).
    pub fn with_replay_capacity(self, capacity: usize) -> Self {
        Self {
            processed: Mutex::new(ReplayCache::new(capacity)),
            ..self
        }
    }

    /// Hosts [`BlueChaincode`] under the name derived from `path`.
    pub fn blue(path: &str, store: Arc<dyn TableStore>) -> Self {
        Self::new(ChaincodeId::from_path(path), Box::new(BlueChaincode), store)
    }

    pub fn chaincode_id(&self) -> &ChaincodeId {
        &self.chaincode_id
    }

    pub fn store(&self) -> &Arc<dyn TableStore> {
        &self.store
    }

    /// Executed transactions currently remembered for replay.
    pub fn processed_count(&self) -> usize {
        self.processed.lock().len()
    }

    pub fn process(&self, tx: &SignedTransaction) -> Response {
        if let Err(e) = tx.verify() {
            warn!(tx_id = %tx.id, error = %e, "rejecting unverifiable transaction");
            return Response::rejected(format!("invalid transaction: {e}"));
        }

        if tx.spec.chaincode_id.name != self.chaincode_id.name {
            warn!(
                tx_id = %tx.id,
                chaincode = %tx.spec.chaincode_id.name,
                "transaction targets unknown chaincode"
            );
            return Response::not_found(format!(
                "chaincode '{}' is not deployed",
                tx.spec.chaincode_id.path
            ));
        }

        let mut processed = self.processed.lock();
        if let Some(previous) = processed.get(&tx.id) {
            if previous.signature != tx.signature {
                warn!(tx_id = %tx.id, "transaction id reused by a different transaction");
                return Response::rejected(format!(
                    "transaction id {} was already used by a different transaction",
                    tx.id
                ));
            }
            debug!(tx_id = %tx.id, "duplicate transaction id, replaying response");
            return previous.response.clone();
        }

        let input = &tx.spec.input;
        let stub = self.store.as_ref();
        let result = match tx.kind {
            TransactionKind::Deploy => self.chaincode.init(stub, &input.function, &input.args),
            TransactionKind::Invoke => self.chaincode.invoke(stub, &input.function, &input.args),
            TransactionKind::Query => self.chaincode.query(stub, &input.function, &input.args),
        };

        let response = match result {
            Ok(payload) => {
                info!(
                    tx_id = %tx.id,
                    kind = %tx.kind,
                    function = %input.function,
                    confidentiality = %tx.spec.confidentiality,
                    "transaction executed"
                );
                Response::success(String::from_utf8_lossy(&payload))
            }
            Err(e) => {
                warn!(
                    tx_id = %tx.id,
                    kind = %tx.kind,
                    function = %input.function,
                    error = %e,
                    "chaincode returned an error"
                );
                Response::failure(e.to_string())
            }
        };

        processed.insert(
            tx.id.clone(),
            Executed {
                signature: tx.signature.clone(),
                response: response.clone(),
            },
        );
        response
    }
}

impl std::fmt::Debug for ContractHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContractHost")
            .field("chaincode_id", &self.chaincode_id)
            .field("processed", &self.processed_count())
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// In-process transport
// ---------------------------------------------------------------------------

/// Connects a submitter straight to a [`ContractHost`] in the same process.
#[derive(Debug, Clone)]
pub struct LocalConnector {
    host: Arc<ContractHost>,
}

impl LocalConnector {
    pub fn new(host: Arc<ContractHost>) -> Self {
        Self { host }
    }
}

#[async_trait]
impl Connector for LocalConnector {
    async fn connect(&self) -> Result<Arc<dyn PeerChannel>, TransportError> {
        Ok(Arc::new(LocalChannel {
            host: Arc::clone(&self.host),
        }))
    }
}

struct LocalChannel {
    host: Arc<ContractHost>,
}

#[async_trait]
impl PeerChannel for LocalChannel {
    async fn process_transaction(
        &self,
        tx: &SignedTransaction,
    ) -> Result<Response, TransportError> {
        // Execution may flush the store to disk.
        let host = Arc::clone(&self.host);
        let tx = tx.clone();
        tokio::task::spawn_blocking(move || host.process(&tx))
            .await
            .map_err(|e| TransportError::Closed(format!("contract execution aborted: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::SEND_TABLE;
    use crate::store::MemoryTableStore;
    use blue_protocol::identity::Membership;
    use blue_protocol::transaction::{ChaincodeInput, ChaincodeSpec, ConfidentialityLevel};

    const PATH: &str = "github.com/acme/blue";
    const SEND_ARGS: [&str; 5] = ["A", "B", "10", "USD", "T1"];

    fn tx(
        id: &str,
        kind: TransactionKind,
        path: &str,
        function: &str,
        args: &[&str],
    ) -> SignedTransaction {
        let m = Membership::new();
        m.register("lukas", "pw").unwrap();
        let spec = ChaincodeSpec {
            chaincode_id: ChaincodeId::from_path(path),
            input: ChaincodeInput::new(function, args.iter().map(|s| s.to_string()).collect()),
            confidentiality: ConfidentialityLevel::Public,
        };
        m.init_client("lukas")
            .unwrap()
            .new_transaction_handler()
            .build(kind, spec, id.to_string())
    }

    fn deployed_host() -> ContractHost {
        let host = ContractHost::blue(PATH, Arc::new(MemoryTableStore::new()));
        let deploy = tx("deploy", TransactionKind::Deploy, PATH, "init", &[]);
        assert!(host.process(&deploy).is_success());
        host
    }

    #[test]
    fn invoke_records_a_row() {
        let host = deployed_host();
        let r = host.process(&tx("t1", TransactionKind::Invoke, PATH, "send", &SEND_ARGS));
        assert!(r.is_success());
        assert_eq!(host.store().row_count(SEND_TABLE).unwrap(), 1);
    }

    #[test]
    fn resent_transaction_is_replayed_not_reexecuted() {
        let host = deployed_host();
        let send = tx("t1", TransactionKind::Invoke, PATH, "send", &SEND_ARGS);

        assert!(host.process(&send).is_success());
        // Same envelope again: the recorded success comes back instead of a
        // duplicate-record failure.
        assert!(host.process(&send).is_success());
        assert_eq!(host.store().row_count(SEND_TABLE).unwrap(), 1);
        assert_eq!(host.processed_count(), 2);
    }

    #[test]
    fn reused_id_with_different_content_is_rejected_not_replayed() {
        let host = deployed_host();
        let first = tx("shared-id", TransactionKind::Invoke, PATH, "send", &SEND_ARGS);
        assert!(host.process(&first).is_success());

        let other_args = ["C", "D", "20", "EUR", "T2"];
        let second = tx("shared-id", TransactionKind::Invoke, PATH, "send", &other_args);
        let r = host.process(&second);

        assert_eq!(r.status, Response::BAD_REQUEST);
        assert!(r.message.contains("already used by a different transaction"));
        assert_eq!(host.store().row_count(SEND_TABLE).unwrap(), 1);

        // The original envelope still replays its own answer.
        assert!(host.process(&first).is_success());
    }

    #[test]
    fn replay_memory_stays_within_capacity() {
        let host = ContractHost::blue(PATH, Arc::new(MemoryTableStore::new()))
            .with_replay_capacity(16);
        for i in 0..200 {
            let q = tx(&format!("q{i}"), TransactionKind::Query, PATH, "send", &[]);
            host.process(&q);
            assert!(host.processed_count() <= 16);
        }
        assert_eq!(host.processed_count(), 16);
    }

    #[test]
    fn oldest_transaction_is_forgotten_first() {
        let host = ContractHost::blue(PATH, Arc::new(MemoryTableStore::new()))
            .with_replay_capacity(2);
        let deploy = tx("deploy", TransactionKind::Deploy, PATH, "init", &[]);
        assert!(host.process(&deploy).is_success());
        let send = tx("t1", TransactionKind::Invoke, PATH, "send", &SEND_ARGS);
        assert!(host.process(&send).is_success());
        host.process(&tx("q1", TransactionKind::Query, PATH, "send", &[]));

        // `t1` is still remembered and replays its success.
        assert!(host.process(&send).is_success());
        assert_eq!(host.store().row_count(SEND_TABLE).unwrap(), 1);
        // `deploy` was evicted, so it runs again and its tables already exist.
        assert_eq!(host.process(&deploy).status, Response::FAILURE);
        assert_eq!(host.processed_count(), 2);
    }

    #[test]
    fn new_transaction_with_same_operands_is_a_duplicate() {
        let host = deployed_host();
        host.process(&tx("t1", TransactionKind::Invoke, PATH, "send", &SEND_ARGS));

        let r = host.process(&tx("t2", TransactionKind::Invoke, PATH, "send", &SEND_ARGS));
        assert_eq!(r.status, Response::FAILURE);
        assert_eq!(r.message, "duplicate record in table 'send'");
    }

    #[test]
    fn tampered_transaction_is_rejected_before_execution() {
        let host = deployed_host();
        let mut send = tx("t1", TransactionKind::Invoke, PATH, "send", &SEND_ARGS);
        send.spec.input.args[2] = "1000".into();

        let r = host.process(&send);
        assert_eq!(r.status, Response::BAD_REQUEST);
        assert_eq!(host.store().row_count(SEND_TABLE).unwrap(), 0);
    }

    #[test]
    fn other_chaincode_is_not_found() {
        let host = deployed_host();
        let other = "github.com/acme/red";
        let r = host.process(&tx("t1", TransactionKind::Invoke, other, "send", &SEND_ARGS));
        assert_eq!(r.status, Response::NOT_FOUND);
    }

    #[test]
    fn query_is_a_failure_response() {
        let host = deployed_host();
        let r = host.process(&tx("q1", TransactionKind::Query, PATH, "send", &[]));
        assert_eq!(r.status, Response::FAILURE);
        assert!(r.message.contains("unknown function query"));
    }

    #[tokio::test]
    async fn local_connector_reaches_the_host() {
        let host = Arc::new(ContractHost::blue(PATH, Arc::new(MemoryTableStore::new())));
        let channel = LocalConnector::new(Arc::clone(&host)).connect().await.unwrap();

        let deploy = tx("deploy", TransactionKind::Deploy, PATH, "init", &[]);
        let r = channel.process_transaction(&deploy).await.unwrap();
        assert!(r.is_success());
        assert_eq!(host.processed_count(), 1);
    }
}
