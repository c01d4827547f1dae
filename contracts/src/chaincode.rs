//! # Contract Dispatcher
//!
//! The single entry point the ledger runtime calls. `init` provisions the
//! tables, `invoke` routes on the function name carried beside the
//! operands, and `query` has no read path.
//!
//! Operands arrive as `[sender, receiver, amount, currency, timestamp]` for
//! `send` and `[sender, takerGets, takerPays, timestamp]` for `offer`. The
//! timestamp moves to the front when the record is built, which defines the
//! key order used for uniqueness.

use blue_protocol::config::{FUNCTION_OFFER, FUNCTION_SEND, OFFER_ARG_COUNT, SEND_ARG_COUNT};
use blue_protocol::transaction::{Amount, AssetAmount, ValueError};
use tracing::{debug, warn};

use crate::error::ContractError;
use crate::records::{OfferRecord, SendRecord, TableHandler};
use crate::store::TableStore;

/// Lifecycle interface a ledger host drives.
///
/// `stub` is the table store scoped to the current transaction. Returned
/// bytes become the response message.
pub trait Chaincode: Send + Sync {
    fn init(
        &self,
        stub: &dyn TableStore,
        function: &str,
        args: &[String],
    ) -> Result<Vec<u8>, ContractError>;

    fn invoke(
        &self,
        stub: &dyn TableStore,
        function: &str,
        args: &[String],
    ) -> Result<Vec<u8>, ContractError>;

    fn query(
        &self,
        stub: &dyn TableStore,
        function: &str,
        args: &[String],
    ) -> Result<Vec<u8>, ContractError>;
}

/// The send/offer recording contract.
#[derive(Debug, Default, Clone, Copy)]
pub struct BlueChaincode;

impl BlueChaincode {
    fn send(&self, stub: &dyn TableStore, args: &[String]) -> Result<Vec<u8>, ContractError> {
        let [sender, receiver, amount, currency, timestamp] =
            expect_args::<SEND_ARG_COUNT>(FUNCTION_SEND, args)?;

        let record = SendRecord {
            timestamp: timestamp.clone(),
            sender: sender.clone(),
            receiver: receiver.clone(),
            amount: amount.parse::<Amount>().map_err(invalid("amount"))?,
            currency: currency.clone(),
        };
        TableHandler::new(stub).record_send(record)?;
        Ok(Vec::new())
    }

    fn offer(&self, stub: &dyn TableStore, args: &[String]) -> Result<Vec<u8>, ContractError> {
        let [sender, taker_gets, taker_pays, timestamp] =
            expect_args::<OFFER_ARG_COUNT>(FUNCTION_OFFER, args)?;

        let record = OfferRecord {
            timestamp: timestamp.clone(),
            sender: sender.clone(),
            taker_gets: taker_gets
                .parse::<AssetAmount>()
                .map_err(invalid("takerGets"))?,
            taker_pays: taker_pays
                .parse::<AssetAmount>()
                .map_err(invalid("takerPays"))?,
        };
        TableHandler::new(stub).record_offer(record)?;
        Ok(Vec::new())
    }
}

impl Chaincode for BlueChaincode {
    fn init(
        &self,
        stub: &dyn TableStore,
        function: &str,
        args: &[String],
    ) -> Result<Vec<u8>, ContractError> {
        expect_args::<0>(function, args)?;
        TableHandler::new(stub).create_schema()?;
        Ok(Vec::new())
    }

    fn invoke(
        &self,
        stub: &dyn TableStore,
        function: &str,
        args: &[String],
    ) -> Result<Vec<u8>, ContractError> {
        debug!(function, args = args.len(), "invoke");
        match function {
            FUNCTION_SEND => self.send(stub, args),
            FUNCTION_OFFER => self.offer(stub, args),
            other => {
                warn!(function = other, "unknown invoke function");
                Err(ContractError::UnknownFunction {
                    kind: "invoke",
                    function: other.to_string(),
                })
            }
        }
    }

    fn query(
        &self,
        _stub: &dyn TableStore,
        function: &str,
        _args: &[String],
    ) -> Result<Vec<u8>, ContractError> {
        Err(ContractError::UnknownFunction {
            kind: "query",
            function: function.to_string(),
        })
    }
}

fn expect_args<'a, const N: usize>(
    function: &str,
    args: &'a [String],
) -> Result<&'a [String; N], ContractError> {
    args.try_into().map_err(|_| ContractError::ArgumentCount {
        function: function.to_string(),
        expected: N,
        got: args.len(),
    })
}

fn invalid(name: &'static str) -> impl Fn(ValueError) -> ContractError {
    move |source| ContractError::InvalidArgument { name, source }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{OFFER_TABLE, SEND_TABLE};
    use crate::store::{ColumnValue, MemoryTableStore, Row};

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    fn deployed() -> MemoryTableStore {
        let store = MemoryTableStore::new();
        BlueChaincode.init(&store, "init", &[]).unwrap();
        store
    }

    #[test]
    fn init_creates_both_tables() {
        let store = deployed();
        assert_eq!(store.row_count(SEND_TABLE).unwrap(), 0);
        assert_eq!(store.row_count(OFFER_TABLE).unwrap(), 0);
    }

    #[test]
    fn second_init_fails_schema_creation() {
        let store = deployed();
        assert!(matches!(
            BlueChaincode.init(&store, "init", &[]),
            Err(ContractError::SchemaCreation(_))
        ));
    }

    #[test]
    fn init_rejects_arguments() {
        let store = MemoryTableStore::new();
        assert!(matches!(
            BlueChaincode.init(&store, "init", &args(&["x"])),
            Err(ContractError::ArgumentCount { expected: 0, got: 1, .. })
        ));
        // Nothing was provisioned.
        assert!(store.row_count(SEND_TABLE).is_err());
    }

    #[test]
    fn send_reorders_timestamp_to_the_front() {
        let store = deployed();
        BlueChaincode
            .invoke(&store, "send", &args(&["A", "B", "10", "USD", "T1"]))
            .unwrap();

        let row = store
            .get_row(SEND_TABLE, &["T1".into(), "A".into(), "B".into(), "10".into()])
            .unwrap();
        assert_eq!(
            row,
            Some(Row::new(vec![
                "T1".into(),
                "A".into(),
                "B".into(),
                "10".into(),
                ColumnValue::String("USD".into()),
            ]))
        );
    }

    #[test]
    fn offer_reorders_timestamp_to_the_front() {
        let store = deployed();
        BlueChaincode
            .invoke(&store, "offer", &args(&["alice", "10XRP", "5USD", "T1"]))
            .unwrap();

        let row = store
            .get_row(
                OFFER_TABLE,
                &["T1".into(), "alice".into(), "10XRP".into(), "5USD".into()],
            )
            .unwrap()
            .unwrap();
        assert_eq!(row.columns[0].as_str(), Some("T1"));
        assert_eq!(row.columns[2].as_str(), Some("10XRP"));
    }

    #[test]
    fn wrong_argument_counts_insert_nothing() {
        let store = deployed();

        for n in [0, 4, 6] {
            let a: Vec<String> = (0..n).map(|i| i.to_string()).collect();
            assert!(matches!(
                BlueChaincode.invoke(&store, "send", &a),
                Err(ContractError::ArgumentCount { expected: 5, .. })
            ));
        }
        for n in [3, 5] {
            let a: Vec<String> = (0..n).map(|i| i.to_string()).collect();
            assert!(matches!(
                BlueChaincode.invoke(&store, "offer", &a),
                Err(ContractError::ArgumentCount { expected: 4, .. })
            ));
        }

        assert_eq!(store.row_count(SEND_TABLE).unwrap(), 0);
        assert_eq!(store.row_count(OFFER_TABLE).unwrap(), 0);
    }

    #[test]
    fn duplicate_send_is_reported() {
        let store = deployed();
        let a = args(&["A", "B", "10", "USD", "T1"]);

        BlueChaincode.invoke(&store, "send", &a).unwrap();
        let err = BlueChaincode.invoke(&store, "send", &a).unwrap_err();
        assert_eq!(err.to_string(), "duplicate record in table 'send'");
    }

    #[test]
    fn unparseable_amount_is_an_invalid_argument() {
        let store = deployed();
        let err = BlueChaincode
            .invoke(&store, "send", &args(&["A", "B", "ten", "USD", "T1"]))
            .unwrap_err();
        assert!(matches!(
            err,
            ContractError::InvalidArgument { name: "amount", .. }
        ));
        assert_eq!(store.row_count(SEND_TABLE).unwrap(), 0);
    }

    #[test]
    fn unknown_invoke_function_is_rejected() {
        let store = deployed();
        let err = BlueChaincode.invoke(&store, "burn", &[]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "received unknown function invoke invocation with function 'burn'"
        );
    }

    #[test]
    fn every_query_is_rejected() {
        let store = deployed();
        for function in ["send", "offer", "anything"] {
            assert!(matches!(
                BlueChaincode.query(&store, function, &[]),
                Err(ContractError::UnknownFunction { kind: "query", .. })
            ));
        }
    }
}
