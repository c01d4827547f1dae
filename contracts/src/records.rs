//! # Record Handler
//!
//! Shapes send and offer records into table rows and writes them. The
//! composite key of each table is what makes a record unique:
//!
//! | Table   | Key columns                                  | Data columns |
//! |---------|----------------------------------------------|--------------|
//! | `send`  | timestamp, sender, receiver, amount          | currency     |
//! | `offer` | timestamp, sender, takerGets, takerPays      |              |
//!
//! The timestamp comes first in both tables. Positional invoke arguments
//! carry it last; [`SendRecord`] and [`OfferRecord`] name every field so
//! the reordering happens exactly once, in the dispatcher.

use blue_protocol::transaction::{Amount, AssetAmount};
use tracing::{debug, info};

use crate::error::ContractError;
use crate::store::{ColumnDefinition, ColumnType, ColumnValue, Row, TableStore};

pub const SEND_TABLE: &str = "send";
pub const OFFER_TABLE: &str = "offer";

pub mod columns {
    pub const TIMESTAMP: &str = "timestamp";
    pub const SENDER: &str = "sender";
    pub const RECEIVER: &str = "receiver";
    pub const AMOUNT: &str = "amount";
    pub const CURRENCY: &str = "currency";
    pub const TAKER_GETS: &str = "takerGets";
    pub const TAKER_PAYS: &str = "takerPays";
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// A direct transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendRecord {
    pub timestamp: String,
    pub sender: String,
    pub receiver: String,
    pub amount: Amount,
    pub currency: String,
}

impl SendRecord {
    /// The key columns, in table order.
    pub fn key(&self) -> Vec<ColumnValue> {
        vec![
            self.timestamp.as_str().into(),
            self.sender.as_str().into(),
            self.receiver.as_str().into(),
            self.amount.to_string().into(),
        ]
    }

    fn into_row(self) -> Row {
        let mut columns = self.key();
        columns.push(self.currency.into());
        Row::new(columns)
    }
}

/// A standing trade intent. Recorded only; nothing matches offers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OfferRecord {
    pub timestamp: String,
    pub sender: String,
    pub taker_gets: AssetAmount,
    pub taker_pays: AssetAmount,
}

impl OfferRecord {
    pub fn key(&self) -> Vec<ColumnValue> {
        vec![
            self.timestamp.as_str().into(),
            self.sender.as_str().into(),
            self.taker_gets.to_string().into(),
            self.taker_pays.to_string().into(),
        ]
    }

    fn into_row(self) -> Row {
        Row::new(self.key())
    }
}

// ---------------------------------------------------------------------------
// TableHandler
// ---------------------------------------------------------------------------

/// Writes records into a [`TableStore`].
pub struct TableHandler<'a> {
    store: &'a dyn TableStore,
}

impl<'a> TableHandler<'a> {
    pub fn new(store: &'a dyn TableStore) -> Self {
        Self { store }
    }

    /// Declares both tables. Fails if either already exists.
    pub fn create_schema(&self) -> Result<(), ContractError> {
        use columns::*;

        self.store
            .create_table(
                SEND_TABLE,
                vec![
                    ColumnDefinition::key_column(TIMESTAMP, ColumnType::String),
                    ColumnDefinition::key_column(SENDER, ColumnType::String),
                    ColumnDefinition::key_column(RECEIVER, ColumnType::String),
                    ColumnDefinition::key_column(AMOUNT, ColumnType::String),
                    ColumnDefinition::data_column(CURRENCY, ColumnType::String),
                ],
            )
            .map_err(ContractError::SchemaCreation)?;

        self.store
            .create_table(
                OFFER_TABLE,
                vec![
                    ColumnDefinition::key_column(TIMESTAMP, ColumnType::String),
                    ColumnDefinition::key_column(SENDER, ColumnType::String),
                    ColumnDefinition::key_column(TAKER_GETS, ColumnType::String),
                    ColumnDefinition::key_column(TAKER_PAYS, ColumnType::String),
                ],
            )
            .map_err(ContractError::SchemaCreation)?;

        info!("created send and offer tables");
        Ok(())
    }

    pub fn record_send(&self, record: SendRecord) -> Result<(), ContractError> {
        debug!(
            timestamp = %record.timestamp,
            sender = %record.sender,
            receiver = %record.receiver,
            amount = %record.amount,
            "recording send"
        );
        self.insert(SEND_TABLE, record.into_row())
    }

    pub fn record_offer(&self, record: OfferRecord) -> Result<(), ContractError> {
        debug!(
            timestamp = %record.timestamp,
            sender = %record.sender,
            taker_gets = %record.taker_gets,
            taker_pays = %record.taker_pays,
            "recording offer"
        );
        self.insert(OFFER_TABLE, record.into_row())
    }

    fn insert(&self, table: &str, row: Row) -> Result<(), ContractError> {
        if self.store.insert_row(table, row)? {
            Ok(())
        } else {
            Err(ContractError::DuplicateRecord {
                table: table.to_string(),
            })
        }
    }
}
