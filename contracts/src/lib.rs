//! # Blue Ledger Contract
//!
//! The ledger half of Blue. A deployed [`BlueChaincode`] owns two tables,
//! `send` and `offer`, and appends one row per accepted invocation. A row
//! is rejected when its composite key already exists, which is the only
//! business rule the ledger enforces.
//!
//! ## Modules
//!
//! - **store**: Table schemas, the [`store::TableStore`] trait, an
//!   in-memory store and a sled-backed one.
//! - **records**: [`TableHandler`]: typed records to rows, duplicates to
//!   errors.
//! - **chaincode**: The dispatcher the runtime drives (`init`, `invoke`,
//!   `query`).
//! - **host**: [`ContractHost`]: verification, execution lock, replay of
//!   resent transactions, and an in-process transport.

pub mod chaincode;
pub mod error;
pub mod host;
pub mod records;
pub mod store;

pub use chaincode::{BlueChaincode, Chaincode};
pub use error::ContractError;
pub use host::{ContractHost, LocalConnector};
pub use records::{OfferRecord, SendRecord, TableHandler};
