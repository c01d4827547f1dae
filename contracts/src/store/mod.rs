//! # Ledger Table Store
//!
//! A small typed-table abstraction: a table has an ordered list of columns,
//! some of which are flagged as key columns. The ordered key-column values
//! of a row form its composite key, and a table holds at most one row per
//! composite key.
//!
//! ## Key Encoding
//!
//! Composite keys are encoded as a sequence of `(type tag, length, bytes)`
//! triples:
//!
//! | Type     | Tag  | Payload                    |
//! |----------|------|----------------------------|
//! | `String` | 0x01 | u32 BE length + UTF-8      |
//! | `Int64`  | 0x02 | u32 BE length (8) + i64 BE |
//! | `Bool`   | 0x03 | u32 BE length (1) + 0/1    |
//!
//! The length prefix keeps `("ab", "c")` and `("a", "bc")` apart.
//!
//! Two implementations ship: [`MemoryTableStore`] and the sled-backed
//! [`SledTableStore`].

pub mod memory;
pub mod persistent;

pub use memory::MemoryTableStore;
pub use persistent::SledTableStore;

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum TableError {
    #[error("table '{0}' already exists")]
    TableExists(String),

    #[error("table '{0}' does not exist")]
    TableNotFound(String),

    #[error("invalid schema for table '{table}': {reason}")]
    InvalidSchema { table: String, reason: String },

    #[error("table '{table}' expects {expected} column(s), got {got}")]
    ColumnCount {
        table: String,
        expected: usize,
        got: usize,
    },

    #[error("column '{column}' of table '{table}' is {expected}, got {got}")]
    ColumnType {
        table: String,
        column: String,
        expected: ColumnType,
        got: ColumnType,
    },

    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    #[error("serialization error: {0}")]
    Serialization(String),
}

// ---------------------------------------------------------------------------
// Columns and rows
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnType {
    String,
    Int64,
    Bool,
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnType::String => write!(f, "string"),
            ColumnType::Int64 => write!(f, "int64"),
            ColumnType::Bool => write!(f, "bool"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDefinition {
    pub name: String,
    pub column_type: ColumnType,
    /// Part of the composite key.
    pub key: bool,
}

impl ColumnDefinition {
    pub fn key_column(name: &str, column_type: ColumnType) -> Self {
        Self {
            name: name.to_string(),
            column_type,
            key: true,
        }
    }

    pub fn data_column(name: &str, column_type: ColumnType) -> Self {
        Self {
            name: name.to_string(),
            column_type,
            key: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnValue {
    String(String),
    Int64(i64),
    Bool(bool),
}

impl ColumnValue {
    pub fn column_type(&self) -> ColumnType {
        match self {
            ColumnValue::String(_) => ColumnType::String,
            ColumnValue::Int64(_) => ColumnType::Int64,
            ColumnValue::Bool(_) => ColumnType::Bool,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ColumnValue::String(s) => Some(s),
            _ => None,
        }
    }

    fn encode_into(&self, buf: &mut Vec<u8>) {
        let (tag, bytes): (u8, Vec<u8>) = match self {
            ColumnValue::String(s) => (0x01, s.as_bytes().to_vec()),
            ColumnValue::Int64(n) => (0x02, n.to_be_bytes().to_vec()),
            ColumnValue::Bool(b) => (0x03, vec![u8::from(*b)]),
        };
        buf.push(tag);
        buf.extend_from_slice(&(bytes.len() as u32).to_be_bytes());
        buf.extend_from_slice(&bytes);
    }
}

impl From<&str> for ColumnValue {
    fn from(s: &str) -> Self {
        ColumnValue::String(s.to_string())
    }
}

impl From<String> for ColumnValue {
    fn from(s: String) -> Self {
        ColumnValue::String(s)
    }
}

/// One table row: a value per column, in column order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Row {
    pub columns: Vec<ColumnValue>,
}

impl Row {
    pub fn new(columns: Vec<ColumnValue>) -> Self {
        Self { columns }
    }
}

/// Encodes an ordered tuple of key values.
pub fn encode_key(values: &[ColumnValue]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(values.len() * 16);
    for value in values {
        value.encode_into(&mut buf);
    }
    buf
}

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

/// A validated table definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    name: String,
    columns: Vec<ColumnDefinition>,
}

impl TableSchema {
    /// Rejects empty definitions, keyless definitions and duplicate names.
    pub fn new(name: &str, columns: Vec<ColumnDefinition>) -> Result<Self, TableError> {
        let invalid = |reason: &str| TableError::InvalidSchema {
            table: name.to_string(),
            reason: reason.to_string(),
        };

        if name.is_empty() {
            return Err(invalid("table name is empty"));
        }
        if columns.is_empty() {
            return Err(invalid("no columns"));
        }
        if !columns.iter().any(|c| c.key) {
            return Err(invalid("no key column"));
        }
        let mut seen = HashSet::new();
        if !columns.iter().all(|c| seen.insert(c.name.as_str())) {
            return Err(invalid("duplicate column name"));
        }

        Ok(Self {
            name: name.to_string(),
            columns,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[ColumnDefinition] {
        &self.columns
    }

    pub fn key_columns(&self) -> impl Iterator<Item = &ColumnDefinition> + Clone {
        self.columns.iter().filter(|c| c.key)
    }

    /// Checks `row` against the schema and returns its encoded key.
    pub fn key_of(&self, row: &Row) -> Result<Vec<u8>, TableError> {
        self.check(self.columns.iter(), &row.columns)?;

        let key: Vec<ColumnValue> = self
            .columns
            .iter()
            .zip(&row.columns)
            .filter(|(def, _)| def.key)
            .map(|(_, value)| value.clone())
            .collect();
        Ok(encode_key(&key))
    }

    /// Checks a bare key tuple against the key columns and encodes it.
    pub fn encode_lookup(&self, key: &[ColumnValue]) -> Result<Vec<u8>, TableError> {
        self.check(self.key_columns(), key)?;
        Ok(encode_key(key))
    }

    fn check<'a>(
        &self,
        defs: impl Iterator<Item = &'a ColumnDefinition> + Clone,
        values: &[ColumnValue],
    ) -> Result<(), TableError> {
        let expected = defs.clone().count();
        if expected != values.len() {
            return Err(TableError::ColumnCount {
                table: self.name.clone(),
                expected,
                got: values.len(),
            });
        }
        for (def, value) in defs.zip(values) {
            if def.column_type != value.column_type() {
                return Err(TableError::ColumnType {
                    table: self.name.clone(),
                    column: def.name.clone(),
                    expected: def.column_type,
                    got: value.column_type(),
                });
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// TableStore
// ---------------------------------------------------------------------------

/// Ledger-side table storage.
///
/// Calls are synchronous and expected to run inside the ledger's own
/// transaction boundary (see `ContractHost`).
pub trait TableStore: Send + Sync {
    /// Declares a table. Fails with [`TableError::TableExists`] if the
    /// name is taken.
    fn create_table(&self, name: &str, columns: Vec<ColumnDefinition>) -> Result<(), TableError>;

    /// Inserts `row` unless a row with the same composite key exists.
    ///
    /// `Ok(false)` means "already there"; the existing row is untouched.
    fn insert_row(&self, table: &str, row: Row) -> Result<bool, TableError>;

    /// Looks a row up by its key-column values.
    fn get_row(&self, table: &str, key: &[ColumnValue]) -> Result<Option<Row>, TableError>;

    fn row_count(&self, table: &str) -> Result<usize, TableError>;
}

// ---------------------------------------------------------------------------
// Shared behaviour checks, run against every implementation
// ---------------------------------------------------------------------------
