//! sled-backed table store for `blue-node peer`.
//!
//! ## Tree Layout
//!
//! | Tree           | Key                   | Value                  |
//! |----------------|-----------------------|------------------------|
//! | `schemas`      | table name (UTF-8)    | `bincode(TableSchema)` |
//! | `table:<name>` | encoded composite key | `bincode(Row)`         |
//!
//! Table creation and row insertion are both `compare_and_swap` against an
//! absent value, so concurrent writers can never overwrite each other.
//! Every successful write is flushed before returning.

use sled::{Db, Tree};
use std::path::Path;
use tracing::debug;

use super::{ColumnDefinition, ColumnValue, Row, TableError, TableSchema, TableStore};

#[derive(Debug, Clone)]
pub struct SledTableStore {
    db: Db,
    schemas: Tree,
}

impl SledTableStore {
    /// Opens (or creates) a store at `path`. Existing tables and rows are
    /// available immediately.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, TableError> {
        Self::from_db(sled::open(path)?)
    }

    /// A store that lives in a temporary directory and vanishes on drop.
    pub fn open_temporary() -> Result<Self, TableError> {
        Self::from_db(sled::Config::new().temporary(true).open()?)
    }

    fn from_db(db: Db) -> Result<Self, TableError> {
        let schemas = db.open_tree("schemas")?;
        Ok(Self { db, schemas })
    }

    fn schema(&self, table: &str) -> Result<TableSchema, TableError> {
        let bytes = self
            .schemas
            .get(table.as_bytes())?
            .ok_or_else(|| TableError::TableNotFound(table.to_string()))?;
        bincode::deserialize(&bytes).map_err(|e| TableError::Serialization(e.to_string()))
    }

    fn rows(&self, table: &str) -> Result<Tree, TableError> {
        Ok(self.db.open_tree(format!("table:{table}"))?)
    }
}

impl TableStore for SledTableStore {
    fn create_table(&self, name: &str, columns: Vec<ColumnDefinition>) -> Result<(), TableError> {
        let schema = TableSchema::new(name, columns)?;
        let encoded =
            bincode::serialize(&schema).map_err(|e| TableError::Serialization(e.to_string()))?;

        self.schemas
            .compare_and_swap(name.as_bytes(), None as Option<&[u8]>, Some(encoded))?
            .map_err(|_| TableError::TableExists(name.to_string()))?;
        self.db.flush()?;

        debug!(table = name, "created table");
        Ok(())
    }

    fn insert_row(&self, table: &str, row: Row) -> Result<bool, TableError> {
        let schema = self.schema(table)?;
        let key = schema.key_of(&row)?;
        let encoded =
            bincode::serialize(&row).map_err(|e| TableError::Serialization(e.to_string()))?;

        let inserted = self
            .rows(table)?
            .compare_and_swap(key, None as Option<&[u8]>, Some(encoded))?
            .is_ok();
        if inserted {
            self.db.flush()?;
        }
        Ok(inserted)
    }

    fn get_row(&self, table: &str, key: &[ColumnValue]) -> Result<Option<Row>, TableError> {
        let schema = self.schema(table)?;
        let key = schema.encode_lookup(key)?;
        match self.rows(table)?.get(key)? {
            Some(bytes) => bincode::deserialize(&bytes)
                .map(Some)
                .map_err(|e| TableError::Serialization(e.to_string())),
            None => Ok(None),
        }
    }

    fn row_count(&self, table: &str) -> Result<usize, TableError> {
        self.schema(table)?;
        Ok(self.rows(table)?.len())
    }
}
