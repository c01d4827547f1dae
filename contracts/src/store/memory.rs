//! In-memory table store, used by the single-process gateway and tests.

use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};

use super::{ColumnDefinition, ColumnValue, Row, TableError, TableSchema, TableStore};

#[derive(Debug)]
struct MemoryTable {
    schema: TableSchema,
    rows: BTreeMap<Vec<u8>, Row>,
}

#[derive(Debug, Default)]
pub struct MemoryTableStore {
    tables: RwLock<HashMap<String, MemoryTable>>,
}

impl MemoryTableStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TableStore for MemoryTableStore {
    fn create_table(&self, name: &str, columns: Vec<ColumnDefinition>) -> Result<(), TableError> {
        let schema = TableSchema::new(name, columns)?;
        let mut tables = self.tables.write();
        if tables.contains_key(name) {
            return Err(TableError::TableExists(name.to_string()));
        }
        tables.insert(
            name.to_string(),
            MemoryTable {
                schema,
                rows: BTreeMap::new(),
            },
        );
        Ok(())
    }

    fn insert_row(&self, table: &str, row: Row) -> Result<bool, TableError> {
        let mut tables = self.tables.write();
        let t = tables
            .get_mut(table)
            .ok_or_else(|| TableError::TableNotFound(table.to_string()))?;

        let key = t.schema.key_of(&row)?;
        if t.rows.contains_key(&key) {
            return Ok(false);
        }
        t.rows.insert(key, row);
        Ok(true)
    }

    fn get_row(&self, table: &str, key: &[ColumnValue]) -> Result<Option<Row>, TableError> {
        let tables = self.tables.read();
        let t = tables
            .get(table)
            .ok_or_else(|| TableError::TableNotFound(table.to_string()))?;
        let key = t.schema.encode_lookup(key)?;
        Ok(t.rows.get(&key).cloned())
    }

    fn row_count(&self, table: &str) -> Result<usize, TableError> {
        self.tables
            .read()
            .get(table)
            .map(|t| t.rows.len())
            .ok_or_else(|| TableError::TableNotFound(table.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::conformance;

    #[test]
    fn memory_store_conformance() {
        conformance::run_all(|| Box::new(MemoryTableStore::new()) as Box<dyn TableStore>);
    }
}
