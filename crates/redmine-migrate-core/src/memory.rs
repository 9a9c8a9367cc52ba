//! In-memory row store, used for rehearsal runs and tests.

use std::collections::BTreeMap;

use crate::row::{Filter, Row, RowId, Value, ID_COLUMN};
use crate::store::{DestinationStore, SourceStore, StoreError, StoreOperation};

#[derive(Debug, Clone, Default)]
struct Table {
    rows: Vec<Row>,
    /// `None` once the largest representable id has been handed out.
    next_id: Option<i64>,
}

impl Table {
    fn starting_at(next_id: i64) -> Self {
        Self {
            rows: Vec::new(),
            next_id: Some(next_id),
        }
    }
}

/// Tables of rows kept in insertion order. Inserted rows receive sequential
/// ids starting at the store's id base.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    tables: BTreeMap<String, Table>,
    id_base: i64,
    snapshot: Option<BTreeMap<String, Table>>,
    #[cfg(test)]
    fail_inserts_into: Option<String>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::with_id_base(1)
    }

    /// Store whose first assigned id in every table is `id_base`.
    #[must_use]
    pub fn with_id_base(id_base: i64) -> Self {
        Self {
            tables: BTreeMap::new(),
            id_base,
            snapshot: None,
            #[cfg(test)]
            fail_inserts_into: None,
        }
    }

    /// Seed a row verbatim, keeping its `id` if it has one.
    pub fn seed(&mut self, table: &str, row: Row) -> &mut Self {
        let entry = self.table_mut(table);
        if let Some(Value::Integer(id)) = row.get(ID_COLUMN) {
            entry.next_id = match (entry.next_id, id.checked_add(1)) {
                (Some(current), Some(after)) => Some(current.max(after)),
                _ => None,
            };
        }
        entry.rows.push(row);
        self
    }

    /// Make every insert into `table` fail.
    #[cfg(test)]
    pub(crate) fn fail_inserts_into(&mut self, table: &str) {
        self.fail_inserts_into = Some(table.to_string());
    }

    #[must_use]
    pub fn rows(&self, table: &str) -> &[Row] {
        self.tables
            .get(table)
            .map_or(&[][..], |table| table.rows.as_slice())
    }

    #[must_use]
    pub fn row_count(&self, table: &str) -> usize {
        self.rows(table).len()
    }

    #[must_use]
    pub fn find(&self, table: &str, id: RowId) -> Option<&Row> {
        let id = Value::from(id);
        self.rows(table)
            .iter()
            .find(|row| row.get(ID_COLUMN) == Some(&id))
    }

    #[must_use]
    pub fn in_transaction(&self) -> bool {
        self.snapshot.is_some()
    }

    fn table_mut(&mut self, table: &str) -> &mut Table {
        let id_base = self.id_base;
        self.tables
            .entry(table.to_string())
            .or_insert_with(|| Table::starting_at(id_base))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceStore for MemoryStore {
    fn select(&self, table: &str, filter: &Filter) -> Result<Vec<Row>, StoreError> {
        let rows = self.rows(table);
        Ok(rows
            .iter()
            .filter(|row| filter.matches(row))
            .cloned()
            .collect())
    }
}

impl DestinationStore for MemoryStore {
    fn insert(&mut self, table: &str, row: &Row) -> Result<RowId, StoreError> {
        #[cfg(test)]
        {
            if self.fail_inserts_into.as_deref() == Some(table) {
                return Err(StoreError::new(
                    StoreOperation::Insert,
                    table,
                    "insert rejected by store",
                ));
            }
        }
        if row.contains_key(ID_COLUMN) {
            return Err(StoreError::new(
                StoreOperation::Insert,
                table,
                "row already carries an id; ids are assigned by the store",
            ));
        }

        let entry = self.table_mut(table);
        let Some(next_id) = entry.next_id else {
            return Err(StoreError::new(
                StoreOperation::Insert,
                table,
                "row ids exhausted",
            ));
        };
        let id = RowId(next_id);
        entry.next_id = next_id.checked_add(1);

        let mut stored = row.clone();
        stored.insert(ID_COLUMN.to_string(), Value::from(id));
        entry.rows.push(stored);
        Ok(id)
    }

    fn begin(&mut self) -> Result<(), StoreError> {
        if self.snapshot.is_some() {
            return Err(StoreError::transaction(
                StoreOperation::Begin,
                "transaction already open",
            ));
        }
        self.snapshot = Some(self.tables.clone());
        Ok(())
    }

    fn commit(&mut self) -> Result<(), StoreError> {
        match self.snapshot.take() {
            Some(_) => Ok(()),
            None => Err(StoreError::transaction(
                StoreOperation::Commit,
                "no open transaction",
            )),
        }
    }

    fn rollback(&mut self) -> Result<(), StoreError> {
        let Some(snapshot) = self.snapshot.take() else {
            return Err(StoreError::transaction(
                StoreOperation::Rollback,
                "no open transaction",
            ));
        };
        self.tables = snapshot;
        Ok(())
    }
}
