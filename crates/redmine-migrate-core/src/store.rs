use std::error::Error as StdError;
use std::fmt::{Display, Formatter};

use crate::row::{Filter, Row, RowId};

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum StoreOperation {
    Select,
    Insert,
    Begin,
    Commit,
    Rollback,
}

impl Display for StoreOperation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Select => "select",
            Self::Insert => "insert",
            Self::Begin => "begin",
            Self::Commit => "commit",
            Self::Rollback => "rollback",
        })
    }
}

/// A read or write failure reported by a row store.
#[derive(Debug, thiserror::Error)]
#[error("{operation} on `{target}` failed: {source}")]
pub struct StoreError {
    pub operation: StoreOperation,
    /// Table name, or `transaction` for begin/commit/rollback.
    pub target: String,
    #[source]
    pub source: Box<dyn StdError + Send + Sync>,
}

impl StoreError {
    pub fn new(
        operation: StoreOperation,
        target: impl Into<String>,
        source: impl Into<Box<dyn StdError + Send + Sync>>,
    ) -> Self {
        Self {
            operation,
            target: target.into(),
            source: source.into(),
        }
    }

    pub fn transaction(
        operation: StoreOperation,
        source: impl Into<Box<dyn StdError + Send + Sync>>,
    ) -> Self {
        Self::new(operation, "transaction", source)
    }
}

/// Read side of a migration: the store the project is copied from.
pub trait SourceStore {
    /// Rows of `table` matching every criterion of `filter`, in storage order.
    ///
    /// # Errors
    /// Returns [`StoreError`] when the read fails.
    fn select(&self, table: &str, filter: &Filter) -> Result<Vec<Row>, StoreError>;
}

/// Write side of a migration: the store the project is copied into.
///
/// Stores that support transactions override `begin`/`commit`/`rollback` so a
/// failed run leaves no rows behind.
pub trait DestinationStore {
    /// Insert `row` into `table` and return the identifier the store assigned.
    ///
    /// # Errors
    /// Returns [`StoreError`] when the insert is rejected.
    fn insert(&mut self, table: &str, row: &Row) -> Result<RowId, StoreError>;

    /// # Errors
    /// Returns [`StoreError`] when a transaction cannot be opened.
    fn begin(&mut self) -> Result<(), StoreError> {
        Ok(())
    }

    /// # Errors
    /// Returns [`StoreError`] when the transaction cannot be committed.
    fn commit(&mut self) -> Result<(), StoreError> {
        Ok(())
    }

    /// # Errors
    /// Returns [`StoreError`] when the transaction cannot be rolled back.
    fn rollback(&mut self) -> Result<(), StoreError> {
        Ok(())
    }
}

impl<S: SourceStore + ?Sized> SourceStore for &S {
    fn select(&self, table: &str, filter: &Filter) -> Result<Vec<Row>, StoreError> {
        (**self).select(table, filter)
    }
}

impl<D: DestinationStore + ?Sized> DestinationStore for &mut D {
    fn insert(&mut self, table: &str, row: &Row) -> Result<RowId, StoreError> {
        (**self).insert(table, row)
    }

    fn begin(&mut self) -> Result<(), StoreError> {
        (**self).begin()
    }

    fn commit(&mut self) -> Result<(), StoreError> {
        (**self).commit()
    }

    fn rollback(&mut self) -> Result<(), StoreError> {
        (**self).rollback()
    }
}
