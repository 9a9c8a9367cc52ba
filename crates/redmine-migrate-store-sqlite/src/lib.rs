use std::path::Path;

use anyhow::{Context, Result};
use redmine_migrate_core::{
    Criterion, DestinationStore, Filter, Row, RowId, SourceStore, StoreError, StoreOperation, Value,
};
use rusqlite::types::{Type, Value as SqlValue, ValueRef};
use rusqlite::{params_from_iter, Connection};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A Redmine database reached through SQLite. Serves as either side of a
/// migration; table and column names come from the entity graph and are
/// quoted, values are always bound as parameters.
pub struct SqliteRowStore {
    conn: Connection,
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct ForeignKeyViolation {
    pub table: String,
    pub rowid: i64,
    pub parent: String,
    pub fk_index: i64,
}

impl SqliteRowStore {
    /// Open a SQLite database and configure required runtime pragmas.
    ///
    /// # Errors
    /// Returns an error when the database cannot be opened or configured.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open sqlite database at {}", path.display()))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA foreign_keys = ON;
             PRAGMA busy_timeout = 5000;",
        )
        .context("failed to configure sqlite pragmas")?;

        debug!(path = %path.display(), "opened sqlite row store");
        Ok(Self { conn })
    }

    /// Wrap an already configured connection.
    #[must_use]
    pub fn from_connection(conn: Connection) -> Self {
        Self { conn }
    }

    #[must_use]
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Run a batch of SQL statements, typically schema or seed data.
    ///
    /// # Errors
    /// Returns an error when any statement fails.
    pub fn execute_batch(&self, sql: &str) -> Result<()> {
        self.conn.execute_batch(sql).context("failed to execute sql batch")
    }

    /// # Errors
    /// Returns an error when the table cannot be counted.
    pub fn row_count(&self, table: &str) -> Result<i64> {
        let sql = format!("SELECT COUNT(*) FROM {}", quote_identifier(table));
        self.conn
            .query_row(&sql, [], |row| row.get(0))
            .with_context(|| format!("failed to count rows in {table}"))
    }

    /// Rows that violate a declared foreign key, as reported by
    /// `PRAGMA foreign_key_check`.
    ///
    /// # Errors
    /// Returns an error when the check cannot be run.
    pub fn foreign_key_violations(&self) -> Result<Vec<ForeignKeyViolation>> {
        let mut stmt = self
            .conn
            .prepare("PRAGMA foreign_key_check")
            .context("failed to prepare PRAGMA foreign_key_check")?;
        let rows = stmt.query_map([], |row| {
            Ok(ForeignKeyViolation {
                table: row.get(0)?,
                rowid: row.get(1)?,
                parent: row.get(2)?,
                fk_index: row.get(3)?,
            })
        })?;

        let mut violations = Vec::new();
        for row in rows {
            violations.push(row.context("failed to decode foreign key violation")?);
        }
        Ok(violations)
    }

    fn transaction(&self, operation: StoreOperation, sql: &str) -> Result<(), StoreError> {
        self.conn
            .execute_batch(sql)
            .map_err(|err| StoreError::transaction(operation, err))
    }
}

impl SourceStore for SqliteRowStore {
    fn select(&self, table: &str, filter: &Filter) -> Result<Vec<Row>, StoreError> {
        let fail = |err: rusqlite::Error| StoreError::new(StoreOperation::Select, table, err);

        let mut sql = format!("SELECT * FROM {}", quote_identifier(table));
        let mut bound = Vec::new();
        for (index, (column, criterion)) in filter.criteria().iter().enumerate() {
            sql.push_str(if index == 0 { " WHERE " } else { " AND " });
            sql.push_str(&quote_identifier(column));
            match criterion {
                Criterion::Equals(value) => {
                    bound.push(to_sql(value));
                    sql.push_str(&format!(" = ?{}", bound.len()));
                }
                Criterion::IsNull => sql.push_str(" IS NULL"),
            }
        }
        sql.push_str(" ORDER BY rowid");

        let mut stmt = self.conn.prepare(&sql).map_err(fail)?;
        let columns: Vec<String> = stmt
            .column_names()
            .into_iter()
            .map(String::from)
            .collect();
        let rows = stmt
            .query_map(params_from_iter(bound), |record| {
                let mut row = Row::new();
                for (index, column) in columns.iter().enumerate() {
                    row.insert(column.clone(), from_sql(index, record.get_ref(index)?)?);
                }
                Ok(row)
            })
            .map_err(fail)?;

        rows.collect::<Result<Vec<_>, _>>().map_err(fail)
    }
}

impl DestinationStore for SqliteRowStore {
    fn insert(&mut self, table: &str, row: &Row) -> Result<RowId, StoreError> {
        let sql = if row.is_empty() {
            format!("INSERT INTO {} DEFAULT VALUES", quote_identifier(table))
        } else {
            let columns: Vec<String> = row
                .keys()
                .map(|column| quote_identifier(column))
                .collect();
            let placeholders: Vec<String> = (1..=row.len())
                .map(|index| format!("?{index}"))
                .collect();
            format!(
                "INSERT INTO {} ({}) VALUES ({})",
                quote_identifier(table),
                columns.join(", "),
                placeholders.join(", ")
            )
        };

        self.conn
            .execute(&sql, params_from_iter(row.values().map(to_sql)))
            .map_err(|err| StoreError::new(StoreOperation::Insert, table, err))?;
        Ok(RowId(self.conn.last_insert_rowid()))
    }

    fn begin(&mut self) -> Result<(), StoreError> {
        self.transaction(StoreOperation::Begin, "BEGIN IMMEDIATE")
    }

    fn commit(&mut self) -> Result<(), StoreError> {
        self.transaction(StoreOperation::Commit, "COMMIT")
    }

    fn rollback(&mut self) -> Result<(), StoreError> {
        self.transaction(StoreOperation::Rollback, "ROLLBACK")
    }
}

fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn to_sql(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Integer(value) => SqlValue::Integer(*value),
        Value::Real(value) => SqlValue::Real(*value),
        Value::Text(value) => SqlValue::Text(value.clone()),
        Value::Blob(value) => SqlValue::Blob(value.clone()),
    }
}

/// Text that is not valid UTF-8 is rejected rather than repaired, so a
/// migrated row never differs silently from its source.
fn from_sql(index: usize, value: ValueRef<'_>) -> rusqlite::Result<Value> {
    Ok(match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(value) => Value::Integer(value),
        ValueRef::Real(value) => Value::Real(value),
        ValueRef::Text(bytes) => std::str::from_utf8(bytes)
            .map(|text| Value::Text(text.to_string()))
            .map_err(|err| {
                rusqlite::Error::FromSqlConversionFailure(index, Type::Text, Box::new(err))
            })?,
        ValueRef::Blob(bytes) => Value::Blob(bytes.to_vec()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use redmine_migrate_core::row;

    const SCHEMA: &str = r#"
CREATE TABLE wiki_pages (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  wiki_id INTEGER NOT NULL,
  title TEXT NOT NULL,
  parent_id INTEGER REFERENCES wiki_pages(id)
);
CREATE TABLE "odd ""name""" (id INTEGER PRIMARY KEY AUTOINCREMENT, note TEXT);
"#;

    fn store() -> Result<SqliteRowStore> {
        let store = SqliteRowStore::open(Path::new(":memory:"))?;
        store.execute_batch(SCHEMA)?;
        Ok(store)
    }

    fn page(wiki: i64, title: &str) -> Row {
        row([("wiki_id", Value::Integer(wiki)), ("title", Value::from(title))])
    }

    #[test]
    fn insert_returns_assigned_id_and_select_reads_it_back() -> Result<()> {
        let mut store = store()?;
        let root = store.insert("wiki_pages", &page(1, "Wiki"))?;
        let child = store.insert(
            "wiki_pages",
            &row([
                ("wiki_id", Value::Integer(1)),
                ("title", Value::from("Child")),
                ("parent_id", Value::from(root)),
            ]),
        )?;
        assert_ne!(root, child);

        let filter = Filter::new().eq("wiki_id", 1_i64).is_null("parent_id");
        let roots = store.select("wiki_pages", &filter)?;
        assert_eq!(roots.len(), 1);
        assert_eq!(roots[0].get("id"), Some(&Value::from(root)));
        assert_eq!(roots[0].get("parent_id"), Some(&Value::Null));

        let children = store.select("wiki_pages", &Filter::new().eq("parent_id", root))?;
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].get("title"), Some(&Value::from("Child")));
        Ok(())
    }

    #[test]
    fn select_returns_rows_in_storage_order() -> Result<()> {
        let mut store = store()?;
        for title in ["c", "a", "b"] {
            store.insert("wiki_pages", &page(2, title))?;
        }

        let titles: Vec<Value> = store
            .select("wiki_pages", &Filter::new().eq("wiki_id", 2_i64))?
            .into_iter()
            .filter_map(|mut row| row.remove("title"))
            .collect();
        assert_eq!(
            titles,
            vec![Value::from("c"), Value::from("a"), Value::from("b")]
        );
        Ok(())
    }

    #[test]
    fn identifiers_are_quoted() -> Result<()> {
        let mut store = store()?;
        store.insert("odd \"name\"", &row([("note", "kept")]))?;
        assert_eq!(store.row_count("odd \"name\"")?, 1);
        assert_eq!(store.select("odd \"name\"", &Filter::new())?.len(), 1);
        Ok(())
    }

    #[test]
    fn empty_row_inserts_default_values() -> Result<()> {
        let mut store = store()?;
        let id = store.insert("odd \"name\"", &Row::new())?;
        assert_eq!(id, RowId(1));
        Ok(())
    }

    #[test]
    fn rollback_discards_inserts() -> Result<()> {
        let mut store = store()?;
        store.begin()?;
        store.insert("wiki_pages", &page(1, "Gone"))?;
        store.rollback()?;
        assert_eq!(store.row_count("wiki_pages")?, 0);

        store.begin()?;
        store.insert("wiki_pages", &page(1, "Kept"))?;
        store.commit()?;
        assert_eq!(store.row_count("wiki_pages")?, 1);
        Ok(())
    }

    #[test]
    fn failures_name_operation_and_table() -> Result<()> {
        let mut store = store()?;
        let err = match store.insert("missing_table", &row([("x", 1_i64)])) {
            Ok(id) => panic!("insert into missing table returned {id}"),
            Err(err) => err,
        };
        assert_eq!(err.operation, StoreOperation::Insert);
        assert_eq!(err.target, "missing_table");

        assert!(store.commit().is_err());
        Ok(())
    }

    #[test]
    fn foreign_key_check_reports_dangling_parent() -> Result<()> {
        let store = store()?;
        store.execute_batch(
            "PRAGMA foreign_keys = OFF;
             INSERT INTO wiki_pages (id, wiki_id, title, parent_id) VALUES (1, 1, 'Orphan', 99);
             PRAGMA foreign_keys = ON;",
        )?;

        let violations = store.foreign_key_violations()?;
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].table, "wiki_pages");
        assert_eq!(violations[0].parent, "wiki_pages");
        Ok(())
    }

    #[test]
    fn text_that_is_not_utf8_fails_the_select() -> Result<()> {
        let store = store()?;
        store.execute_batch(
            "INSERT INTO wiki_pages (wiki_id, title) VALUES (1, CAST(x'4162ff' AS TEXT));",
        )?;

        let err = match store.select("wiki_pages", &Filter::new()) {
            Ok(rows) => panic!("invalid text decoded as {rows:?}"),
            Err(err) => err,
        };
        assert_eq!(err.operation, StoreOperation::Select);
        assert_eq!(err.target, "wiki_pages");
        Ok(())
    }

    #[test]
    fn multibyte_text_reads_back_unchanged() -> Result<()> {
        let mut store = store()?;
        store.insert("wiki_pages", &page(3, "Übersicht 概要"))?;

        let pages = store.select("wiki_pages", &Filter::new().eq("wiki_id", 3_i64))?;
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].get("title"), Some(&Value::from("Übersicht 概要")));
        Ok(())
    }
}
