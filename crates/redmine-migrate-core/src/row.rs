use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

/// Name of the primary key column every migrated table carries.
pub const ID_COLUMN: &str = "id";

/// Identifier assigned by a row store on insert.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[serde(transparent)]
pub struct RowId(pub i64);

impl Display for RowId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for RowId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

/// A single column value, mirroring the storage classes of a relational row.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl Value {
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(value) => Some(*value),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value),
            _ => None,
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Integer(value) => write!(f, "{value}"),
            Self::Real(value) => write!(f, "{value}"),
            Self::Text(value) => write!(f, "'{value}'"),
            Self::Blob(value) => write!(f, "<{} bytes>", value.len()),
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<RowId> for Value {
    fn from(value: RowId) -> Self {
        Self::Integer(value.0)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Real(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self {
        Self::Blob(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// A row as a mapping of column name to value.
pub type Row = BTreeMap<String, Value>;

/// Builds a row from `(column, value)` pairs.
pub fn row<I, C, V>(columns: I) -> Row
where
    I: IntoIterator<Item = (C, V)>,
    C: Into<String>,
    V: Into<Value>,
{
    columns
        .into_iter()
        .map(|(column, value)| (column.into(), value.into()))
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub enum Criterion {
    Equals(Value),
    IsNull,
}

impl Criterion {
    /// Absent columns count as null, matching SQL semantics for optional keys.
    #[must_use]
    pub fn matches(&self, value: Option<&Value>) -> bool {
        match self {
            Self::Equals(expected) => value == Some(expected),
            Self::IsNull => value.map_or(true, Value::is_null),
        }
    }
}

/// Exact-match conjunction over named columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    criteria: Vec<(String, Criterion)>,
}

impl Filter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn eq(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        let criterion = Criterion::Equals(value.into());
        self.criteria.push((column.into(), criterion));
        self
    }

    #[must_use]
    pub fn is_null(mut self, column: impl Into<String>) -> Self {
        self.criteria.push((column.into(), Criterion::IsNull));
        self
    }

    #[must_use]
    pub fn criteria(&self) -> &[(String, Criterion)] {
        &self.criteria
    }

    #[must_use]
    pub fn matches(&self, row: &Row) -> bool {
        self.criteria
            .iter()
            .all(|(column, criterion)| criterion.matches(row.get(column)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_matches_conjunction_of_criteria() {
        let page = row([("wiki_id", Value::Integer(3)), ("parent_id", Value::Null)]);
        let child = row([("wiki_id", 3_i64), ("parent_id", 9_i64)]);

        let roots = Filter::new().eq("wiki_id", 3_i64).is_null("parent_id");
        assert!(roots.matches(&page));
        assert!(!roots.matches(&child));

        let children = Filter::new().eq("wiki_id", 3_i64).eq("parent_id", RowId(9));
        assert!(children.matches(&child));
        assert!(!children.matches(&page));
    }

    #[test]
    fn is_null_accepts_absent_column() {
        let bare = row([("wiki_id", 3_i64)]);
        assert!(Filter::new().is_null("parent_id").matches(&bare));
        assert!(!Filter::new().eq("parent_id", 1_i64).matches(&bare));
    }

    #[test]
    fn optional_values_convert_to_null() {
        assert_eq!(Value::from(Option::<i64>::None), Value::Null);
        assert_eq!(Value::from(Some("x")), Value::Text("x".to_string()));
    }
}
