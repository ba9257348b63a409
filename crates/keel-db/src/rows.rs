//! Backend-agnostic query results.
//!
//! [`Rows`] is a small owned row collection: column names plus one
//! [`SqlValue`] per cell. Typed accessors on [`RowRef`] turn a missing
//! column or an unexpected type into a [`DbError::TypeMismatch`].

use crate::error::{DbError, DbResult};
use std::fmt;

/// A single SQL value, used both for bound parameters and result cells.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl SqlValue {
    /// True for SQL `NULL`.
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlValue::Null => f.write_str("null"),
            SqlValue::Bool(b) => write!(f, "{b}"),
            SqlValue::Int(n) => write!(f, "{n}"),
            SqlValue::Float(x) => write!(f, "{x}"),
            SqlValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        SqlValue::Int(v)
    }
}

impl From<bool> for SqlValue {
    fn from(v: bool) -> Self {
        SqlValue::Bool(v)
    }
}

impl From<f64> for SqlValue {
    fn from(v: f64) -> Self {
        SqlValue::Float(v)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::Text(v.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::Text(v)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(SqlValue::Null, Into::into)
    }
}

/// Owned result of a query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Rows {
    columns: Vec<String>,
    rows: Vec<Vec<SqlValue>>,
}

impl Rows {
    /// Build a result set. Every row must have one value per column.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<SqlValue>>) -> Self {
        debug_assert!(rows.iter().all(|r| r.len() == columns.len()));
        Self { columns, rows }
    }

    /// Column names in select-list order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Iterate over rows as name-addressable views.
    pub fn iter(&self) -> impl Iterator<Item = RowRef<'_>> {
        self.rows.iter().map(|values| RowRef {
            columns: &self.columns,
            values,
        })
    }

    /// The first row, if any.
    pub fn first(&self) -> Option<RowRef<'_>> {
        self.iter().next()
    }
}

/// Borrowed view of one row in a [`Rows`] collection.
#[derive(Debug, Clone, Copy)]
pub struct RowRef<'a> {
    columns: &'a [String],
    values: &'a [SqlValue],
}

impl<'a> RowRef<'a> {
    /// Raw values in column order.
    pub fn values(&self) -> &'a [SqlValue] {
        self.values
    }

    /// Look up a value by column name.
    pub fn get(&self, column: &str) -> DbResult<&'a SqlValue> {
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|idx| &self.values[idx])
            .ok_or_else(|| DbError::TypeMismatch {
                column: column.to_string(),
                message: "no such column in result".to_string(),
            })
    }

    /// Read a non-null integer column.
    pub fn get_i64(&self, column: &str) -> DbResult<i64> {
        self.get_opt_i64(column)?.ok_or_else(|| DbError::TypeMismatch {
            column: column.to_string(),
            message: "expected integer, found null".to_string(),
        })
    }

    /// Read a nullable integer column.
    pub fn get_opt_i64(&self, column: &str) -> DbResult<Option<i64>> {
        match self.get(column)? {
            SqlValue::Null => Ok(None),
            SqlValue::Int(n) => Ok(Some(*n)),
            other => Err(DbError::TypeMismatch {
                column: column.to_string(),
                message: format!("expected integer, found '{other}'"),
            }),
        }
    }

    /// Read a non-null text column.
    pub fn get_str(&self, column: &str) -> DbResult<&'a str> {
        match self.get(column)? {
            SqlValue::Text(s) => Ok(s.as_str()),
            other => Err(DbError::TypeMismatch {
                column: column.to_string(),
                message: format!("expected text, found '{other}'"),
            }),
        }
    }
}
