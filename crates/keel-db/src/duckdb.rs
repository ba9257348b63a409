//! DuckDB connection implementation

use crate::error::{DbError, DbResult};
use crate::rows::{Rows, SqlValue};
use crate::traits::Connection;
use async_trait::async_trait;
use duckdb::types::{ToSql, ToSqlOutput, Value, ValueRef};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

/// DuckDB database backend
///
/// DuckDB runs DDL inside transactions, so a failed transactional migration
/// run leaves no tables behind.
pub struct DuckDbBackend {
    conn: Mutex<duckdb::Connection>,
    in_transaction: AtomicBool,
}

impl ToSql for SqlValue {
    fn to_sql(&self) -> duckdb::Result<ToSqlOutput<'_>> {
        let value = match self {
            SqlValue::Null => Value::Null,
            SqlValue::Bool(b) => Value::Boolean(*b),
            SqlValue::Int(n) => Value::BigInt(*n),
            SqlValue::Float(x) => Value::Double(*x),
            SqlValue::Text(s) => Value::Text(s.clone()),
        };
        Ok(ToSqlOutput::Owned(value))
    }
}

/// Read a cell as a [`SqlValue`].
///
/// Only integer, float, boolean and text cells are represented; dates and
/// timestamps should be cast in SQL (`epoch_ms`, `CAST(.. AS VARCHAR)`)
/// before reading. Anything else is a [`DbError::TypeMismatch`].
fn read_value(row: &duckdb::Row<'_>, idx: usize) -> DbResult<SqlValue> {
    let mismatch = |message: String| DbError::TypeMismatch {
        column: row
            .as_ref()
            .column_name(idx)
            .map_or_else(|_| format!("#{idx}"), |name| name.to_string()),
        message,
    };
    let value = row
        .get_ref(idx)
        .map_err(|e| mismatch(format!("cannot read cell: {e}")))?;
    let out_of_range = |n: &dyn std::fmt::Display| mismatch(format!("{n} does not fit in i64"));
    Ok(match value {
        ValueRef::Null => SqlValue::Null,
        ValueRef::Boolean(b) => SqlValue::Bool(b),
        ValueRef::TinyInt(n) => SqlValue::Int(n.into()),
        ValueRef::SmallInt(n) => SqlValue::Int(n.into()),
        ValueRef::Int(n) => SqlValue::Int(n.into()),
        ValueRef::BigInt(n) => SqlValue::Int(n),
        ValueRef::HugeInt(n) => SqlValue::Int(i64::try_from(n).map_err(|_| out_of_range(&n))?),
        ValueRef::UTinyInt(n) => SqlValue::Int(n.into()),
        ValueRef::USmallInt(n) => SqlValue::Int(n.into()),
        ValueRef::UInt(n) => SqlValue::Int(n.into()),
        ValueRef::UBigInt(n) => SqlValue::Int(i64::try_from(n).map_err(|_| out_of_range(&n))?),
        ValueRef::Float(x) => SqlValue::Float(x.into()),
        ValueRef::Double(x) => SqlValue::Float(x),
        ValueRef::Text(bytes) => SqlValue::Text(String::from_utf8_lossy(bytes).into_owned()),
        other => {
            return Err(mismatch(format!(
                "unsupported {:?} value; cast it to a number or text in SQL",
                other.data_type()
            )))
        }
    })
}

impl DuckDbBackend {
    /// Create a new in-memory DuckDB connection
    pub fn in_memory() -> DbResult<Self> {
        let conn = duckdb::Connection::open_in_memory()
            .map_err(|e| DbError::ConnectionError(e.to_string()))?;
        Ok(Self::wrap(conn))
    }

    /// Create a new DuckDB connection from a file path
    pub fn from_path(path: &Path) -> DbResult<Self> {
        let conn = duckdb::Connection::open(path)
            .map_err(|e| DbError::ConnectionError(format!("{e}: {}", path.display())))?;
        Ok(Self::wrap(conn))
    }

    /// Create from path string (handles :memory: special case)
    pub fn new(path: &str) -> DbResult<Self> {
        if path == ":memory:" {
            Self::in_memory()
        } else {
            Self::from_path(Path::new(path))
        }
    }

    fn wrap(conn: duckdb::Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
            in_transaction: AtomicBool::new(false),
        }
    }

    fn lock(&self) -> DbResult<MutexGuard<'_, duckdb::Connection>> {
        self.conn
            .lock()
            .map_err(|e| DbError::MutexPoisoned(e.to_string()))
    }

    /// Execute SQL synchronously
    fn execute_sync(&self, sql: &str, params: &[SqlValue]) -> DbResult<usize> {
        let conn = self.lock()?;
        conn.execute(sql, duckdb::params_from_iter(params))
            .map_err(|e| DbError::ExecutionError(format!("{e}: {sql}")))
    }

    /// Execute batch SQL synchronously
    fn execute_batch_sync(&self, sql: &str) -> DbResult<()> {
        let conn = self.lock()?;
        conn.execute_batch(sql)
            .map_err(|e| DbError::ExecutionError(e.to_string()))
    }

    /// Run a query and collect every row.
    ///
    /// DuckDB panics on `stmt.column_count()` before execution, so rows are
    /// collected first and column metadata is read afterwards.
    fn query_sync(&self, sql: &str, params: &[SqlValue]) -> DbResult<Rows> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(sql)
            .map_err(|e| DbError::ExecutionError(format!("{e}: {sql}")))?;

        let rows: Vec<Vec<SqlValue>> = stmt
            .query_map(duckdb::params_from_iter(params), |row| {
                let col_count = row.as_ref().column_count();
                Ok((0..col_count)
                    .map(|i| read_value(row, i))
                    .collect::<DbResult<Vec<_>>>())
            })
            .map_err(|e| DbError::ExecutionError(format!("{e}: {sql}")))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| DbError::ExecutionError(format!("row error: {e}")))?
            .into_iter()
            .collect::<DbResult<Vec<_>>>()?;

        let columns: Vec<String> = (0..stmt.column_count())
            .map(|i| {
                stmt.column_name(i)
                    .map_or("?".to_string(), |v| v.to_string())
            })
            .collect();

        Ok(Rows::new(columns, rows))
    }

    fn transaction_control(&self, sql: &str, open_after: bool) -> DbResult<()> {
        let conn = self.lock()?;
        conn.execute_batch(sql)
            .map_err(|e| DbError::TransactionError(format!("{sql} failed: {e}")))?;
        self.in_transaction.store(open_after, Ordering::SeqCst);
        Ok(())
    }

    /// Check if relation exists synchronously
    fn relation_exists_sync(&self, name: &str) -> DbResult<bool> {
        let (schema, table) = match name.rfind('.') {
            Some(pos) => (&name[..pos], &name[pos + 1..]),
            None => ("main", name),
        };
        let rows = self.query_sync(
            "SELECT COUNT(*) AS n FROM information_schema.tables \
             WHERE table_schema = ? AND table_name = ?",
            &[SqlValue::from(schema), SqlValue::from(table)],
        )?;
        let count = match rows.first() {
            Some(row) => row.get_i64("n")?,
            None => 0,
        };
        Ok(count > 0)
    }
}

#[async_trait]
impl Connection for DuckDbBackend {
    async fn execute(&self, sql: &str, params: &[SqlValue]) -> DbResult<usize> {
        self.execute_sync(sql, params)
    }

    async fn query(&self, sql: &str, params: &[SqlValue]) -> DbResult<Rows> {
        self.query_sync(sql, params)
    }

    async fn execute_batch(&self, sql: &str) -> DbResult<()> {
        self.execute_batch_sync(sql)
    }

    async fn begin_transaction(&self) -> DbResult<()> {
        self.transaction_control("BEGIN TRANSACTION", true)
    }

    async fn commit(&self) -> DbResult<()> {
        self.transaction_control("COMMIT", false)
    }

    async fn rollback(&self) -> DbResult<()> {
        self.transaction_control("ROLLBACK", false)
    }

    async fn release(&self) -> DbResult<()> {
        if self.in_transaction.load(Ordering::SeqCst) {
            log::warn!("Releasing DuckDB connection with an open transaction; rolling back");
            self.transaction_control("ROLLBACK", false)?;
        }
        Ok(())
    }

    async fn relation_exists(&self, name: &str) -> DbResult<bool> {
        self.relation_exists_sync(name)
    }

    fn db_type(&self) -> &'static str {
        "duckdb"
    }
}

#[cfg(test)]
#[path = "duckdb_test.rs"]
mod tests;
