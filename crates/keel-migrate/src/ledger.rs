//! Persistent record of applied migrations.
//!
//! One row per applied migration lives in `<schema>.<table>` inside the
//! target database. The schema and table are created lazily on every run.

use crate::error::{LedgerError, LedgerResult};
use chrono::{DateTime, NaiveDate, Utc};
use keel_core::{LedgerConfig, MigrationName};
use keel_db::{Connection, DbError, DbResult, SqlValue};
use keel_db::rows::RowRef;

/// A persisted ledger row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerRow {
    pub id: String,
    pub name: MigrationName,
    pub description: String,
    pub batch: i64,
    pub created_at: NaiveDate,
    pub run_at: DateTime<Utc>,
}

/// Reads and writes the ledger table over a caller-supplied connection.
#[derive(Debug, Clone)]
pub struct Ledger {
    config: LedgerConfig,
    table: String,
}

impl Ledger {
    pub fn new(config: LedgerConfig) -> Self {
        let table = config.qualified_table();
        Self { config, table }
    }

    /// Fully-qualified ledger table name.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Create the ledger schema and table if they do not exist.
    pub async fn ensure_schema(&self, conn: &dyn Connection) -> LedgerResult<()> {
        let ddl = format!(
            "CREATE SCHEMA IF NOT EXISTS {schema};
             CREATE TABLE IF NOT EXISTS {table} (
                 id          VARCHAR PRIMARY KEY,
                 name        VARCHAR NOT NULL UNIQUE,
                 description VARCHAR NOT NULL,
                 batch       BIGINT NOT NULL,
                 created_at  DATE NOT NULL,
                 run_at      TIMESTAMP NOT NULL DEFAULT current_timestamp
             );",
            schema = self.config.schema,
            table = self.table,
        );
        conn.execute_batch(&ddl)
            .await
            .map_err(|e| LedgerError::new("schema creation", e))
    }

    /// Every applied migration, ordered by name.
    pub async fn list_applied(&self, conn: &dyn Connection) -> LedgerResult<Vec<LedgerRow>> {
        let sql = format!(
            "SELECT id, name, description, batch,
                    CAST(created_at AS VARCHAR) AS created_at,
                    epoch_ms(run_at) AS run_at_ms
             FROM {}
             ORDER BY name",
            self.table
        );
        let rows = conn
            .query(&sql, &[])
            .await
            .map_err(|e| LedgerError::new("read", e))?;
        rows.iter()
            .map(|row| read_row(&row))
            .collect::<DbResult<Vec<_>>>()
            .map_err(|e| LedgerError::new("read", e))
    }

    /// Batch number for the next `up` run: one past the highest, or 1.
    pub async fn next_batch(&self, conn: &dyn Connection) -> LedgerResult<i64> {
        let sql = format!(
            "SELECT COALESCE(MAX(batch), 0) + 1 AS next_batch FROM {}",
            self.table
        );
        let rows = conn
            .query(&sql, &[])
            .await
            .map_err(|e| LedgerError::new("batch lookup", e))?;
        match rows.first() {
            Some(row) => row
                .get_i64("next_batch")
                .map_err(|e| LedgerError::new("batch lookup", e)),
            None => Ok(1),
        }
    }

    /// Highest batch number, or `None` when nothing is applied.
    pub async fn last_batch(&self, conn: &dyn Connection) -> LedgerResult<Option<i64>> {
        let sql = format!("SELECT MAX(batch) AS last_batch FROM {}", self.table);
        let rows = conn
            .query(&sql, &[])
            .await
            .map_err(|e| LedgerError::new("batch lookup", e))?;
        match rows.first() {
            Some(row) => row
                .get_opt_i64("last_batch")
                .map_err(|e| LedgerError::new("batch lookup", e)),
            None => Ok(None),
        }
    }

    /// Insert the row for a successfully applied migration and return the
    /// timestamp the database assigned to it.
    pub async fn record_applied(
        &self,
        conn: &dyn Connection,
        name: &MigrationName,
        description: &str,
        batch: i64,
        created_at: NaiveDate,
    ) -> LedgerResult<DateTime<Utc>> {
        let id = uuid::Uuid::new_v4().to_string();
        let insert = format!(
            "INSERT INTO {} (id, name, description, batch, created_at)
             VALUES (?, ?, ?, ?, CAST(? AS DATE))
             RETURNING epoch_ms(run_at) AS run_at_ms",
            self.table
        );
        let params = [
            SqlValue::from(id.as_str()),
            SqlValue::from(name.as_str()),
            SqlValue::from(description),
            SqlValue::from(batch),
            SqlValue::from(created_at.format("%Y-%m-%d").to_string()),
        ];
        let rows = conn
            .query(&insert, &params)
            .await
            .map_err(|e| LedgerError::new("insert", e))?;
        let row = rows.first().ok_or_else(|| {
            LedgerError::new(
                "insert",
                DbError::ExecutionError(format!("insert of '{name}' returned no row")),
            )
        })?;
        read_run_at(&row).map_err(|e| LedgerError::new("insert", e))
    }

    /// Delete the row for a reverted migration.
    pub async fn record_reverted(
        &self,
        conn: &dyn Connection,
        name: &MigrationName,
    ) -> LedgerResult<()> {
        let sql = format!("DELETE FROM {} WHERE name = ?", self.table);
        let affected = conn
            .execute(&sql, &[SqlValue::from(name.as_str())])
            .await
            .map_err(|e| LedgerError::new("delete", e))?;
        if affected == 0 {
            log::warn!("No ledger row for '{}' in {}", name, self.table);
        }
        Ok(())
    }
}

fn read_row(row: &RowRef<'_>) -> DbResult<LedgerRow> {
    let created_at = row.get_str("created_at")?;
    let created_at = NaiveDate::parse_from_str(created_at, "%Y-%m-%d").map_err(|e| {
        DbError::TypeMismatch {
            column: "created_at".to_string(),
            message: e.to_string(),
        }
    })?;
    Ok(LedgerRow {
        id: row.get_str("id")?.to_string(),
        name: MigrationName::new(row.get_str("name")?),
        description: row.get_str("description")?.to_string(),
        batch: row.get_i64("batch")?,
        created_at,
        run_at: read_run_at(row)?,
    })
}

fn read_run_at(row: &RowRef<'_>) -> DbResult<DateTime<Utc>> {
    let millis = row.get_i64("run_at_ms")?;
    DateTime::<Utc>::from_timestamp_millis(millis).ok_or_else(|| DbError::TypeMismatch {
        column: "run_at".to_string(),
        message: format!("{millis} is out of range"),
    })
}

#[cfg(test)]
#[path = "ledger_test.rs"]
mod tests;
