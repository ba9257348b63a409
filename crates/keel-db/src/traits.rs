//! Connection trait definition

use crate::error::DbResult;
use crate::rows::{Rows, SqlValue};
use async_trait::async_trait;

/// A checked-out database connection.
///
/// The migration engine runs an entire `up`/`down` invocation on one
/// connection, so transaction control lives here rather than on a pool.
/// Implementations must be Send + Sync for async operation.
#[async_trait]
pub trait Connection: Send + Sync {
    /// Execute a single statement with bound parameters, returns affected rows
    async fn execute(&self, sql: &str, params: &[SqlValue]) -> DbResult<usize>;

    /// Execute a single statement with bound parameters and collect its rows
    async fn query(&self, sql: &str, params: &[SqlValue]) -> DbResult<Rows>;

    /// Execute multiple `;`-separated statements without parameters
    async fn execute_batch(&self, sql: &str) -> DbResult<()>;

    /// Open a transaction; everything until `commit`/`rollback` belongs to it
    async fn begin_transaction(&self) -> DbResult<()>;

    /// Commit the open transaction
    async fn commit(&self) -> DbResult<()>;

    /// Roll back the open transaction
    async fn rollback(&self) -> DbResult<()>;

    /// Hand the connection back; an open transaction is rolled back
    async fn release(&self) -> DbResult<()>;

    /// Check if a table or view exists (`schema.name` or bare `name`)
    async fn relation_exists(&self, name: &str) -> DbResult<bool>;

    /// Database type identifier for logging
    fn db_type(&self) -> &'static str;
}
