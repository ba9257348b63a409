//! Public operations: apply pending, revert the last batch, query status.

use crate::error::{LedgerError, MigrateError, MigrateResult};
use crate::executor::{self, ExecutionReport};
use crate::ledger::Ledger;
use crate::migration::{Direction, Migration, StatusFilter};
use crate::reconcile::reconcile;
use crate::registry::MigrationRegistry;
use crate::reporter::{NoopReporter, Reporter};
use keel_db::Connection;
use serde::Serialize;
use std::sync::Arc;

/// Options for `apply_pending` and `revert_last_batch`.
#[derive(Debug, Clone, Copy)]
pub struct ApplyOptions {
    /// Run every step and ledger write inside one transaction
    pub transactional: bool,
}

impl Default for ApplyOptions {
    fn default() -> Self {
        Self {
            transactional: true,
        }
    }
}

/// Result of a successful `up` or `down` run.
#[derive(Debug, Clone, Serialize)]
pub struct RunOutcome {
    pub direction: Direction,
    /// Batch written or removed; `None` when nothing ran
    pub batch: Option<i64>,
    /// Migrations that took effect, in execution order
    #[serde(serialize_with = "serialize_names")]
    pub migrations: Vec<Migration>,
    pub transactional: bool,
}

impl RunOutcome {
    pub fn is_empty(&self) -> bool {
        self.migrations.is_empty()
    }
}

fn serialize_names<S: serde::Serializer>(
    migrations: &[Migration],
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(migrations.iter().map(|m| m.name.as_str()))
}

/// Drives migration runs against one connection at a time.
pub struct Migrator {
    registry: MigrationRegistry,
    ledger: Ledger,
    reporter: Arc<dyn Reporter>,
}

impl Migrator {
    pub fn new(registry: MigrationRegistry, ledger: Ledger) -> Self {
        Self {
            registry,
            ledger,
            reporter: Arc::new(NoopReporter),
        }
    }

    /// Send run events to `reporter` instead of discarding them.
    pub fn with_reporter(mut self, reporter: Arc<dyn Reporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn registry(&self) -> &MigrationRegistry {
        &self.registry
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Apply every pending migration as a new batch.
    pub async fn apply_pending(
        &self,
        conn: &dyn Connection,
        options: ApplyOptions,
    ) -> MigrateResult<RunOutcome> {
        self.run(conn, Direction::Up, options).await
    }

    /// Revert every migration in the most recent batch.
    pub async fn revert_last_batch(
        &self,
        conn: &dyn Connection,
        options: ApplyOptions,
    ) -> MigrateResult<RunOutcome> {
        self.run(conn, Direction::Down, options).await
    }

    /// Reconciled view of disk and ledger, filtered by state.
    pub async fn query_status(
        &self,
        conn: &dyn Connection,
        filter: StatusFilter,
    ) -> MigrateResult<Vec<Migration>> {
        let migrations = self.load(conn).await?;
        Ok(executor::status(&migrations, filter))
    }

    async fn load(&self, conn: &dyn Connection) -> MigrateResult<Vec<Migration>> {
        let disk = self.registry.load()?;
        self.ledger.ensure_schema(conn).await?;
        let rows = self.ledger.list_applied(conn).await?;
        Ok(reconcile(disk, rows))
    }

    async fn run(
        &self,
        conn: &dyn Connection,
        direction: Direction,
        options: ApplyOptions,
    ) -> MigrateResult<RunOutcome> {
        let result = self.run_inner(conn, direction, options).await;
        match &result {
            Ok(outcome) => {
                self.reporter.on_summary(&outcome.migrations, None);
                log::info!(
                    "{} migration(s) {} (batch {})",
                    outcome.migrations.len(),
                    match direction {
                        Direction::Up => "applied",
                        Direction::Down => "reverted",
                    },
                    outcome
                        .batch
                        .map_or_else(|| "none".to_string(), |b| b.to_string())
                );
            }
            Err(err) => self.reporter.on_summary(&[], Some(err)),
        }
        result
    }

    async fn run_inner(
        &self,
        conn: &dyn Connection,
        direction: Direction,
        options: ApplyOptions,
    ) -> MigrateResult<RunOutcome> {
        // Discovery errors must surface before the database is touched.
        let disk = self.registry.load()?;

        if !options.transactional {
            let report = self.execute(conn, direction, disk).await?;
            return Ok(outcome(direction, report, false));
        }

        conn.begin_transaction()
            .await
            .map_err(|e| LedgerError::new("transaction begin", e))?;

        match self.execute(conn, direction, disk).await {
            Ok(report) => {
                if let Err(commit_err) = conn.commit().await {
                    let _ = conn.rollback().await;
                    return Err(LedgerError::new("transaction commit", commit_err).into());
                }
                Ok(outcome(direction, report, true))
            }
            Err(mut err) => {
                match conn.rollback().await {
                    Ok(()) => {
                        if let MigrateError::Execution(exec) = &mut err {
                            exec.rolled_back = true;
                        }
                    }
                    Err(rollback_err) => {
                        log::error!("Rollback after failed run also failed: {rollback_err}");
                    }
                }
                Err(err)
            }
        }
    }

    async fn execute(
        &self,
        conn: &dyn Connection,
        direction: Direction,
        disk: Vec<Migration>,
    ) -> MigrateResult<ExecutionReport> {
        self.ledger.ensure_schema(conn).await?;
        let rows = self.ledger.list_applied(conn).await?;
        let mut migrations = reconcile(disk, rows);
        let reporter = self.reporter.as_ref();
        match direction {
            Direction::Up => executor::apply(conn, &self.ledger, &mut migrations, reporter).await,
            Direction::Down => {
                executor::revert(conn, &self.ledger, &mut migrations, reporter).await
            }
        }
    }
}

fn outcome(direction: Direction, report: ExecutionReport, transactional: bool) -> RunOutcome {
    RunOutcome {
        direction,
        batch: report.batch,
        migrations: report.migrations,
        transactional,
    }
}
