//! Step execution for `up` and `down` runs.
//!
//! Steps run strictly in sequence on the caller's connection. Each step moves
//! its migration from `Pending` to `Completed` or `Error`, and the first
//! failure stops the run. Transaction control belongs to the caller.

use crate::error::{MigrateResult, MigrationExecutionError};
use crate::ledger::Ledger;
use crate::migration::{Direction, Migration, RunState, StatusFilter};
use crate::reporter::{Reporter, StepOutcome};
use keel_db::Connection;

/// What an executed run changed.
#[derive(Debug, Clone, Default)]
pub struct ExecutionReport {
    /// Batch that was written (`up`) or removed (`down`); `None` if no step ran
    pub batch: Option<i64>,
    /// Migrations that completed, in execution order
    pub migrations: Vec<Migration>,
}

/// Indices of runnable `Down` migrations in ascending name order.
pub fn up_candidates(migrations: &[Migration]) -> Vec<usize> {
    let mut indices: Vec<usize> = migrations
        .iter()
        .enumerate()
        .filter(|(_, m)| !m.is_up() && m.is_runnable())
        .map(|(i, _)| i)
        .collect();
    indices.sort_by(|&a, &b| migrations[a].name.cmp(&migrations[b].name));
    indices
}

/// Indices of runnable `Up` migrations in `batch`, in descending name order.
pub fn down_candidates(migrations: &[Migration], batch: i64) -> Vec<usize> {
    let mut indices: Vec<usize> = migrations
        .iter()
        .enumerate()
        .filter(|(_, m)| m.is_up() && m.batch == Some(batch) && m.is_runnable())
        .map(|(i, _)| i)
        .collect();
    indices.sort_by(|&a, &b| migrations[b].name.cmp(&migrations[a].name));
    indices
}

/// Apply every pending migration as one new batch.
pub async fn apply(
    conn: &dyn Connection,
    ledger: &Ledger,
    migrations: &mut [Migration],
    reporter: &dyn Reporter,
) -> MigrateResult<ExecutionReport> {
    let candidates = up_candidates(migrations);
    if candidates.is_empty() {
        log::debug!("No pending migrations");
        return Ok(ExecutionReport::default());
    }

    let batch = ledger.next_batch(conn).await?;
    log::debug!("Applying {} migration(s) as batch {batch}", candidates.len());
    run_steps(conn, ledger, migrations, &candidates, Direction::Up, batch, reporter).await
}

/// Revert every runnable migration of the most recent batch.
pub async fn revert(
    conn: &dyn Connection,
    ledger: &Ledger,
    migrations: &mut [Migration],
    reporter: &dyn Reporter,
) -> MigrateResult<ExecutionReport> {
    let Some(batch) = ledger.last_batch(conn).await? else {
        log::debug!("No batches to revert");
        return Ok(ExecutionReport::default());
    };

    let candidates = down_candidates(migrations, batch);
    if candidates.is_empty() {
        log::debug!("Batch {batch} has no runnable migrations");
        return Ok(ExecutionReport::default());
    }

    log::debug!("Reverting {} migration(s) of batch {batch}", candidates.len());
    run_steps(conn, ledger, migrations, &candidates, Direction::Down, batch, reporter).await
}

/// Filter a reconciled set without touching the database.
pub fn status(migrations: &[Migration], filter: StatusFilter) -> Vec<Migration> {
    migrations
        .iter()
        .filter(|m| filter.matches(m))
        .cloned()
        .collect()
}

async fn run_steps(
    conn: &dyn Connection,
    ledger: &Ledger,
    migrations: &mut [Migration],
    candidates: &[usize],
    direction: Direction,
    batch: i64,
    reporter: &dyn Reporter,
) -> MigrateResult<ExecutionReport> {
    reporter.on_plan(direction, candidates.len());

    let mut done: Vec<Migration> = Vec::with_capacity(candidates.len());
    for &idx in candidates {
        let migration = &mut migrations[idx];
        let Some(capability) = migration.capability().cloned() else {
            continue;
        };
        migration.run_state = RunState::Pending;

        let verb = match direction {
            Direction::Up => "Applying",
            Direction::Down => "Reverting",
        };
        reporter.on_progress(&format!("{verb} {}", migration.name));
        log::debug!("{verb} {}", migration.name);

        let result = match direction {
            Direction::Up => capability.up(conn).await,
            Direction::Down => capability.down(conn).await,
        };

        if let Err(source) = result {
            migration.run_state = RunState::Error;
            reporter.on_step_result(
                migration,
                &StepOutcome::Failed {
                    direction,
                    error: &source,
                },
            );
            return Err(MigrationExecutionError {
                migration: migration.clone(),
                direction,
                source,
                completed: done.into_iter().map(|m| m.name).collect(),
                rolled_back: false,
            }
            .into());
        }

        match direction {
            Direction::Up => {
                let run_at = ledger
                    .record_applied(
                        conn,
                        &migration.name,
                        &migration.description,
                        batch,
                        migration.created_at,
                    )
                    .await?;
                migration.mark_applied(batch, run_at);
                reporter.on_step_result(migration, &StepOutcome::Applied);
            }
            Direction::Down => {
                ledger.record_reverted(conn, &migration.name).await?;
                migration.mark_reverted();
                reporter.on_step_result(migration, &StepOutcome::Reverted);
            }
        }
        done.push(migration.clone());
    }

    Ok(ExecutionReport {
        batch: Some(batch),
        migrations: done,
    })
}

#[cfg(test)]
#[path = "executor_test.rs"]
mod tests;
