//! Progress and result callbacks for migration runs.

use crate::error::MigrateError;
use crate::migration::{Direction, Migration};
use keel_db::DbError;

/// Result of a single step, passed to [`Reporter::on_step_result`].
#[derive(Debug)]
pub enum StepOutcome<'a> {
    Applied,
    Reverted,
    Failed {
        direction: Direction,
        error: &'a DbError,
    },
}

/// Receives events from a run. Every method defaults to doing nothing.
pub trait Reporter: Send + Sync {
    /// A run is about to execute `count` steps in `direction`.
    fn on_plan(&self, _direction: Direction, _count: usize) {}

    /// Free-form progress message ("Applying ...").
    fn on_progress(&self, _message: &str) {}

    /// A step finished, successfully or not.
    fn on_step_result(&self, _migration: &Migration, _outcome: &StepOutcome<'_>) {}

    /// The run finished. `migrations` are the steps that took effect.
    fn on_summary(&self, _migrations: &[Migration], _error: Option<&MigrateError>) {}
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopReporter;

impl Reporter for NoopReporter {}

/// Forwards events to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogReporter;

impl Reporter for LogReporter {
    fn on_plan(&self, direction: Direction, count: usize) {
        log::debug!("Running {count} migration(s) {direction}");
    }

    fn on_progress(&self, message: &str) {
        log::debug!("{message}");
    }

    fn on_step_result(&self, migration: &Migration, outcome: &StepOutcome<'_>) {
        match outcome {
            StepOutcome::Applied => log::info!("Applied {}", migration.name),
            StepOutcome::Reverted => log::info!("Reverted {}", migration.name),
            StepOutcome::Failed { direction, error } => {
                log::error!("Migration {} failed during {direction}: {error}", migration.name)
            }
        }
    }

    fn on_summary(&self, migrations: &[Migration], error: Option<&MigrateError>) {
        match error {
            Some(err) => log::error!("Migration run failed: {err}"),
            None if migrations.is_empty() => log::info!("Nothing to do"),
            None => log::info!("{} migration(s) completed", migrations.len()),
        }
    }
}
