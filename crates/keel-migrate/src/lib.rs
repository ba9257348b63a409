//! Migration engine for Keel.
//!
//! Discovers migration files, reconciles them with the ledger table stored in
//! the target database, and applies or reverts them in batches. Runs are
//! transactional by default: a failing step rolls back every step and ledger
//! write of the run.

pub mod error;
pub mod executor;
pub mod ledger;
pub mod migration;
pub mod migrator;
pub mod reconcile;
pub mod registry;
pub mod reporter;

pub use error::{
    LedgerError, MigrateError, MigrateResult, MigrationExecutionError, RegistryError,
};
pub use ledger::{Ledger, LedgerRow};
pub use migration::{
    Direction, Migration, MigrationCapability, RunState, SqlMigration, StatusFilter, UpDownState,
};
pub use migrator::{ApplyOptions, Migrator, RunOutcome};
pub use registry::MigrationRegistry;
pub use reporter::{LogReporter, NoopReporter, Reporter, StepOutcome};
