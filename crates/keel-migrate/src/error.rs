//! Error types for the migration engine.
//!
//! A failed run ends in exactly one [`MigrateError`], and callers match on its
//! kind: the registry could not produce a migration set, the ledger could not
//! be read or written, or a specific migration step failed.

use crate::migration::{Direction, Migration};
use keel_core::{CoreError, MigrationName};
use keel_db::DbError;
use thiserror::Error;

/// Discovery failures. Fatal to the run; no steps are attempted.
#[derive(Error, Debug)]
pub enum RegistryError {
    /// R001: Migrations directory does not exist
    #[error("[R001] Migrations directory not found: {path}")]
    DirectoryNotFound { path: String },

    /// R002: Directory or migration file could not be read
    #[error("[R002] Failed to read '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    /// R003: File name fits the pattern but is not a valid migration name
    #[error("[R003] {0}")]
    InvalidName(#[from] CoreError),

    /// R004: Two files share a migration name
    #[error("[R004] Duplicate migration '{name}' in {first} and {second}")]
    DuplicateName {
        name: String,
        first: String,
        second: String,
    },

    /// R005: Migration file does not provide both `up` and `down`
    #[error("[R005] Migration '{name}' ({path}) has no usable up/down pair: {reason}")]
    MissingCapability {
        name: String,
        path: String,
        reason: String,
    },
}

/// Ledger failures unrelated to a specific migration step.
#[derive(Error, Debug)]
#[error("[L001] Migration ledger {operation} failed: {source}")]
pub struct LedgerError {
    /// What the ledger was doing, e.g. "schema creation"
    pub operation: &'static str,
    #[source]
    pub source: DbError,
}

impl LedgerError {
    pub fn new(operation: &'static str, source: DbError) -> Self {
        Self { operation, source }
    }
}

/// A migration's `up` or `down` step failed.
#[derive(Error, Debug)]
#[error("[X001] Migration {name} failed during {direction}: {source}", name = .migration.name)]
pub struct MigrationExecutionError {
    /// The failing migration, with `run_state = Error`
    pub migration: Migration,
    pub direction: Direction,
    #[source]
    pub source: DbError,
    /// Migrations that completed earlier in the same run, in execution order
    pub completed: Vec<MigrationName>,
    /// True when the run was transactional and every step was undone
    pub rolled_back: bool,
}

/// Terminal error of an apply/revert/status run.
#[derive(Error, Debug)]
pub enum MigrateError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Execution(#[from] Box<MigrationExecutionError>),
}

impl From<MigrationExecutionError> for MigrateError {
    fn from(err: MigrationExecutionError) -> Self {
        MigrateError::Execution(Box::new(err))
    }
}

/// Result type alias for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Result type alias for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Result type alias for [`MigrateError`].
pub type MigrateResult<T> = Result<T, MigrateError>;
