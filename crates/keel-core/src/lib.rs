//! keel-core - Core library for Keel
//!
//! This crate provides the shared pieces used across all Keel components:
//! `keel.yml` configuration parsing, the migration naming scheme, and the
//! core error type.

pub mod config;
pub mod error;
pub mod migration_name;
pub(crate) mod serde_helpers;

pub use config::{Config, DatabaseConfig, LedgerConfig};
pub use error::{CoreError, CoreResult};
pub use migration_name::{MigrationFileName, MigrationName};
