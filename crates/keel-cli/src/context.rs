//! Runtime context for CLI commands

use anyhow::{Context, Result};
use keel_core::Config;
use keel_db::DuckDbBackend;
use keel_migrate::{Ledger, MigrationRegistry, Migrator, Reporter};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::cli::GlobalArgs;

/// Loaded project configuration plus the resolved database location
pub(crate) struct ProjectContext {
    /// Project root (the `--project-dir`)
    pub root: PathBuf,

    /// Parsed `keel.yml`
    pub config: Config,

    /// Database path after CLI/env/config resolution
    pub database: String,
}

impl ProjectContext {
    /// Load configuration from global arguments
    pub fn load(args: &GlobalArgs) -> Result<Self> {
        let root = PathBuf::from(&args.project_dir);

        let config = if let Some(config_path) = &args.config {
            Config::load(Path::new(config_path)).context("Failed to load configuration file")?
        } else {
            Config::load_from_dir(&root).context("Failed to load project configuration")?
        };

        let database = config.resolve_database(&root, args.database.as_deref());
        log::debug!("Using database {database}");

        Ok(Self {
            root,
            config,
            database,
        })
    }

    /// Absolute migrations directory
    pub fn migrations_dir(&self) -> PathBuf {
        self.config.migrations_dir_absolute(&self.root)
    }

    /// Open the target database
    pub fn connect(&self) -> Result<DuckDbBackend> {
        DuckDbBackend::new(&self.database)
            .with_context(|| format!("Failed to connect to database '{}'", self.database))
    }

    /// Build a migrator over the configured directory and ledger table
    pub fn migrator(&self, reporter: Arc<dyn Reporter>) -> Migrator {
        Migrator::new(
            MigrationRegistry::new(self.migrations_dir()),
            Ledger::new(self.config.ledger.clone()),
        )
        .with_reporter(reporter)
    }
}
