//! Migration discovery.
//!
//! Scans one directory (non-recursively) for files named
//! `YYYY-MM-DD-NNNNNNNNN.<ext>` and resolves each to an executable
//! capability. Capabilities come from explicit registration by name, or from
//! parsing `.sql` files; anything else is rejected at load time rather than
//! at execution time.

use crate::error::{RegistryError, RegistryResult};
use crate::migration::{Migration, MigrationCapability, SqlMigration};
use keel_core::{MigrationFileName, MigrationName};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Extension of migrations that carry their own up/down SQL.
pub const SQL_EXTENSION: &str = "sql";

/// Discovers migration definitions in a directory.
pub struct MigrationRegistry {
    dir: PathBuf,
    registered: BTreeMap<MigrationName, Arc<dyn MigrationCapability>>,
}

impl MigrationRegistry {
    /// Create a registry over `dir`. The directory is read on each [`load`](Self::load).
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            registered: BTreeMap::new(),
        }
    }

    /// Attach a compiled capability to the migration file with this name.
    ///
    /// A registration takes precedence over the file's own content, so a
    /// `.rs`/`.txt` placeholder (or even a `.sql` file) can be backed by code.
    pub fn register(
        mut self,
        name: impl Into<MigrationName>,
        capability: Arc<dyn MigrationCapability>,
    ) -> Self {
        self.registered.insert(name.into(), capability);
        self
    }

    /// Directory this registry scans.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Load every migration in the directory, ordered by name.
    pub fn load(&self) -> RegistryResult<Vec<Migration>> {
        if !self.dir.is_dir() {
            return Err(RegistryError::DirectoryNotFound {
                path: self.dir.display().to_string(),
            });
        }

        let io_err = |path: &Path, source: std::io::Error| RegistryError::Io {
            path: path.display().to_string(),
            source,
        };

        let mut found: BTreeMap<MigrationName, (PathBuf, Migration)> = BTreeMap::new();
        for entry in std::fs::read_dir(&self.dir).map_err(|e| io_err(&self.dir, e))? {
            let entry = entry.map_err(|e| io_err(&self.dir, e))?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
                log::debug!("Skipping non UTF-8 file name in {}", self.dir.display());
                continue;
            };
            let Some(parsed) = MigrationFileName::parse(file_name)? else {
                log::debug!("Ignoring non-migration file {}", path.display());
                continue;
            };

            if let Some((first, _)) = found.get(&parsed.name) {
                return Err(RegistryError::DuplicateName {
                    name: parsed.name.to_string(),
                    first: first.display().to_string(),
                    second: path.display().to_string(),
                });
            }

            let migration = self.resolve(&path, parsed)?;
            found.insert(migration.name.clone(), (path, migration));
        }

        for name in self.registered.keys() {
            if !found.contains_key(name) {
                log::warn!(
                    "Migration '{}' is registered but has no file in {}",
                    name,
                    self.dir.display()
                );
            }
        }

        log::debug!(
            "Discovered {} migration(s) in {}",
            found.len(),
            self.dir.display()
        );
        Ok(found.into_values().map(|(_, m)| m).collect())
    }

    fn resolve(&self, path: &Path, parsed: MigrationFileName) -> RegistryResult<Migration> {
        if let Some(capability) = self.registered.get(&parsed.name) {
            let description = capability.description().to_string();
            return Ok(Migration::new(
                parsed.name,
                description,
                parsed.created_at,
                Arc::clone(capability),
            ));
        }

        if !parsed.extension.eq_ignore_ascii_case(SQL_EXTENSION) {
            return Err(RegistryError::MissingCapability {
                name: parsed.name.to_string(),
                path: path.display().to_string(),
                reason: format!(
                    "'.{}' files need a registered capability",
                    parsed.extension
                ),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| RegistryError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        let sql = SqlMigration::parse(&content).map_err(|reason| {
            RegistryError::MissingCapability {
                name: parsed.name.to_string(),
                path: path.display().to_string(),
                reason,
            }
        })?;
        let description = sql.description.clone();
        Ok(Migration::new(
            parsed.name,
            description,
            parsed.created_at,
            Arc::new(sql),
        ))
    }
}

#[cfg(test)]
#[path = "registry_test.rs"]
mod tests;
