//! New command implementation - scaffolds a migration file

use anyhow::{Context, Result};
use chrono::Utc;
use keel_core::{MigrationFileName, MigrationName};
use keel_migrate::registry::SQL_EXTENSION;
use keel_migrate::SqlMigration;
use std::fs;
use std::path::{Path, PathBuf};

use crate::cli::{GlobalArgs, NewArgs};
use crate::context::ProjectContext;

/// Execute the new command
pub(crate) async fn execute(args: &NewArgs, global: &GlobalArgs) -> Result<()> {
    let ctx = ProjectContext::load(global)?;
    let dir = ctx.migrations_dir();
    fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create directory: {}", dir.display()))?;

    let ext = args.ext.trim_start_matches('.');
    if ext.is_empty() || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        anyhow::bail!("Invalid extension '{}': use letters and digits only", args.ext);
    }

    let name = MigrationName::generate(Utc::now());
    let path = unique_path(&dir, name, ext)?;
    let description = args.description.as_deref().unwrap_or_default();
    let body = if ext.eq_ignore_ascii_case(SQL_EXTENSION) {
        SqlMigration::template(description)
    } else {
        String::new()
    };

    fs::write(&path, body).with_context(|| format!("Failed to write {}", path.display()))?;
    println!("Created {}", path.display());
    if !ext.eq_ignore_ascii_case(SQL_EXTENSION) {
        println!("  register an up/down capability for it with MigrationRegistry::register");
    }
    Ok(())
}

/// Pick a file path for `name`, bumping the 9-digit suffix while any file in
/// `dir` already uses that stem.
pub(crate) fn unique_path(dir: &Path, name: MigrationName, ext: &str) -> Result<PathBuf> {
    let (date, suffix) = name
        .as_str()
        .rsplit_once('-')
        .context("Generated migration name has no suffix")?;
    let mut counter: u64 = suffix
        .parse()
        .with_context(|| format!("Generated migration suffix '{suffix}' is not numeric"))?;

    loop {
        let stem = format!("{date}-{counter:09}");
        if !stem_taken(dir, &stem)? {
            let file_name = format!("{stem}.{ext}");
            // Round-trip through the parser so the file is discoverable.
            MigrationFileName::parse(&file_name)?
                .with_context(|| format!("'{file_name}' is not a valid migration file name"))?;
            return Ok(dir.join(file_name));
        }
        counter += 1;
        if counter > 999_999_999 {
            anyhow::bail!("No free migration name left for {date}");
        }
    }
}

fn stem_taken(dir: &Path, stem: &str) -> Result<bool> {
    for entry in fs::read_dir(dir).with_context(|| format!("Failed to read {}", dir.display()))? {
        let entry = entry?;
        let path = entry.path();
        if path.file_stem().and_then(|s| s.to_str()) == Some(stem) {
            return Ok(true);
        }
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unique_path_bumps_suffix_on_collision() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("2024-05-06-120000000.sql"), "").unwrap();
        fs::write(dir.path().join("2024-05-06-120000001.rs"), "").unwrap();

        let path = unique_path(dir.path(), MigrationName::new("2024-05-06-120000000"), "sql")
            .unwrap();
        assert_eq!(path, dir.path().join("2024-05-06-120000002.sql"));
    }

    #[test]
    fn unique_path_keeps_free_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = unique_path(dir.path(), MigrationName::new("2024-05-06-000000042"), "rs")
            .unwrap();
        assert_eq!(path, dir.path().join("2024-05-06-000000042.rs"));
    }
}
