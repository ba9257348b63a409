//! Init command implementation - scaffolds keel.yml and the migrations directory

use anyhow::{Context, Result};
use keel_core::config::CONFIG_FILE_NAMES;
use keel_core::Config;
use std::fs;
use std::path::Path;

use crate::cli::{GlobalArgs, InitArgs};

/// Execute the init command
pub(crate) async fn execute(args: &InitArgs, global: &GlobalArgs) -> Result<()> {
    let root = Path::new(&global.project_dir);

    if let Some(existing) = CONFIG_FILE_NAMES
        .iter()
        .map(|name| root.join(name))
        .find(|path| path.exists())
    {
        anyhow::bail!("{} already exists", existing.display());
    }

    let name = match &args.name {
        Some(name) => name.clone(),
        None => default_project_name(root)?,
    };

    let config = Config::with_name(name);
    config.validate().context("Invalid project configuration")?;

    fs::create_dir_all(root)
        .with_context(|| format!("Failed to create directory: {}", root.display()))?;
    let migrations_dir = config.migrations_dir_absolute(root);
    fs::create_dir_all(&migrations_dir)
        .with_context(|| format!("Failed to create directory: {}", migrations_dir.display()))?;

    let config_path = root.join(CONFIG_FILE_NAMES[0]);
    let yaml = config.to_yaml().context("Failed to render keel.yml")?;
    fs::write(&config_path, yaml)
        .with_context(|| format!("Failed to write {}", config_path.display()))?;

    println!("Initialized Keel project '{}'", config.name);
    println!("  config:     {}", config_path.display());
    println!("  migrations: {}", migrations_dir.display());
    Ok(())
}

/// Directory name of the project root, falling back to the current directory.
fn default_project_name(root: &Path) -> Result<String> {
    let absolute = if root.is_absolute() {
        root.to_path_buf()
    } else {
        std::env::current_dir()
            .context("Failed to read current directory")?
            .join(root)
    };
    absolute
        .components()
        .filter_map(|c| match c {
            std::path::Component::Normal(part) => part.to_str(),
            _ => None,
        })
        .last()
        .map(String::from)
        .context("Cannot derive a project name; pass --name")
}
