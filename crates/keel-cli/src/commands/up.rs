//! Up command implementation - applies pending migrations

use anyhow::Result;
use keel_migrate::Direction;

use crate::cli::{GlobalArgs, RunArgs};
use crate::commands::common::run_migrations;

/// Execute the up command
pub(crate) async fn execute(args: &RunArgs, global: &GlobalArgs) -> Result<()> {
    run_migrations(Direction::Up, args, global).await
}
