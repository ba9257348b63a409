//! Down command implementation - reverts the last batch

use anyhow::Result;
use keel_migrate::Direction;

use crate::cli::{GlobalArgs, RunArgs};
use crate::commands::common::run_migrations;

/// Execute the down command
pub(crate) async fn execute(args: &RunArgs, global: &GlobalArgs) -> Result<()> {
    run_migrations(Direction::Down, args, global).await
}
