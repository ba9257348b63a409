//! CLI argument definitions using clap derive API

use clap::{Args, Parser, Subcommand, ValueEnum};
use keel_core::config::DATABASE_ENV_VAR;
use keel_migrate::StatusFilter;

/// Keel - batch-based schema migrations for DuckDB
#[derive(Parser, Debug)]
#[command(name = "keel")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Global arguments available to all commands
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to project directory
    #[arg(short = 'p', long, global = true, default_value = ".")]
    pub project_dir: String,

    /// Override config file path
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Override the database path from keel.yml
    #[arg(short, long, global = true, env = DATABASE_ENV_VAR)]
    pub database: Option<String>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write a default keel.yml and create the migrations directory
    Init(InitArgs),

    /// Create a new, empty migration file
    New(NewArgs),

    /// Apply all pending migrations as one batch
    Up(RunArgs),

    /// Revert the most recently applied batch
    Down(RunArgs),

    /// Show which migrations are applied
    Status(StatusArgs),
}

/// Arguments for the init command
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Project name (default: the project directory name)
    #[arg(short, long)]
    pub name: Option<String>,
}

/// Arguments for the new command
#[derive(Args, Debug)]
pub struct NewArgs {
    /// Description written into the migration header
    #[arg(short = 'm', long)]
    pub description: Option<String>,

    /// File extension; anything other than `sql` needs a capability registered in code
    #[arg(long, default_value = "sql")]
    pub ext: String,
}

/// Arguments for the up and down commands
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Run steps without a surrounding transaction
    #[arg(long)]
    pub no_transaction: bool,
}

/// Arguments for the status command
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Which migrations to list
    #[arg(short, long, value_enum, default_value = "all")]
    pub filter: StatusFilterArg,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub output: StatusOutput,
}

/// Status filter values
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusFilterArg {
    /// Applied migrations only
    Up,
    /// Pending migrations only
    Down,
    /// Everything
    All,
}

impl From<StatusFilterArg> for StatusFilter {
    fn from(arg: StatusFilterArg) -> Self {
        match arg {
            StatusFilterArg::Up => StatusFilter::Up,
            StatusFilterArg::Down => StatusFilter::Down,
            StatusFilterArg::All => StatusFilter::All,
        }
    }
}

/// Status output formats
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusOutput {
    /// Table format
    Table,
    /// JSON output
    Json,
}

#[cfg(test)]
#[path = "cli_test.rs"]
mod tests;
