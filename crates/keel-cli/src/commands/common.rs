//! Helpers shared by the CLI commands.

use anyhow::{Context, Result};
use keel_db::Connection;
use keel_migrate::{ApplyOptions, Direction, MigrateError, RunOutcome};
use std::sync::Arc;

use crate::cli::{GlobalArgs, RunArgs};
use crate::context::ProjectContext;
use crate::reporter::ConsoleReporter;

/// Shared body of `keel up` and `keel down`.
pub(crate) async fn run_migrations(
    direction: Direction,
    args: &RunArgs,
    global: &GlobalArgs,
) -> Result<()> {
    let ctx = ProjectContext::load(global)?;
    let options = ApplyOptions {
        transactional: ctx.config.transactional && !args.no_transaction,
    };
    let conn = ctx.connect()?;
    let migrator = ctx.migrator(Arc::new(ConsoleReporter::default()));

    let result = match direction {
        Direction::Up => migrator.apply_pending(&conn, options).await,
        Direction::Down => migrator.revert_last_batch(&conn, options).await,
    };
    release(&conn).await;

    match result {
        Ok(outcome) => {
            print_outcome(&outcome);
            Ok(())
        }
        Err(err) => {
            for line in failure_notes(&err, options.transactional) {
                eprintln!("{line}");
            }
            Err(err).context(match direction {
                Direction::Up => "Failed to apply migrations",
                Direction::Down => "Failed to revert migrations",
            })
        }
    }
}

fn print_outcome(outcome: &RunOutcome) {
    let Some(batch) = outcome.batch.filter(|_| !outcome.is_empty()) else {
        match outcome.direction {
            Direction::Up => println!("Nothing to migrate."),
            Direction::Down => println!("Nothing to revert."),
        }
        return;
    };

    let verb = match outcome.direction {
        Direction::Up => "Applied",
        Direction::Down => "Reverted",
    };
    println!(
        "{verb} {} migration(s) in batch {batch}{}:",
        outcome.migrations.len(),
        if outcome.transactional {
            ""
        } else {
            " (no transaction)"
        }
    );
    for migration in &outcome.migrations {
        println!("  {}", migration.name);
    }
}

/// Hand the connection back, rolling back anything a failed run left open.
pub(crate) async fn release(conn: &dyn Connection) {
    if let Err(err) = conn.release().await {
        log::warn!("Failed to release {} connection: {err}", conn.db_type());
    }
}

/// Lines explaining what a failed run left behind.
///
/// Registry failures happen before the database is touched, so they get none.
pub(crate) fn failure_notes(err: &MigrateError, transactional: bool) -> Vec<String> {
    let (completed, direction, rolled_back) = match err {
        MigrateError::Registry(_) => return Vec::new(),
        MigrateError::Ledger(_) => (&[][..], None, true),
        MigrateError::Execution(exec) => {
            (&exec.completed[..], Some(exec.direction), exec.rolled_back)
        }
    };
    let names = completed
        .iter()
        .map(|n| n.as_str())
        .collect::<Vec<_>>()
        .join(", ");

    let mut notes = Vec::new();
    if transactional {
        if rolled_back {
            notes.push("All changes were rolled back".to_string());
            if !completed.is_empty() {
                notes.push(format!("Undone step(s): {names}"));
            }
        } else {
            notes.push("Rollback failed; the database may hold partial changes".to_string());
            if !completed.is_empty() {
                notes.push(format!("Steps completed before the failure: {names}"));
            }
        }
    } else if !completed.is_empty() {
        notes.push(format!(
            "{} earlier step(s) remain {}: {names}",
            completed.len(),
            match direction {
                Some(Direction::Down) => "reverted",
                _ => "applied",
            }
        ));
    }
    notes
}

// ---------------------------------------------------------------------------
// Table-printing utilities
// ---------------------------------------------------------------------------

/// Calculate column widths for a table given headers and row data.
pub(crate) fn calculate_column_widths(headers: &[&str], rows: &[Vec<String>]) -> Vec<usize> {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (w, cell) in widths.iter_mut().zip(row.iter()) {
            *w = (*w).max(cell.chars().count());
        }
    }
    widths
}

/// Render a left-aligned table with a dashed separator under the header.
pub(crate) fn format_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let widths = calculate_column_widths(headers, rows);
    let line = |cells: Vec<String>| -> String {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, &w)| format!("{:<width$}", cell, width = w))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let mut out = Vec::with_capacity(rows.len() + 2);
    out.push(line(headers.iter().map(|h| h.to_string()).collect()));
    out.push(line(widths.iter().map(|&w| "-".repeat(w)).collect()));
    for row in rows {
        out.push(line(row.clone()));
    }
    out.join("\n")
}

/// Print a formatted table to stdout.
pub(crate) fn print_table(headers: &[&str], rows: &[Vec<String>]) {
    println!("{}", format_table(headers, rows));
}

#[cfg(test)]
#[path = "common_test.rs"]
mod tests;
