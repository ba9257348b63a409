//! Status command implementation - lists applied and pending migrations

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use keel_migrate::{Migration, NoopReporter, UpDownState};
use serde::Serialize;
use std::sync::Arc;

use crate::cli::{GlobalArgs, StatusArgs, StatusOutput};
use crate::commands::common::{print_table, release};
use crate::context::ProjectContext;

/// One status line, as printed in JSON output
#[derive(Debug, Serialize)]
pub(crate) struct StatusRow {
    pub name: String,
    pub description: String,
    pub state: UpDownState,
    pub batch: Option<i64>,
    pub created_at: NaiveDate,
    pub run_at: Option<DateTime<Utc>>,
    /// False for ledger rows whose file is gone
    pub runnable: bool,
}

impl From<&Migration> for StatusRow {
    fn from(m: &Migration) -> Self {
        Self {
            name: m.name.to_string(),
            description: m.description.clone(),
            state: m.up_down_state,
            batch: m.batch,
            created_at: m.created_at,
            run_at: m.run_at,
            runnable: m.is_runnable(),
        }
    }
}

/// Execute the status command
pub(crate) async fn execute(args: &StatusArgs, global: &GlobalArgs) -> Result<()> {
    let ctx = ProjectContext::load(global)?;
    let conn = ctx.connect()?;
    let migrator = ctx.migrator(Arc::new(NoopReporter));

    let result = migrator.query_status(&conn, args.filter.into()).await;
    release(&conn).await;
    let migrations = result.context("Failed to read migration status")?;
    let rows: Vec<StatusRow> = migrations.iter().map(StatusRow::from).collect();

    match args.output {
        StatusOutput::Json => {
            let json = serde_json::to_string_pretty(&rows)
                .context("Failed to serialize migration status")?;
            println!("{json}");
        }
        StatusOutput::Table => {
            if rows.is_empty() {
                println!("No migrations found.");
                return Ok(());
            }
            print_table(
                &["NAME", "STATE", "BATCH", "RUN AT", "DESCRIPTION"],
                &table_rows(&rows),
            );
            let pending = rows
                .iter()
                .filter(|r| r.state == UpDownState::Down)
                .count();
            println!("\n{} migration(s), {pending} pending", rows.len());
        }
    }
    Ok(())
}

pub(crate) fn table_rows(rows: &[StatusRow]) -> Vec<Vec<String>> {
    rows.iter()
        .map(|r| {
            let state = if r.runnable {
                r.state.to_string()
            } else {
                format!("{} (no file)", r.state)
            };
            vec![
                r.name.clone(),
                state,
                r.batch.map(|b| b.to_string()).unwrap_or_default(),
                r.run_at
                    .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                    .unwrap_or_default(),
                r.description.clone(),
            ]
        })
        .collect()
}
