//! Terminal progress for migration runs.

use indicatif::{ProgressBar, ProgressStyle};
use keel_migrate::{Direction, MigrateError, Migration, Reporter, StepOutcome};
use std::sync::Mutex;

/// Draws a progress bar on stderr while steps run.
#[derive(Default)]
pub(crate) struct ConsoleReporter {
    bar: Mutex<Option<ProgressBar>>,
}

impl ConsoleReporter {
    fn with_bar(&self, f: impl FnOnce(&ProgressBar)) {
        if let Ok(guard) = self.bar.lock() {
            if let Some(pb) = guard.as_ref() {
                f(pb);
            }
        }
    }
}

impl Reporter for ConsoleReporter {
    fn on_plan(&self, direction: Direction, count: usize) {
        let pb = ProgressBar::new(count as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
                )
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        pb.set_message(format!("migrating {direction}"));
        if let Ok(mut guard) = self.bar.lock() {
            *guard = Some(pb);
        }
    }

    fn on_progress(&self, message: &str) {
        self.with_bar(|pb| pb.set_message(message.to_string()));
    }

    fn on_step_result(&self, migration: &Migration, outcome: &StepOutcome<'_>) {
        self.with_bar(|pb| {
            match outcome {
                StepOutcome::Applied => pb.println(format!("  ✓ up    {}", migration.name)),
                StepOutcome::Reverted => pb.println(format!("  ✓ down  {}", migration.name)),
                StepOutcome::Failed { direction, .. } => {
                    pb.println(format!("  ✗ {direction:<5} {}", migration.name))
                }
            }
            pb.inc(1);
        });
    }

    fn on_summary(&self, _migrations: &[Migration], _error: Option<&MigrateError>) {
        if let Ok(mut guard) = self.bar.lock() {
            if let Some(pb) = guard.take() {
                pb.finish_and_clear();
            }
        }
    }
}
