//! Merge on-disk definitions with ledger rows into one ordered view.

use crate::ledger::LedgerRow;
use crate::migration::{Migration, UpDownState};
use std::collections::BTreeMap;

/// Mark disk migrations that have a ledger row as `Up`, add a ghost for every
/// row without a file, and return everything sorted by name.
///
/// The ledger is authoritative for `batch`, `run_at` and `created_at`; the
/// description comes from disk when the file exists.
pub fn reconcile(disk: Vec<Migration>, rows: Vec<LedgerRow>) -> Vec<Migration> {
    let mut rows: BTreeMap<_, _> = rows.into_iter().map(|r| (r.name.clone(), r)).collect();

    let mut merged: Vec<Migration> = disk
        .into_iter()
        .map(|mut migration| {
            match rows.remove(&migration.name) {
                Some(row) => {
                    migration.up_down_state = UpDownState::Up;
                    migration.batch = Some(row.batch);
                    migration.run_at = Some(row.run_at);
                    migration.created_at = row.created_at;
                }
                None => {
                    migration.up_down_state = UpDownState::Down;
                    migration.batch = None;
                    migration.run_at = None;
                }
            }
            migration
        })
        .collect();

    for row in rows.into_values() {
        log::debug!("Ledger row '{}' has no migration file", row.name);
        merged.push(Migration::ghost(
            row.name,
            row.description,
            row.created_at,
            row.batch,
            row.run_at,
        ));
    }

    merged.sort_by(|a, b| a.name.cmp(&b.name));
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migration::SqlMigration;
    use chrono::{NaiveDate, TimeZone, Utc};
    use keel_core::MigrationName;
    use std::sync::Arc;

    fn disk(name: &str) -> Migration {
        Migration::new(
            MigrationName::new(name),
            "from disk",
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            Arc::new(SqlMigration {
                description: "from disk".to_string(),
                up_sql: String::new(),
                down_sql: String::new(),
            }),
        )
    }

    fn row(name: &str, batch: i64) -> LedgerRow {
        LedgerRow {
            id: format!("id-{name}"),
            name: MigrationName::new(name),
            description: "from ledger".to_string(),
            batch,
            created_at: NaiveDate::from_ymd_opt(2023, 6, 1).unwrap(),
            run_at: Utc.with_ymd_and_hms(2024, 2, 1, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn empty_ledger_leaves_everything_down() {
        let merged = reconcile(vec![disk("b"), disk("a")], vec![]);
        let names: Vec<&str> = merged.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert!(merged.iter().all(|m| !m.is_up() && m.batch.is_none()));
    }

    #[test]
    fn matching_row_marks_up_with_ledger_attributes() {
        let merged = reconcile(vec![disk("a"), disk("b")], vec![row("a", 4)]);
        assert!(merged[0].is_up());
        assert_eq!(merged[0].batch, Some(4));
        assert_eq!(
            merged[0].created_at,
            NaiveDate::from_ymd_opt(2023, 6, 1).unwrap()
        );
        assert_eq!(merged[0].description, "from disk");
        assert!(merged[0].run_at.is_some());
        assert!(!merged[1].is_up());
    }

    #[test]
    fn unmatched_row_becomes_ghost_in_order() {
        let merged = reconcile(
            vec![disk("2024-01-01-000000001"), disk("2024-03-01-000000001")],
            vec![row("orphan-migration", 1), row("2024-02-01-000000001", 1)],
        );
        let names: Vec<&str> = merged.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "2024-01-01-000000001",
                "2024-02-01-000000001",
                "2024-03-01-000000001",
                "orphan-migration"
            ]
        );
        let ghost = &merged[1];
        assert!(ghost.is_up());
        assert!(!ghost.is_runnable());
        assert_eq!(ghost.description, "from ledger");
        assert_eq!(ghost.batch, Some(1));
    }
}
