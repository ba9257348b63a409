use super::*;
use chrono::NaiveDate;
use keel_core::MigrationName;
use keel_db::{DbError, DuckDbBackend};
use keel_migrate::{LedgerError, Migration, MigrationExecutionError, RegistryError};

fn step_failure(direction: Direction, completed: &[&str], rolled_back: bool) -> MigrateError {
    let migration = Migration::ghost(
        MigrationName::new("2024-01-03-000000001"),
        "",
        NaiveDate::from_ymd_opt(2024, 1, 3).unwrap(),
        1,
        chrono::Utc::now(),
    );
    MigrationExecutionError {
        migration,
        direction,
        source: DbError::ExecutionError("boom".to_string()),
        completed: completed.iter().map(|n| MigrationName::new(*n)).collect(),
        rolled_back,
    }
    .into()
}

#[test]
fn column_widths_cover_headers_and_cells() {
    let rows = vec![vec!["2024-01-01-000000001".to_string(), "up".to_string()]];
    assert_eq!(calculate_column_widths(&["NAME", "STATE"], &rows), vec![20, 5]);
}

#[test]
fn format_table_aligns_columns() {
    let rows = vec![
        vec!["a".to_string(), "up".to_string()],
        vec!["bbbb".to_string(), "down".to_string()],
    ];
    let table = format_table(&["NAME", "STATE"], &rows);
    assert_eq!(table, "NAME  STATE\n----  -----\na     up\nbbbb  down");
}

#[test]
fn format_table_without_rows() {
    assert_eq!(format_table(&["NAME"], &[]), "NAME\n----");
}

#[test]
fn rolled_back_first_step_still_reports_rollback() {
    let err = step_failure(Direction::Up, &[], true);
    assert_eq!(failure_notes(&err, true), vec!["All changes were rolled back"]);
}

#[test]
fn rolled_back_run_lists_undone_steps() {
    let err = step_failure(Direction::Up, &["2024-01-01-000000001", "2024-01-02-000000001"], true);
    assert_eq!(
        failure_notes(&err, true),
        vec![
            "All changes were rolled back",
            "Undone step(s): 2024-01-01-000000001, 2024-01-02-000000001"
        ]
    );
}

#[test]
fn ledger_failure_in_transaction_reports_rollback() {
    let err = MigrateError::from(LedgerError::new(
        "insert",
        DbError::ExecutionError("disk full".to_string()),
    ));
    assert_eq!(failure_notes(&err, true), vec!["All changes were rolled back"]);
    assert!(failure_notes(&err, false).is_empty());
}

#[test]
fn failed_rollback_is_not_reported_as_rolled_back() {
    let err = step_failure(Direction::Up, &["2024-01-01-000000001"], false);
    let notes = failure_notes(&err, true);
    assert!(notes[0].starts_with("Rollback failed"));
    assert!(notes[1].ends_with("2024-01-01-000000001"));
}

#[test]
fn non_transactional_failure_lists_remaining_steps() {
    let err = step_failure(Direction::Down, &["2024-01-02-000000001"], false);
    assert_eq!(
        failure_notes(&err, false),
        vec!["1 earlier step(s) remain reverted: 2024-01-02-000000001"]
    );
    assert!(failure_notes(&step_failure(Direction::Up, &[], false), false).is_empty());
}

#[test]
fn registry_failure_has_no_notes() {
    let err = MigrateError::from(RegistryError::DirectoryNotFound {
        path: "migrations".to_string(),
    });
    assert!(failure_notes(&err, true).is_empty());
}

#[tokio::test]
async fn release_closes_open_transaction() {
    let conn = DuckDbBackend::in_memory().unwrap();
    conn.begin_transaction().await.unwrap();
    conn.execute("CREATE TABLE t (id INT)", &[]).await.unwrap();
    release(&conn).await;
    assert!(!conn.relation_exists("t").await.unwrap());
    conn.begin_transaction().await.unwrap();
    conn.commit().await.unwrap();
}
