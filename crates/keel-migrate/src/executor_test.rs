use super::*;
use crate::error::MigrateError;
use crate::migration::{MigrationCapability, SqlMigration, UpDownState};
use crate::reporter::NoopReporter;
use chrono::{NaiveDate, Utc};
use keel_core::{LedgerConfig, MigrationName};
use keel_db::DuckDbBackend;
use std::sync::{Arc, Mutex};

fn sql(name: &str, up: &str, down: &str) -> Migration {
    Migration::new(
        MigrationName::new(name),
        format!("migration {name}"),
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        Arc::new(SqlMigration {
            description: String::new(),
            up_sql: up.to_string(),
            down_sql: down.to_string(),
        }) as Arc<dyn MigrationCapability>,
    )
}

async fn setup() -> (DuckDbBackend, Ledger) {
    let conn = DuckDbBackend::in_memory().unwrap();
    let ledger = Ledger::new(LedgerConfig::default());
    ledger.ensure_schema(&conn).await.unwrap();
    (conn, ledger)
}

#[derive(Default)]
struct Recording {
    events: Mutex<Vec<String>>,
}

impl Reporter for Recording {
    fn on_plan(&self, direction: Direction, count: usize) {
        self.events
            .lock()
            .unwrap()
            .push(format!("plan {direction} {count}"));
    }

    fn on_step_result(&self, migration: &Migration, outcome: &StepOutcome<'_>) {
        let tag = match outcome {
            StepOutcome::Applied => "applied",
            StepOutcome::Reverted => "reverted",
            StepOutcome::Failed { .. } => "failed",
        };
        self.events
            .lock()
            .unwrap()
            .push(format!("{tag} {}", migration.name));
    }
}

#[test]
fn candidates_follow_state_and_order() {
    let created = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    let mut c = sql("c", "", "");
    c.mark_applied(2, Utc::now());
    let mut a = sql("a", "", "");
    a.mark_applied(2, Utc::now());
    let mut old = sql("0", "", "");
    old.mark_applied(1, Utc::now());
    let ghost = Migration::ghost(MigrationName::new("b"), "", created, 2, Utc::now());
    let migrations = vec![c, sql("e", "", ""), a, ghost, sql("d", "", ""), old];

    let up: Vec<&str> = up_candidates(&migrations)
        .into_iter()
        .map(|i| migrations[i].name.as_str())
        .collect();
    assert_eq!(up, vec!["d", "e"]);

    let down: Vec<&str> = down_candidates(&migrations, 2)
        .into_iter()
        .map(|i| migrations[i].name.as_str())
        .collect();
    assert_eq!(down, vec!["c", "a"]);
}

#[tokio::test]
async fn apply_runs_pending_in_order_as_one_batch() {
    let (conn, ledger) = setup().await;
    let reporter = Recording::default();
    let mut migrations = vec![
        sql("2024-01-01-000000001", "CREATE TABLE a (id INT)", "DROP TABLE a"),
        sql(
            "2024-01-01-000000002",
            "INSERT INTO a VALUES (1)",
            "DELETE FROM a",
        ),
    ];

    let report = apply(&conn, &ledger, &mut migrations, &reporter)
        .await
        .unwrap();
    assert_eq!(report.batch, Some(1));
    assert_eq!(report.migrations.len(), 2);
    assert!(migrations
        .iter()
        .all(|m| m.is_up() && m.batch == Some(1) && m.run_state == RunState::Completed));
    assert_eq!(
        *reporter.events.lock().unwrap(),
        vec![
            "plan up 2",
            "applied 2024-01-01-000000001",
            "applied 2024-01-01-000000002"
        ]
    );

    let rows = ledger.list_applied(&conn).await.unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].description, "migration 2024-01-01-000000001");
}

#[tokio::test]
async fn apply_with_nothing_pending_writes_nothing() {
    let (conn, ledger) = setup().await;
    let mut migrations: Vec<Migration> = Vec::new();
    let report = apply(&conn, &ledger, &mut migrations, &NoopReporter)
        .await
        .unwrap();
    assert!(report.migrations.is_empty());
    assert_eq!(report.batch, None);
    assert_eq!(ledger.last_batch(&conn).await.unwrap(), None);
}

#[tokio::test]
async fn apply_stops_at_first_failure() {
    let (conn, ledger) = setup().await;
    let mut migrations = vec![
        sql("m1", "CREATE TABLE a (id INT)", "DROP TABLE a"),
        sql("m2", "CREATE TABLE broken (", ""),
        sql("m3", "CREATE TABLE c (id INT)", "DROP TABLE c"),
    ];

    let err = apply(&conn, &ledger, &mut migrations, &NoopReporter)
        .await
        .unwrap_err();
    let MigrateError::Execution(exec) = err else {
        panic!("expected execution error");
    };
    assert_eq!(exec.migration.name, "m2");
    assert_eq!(exec.direction, Direction::Up);
    assert_eq!(exec.completed, vec![MigrationName::new("m1")]);
    assert!(!exec.rolled_back);

    assert_eq!(migrations[0].run_state, RunState::Completed);
    assert_eq!(migrations[1].run_state, RunState::Error);
    assert_eq!(migrations[1].up_down_state, UpDownState::Down);
    assert_eq!(migrations[2].run_state, RunState::Pending);
    assert_eq!(ledger.list_applied(&conn).await.unwrap().len(), 1);
}

#[tokio::test]
async fn revert_undoes_only_last_batch_in_reverse() {
    let (conn, ledger) = setup().await;
    let reporter = Recording::default();
    let mut first = vec![sql("m1", "CREATE TABLE a (id INT)", "DROP TABLE a")];
    apply(&conn, &ledger, &mut first, &NoopReporter)
        .await
        .unwrap();

    let mut all = vec![
        first.remove(0),
        sql("m2", "CREATE TABLE b (id INT)", "DROP TABLE b"),
        sql("m3", "CREATE VIEW v AS SELECT * FROM b", "DROP VIEW v"),
    ];
    apply(&conn, &ledger, &mut all, &NoopReporter).await.unwrap();
    assert_eq!(all[2].batch, Some(2));

    let report = revert(&conn, &ledger, &mut all, &reporter).await.unwrap();
    assert_eq!(report.batch, Some(2));
    let names: Vec<&str> = report.migrations.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(names, vec!["m3", "m2"]);
    assert!(all[0].is_up());
    assert!(!all[1].is_up() && all[1].batch.is_none() && all[1].run_at.is_none());
    assert_eq!(ledger.last_batch(&conn).await.unwrap(), Some(1));
    assert_eq!(
        *reporter.events.lock().unwrap(),
        vec!["plan down 2", "reverted m3", "reverted m2"]
    );
}

#[tokio::test]
async fn revert_with_empty_ledger_is_noop() {
    let (conn, ledger) = setup().await;
    let mut migrations = vec![sql("m1", "CREATE TABLE a (id INT)", "DROP TABLE a")];
    let report = revert(&conn, &ledger, &mut migrations, &NoopReporter)
        .await
        .unwrap();
    assert!(report.migrations.is_empty());
    assert_eq!(report.batch, None);
}

#[tokio::test]
async fn revert_failure_reports_down_direction() {
    let (conn, ledger) = setup().await;
    let mut migrations = vec![sql("m1", "CREATE TABLE a (id INT)", "DROP TABLE missing")];
    apply(&conn, &ledger, &mut migrations, &NoopReporter)
        .await
        .unwrap();

    let err = revert(&conn, &ledger, &mut migrations, &NoopReporter)
        .await
        .unwrap_err();
    let MigrateError::Execution(exec) = err else {
        panic!("expected execution error");
    };
    assert_eq!(exec.direction, Direction::Down);
    assert!(exec.completed.is_empty());
    assert!(migrations[0].is_up());
    assert_eq!(migrations[0].run_state, RunState::Error);
}

#[test]
fn status_filters_without_database() {
    let mut up = sql("a", "", "");
    up.mark_applied(1, Utc::now());
    let migrations = vec![up, sql("b", "", "")];
    assert_eq!(status(&migrations, StatusFilter::All).len(), 2);
    assert_eq!(status(&migrations, StatusFilter::Up)[0].name, "a");
    assert_eq!(status(&migrations, StatusFilter::Down)[0].name, "b");
}
