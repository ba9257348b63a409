use super::*;

#[test]
fn parse_sections_and_description() {
    let content = "\
-- description: create users
-- up
CREATE TABLE users (id INTEGER);
-- a comment kept with the statement
INSERT INTO users VALUES (1);
-- down
DROP TABLE users;
";
    let sql = SqlMigration::parse(content).unwrap();
    assert_eq!(sql.description, "create users");
    assert_eq!(
        sql.up_sql,
        "CREATE TABLE users (id INTEGER);\n-- a comment kept with the statement\nINSERT INTO users VALUES (1);"
    );
    assert_eq!(sql.down_sql, "DROP TABLE users;");
}

#[test]
fn parse_markers_are_case_insensitive_and_order_free() {
    let sql = SqlMigration::parse("--DOWN\nDROP TABLE t;\n--  Up \nCREATE TABLE t (id INT);\n")
        .unwrap();
    assert_eq!(sql.up_sql, "CREATE TABLE t (id INT);");
    assert_eq!(sql.down_sql, "DROP TABLE t;");
    assert_eq!(sql.description, "");
}

#[test]
fn parse_allows_empty_down() {
    let sql = SqlMigration::parse("-- up\nCREATE TABLE t (id INT);\n-- down\n").unwrap();
    assert!(sql.down_sql.is_empty());
}

#[test]
fn parse_rejects_missing_markers() {
    assert!(SqlMigration::parse("CREATE TABLE t (id INT);")
        .unwrap_err()
        .contains("'-- up' and '-- down'"));
    assert!(SqlMigration::parse("-- up\nCREATE TABLE t (id INT);")
        .unwrap_err()
        .contains("'-- down'"));
    assert!(SqlMigration::parse("-- down\nDROP TABLE t;")
        .unwrap_err()
        .contains("'-- up'"));
}

#[test]
fn parse_rejects_sql_before_first_marker() {
    let err = SqlMigration::parse(
        "-- description: seed\n\nCREATE TABLE early (id INT);\n-- up\nSELECT 1;\n-- down\n",
    )
    .unwrap_err();
    assert!(err.contains("line 3"), "{err}");
    assert!(err.contains("before the first"), "{err}");

    let sql = SqlMigration::parse("-- a comment\n\n-- up\nSELECT 1;\n-- down\n").unwrap();
    assert_eq!(sql.up_sql, "SELECT 1;");
}

#[test]
fn parse_rejects_duplicate_markers() {
    let err = SqlMigration::parse("-- up\nA;\n-- up\nB;\n-- down\n").unwrap_err();
    assert!(err.contains("more than one"));
}

#[test]
fn template_parses_back() {
    let sql = SqlMigration::parse(&SqlMigration::template("add index")).unwrap();
    assert_eq!(sql.description, "add index");
    assert!(sql.up_sql.is_empty());
    assert!(sql.down_sql.is_empty());
}

#[test]
fn ghost_is_up_and_not_runnable() {
    let created = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    let ghost = Migration::ghost(
        MigrationName::new("orphan-migration"),
        "gone",
        created,
        1,
        Utc::now(),
    );
    assert!(!ghost.is_runnable());
    assert!(ghost.is_up());
    assert_eq!(ghost.batch, Some(1));
    assert!(ghost.run_at.is_some());
}

#[test]
fn mark_applied_and_reverted_keep_state_invariant() {
    let created = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    let capability: Arc<dyn MigrationCapability> = Arc::new(SqlMigration {
        description: String::new(),
        up_sql: String::new(),
        down_sql: String::new(),
    });
    let mut m = Migration::new(
        MigrationName::new("2024-01-01-000000001"),
        "d",
        created,
        capability,
    );
    assert_eq!(m.up_down_state, UpDownState::Down);
    assert!(m.batch.is_none() && m.run_at.is_none());

    m.mark_applied(3, Utc::now());
    assert_eq!(m.up_down_state, UpDownState::Up);
    assert_eq!(m.batch, Some(3));
    assert!(m.run_at.is_some());
    assert_eq!(m.run_state, RunState::Completed);

    m.mark_reverted();
    assert_eq!(m.up_down_state, UpDownState::Down);
    assert!(m.batch.is_none() && m.run_at.is_none());
}

#[test]
fn status_filter_matches() {
    let created = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    let up = Migration::ghost(MigrationName::new("a"), "", created, 1, Utc::now());
    assert!(StatusFilter::Up.matches(&up));
    assert!(!StatusFilter::Down.matches(&up));
    assert!(StatusFilter::All.matches(&up));
    assert_eq!(StatusFilter::default(), StatusFilter::All);
}

#[test]
fn direction_display() {
    assert_eq!(Direction::Up.to_string(), "up");
    assert_eq!(Direction::Down.to_string(), "down");
}
