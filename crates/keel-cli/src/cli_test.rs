use super::*;
use clap::CommandFactory;

#[test]
fn verify_cli_args() {
    // Validates the entire command tree: short flag conflicts,
    // duplicate args, and other clap definition errors.
    Cli::command().debug_assert();
}

#[test]
fn parse_up_with_globals() {
    let cli = Cli::try_parse_from([
        "keel",
        "-p",
        "proj",
        "--database",
        ":memory:",
        "up",
        "--no-transaction",
    ])
    .unwrap();
    assert_eq!(cli.global.project_dir, "proj");
    assert_eq!(cli.global.database.as_deref(), Some(":memory:"));
    match cli.command {
        Commands::Up(args) => assert!(args.no_transaction),
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn status_defaults_to_all_as_table() {
    let cli = Cli::try_parse_from(["keel", "status"]).unwrap();
    match cli.command {
        Commands::Status(args) => {
            assert_eq!(args.filter, StatusFilterArg::All);
            assert_eq!(args.output, StatusOutput::Table);
            assert_eq!(StatusFilter::from(args.filter), StatusFilter::All);
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn status_filter_and_json() {
    let cli = Cli::try_parse_from(["keel", "status", "--filter", "down", "-o", "json"]).unwrap();
    match cli.command {
        Commands::Status(args) => {
            assert_eq!(StatusFilter::from(args.filter), StatusFilter::Down);
            assert_eq!(args.output, StatusOutput::Json);
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn new_defaults_to_sql() {
    let cli = Cli::try_parse_from(["keel", "new", "-m", "add users"]).unwrap();
    match cli.command {
        Commands::New(args) => {
            assert_eq!(args.ext, "sql");
            assert_eq!(args.description.as_deref(), Some("add users"));
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn unknown_filter_is_rejected() {
    assert!(Cli::try_parse_from(["keel", "status", "--filter", "sideways"]).is_err());
}
