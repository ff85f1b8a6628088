use super::*;

#[test]
fn parses_db_ping_command() {
    let cli = Cli::try_parse_from(["skuopt-cli", "db", "ping"]).expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Some(Commands::Db {
            command: DbCommands::Ping
        })
    ));
}

#[test]
fn parses_db_migrate_command() {
    let cli =
        Cli::try_parse_from(["skuopt-cli", "db", "migrate"]).expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Some(Commands::Db {
            command: DbCommands::Migrate
        })
    ));
}

#[test]
fn no_command_is_none() {
    let cli = Cli::try_parse_from(["skuopt-cli"]).expect("expected valid cli args");
    assert!(cli.command.is_none());
}

#[test]
fn parses_users_show() {
    let cli = Cli::try_parse_from(["skuopt-cli", "users", "show", "--email", "ana@example.com"])
        .unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Users {
            command: UsersCommands::Show { ref email }
        }) if email == "ana@example.com"
    ));
}

#[test]
fn parses_set_plan_case_insensitively() {
    let cli = Cli::try_parse_from([
        "skuopt-cli",
        "users",
        "set-plan",
        "--email",
        "ana@example.com",
        "--plan",
        "PRO",
    ])
    .unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Users {
            command: UsersCommands::SetPlan {
                plan: Plan::Pro,
                ..
            }
        })
    ));
}

#[test]
fn rejects_unknown_plan() {
    let result = Cli::try_parse_from([
        "skuopt-cli",
        "users",
        "set-plan",
        "--email",
        "ana@example.com",
        "--plan",
        "gold",
    ]);
    assert!(result.is_err());
}

#[test]
fn grant_accepts_negative_credits() {
    let cli = Cli::try_parse_from([
        "skuopt-cli",
        "users",
        "grant",
        "--email",
        "ana@example.com",
        "--credits",
        "-5",
    ])
    .unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Users {
            command: UsersCommands::Grant { credits: -5, .. }
        })
    ));
}

#[test]
fn parses_credits_refill() {
    let cli = Cli::try_parse_from(["skuopt-cli", "credits", "refill"]).unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Credits {
            command: CreditsCommands::Refill
        })
    ));
}

#[test]
fn history_export_out_is_optional() {
    let cli = Cli::try_parse_from([
        "skuopt-cli",
        "history",
        "export",
        "--email",
        "ana@example.com",
    ])
    .unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::History {
            command: HistoryCommands::Export { out: None, .. }
        })
    ));

    let cli = Cli::try_parse_from([
        "skuopt-cli",
        "history",
        "export",
        "--email",
        "ana@example.com",
        "--out",
        "/tmp/h.csv",
    ])
    .unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::History {
            command: HistoryCommands::Export { out: Some(ref p), .. }
        }) if p == &PathBuf::from("/tmp/h.csv")
    ));
}
