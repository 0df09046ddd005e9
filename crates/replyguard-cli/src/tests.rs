use clap::Parser;

use super::*;

#[test]
fn parses_monitor_with_comma_separated_sources() {
    let cli = Cli::try_parse_from([
        "replyguard-cli",
        "monitor",
        "--term",
        "acme",
        "--sources",
        "smallbusiness,startups",
        "--interval",
        "120",
    ])
    .expect("expected valid cli args");

    match cli.command {
        Commands::Monitor {
            term,
            sources,
            interval,
            notify_target,
        } => {
            assert_eq!(term, "acme");
            assert_eq!(sources, vec!["smallbusiness", "startups"]);
            assert_eq!(interval, Some(120));
            assert!(notify_target.is_none());
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn monitor_requires_sources() {
    assert!(Cli::try_parse_from(["replyguard-cli", "monitor", "--term", "acme"]).is_err());
}

#[test]
fn parses_approve_with_edit() {
    let cli = Cli::try_parse_from([
        "replyguard-cli",
        "approve",
        "t1_abc123",
        "--edited-response",
        "Thanks, DM us",
    ])
    .expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Commands::Approve { ref natural_id, edited_response: Some(ref text) }
            if natural_id == "t1_abc123" && text == "Thanks, DM us"
    ));
}

#[test]
fn parses_reject() {
    let cli =
        Cli::try_parse_from(["replyguard-cli", "reject", "abc123"]).expect("expected valid cli args");
    assert!(matches!(cli.command, Commands::Reject { ref natural_id } if natural_id == "abc123"));
}

#[test]
fn list_parses_typed_filters() {
    let cli = Cli::try_parse_from([
        "replyguard-cli",
        "list",
        "--status",
        "pending_approval",
        "--limit",
        "5",
    ])
    .expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Commands::List {
            status: Some(CommentStatus::PendingApproval),
            sentiment: None,
            term: None,
            limit: 5
        }
    ));
}

#[test]
fn list_rejects_unknown_status() {
    assert!(Cli::try_parse_from(["replyguard-cli", "list", "--status", "archived"]).is_err());
}

#[test]
fn list_filters_are_mutually_exclusive() {
    assert!(Cli::try_parse_from([
        "replyguard-cli",
        "list",
        "--status",
        "new",
        "--sentiment",
        "negative"
    ])
    .is_err());
}

#[test]
fn list_defaults_to_recent_twenty() {
    let cli = Cli::try_parse_from(["replyguard-cli", "list"]).expect("expected valid cli args");
    assert!(matches!(
        cli.command,
        Commands::List {
            status: None,
            sentiment: None,
            term: None,
            limit: 20
        }
    ));
}

#[test]
fn parses_pending_and_migrate() {
    assert!(matches!(
        Cli::try_parse_from(["replyguard-cli", "pending"]).map(|c| c.command),
        Ok(Commands::Pending)
    ));
    assert!(matches!(
        Cli::try_parse_from(["replyguard-cli", "migrate"]).map(|c| c.command),
        Ok(Commands::Migrate)
    ));
}

#[test]
fn subcommand_is_required() {
    assert!(Cli::try_parse_from(["replyguard-cli"]).is_err());
}
