use aivis_core::QuestionType;
use uuid::Uuid;

use super::*;

#[test]
fn no_command_is_none() {
    let cli = Cli::try_parse_from(["aivis"]).expect("expected valid cli args");
    assert!(cli.command.is_none());
}

#[test]
fn run_requires_company() {
    assert!(Cli::try_parse_from(["aivis", "run"]).is_err());
}

#[test]
fn run_defaults() {
    let cli = Cli::try_parse_from(["aivis", "run", "--company", "acme-analytics"]).unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Run {
            ref company,
            questions: None,
            ref types,
            timeout_secs: None,
            dry_run: false,
            json: false,
        }) if company == "acme-analytics" && types.is_empty()
    ));
}

#[test]
fn run_with_all_options() {
    let cli = Cli::try_parse_from([
        "aivis",
        "run",
        "--company",
        "acme-analytics",
        "--questions",
        "40",
        "--type",
        "comparison",
        "--type",
        "recommendation_request",
        "--timeout-secs",
        "300",
        "--dry-run",
        "--json",
    ])
    .unwrap();
    match cli.command {
        Some(Commands::Run {
            questions,
            types,
            timeout_secs,
            dry_run,
            json,
            ..
        }) => {
            assert_eq!(questions, Some(40));
            assert_eq!(
                types,
                vec![
                    QuestionType::ComparisonQuery,
                    QuestionType::RecommendationRequest
                ]
            );
            assert_eq!(timeout_secs, Some(300));
            assert!(dry_run);
            assert!(json);
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn unknown_question_type_is_rejected() {
    let result = Cli::try_parse_from([
        "aivis",
        "run",
        "--company",
        "acme-analytics",
        "--type",
        "trivia",
    ]);
    assert!(result.is_err());
}

#[test]
fn parses_companies_list() {
    let cli = Cli::try_parse_from(["aivis", "companies", "list"]).unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Companies {
            command: CompaniesCommands::List
        })
    ));
}

#[test]
fn parses_runs_show_with_uuid() {
    let id = Uuid::new_v4();
    let cli = Cli::try_parse_from(["aivis", "runs", "show", &id.to_string()]).unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Runs {
            command: RunsCommands::Show { id: parsed, json: false }
        }) if parsed == id
    ));
}

#[test]
fn runs_show_rejects_malformed_id() {
    assert!(Cli::try_parse_from(["aivis", "runs", "show", "not-a-uuid"]).is_err());
}

#[test]
fn parses_runs_list_filters() {
    let cli = Cli::try_parse_from([
        "aivis", "runs", "list", "--company", "acme-analytics", "--limit", "5",
    ])
    .unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Runs {
            command: RunsCommands::List {
                company: Some(ref c),
                limit: 5
            }
        }) if c == "acme-analytics"
    ));
}

#[test]
fn parses_db_ping_command() {
    let cli = Cli::try_parse_from(["aivis", "db", "ping"]).expect("expected valid cli args");
    assert!(matches!(
        cli.command,
        Some(Commands::Db {
            command: DbCommands::Ping
        })
    ));
}

#[test]
fn parses_db_migrate_command() {
    let cli = Cli::try_parse_from(["aivis", "db", "migrate"]).expect("expected valid cli args");
    assert!(matches!(
        cli.command,
        Some(Commands::Db {
            command: DbCommands::Migrate
        })
    ));
}

mod cancel_watch {
    use std::io;
    use std::time::Duration;

    use crate::run::{wait_for_cancel, CancelCause};

    #[tokio::test(start_paused = true)]
    async fn broken_interrupt_listener_keeps_the_timeout() {
        let started = tokio::time::Instant::now();
        let failing = async { Err(io::Error::other("no signal handler")) };

        let cause = wait_for_cancel(failing, Some(Duration::from_secs(30))).await;

        assert_eq!(cause, Some(CancelCause::Timeout));
        assert!(started.elapsed() >= Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn interrupt_wins_before_timeout() {
        let cause = wait_for_cancel(async { Ok(()) }, Some(Duration::from_secs(30))).await;
        assert_eq!(cause, Some(CancelCause::Interrupt));
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_fires_while_waiting_for_interrupt() {
        let cause = wait_for_cancel(
            std::future::pending::<io::Result<()>>(),
            Some(Duration::from_secs(5)),
        )
        .await;
        assert_eq!(cause, Some(CancelCause::Timeout));
    }

    #[tokio::test]
    async fn broken_listener_without_timeout_gives_up() {
        let failing = async { Err(io::Error::other("no signal handler")) };
        assert_eq!(wait_for_cancel(failing, None).await, None);
    }
}
