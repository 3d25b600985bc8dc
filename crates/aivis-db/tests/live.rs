//! Live tests for `PgRunRepository` using `#[sqlx::test]`.
//!
//! Each test gets a fresh, fully-migrated Postgres database from the sqlx
//! test harness. They need `DATABASE_URL` and are ignored by default.

use aivis_core::{Question, QuestionType, RunStatus};
use aivis_db::PgRunRepository;
use aivis_pipeline::{RepositoryError, RunRepository};

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn run_lifecycle_round_trips(pool: sqlx::PgPool) {
    let repo = PgRunRepository::new(pool);
    let run = repo.create_run("acme-analytics", 2).await.unwrap();
    assert_eq!(run.status, RunStatus::Pending);

    repo.update_status(run.id, RunStatus::Running, None)
        .await
        .unwrap();
    let questions = vec![
        Question::new(
            "What is Acme Analytics?",
            QuestionType::DirectConversational,
            0,
            "direct_conversational/0",
        ),
        Question::new(
            "Which analytics tools lead today?",
            QuestionType::IndirectConversational,
            1,
            "indirect_conversational/0",
        ),
    ];
    repo.record_questions(run.id, &questions).await.unwrap();
    repo.update_status(run.id, RunStatus::Failed, Some("boom"))
        .await
        .unwrap();

    let stored = repo.get_run(run.id).await.unwrap().unwrap();
    assert_eq!(stored.status, RunStatus::Failed);
    assert_eq!(stored.error_message.as_deref(), Some("boom"));
    assert!(stored.started_at.is_some());
    assert!(stored.completed_at.is_some());
    assert!(repo.get_score(run.id).await.unwrap().is_none());
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn illegal_transition_is_rejected(pool: sqlx::PgPool) {
    let repo = PgRunRepository::new(pool);
    let run = repo.create_run("acme-analytics", 5).await.unwrap();

    let err = repo
        .update_status(run.id, RunStatus::Completed, None)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        RepositoryError::InvalidTransition {
            from: RunStatus::Pending,
            to: RunStatus::Completed,
            ..
        }
    ));

    let err = repo
        .update_status(uuid::Uuid::new_v4(), RunStatus::Running, None)
        .await
        .unwrap_err();
    assert!(matches!(err, RepositoryError::NotFound(_)));
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn list_runs_filters_by_company(pool: sqlx::PgPool) {
    let repo = PgRunRepository::new(pool);
    repo.create_run("acme-analytics", 5).await.unwrap();
    repo.create_run("northwind-ledger", 5).await.unwrap();

    let all = repo.list_runs(None, 10).await.unwrap();
    assert_eq!(all.len(), 2);
    let acme = repo.list_runs(Some("acme-analytics"), 10).await.unwrap();
    assert_eq!(acme.len(), 1);
    assert_eq!(acme[0].company_id, "acme-analytics");
}
