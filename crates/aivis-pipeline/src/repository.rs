use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use aivis_core::{Question, RunRecord, RunStatus, ScoreResult};
use chrono::Utc;
use uuid::Uuid;

use crate::analyzer::AnalyzedResponse;
use crate::competitive::CompetitiveMetrics;
use crate::error::RepositoryError;

/// Persistence for runs and everything they produce.
///
/// Status updates must respect [`RunStatus::can_transition_to`];
/// implementations reject illegal moves with
/// [`RepositoryError::InvalidTransition`].
#[async_trait]
pub trait RunRepository: Send + Sync {
    /// Create a run in `pending` state.
    async fn create_run(
        &self,
        company_id: &str,
        question_count: usize,
    ) -> Result<RunRecord, RepositoryError>;

    async fn get_run(&self, id: Uuid) -> Result<Option<RunRecord>, RepositoryError>;

    /// Move a run to `status`. `message` is stored as the error message for
    /// failed runs.
    async fn update_status(
        &self,
        id: Uuid,
        status: RunStatus,
        message: Option<&str>,
    ) -> Result<(), RepositoryError>;

    async fn record_questions(
        &self,
        run_id: Uuid,
        questions: &[Question],
    ) -> Result<(), RepositoryError>;

    async fn record_responses(
        &self,
        run_id: Uuid,
        analyzed: &[AnalyzedResponse],
    ) -> Result<(), RepositoryError>;

    async fn record_score(
        &self,
        run_id: Uuid,
        score: &ScoreResult,
        metrics: &CompetitiveMetrics,
    ) -> Result<(), RepositoryError>;
}

/// Apply a status change to a record, stamping timestamps.
///
/// # Errors
///
/// Returns [`RepositoryError::InvalidTransition`] for an illegal move.
pub fn apply_transition(
    record: &mut RunRecord,
    status: RunStatus,
    message: Option<&str>,
) -> Result<(), RepositoryError> {
    if !record.status.can_transition_to(status) {
        return Err(RepositoryError::InvalidTransition {
            id: record.id,
            from: record.status,
            to: status,
        });
    }
    let now = Utc::now();
    match status {
        RunStatus::Running => record.started_at = Some(now),
        RunStatus::Completed | RunStatus::Failed => record.completed_at = Some(now),
        RunStatus::Pending => {}
    }
    if status == RunStatus::Failed {
        record.error_message = message.map(str::to_string);
    }
    record.status = status;
    Ok(())
}

#[derive(Debug)]
struct StoredRun {
    record: RunRecord,
    questions: Vec<Question>,
    responses: Vec<AnalyzedResponse>,
    score: Option<(ScoreResult, CompetitiveMetrics)>,
}

/// Process-local repository for offline runs and tests.
#[derive(Debug, Default)]
pub struct InMemoryRunRepository {
    runs: Mutex<HashMap<Uuid, StoredRun>>,
}

impl InMemoryRunRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Uuid, StoredRun>> {
        self.runs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn with_run<T>(
        &self,
        id: Uuid,
        f: impl FnOnce(&mut StoredRun) -> Result<T, RepositoryError>,
    ) -> Result<T, RepositoryError> {
        let mut runs = self.lock();
        let run = runs.get_mut(&id).ok_or(RepositoryError::NotFound(id))?;
        f(run)
    }

    #[must_use]
    pub fn questions(&self, run_id: Uuid) -> Vec<Question> {
        self.lock()
            .get(&run_id)
            .map(|r| r.questions.clone())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn responses(&self, run_id: Uuid) -> Vec<AnalyzedResponse> {
        self.lock()
            .get(&run_id)
            .map(|r| r.responses.clone())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn score(&self, run_id: Uuid) -> Option<ScoreResult> {
        self.lock()
            .get(&run_id)
            .and_then(|r| r.score.as_ref().map(|(s, _)| s.clone()))
    }

    /// All runs, oldest first.
    #[must_use]
    pub fn runs(&self) -> Vec<RunRecord> {
        let mut records: Vec<RunRecord> =
            self.lock().values().map(|r| r.record.clone()).collect();
        records.sort_by_key(|r| r.created_at);
        records
    }
}

#[async_trait]
impl RunRepository for InMemoryRunRepository {
    async fn create_run(
        &self,
        company_id: &str,
        question_count: usize,
    ) -> Result<RunRecord, RepositoryError> {
        let record = RunRecord {
            id: Uuid::new_v4(),
            company_id: company_id.to_string(),
            question_count,
            status: RunStatus::Pending,
            error_message: None,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
        };
        self.lock().insert(
            record.id,
            StoredRun {
                record: record.clone(),
                questions: Vec::new(),
                responses: Vec::new(),
                score: None,
            },
        );
        Ok(record)
    }

    async fn get_run(&self, id: Uuid) -> Result<Option<RunRecord>, RepositoryError> {
        Ok(self.lock().get(&id).map(|r| r.record.clone()))
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: RunStatus,
        message: Option<&str>,
    ) -> Result<(), RepositoryError> {
        self.with_run(id, |run| apply_transition(&mut run.record, status, message))
    }

    async fn record_questions(
        &self,
        run_id: Uuid,
        questions: &[Question],
    ) -> Result<(), RepositoryError> {
        self.with_run(run_id, |run| {
            run.questions = questions.to_vec();
            Ok(())
        })
    }

    async fn record_responses(
        &self,
        run_id: Uuid,
        analyzed: &[AnalyzedResponse],
    ) -> Result<(), RepositoryError> {
        self.with_run(run_id, |run| {
            run.responses = analyzed.to_vec();
            Ok(())
        })
    }

    async fn record_score(
        &self,
        run_id: Uuid,
        score: &ScoreResult,
        metrics: &CompetitiveMetrics,
    ) -> Result<(), RepositoryError> {
        self.with_run(run_id, |run| {
            run.score = Some((score.clone(), metrics.clone()));
            Ok(())
        })
    }
}
