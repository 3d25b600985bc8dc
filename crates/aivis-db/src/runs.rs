//! Postgres-backed [`RunRepository`] over `visibility_runs`, `run_questions`,
//! `run_responses` and `run_scores`.

use aivis_core::{Question, RunRecord, RunStatus, ScoreResult};
use aivis_pipeline::{AnalyzedResponse, CompetitiveMetrics, RepositoryError, RunRepository};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

const ALL_STATUSES: [RunStatus; 4] = [
    RunStatus::Pending,
    RunStatus::Running,
    RunStatus::Completed,
    RunStatus::Failed,
];

const RUN_COLUMNS: &str = "id, company_id, question_count, status, error_message, \
                           created_at, started_at, completed_at";

/// A row from the `visibility_runs` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RunRow {
    pub id: Uuid,
    pub company_id: String,
    pub question_count: i32,
    pub status: String,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl TryFrom<RunRow> for RunRecord {
    type Error = RepositoryError;

    fn try_from(row: RunRow) -> Result<Self, Self::Error> {
        Ok(RunRecord {
            id: row.id,
            company_id: row.company_id,
            question_count: usize::try_from(row.question_count).map_err(backend)?,
            status: row.status.parse().map_err(backend)?,
            error_message: row.error_message,
            created_at: row.created_at,
            started_at: row.started_at,
            completed_at: row.completed_at,
        })
    }
}

fn backend<E>(err: E) -> RepositoryError
where
    E: std::error::Error + Send + Sync + 'static,
{
    RepositoryError::Backend(Box::new(err))
}

/// Statuses from which `next` may be reached.
fn predecessors(next: RunStatus) -> Vec<String> {
    ALL_STATUSES
        .into_iter()
        .filter(|s| s.can_transition_to(next))
        .map(|s| s.as_str().to_string())
        .collect()
}

/// Scores are stored with six decimal places.
fn to_decimal(value: f64) -> Result<Decimal, RepositoryError> {
    Decimal::try_from(value)
        .map(|d| d.round_dp(6))
        .map_err(backend)
}

pub struct PgRunRepository {
    pool: PgPool,
}

impl PgRunRepository {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The most recent `limit` runs, newest first, optionally for one company.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::Backend`] if the query fails.
    pub async fn list_runs(
        &self,
        company_id: Option<&str>,
        limit: i64,
    ) -> Result<Vec<RunRecord>, RepositoryError> {
        let rows = sqlx::query_as::<_, RunRow>(&format!(
            "SELECT {RUN_COLUMNS} FROM visibility_runs \
             WHERE ($1::TEXT IS NULL OR company_id = $1) \
             ORDER BY created_at DESC, id DESC \
             LIMIT $2"
        ))
        .bind(company_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        rows.into_iter().map(RunRecord::try_from).collect()
    }

    /// The stored score of a completed run.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::Backend`] if the query fails.
    pub async fn get_score(&self, run_id: Uuid) -> Result<Option<ScoreResult>, RepositoryError> {
        let row = sqlx::query_scalar::<_, Json<ScoreResult>>(
            "SELECT result FROM run_scores WHERE run_id = $1",
        )
        .bind(run_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;
        Ok(row.map(|Json(score)| score))
    }

    async fn current_status(&self, id: Uuid) -> Result<RunStatus, RepositoryError> {
        let status = sqlx::query_scalar::<_, String>("SELECT status FROM visibility_runs WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?
            .ok_or(RepositoryError::NotFound(id))?;
        status.parse().map_err(backend)
    }
}

#[async_trait]
impl RunRepository for PgRunRepository {
    async fn create_run(
        &self,
        company_id: &str,
        question_count: usize,
    ) -> Result<RunRecord, RepositoryError> {
        let count = i32::try_from(question_count).map_err(backend)?;
        let row = sqlx::query_as::<_, RunRow>(&format!(
            "INSERT INTO visibility_runs (id, company_id, question_count, status) \
             VALUES ($1, $2, $3, 'pending') \
             RETURNING {RUN_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(company_id)
        .bind(count)
        .fetch_one(&self.pool)
        .await
        .map_err(backend)?;

        RunRecord::try_from(row)
    }

    async fn get_run(&self, id: Uuid) -> Result<Option<RunRecord>, RepositoryError> {
        let row = sqlx::query_as::<_, RunRow>(&format!(
            "SELECT {RUN_COLUMNS} FROM visibility_runs WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        row.map(RunRecord::try_from).transpose()
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: RunStatus,
        message: Option<&str>,
    ) -> Result<(), RepositoryError> {
        let stamp = match status {
            RunStatus::Running => ", started_at = NOW()",
            RunStatus::Completed => ", completed_at = NOW()",
            RunStatus::Failed => ", completed_at = NOW(), error_message = $4",
            RunStatus::Pending => "",
        };
        let sql = format!(
            "UPDATE visibility_runs SET status = $2{stamp} \
             WHERE id = $1 AND status = ANY($3)"
        );

        let mut query = sqlx::query(&sql)
            .bind(id)
            .bind(status.as_str())
            .bind(predecessors(status));
        if status == RunStatus::Failed {
            query = query.bind(message);
        }
        let result = query.execute(&self.pool).await.map_err(backend)?;

        if result.rows_affected() == 0 {
            let from = self.current_status(id).await?;
            return Err(RepositoryError::InvalidTransition {
                id,
                from,
                to: status,
            });
        }
        Ok(())
    }

    async fn record_questions(
        &self,
        run_id: Uuid,
        questions: &[Question],
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await.map_err(backend)?;
        for question in questions {
            sqlx::query(
                "INSERT INTO run_questions (id, run_id, position, question_type, template, text) \
                 VALUES ($1, $2, $3, $4, $5, $6) \
                 ON CONFLICT (id) DO NOTHING",
            )
            .bind(question.id)
            .bind(run_id)
            .bind(i32::try_from(question.position).map_err(backend)?)
            .bind(question.question_type.as_str())
            .bind(&question.template)
            .bind(&question.text)
            .execute(&mut *tx)
            .await
            .map_err(backend)?;
        }
        tx.commit().await.map_err(backend)?;
        tracing::debug!(run_id = %run_id, count = questions.len(), "questions persisted");
        Ok(())
    }

    async fn record_responses(
        &self,
        run_id: Uuid,
        analyzed: &[AnalyzedResponse],
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await.map_err(backend)?;
        for a in analyzed {
            sqlx::query(
                "INSERT INTO run_responses \
                   (question_id, run_id, response_text, mention_detected, mention_position, \
                    sentiment, confidence, mention_context, degraded, citations, competitors, \
                    retrieved_at) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) \
                 ON CONFLICT (question_id) DO NOTHING",
            )
            .bind(a.question_id)
            .bind(run_id)
            .bind(&a.response.text)
            .bind(a.mention.mention_detected)
            .bind(a.mention.position.as_str())
            .bind(a.mention.sentiment.as_str())
            .bind(to_decimal(a.mention.confidence)?)
            .bind(&a.mention.context)
            .bind(a.degraded)
            .bind(Json(&a.citations))
            .bind(Json(&a.competitors))
            .bind(a.response.retrieved_at)
            .execute(&mut *tx)
            .await
            .map_err(backend)?;
        }
        tx.commit().await.map_err(backend)?;
        tracing::debug!(run_id = %run_id, count = analyzed.len(), "responses persisted");
        Ok(())
    }

    async fn record_score(
        &self,
        run_id: Uuid,
        score: &ScoreResult,
        metrics: &CompetitiveMetrics,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO run_scores \
               (run_id, overall_score, raw_score, grade, mention_rate, niche_size, result, competitive) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             ON CONFLICT (run_id) DO UPDATE SET \
               overall_score = EXCLUDED.overall_score, raw_score = EXCLUDED.raw_score, \
               grade = EXCLUDED.grade, mention_rate = EXCLUDED.mention_rate, \
               niche_size = EXCLUDED.niche_size, result = EXCLUDED.result, \
               competitive = EXCLUDED.competitive",
        )
        .bind(run_id)
        .bind(to_decimal(score.overall_score)?)
        .bind(to_decimal(score.raw_score)?)
        .bind(score.grade.to_string())
        .bind(to_decimal(score.mention_rate)?)
        .bind(score.niche_size.as_str())
        .bind(Json(score))
        .bind(Json(metrics))
        .execute(&self.pool)
        .await
        .map_err(backend)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(status: &str) -> RunRow {
        RunRow {
            id: Uuid::new_v4(),
            company_id: "acme-analytics".to_string(),
            question_count: 20,
            status: status.to_string(),
            error_message: None,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
        }
    }

    #[test]
    fn row_converts_to_record() {
        let record = RunRecord::try_from(row("running")).unwrap();
        assert_eq!(record.status, RunStatus::Running);
        assert_eq!(record.question_count, 20);
    }

    #[test]
    fn unknown_status_is_a_backend_error() {
        let err = RunRecord::try_from(row("paused")).unwrap_err();
        assert!(matches!(err, RepositoryError::Backend(_)));
    }

    #[test]
    fn predecessors_follow_the_lifecycle() {
        assert_eq!(predecessors(RunStatus::Running), vec!["pending"]);
        assert_eq!(predecessors(RunStatus::Completed), vec!["running"]);
        assert_eq!(predecessors(RunStatus::Failed), vec!["pending", "running"]);
        assert!(predecessors(RunStatus::Pending).is_empty());
    }

    #[test]
    fn decimals_round_to_six_places() {
        assert_eq!(
            to_decimal(0.337_063_845_293_85).unwrap().to_string(),
            "0.337064"
        );
        assert!(to_decimal(f64::NAN).is_err());
    }
}
