use std::sync::Arc;
use std::time::Duration;

use aivis_core::{
    AppConfig, CompanyContext, Question, QuestionType, RunRecord, RunStatus, ScoreResult,
};
use serde::Serialize;
use uuid::Uuid;

use crate::analyzer::{AnalyzedResponse, ResponseAnalyzer};
use crate::cancel::CancelSignal;
use crate::collector::{DispatchSettings, ResponseCollector};
use crate::competitive::{extract_competitive_metrics, CompetitiveMetrics};
use crate::context::CompanyContextBuilder;
use crate::error::{PipelineError, RepositoryError};
use crate::progress::{ProgressSink, RunContext, RunCounters, RunStage};
use crate::questions::{allocate, QuestionGenerator};
use crate::repository::RunRepository;
use crate::scoring;
use crate::services::{CompanySource, JudgmentService, QuestionAnsweringService, QuestionSource};

/// Tunables shared by every run of a pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineSettings {
    pub dispatch: DispatchSettings,
    /// Time in-flight work gets to finish after cancellation.
    pub cancel_grace: Duration,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            dispatch: DispatchSettings::default(),
            cancel_grace: Duration::from_secs(10),
        }
    }
}

impl PipelineSettings {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            dispatch: DispatchSettings {
                max_concurrent: config.max_concurrent_requests,
                request_timeout: Duration::from_secs(config.request_timeout_secs),
                max_retries: config.max_retries,
                backoff_base_ms: config.retry_backoff_base_ms,
            },
            cancel_grace: Duration::from_secs(config.cancel_grace_secs),
        }
    }
}

/// The collaborators a pipeline runs against.
#[derive(Clone)]
pub struct PipelineServices {
    pub companies: Arc<dyn CompanySource>,
    pub questions: Arc<dyn QuestionSource>,
    pub answers: Arc<dyn QuestionAnsweringService>,
    pub judge: Arc<dyn JudgmentService>,
    pub repository: Arc<dyn RunRepository>,
}

/// Per-run options.
#[derive(Default)]
pub struct RunOptions {
    /// Restrict generation to these question types.
    pub question_types: Option<Vec<QuestionType>>,
    pub cancel: CancelSignal,
    pub progress: Option<Arc<dyn ProgressSink>>,
}

/// Everything a completed run produced.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run: RunRecord,
    pub context: CompanyContext,
    pub questions: Vec<Question>,
    pub analyzed: Vec<AnalyzedResponse>,
    pub counters: RunCounters,
    /// `true` if cancellation cut the run short; the score covers what was
    /// collected before that.
    pub cancelled: bool,
    pub metrics: CompetitiveMetrics,
    pub score: ScoreResult,
}

/// Runs company context → questions → collection → analysis → competitive
/// metrics → scoring, persisting the run as it goes.
pub struct VisibilityPipeline {
    services: PipelineServices,
    settings: PipelineSettings,
}

impl VisibilityPipeline {
    #[must_use]
    pub fn new(services: PipelineServices, settings: PipelineSettings) -> Self {
        Self { services, settings }
    }

    /// Execute one scoring run.
    ///
    /// The request is validated before a run record is created. Once created,
    /// any fatal error marks the run `failed` (best-effort) before it is
    /// returned.
    ///
    /// # Errors
    ///
    /// Returns the fatal [`PipelineError`] that stopped the run.
    pub async fn run(
        &self,
        company_id: &str,
        question_count: usize,
        options: RunOptions,
    ) -> Result<RunReport, PipelineError> {
        allocate(question_count, options.question_types.as_deref())?;

        let run = self
            .services
            .repository
            .create_run(company_id, question_count)
            .await?;
        tracing::info!(run_id = %run.id, company_id, question_count, "run created");

        let mut ctx = RunContext::new(
            run.id,
            options.cancel,
            self.settings.cancel_grace,
            options.progress,
        );

        match self
            .execute(run.id, company_id, question_count, options.question_types.as_deref(), &mut ctx)
            .await
        {
            Ok(report) => Ok(report),
            Err(err) => {
                tracing::error!(run_id = %run.id, error = %err, "run failed");
                self.fail_run_best_effort(run.id, &err).await;
                ctx.enter(RunStage::Failed, err.to_string());
                Err(err)
            }
        }
    }

    async fn execute(
        &self,
        run_id: Uuid,
        company_id: &str,
        question_count: usize,
        filter: Option<&[QuestionType]>,
        ctx: &mut RunContext,
    ) -> Result<RunReport, PipelineError> {
        let repository = &self.services.repository;
        repository
            .update_status(run_id, RunStatus::Running, None)
            .await?;

        ctx.enter(RunStage::Context, format!("building context for {company_id}"));
        let context = CompanyContextBuilder::new(Arc::clone(&self.services.companies))
            .build(company_id)
            .await?;

        ctx.enter(
            RunStage::Questions,
            format!("generating {question_count} questions"),
        );
        let questions = QuestionGenerator::new(Arc::clone(&self.services.questions))
            .generate(&context, question_count, filter)
            .await?;
        ctx.counters.questions = questions.len();
        if let Err(err) = repository.record_questions(run_id, &questions).await {
            tracing::warn!(run_id = %run_id, error = %err, "failed to persist questions");
        }

        let collection = ResponseCollector::new(
            Arc::clone(&self.services.answers),
            self.settings.dispatch,
        )
        .collect(&questions, ctx)
        .await?;

        let analysis = ResponseAnalyzer::new(Arc::clone(&self.services.judge), self.settings.dispatch)
            .analyze_all(&questions, collection.responses, &context, ctx)
            .await;
        if let Err(err) = repository.record_responses(run_id, &analysis.analyzed).await {
            tracing::warn!(run_id = %run_id, error = %err, "failed to persist analysed responses");
        }

        ctx.enter(RunStage::Competitive, "aggregating competitors");
        let metrics = extract_competitive_metrics(&analysis.analyzed, &context);

        ctx.enter(RunStage::Scoring, "scoring");
        let score = scoring::score(&analysis.analyzed, &metrics)?;

        repository.record_score(run_id, &score, &metrics).await?;
        repository
            .update_status(run_id, RunStatus::Completed, None)
            .await?;
        let run = repository
            .get_run(run_id)
            .await?
            .ok_or(RepositoryError::NotFound(run_id))?;

        let cancelled = ctx.cancel.is_cancelled();
        tracing::info!(
            run_id = %run_id,
            score = score.display_score(),
            grade = %score.grade,
            analyzed = score.analyzed_responses,
            mentions = score.mentions_detected,
            cancelled,
            "run completed"
        );
        ctx.enter(
            RunStage::Completed,
            format!("score {:.1} (grade {})", score.display_score(), score.grade),
        );

        Ok(RunReport {
            run,
            context,
            questions,
            analyzed: analysis.analyzed,
            counters: ctx.counters,
            cancelled,
            metrics,
            score,
        })
    }

    async fn fail_run_best_effort(&self, run_id: Uuid, err: &PipelineError) {
        let message = err.to_string();
        if let Err(mark_err) = self
            .services
            .repository
            .update_status(run_id, RunStatus::Failed, Some(&message))
            .await
        {
            tracing::error!(
                run_id = %run_id,
                error = %mark_err,
                original_error = %message,
                "failed to mark run as failed"
            );
        }
    }
}
