use std::time::Duration;

use aivis_core::RunStatus;
use thiserror::Error;
use uuid::Uuid;

/// Failure reported by an external collaborator (answer service, judge,
/// question source, company source).
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("rate limited by provider (retry after {retry_after_secs:?}s)")]
    RateLimited { retry_after_secs: Option<u64> },

    #[error("provider unavailable: HTTP {status}")]
    Unavailable { status: u16 },

    #[error("request rejected with HTTP {status}: {message}")]
    Rejected { status: u16, message: String },

    #[error("transport error: {message}")]
    Transport { message: String, transient: bool },

    #[error("malformed provider response: {0}")]
    Malformed(String),
}

/// Fatal run-level errors. Each one marks the run `failed`.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("context build failed for company '{company_id}': {reason}")]
    ContextBuildFailure { company_id: String, reason: String },

    #[error("question generation failed: {reason}")]
    QuestionGenerationFailure { reason: String },

    #[error("response collection failed: none of {attempted} questions produced a response ({failed} failed, {aborted} aborted)")]
    ResponseCollectionFailure {
        attempted: usize,
        failed: usize,
        aborted: usize,
    },

    #[error("scoring input insufficient: no responses were successfully analyzed")]
    ScoringInputInsufficient,

    #[error("invalid run request: {0}")]
    InvalidRequest(String),

    #[error("persistence error: {0}")]
    Persistence(#[from] RepositoryError),
}

/// Recoverable, per-response judgment failure. Logged and counted; the
/// response falls back to the conservative default analysis.
#[derive(Debug, Clone, Error)]
#[error("analysis failed for question {question_id}: {source}")]
pub struct AnalysisFailure {
    pub question_id: Uuid,
    #[source]
    pub source: ProviderError,
}

/// Errors from a [`crate::RunRepository`] implementation.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("run {0} not found")]
    NotFound(Uuid),

    #[error("run {id} cannot move from {from} to {to}")]
    InvalidTransition {
        id: Uuid,
        from: RunStatus,
        to: RunStatus,
    },

    #[error("repository backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}
