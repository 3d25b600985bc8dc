//! AI visibility scoring pipeline.
//!
//! Builds a grounded company context, probes an AI assistant with generated
//! questions, judges each answer for mentions of the company, aggregates the
//! competitive landscape and folds everything into one auditable score.
//!
//! External collaborators are consumed through the traits in [`services`];
//! runs are persisted through a [`RunRepository`].

pub mod analyzer;
pub mod cancel;
pub mod collector;
pub mod competitive;
pub mod context;
pub mod error;
pub mod progress;
pub mod questions;
pub mod repository;
pub(crate) mod retry;
pub mod run;
pub mod scoring;
pub mod services;
pub mod templates;

pub use analyzer::{AnalysisOutcome, AnalyzedResponse, ResponseAnalyzer};
pub use cancel::{cancel_pair, CancelHandle, CancelSignal};
pub use collector::{CollectionOutcome, DispatchSettings, QuestionFailure, ResponseCollector};
pub use competitive::{extract_competitive_metrics, CompetitiveMetrics};
pub use context::{CompanyContextBuilder, RegistryCompanySource};
pub use error::{AnalysisFailure, PipelineError, ProviderError, RepositoryError};
pub use progress::{ProgressEvent, ProgressSink, RunContext, RunCounters, RunStage};
pub use questions::{allocate, QuestionGenerator, MAX_QUESTIONS};
pub use repository::{apply_transition, InMemoryRunRepository, RunRepository};
pub use run::{PipelineServices, PipelineSettings, RunOptions, RunReport, VisibilityPipeline};
pub use services::{
    Answer, CompanySource, GeneratedQuestion, JudgmentService, QuestionAnsweringService,
    QuestionSource, RawCitationJudgment, RawJudgment, TargetDescriptor,
};
pub use templates::TemplateQuestionSource;
