//! Capabilities the pipeline consumes. Every external collaborator sits
//! behind one of these traits so tests can substitute deterministic mocks.

mod judgment;

use async_trait::async_trait;
use aivis_core::{Citation, CompanyConfig, CompanyContext, QuestionType};
use serde::Serialize;

use crate::error::ProviderError;

pub use judgment::{RawCitationJudgment, RawJudgment};

/// An assistant's answer to one probe question, before cleaning.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Answer {
    pub text: String,
    pub citations: Vec<Citation>,
}

/// Identity of the target company as sent to the judge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TargetDescriptor {
    pub name: String,
    pub domain: String,
    pub aliases: Vec<String>,
    pub industry: String,
    pub competitors: Vec<String>,
}

impl From<&CompanyContext> for TargetDescriptor {
    fn from(context: &CompanyContext) -> Self {
        Self {
            name: context.name.clone(),
            domain: context.domain.clone(),
            aliases: context.aliases.clone(),
            industry: context.industry.clone(),
            competitors: context.competitors.iter().map(|c| c.name.clone()).collect(),
        }
    }
}

/// One question text produced by a [`QuestionSource`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedQuestion {
    pub text: String,
    /// Identifier of the template or prompt that produced `text`.
    pub template: String,
}

/// The AI assistant being probed.
#[async_trait]
pub trait QuestionAnsweringService: Send + Sync {
    async fn ask(&self, question: &str) -> Result<Answer, ProviderError>;
}

/// Judges whether and how the target appears in an answer. The result is
/// untrusted; every field may be missing or malformed.
#[async_trait]
pub trait JudgmentService: Send + Sync {
    async fn analyze(
        &self,
        response_text: &str,
        target: &TargetDescriptor,
    ) -> Result<RawJudgment, ProviderError>;
}

/// Produces probe question texts for one question type.
#[async_trait]
pub trait QuestionSource: Send + Sync {
    async fn generate(
        &self,
        context: &CompanyContext,
        question_type: QuestionType,
        count: usize,
    ) -> Result<Vec<GeneratedQuestion>, ProviderError>;
}

/// Looks up the stored record for a company id.
#[async_trait]
pub trait CompanySource: Send + Sync {
    async fn find_company(&self, company_id: &str) -> Result<Option<CompanyConfig>, ProviderError>;
}
