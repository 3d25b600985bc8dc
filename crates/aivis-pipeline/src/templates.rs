//! Deterministic, offline [`QuestionSource`].

use async_trait::async_trait;
use aivis_core::{CompanyContext, QuestionType};

use crate::error::ProviderError;
use crate::services::{GeneratedQuestion, QuestionSource};

const DIRECT: &[&str] = &[
    "What is {company} and what is it best known for?",
    "Is {company} a good choice for {topic}?",
    "What do people say about {company}'s approach to {topic}?",
    "What are the main strengths and weaknesses of {company}?",
];

const INDIRECT: &[&str] = &[
    "What are the most reliable {industry} tools right now?",
    "Which companies are doing notable work in {topic}?",
    "I'm researching {industry}. Which vendors should I know about?",
    "Who are the leading providers for {topic} today?",
];

const COMPARISON: &[&str] = &[
    "How does {company} compare to {competitor}?",
    "{company} or {competitor}: which is better for {topic}?",
    "What are the main differences between {company} and {competitor}?",
];

const RECOMMENDATION: &[&str] = &[
    "Can you recommend a {industry} solution for a growing team?",
    "What would you recommend for {topic}?",
    "Which {industry} product would you suggest for a company just getting started?",
];

const EXPLANATORY: &[&str] = &[
    "How does {topic} work, and which tools support it well?",
    "Explain the current state of {industry} and how leading vendors approach it.",
    "What should I understand about {topic} before choosing a vendor?",
];

/// Fills a fixed template list per question type with the company's name,
/// industry, competitors and knowledge topics. Same context in, same
/// questions out.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateQuestionSource;

impl TemplateQuestionSource {
    const fn templates(question_type: QuestionType) -> &'static [&'static str] {
        match question_type {
            QuestionType::DirectConversational => DIRECT,
            QuestionType::IndirectConversational => INDIRECT,
            QuestionType::ComparisonQuery => COMPARISON,
            QuestionType::RecommendationRequest => RECOMMENDATION,
            QuestionType::ExplanatoryQuery => EXPLANATORY,
        }
    }

    /// Render `count` questions of one type.
    #[must_use]
    pub fn render(
        context: &CompanyContext,
        question_type: QuestionType,
        count: usize,
    ) -> Vec<GeneratedQuestion> {
        let templates = Self::templates(question_type);
        let industry = if context.industry.is_empty() {
            "this market"
        } else {
            context.industry.as_str()
        };
        let topics: Vec<&str> = if context.knowledge.is_empty() {
            vec![industry]
        } else {
            context.knowledge.iter().map(String::as_str).collect()
        };
        let competitors: Vec<&str> = context.competitors.iter().map(|c| c.name.as_str()).collect();

        (0..count)
            .map(|i| {
                let template_idx = i % templates.len();
                // Advance fillers each time the template list wraps around.
                let round = i / templates.len();
                let topic = topics[(i + round) % topics.len()];
                let competitor = if competitors.is_empty() {
                    "its main competitors"
                } else {
                    competitors[(i + round) % competitors.len()]
                };
                let text = templates[template_idx]
                    .replace("{company}", &context.name)
                    .replace("{industry}", industry)
                    .replace("{competitor}", competitor)
                    .replace("{topic}", topic);
                GeneratedQuestion {
                    text,
                    template: format!("{}/{template_idx}", question_type.as_str()),
                }
            })
            .collect()
    }
}

#[async_trait]
impl QuestionSource for TemplateQuestionSource {
    async fn generate(
        &self,
        context: &CompanyContext,
        question_type: QuestionType,
        count: usize,
    ) -> Result<Vec<GeneratedQuestion>, ProviderError> {
        Ok(Self::render(context, question_type, count))
    }
}
