use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::labels::normalize_label;
use crate::CoreError;

/// The five probe-question classes, ordered from "gives the answer away" to
/// "target must be volunteered".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    DirectConversational,
    IndirectConversational,
    ComparisonQuery,
    RecommendationRequest,
    ExplanatoryQuery,
}

impl QuestionType {
    /// Every type, in the canonical table order.
    pub const ALL: [QuestionType; 5] = [
        QuestionType::DirectConversational,
        QuestionType::IndirectConversational,
        QuestionType::ComparisonQuery,
        QuestionType::RecommendationRequest,
        QuestionType::ExplanatoryQuery,
    ];

    /// Fixed difficulty weight used by scoring. A mention the question asked
    /// for (direct, comparison) counts for less than one the assistant
    /// volunteered (recommendation, explanatory).
    #[must_use]
    pub const fn difficulty_weight(self) -> f64 {
        match self {
            QuestionType::DirectConversational => 0.2,
            QuestionType::ComparisonQuery => 0.5,
            QuestionType::IndirectConversational => 1.0,
            QuestionType::RecommendationRequest => 1.5,
            QuestionType::ExplanatoryQuery => 2.0,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            QuestionType::DirectConversational => "direct_conversational",
            QuestionType::IndirectConversational => "indirect_conversational",
            QuestionType::ComparisonQuery => "comparison_query",
            QuestionType::RecommendationRequest => "recommendation_request",
            QuestionType::ExplanatoryQuery => "explanatory_query",
        }
    }
}

impl std::fmt::Display for QuestionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for QuestionType {
    type Err = CoreError;

    /// Accepts the canonical names plus the short forms `direct`, `indirect`,
    /// `comparison`, `recommendation` and `explanatory`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_label(s).as_str() {
            "direct_conversational" | "direct" => Ok(QuestionType::DirectConversational),
            "indirect_conversational" | "indirect" => Ok(QuestionType::IndirectConversational),
            "comparison_query" | "comparison" => Ok(QuestionType::ComparisonQuery),
            "recommendation_request" | "recommendation" => {
                Ok(QuestionType::RecommendationRequest)
            }
            "explanatory_query" | "explanatory" => Ok(QuestionType::ExplanatoryQuery),
            _ => Err(CoreError::UnknownLabel {
                kind: "question type",
                value: s.to_string(),
            }),
        }
    }
}

/// A probe question generated for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: Uuid,
    pub text: String,
    pub question_type: QuestionType,
    /// Zero-based position in the run's question list.
    pub position: usize,
    /// Identifier of the template (or provider prompt) that produced the text.
    pub template: String,
    difficulty_weight: f64,
}

impl Question {
    /// Build a question; the difficulty weight is fixed by `question_type`.
    #[must_use]
    pub fn new(
        text: impl Into<String>,
        question_type: QuestionType,
        position: usize,
        template: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            text: text.into(),
            question_type,
            position,
            template: template.into(),
            difficulty_weight: question_type.difficulty_weight(),
        }
    }

    #[must_use]
    pub fn difficulty_weight(&self) -> f64 {
        self.difficulty_weight
    }
}
