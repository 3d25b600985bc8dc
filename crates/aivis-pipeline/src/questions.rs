use std::sync::Arc;

use aivis_core::{CompanyContext, Question, QuestionType};

use crate::error::PipelineError;
use crate::services::{GeneratedQuestion, QuestionSource};

/// Largest question count a single run accepts.
pub const MAX_QUESTIONS: usize = 100;

/// Share of the question count given to each type, in per-mille, in table order.
const MIXTURE: [(QuestionType, usize); 5] = [
    (QuestionType::DirectConversational, 200),
    (QuestionType::IndirectConversational, 250),
    (QuestionType::ComparisonQuery, 150),
    (QuestionType::RecommendationRequest, 200),
    (QuestionType::ExplanatoryQuery, 200),
];

/// Split `count` across the allowed types by largest-remainder apportionment.
///
/// Types absent from `filter` get nothing; the remaining shares are
/// renormalised. Equal remainders go to the type earlier in the table.
/// Types with a zero allocation are omitted from the result.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidRequest`] for a count outside
/// `1..=MAX_QUESTIONS` or an empty filter.
pub fn allocate(
    count: usize,
    filter: Option<&[QuestionType]>,
) -> Result<Vec<(QuestionType, usize)>, PipelineError> {
    if !(1..=MAX_QUESTIONS).contains(&count) {
        return Err(PipelineError::InvalidRequest(format!(
            "question count must be between 1 and {MAX_QUESTIONS}, got {count}"
        )));
    }
    let allowed: Vec<(QuestionType, usize)> = MIXTURE
        .iter()
        .copied()
        .filter(|(t, _)| filter.is_none_or(|f| f.contains(t)))
        .collect();
    if allowed.is_empty() {
        return Err(PipelineError::InvalidRequest(
            "question type filter selects no types".to_string(),
        ));
    }

    let total_share: usize = allowed.iter().map(|(_, share)| share).sum();
    let mut quotas: Vec<(QuestionType, usize, usize)> = allowed
        .iter()
        .map(|&(t, share)| (t, count * share / total_share, count * share % total_share))
        .collect();

    let assigned: usize = quotas.iter().map(|(_, n, _)| n).sum();
    let mut order: Vec<usize> = (0..quotas.len()).collect();
    // Stable sort keeps table order among equal remainders.
    order.sort_by(|&a, &b| quotas[b].2.cmp(&quotas[a].2));
    for &idx in order.iter().take(count - assigned) {
        quotas[idx].1 += 1;
    }

    Ok(quotas
        .into_iter()
        .filter(|(_, n, _)| *n > 0)
        .map(|(t, n, _)| (t, n))
        .collect())
}

/// Produces the ordered probe questions for a run.
pub struct QuestionGenerator {
    source: Arc<dyn QuestionSource>,
}

impl QuestionGenerator {
    #[must_use]
    pub fn new(source: Arc<dyn QuestionSource>) -> Self {
        Self { source }
    }

    /// Generate `count` questions, grouped by type in table order, positions
    /// `0..n`.
    ///
    /// # Errors
    ///
    /// - [`PipelineError::InvalidRequest`] for a bad count or filter.
    /// - [`PipelineError::QuestionGenerationFailure`] if a source call fails
    ///   twice for one type, or no usable question text comes back at all.
    pub async fn generate(
        &self,
        context: &CompanyContext,
        count: usize,
        filter: Option<&[QuestionType]>,
    ) -> Result<Vec<Question>, PipelineError> {
        let plan = allocate(count, filter)?;
        let mut questions = Vec::with_capacity(count);

        for (question_type, wanted) in plan {
            let generated = self.generate_type(context, question_type, wanted).await?;
            let usable: Vec<GeneratedQuestion> = generated
                .into_iter()
                .filter(|g| !g.text.trim().is_empty())
                .take(wanted)
                .collect();
            if usable.len() < wanted {
                tracing::warn!(
                    question_type = %question_type,
                    wanted,
                    received = usable.len(),
                    "question source returned fewer usable questions than requested"
                );
            }
            for g in usable {
                let position = questions.len();
                questions.push(Question::new(
                    g.text.trim(),
                    question_type,
                    position,
                    g.template,
                ));
            }
        }

        if questions.is_empty() {
            return Err(PipelineError::QuestionGenerationFailure {
                reason: "question source produced no usable questions".to_string(),
            });
        }
        tracing::info!(count = questions.len(), "questions generated");
        Ok(questions)
    }

    async fn generate_type(
        &self,
        context: &CompanyContext,
        question_type: QuestionType,
        count: usize,
    ) -> Result<Vec<GeneratedQuestion>, PipelineError> {
        match self.source.generate(context, question_type, count).await {
            Ok(generated) => Ok(generated),
            Err(first) => {
                tracing::warn!(
                    question_type = %question_type,
                    error = %first,
                    "question source failed; retrying once"
                );
                self.source
                    .generate(context, question_type, count)
                    .await
                    .map_err(|e| PipelineError::QuestionGenerationFailure {
                        reason: format!("{question_type}: {e}"),
                    })
            }
        }
    }
}
