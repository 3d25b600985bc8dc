use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use aivis_core::{
    competitor_key, normalize_domain, Citation, CitationBucket, CitationClassification,
    CompanyContext, MentionAnalysis, MentionPosition, Question, QuestionType, Response,
    Sentiment,
};
use futures::{stream, StreamExt};
use regex::Regex;
use serde::Serialize;
use uuid::Uuid;

use crate::collector::DispatchSettings;
use crate::error::{AnalysisFailure, ProviderError};
use crate::progress::{RunContext, RunStage};
use crate::retry::retry_with_backoff;
use crate::services::{JudgmentService, RawCitationJudgment, RawJudgment, TargetDescriptor};

/// Longest context excerpt kept on a [`MentionAnalysis`], in characters.
pub const MAX_EXCERPT_CHARS: usize = 280;

const DEFAULT_INFLUENCE: f64 = 0.5;
const DEFAULT_MENTIONED_CONFIDENCE: f64 = 0.5;

/// A collected response together with its judgment and question metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyzedResponse {
    pub question_id: Uuid,
    pub question_type: QuestionType,
    pub difficulty_weight: f64,
    /// Position of the question in the run.
    pub position: usize,
    pub response: Response,
    pub mention: MentionAnalysis,
    pub citations: Vec<CitationClassification>,
    /// Competitor names surfaced in this response, deduplicated.
    pub competitors: Vec<String>,
    /// `true` when the judge failed and the conservative default was used.
    pub degraded: bool,
}

#[derive(Debug, Default)]
pub struct AnalysisOutcome {
    /// Analysed responses ordered by question position.
    pub analyzed: Vec<AnalyzedResponse>,
    pub failures: Vec<AnalysisFailure>,
    /// Analyses hard-aborted after cancellation; their responses are dropped.
    pub aborted: usize,
}

/// Judges each response and classifies its citations.
pub struct ResponseAnalyzer {
    judge: Arc<dyn JudgmentService>,
    settings: DispatchSettings,
}

impl ResponseAnalyzer {
    #[must_use]
    pub fn new(judge: Arc<dyn JudgmentService>, settings: DispatchSettings) -> Self {
        Self { judge, settings }
    }

    /// Analyse one response. Never fails: a judge error yields the
    /// conservative default, flagged `degraded`, plus the failure for logging.
    pub async fn analyze(
        &self,
        question: &Question,
        response: Response,
        context: &CompanyContext,
        target: &TargetDescriptor,
    ) -> (AnalyzedResponse, Option<AnalysisFailure>) {
        let judgment = self.judge(&response.text, target).await;
        let (raw, failure) = match judgment {
            Ok(raw) => (Some(raw), None),
            Err(source) => (
                None,
                Some(AnalysisFailure {
                    question_id: question.id,
                    source,
                }),
            ),
        };

        let (mention, citations, competitors) = match &raw {
            Some(raw) => interpret_judgment(raw, &response, context),
            None => (
                MentionAnalysis::default(),
                classify_citations(&response.citations, context, &[], &[]),
                competitors_in_text(&response.text, context),
            ),
        };

        let analyzed = AnalyzedResponse {
            question_id: question.id,
            question_type: question.question_type,
            difficulty_weight: question.difficulty_weight(),
            position: question.position,
            response,
            mention,
            citations,
            competitors,
            degraded: raw.is_none(),
        };
        (analyzed, failure)
    }

    /// Analyse every response that has a matching question, through the same
    /// bounded pool model as collection.
    pub async fn analyze_all(
        &self,
        questions: &[Question],
        mut responses: HashMap<Uuid, Response>,
        context: &CompanyContext,
        ctx: &mut RunContext,
    ) -> AnalysisOutcome {
        let pairs: Vec<(&Question, Response)> = questions
            .iter()
            .filter_map(|q| responses.remove(&q.id).map(|r| (q, r)))
            .collect();
        let total = pairs.len();
        let target = TargetDescriptor::from(context);
        let cancel = ctx.cancel.clone();
        let grace = ctx.cancel_grace;
        let mut outcome = AnalysisOutcome::default();
        let mut settled = 0usize;

        ctx.report(RunStage::Analyzing, 0, total, format!("analysing {total} responses"));

        let target = &target;
        let mut results = stream::iter(pairs)
            .map(|(question, response)| {
                let cancel = cancel.clone();
                async move {
                    tokio::select! {
                        biased;
                        result = self.analyze(question, response, context, target) => (question.id, Some(result)),
                        () = cancel.hard_deadline(grace) => (question.id, None),
                    }
                }
            })
            .buffer_unordered(self.settings.max_concurrent.max(1));

        while let Some((question_id, result)) = results.next().await {
            settled += 1;
            match result {
                Some((analyzed, failure)) => {
                    if let Some(failure) = failure {
                        tracing::warn!(
                            run_id = %ctx.run_id,
                            question_id = %question_id,
                            error = %failure.source,
                            "judgment failed; using conservative default"
                        );
                        outcome.failures.push(failure);
                    }
                    outcome.analyzed.push(analyzed);
                }
                None => {
                    tracing::warn!(
                        run_id = %ctx.run_id,
                        question_id = %question_id,
                        "analysis aborted after cancellation grace period"
                    );
                    outcome.aborted += 1;
                }
            }
            ctx.report(
                RunStage::Analyzing,
                settled,
                total,
                format!("{settled}/{total} responses analysed"),
            );
        }
        drop(results);

        outcome
            .analyzed
            .sort_by(|a, b| a.position.cmp(&b.position).then(a.question_id.cmp(&b.question_id)));
        ctx.counters.analyzed = outcome.analyzed.len();
        ctx.counters.degraded = outcome.failures.len();
        ctx.counters.analysis_aborted = outcome.aborted;

        tracing::info!(
            run_id = %ctx.run_id,
            analyzed = outcome.analyzed.len(),
            degraded = outcome.failures.len(),
            aborted = outcome.aborted,
            "analysis complete"
        );
        outcome
    }

    async fn judge(&self, text: &str, target: &TargetDescriptor) -> Result<RawJudgment, ProviderError> {
        let judge = &self.judge;
        let timeout = self.settings.request_timeout;
        retry_with_backoff(
            self.settings.max_retries,
            self.settings.backoff_base_ms,
            move || async move {
                match tokio::time::timeout(timeout, judge.analyze(text, target)).await {
                    Ok(result) => result,
                    Err(_) => Err(ProviderError::Timeout(timeout)),
                }
            },
        )
        .await
    }
}

/// Normalise an untrusted judgment into a mention analysis, citation
/// classifications and surfaced competitor names.
#[must_use]
pub fn interpret_judgment(
    raw: &RawJudgment,
    response: &Response,
    context: &CompanyContext,
) -> (MentionAnalysis, Vec<CitationClassification>, Vec<String>) {
    let mention = interpret_mention(raw, &response.text, context);
    let competitors = match &raw.competitors {
        Some(names) => clean_competitor_names(names, context),
        None => competitors_in_text(&response.text, context),
    };
    let judged = raw.citations.as_deref().unwrap_or_default();
    let citations = classify_citations(&response.citations, context, &competitors, judged);
    (mention, citations, competitors)
}

fn interpret_mention(raw: &RawJudgment, text: &str, context: &CompanyContext) -> MentionAnalysis {
    let position = raw
        .position
        .as_deref()
        .and_then(|p| p.parse::<MentionPosition>().ok());
    let sentiment = raw
        .sentiment
        .as_deref()
        .and_then(|s| s.parse::<Sentiment>().ok())
        .unwrap_or_default();
    let mentioned = raw
        .mention_detected
        .unwrap_or(matches!(position, Some(p) if p != MentionPosition::None));
    let found = find_target_mention(text, context);
    let judge_excerpt = raw.context.as_deref().map(truncate_excerpt);

    if !mentioned {
        return MentionAnalysis {
            mention_detected: false,
            position: MentionPosition::None,
            sentiment,
            confidence: raw.confidence.map_or(0.0, clamp_unit),
            context: judge_excerpt.unwrap_or_default(),
        };
    }

    let mut confidence = raw
        .confidence
        .map_or(DEFAULT_MENTIONED_CONFIDENCE, clamp_unit);
    if found.is_none() {
        tracing::debug!(
            target_name = %context.name,
            "judge reported a mention the answer text does not contain; halving confidence"
        );
        confidence *= 0.5;
    }

    let excerpt = judge_excerpt
        .or_else(|| found.map(|(start, end)| excerpt_around(text, start, end)))
        .unwrap_or_default();

    MentionAnalysis {
        mention_detected: true,
        position: position
            .filter(|p| *p != MentionPosition::None)
            .unwrap_or(MentionPosition::Passing),
        sentiment,
        confidence,
        context: excerpt,
    }
}

fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Case-insensitive pattern for `needle`, anchored on word boundaries where
/// the needle itself starts or ends with a word character.
fn word_pattern(needle: &str) -> Option<Regex> {
    let needle = needle.trim();
    let first = needle.chars().next()?;
    let last = needle.chars().last()?;
    let is_word = |c: char| c.is_alphanumeric() || c == '_';
    let prefix = if is_word(first) { r"\b" } else { "" };
    let suffix = if is_word(last) { r"\b" } else { "" };
    Regex::new(&format!("(?i){prefix}{}{suffix}", regex::escape(needle))).ok()
}

/// Earliest byte range in `text` naming the target by name, alias or domain.
#[must_use]
pub fn find_target_mention(text: &str, context: &CompanyContext) -> Option<(usize, usize)> {
    context
        .name_variants()
        .chain(std::iter::once(context.domain.as_str()))
        .filter_map(word_pattern)
        .filter_map(|re| re.find(text).map(|m| (m.start(), m.end())))
        .min()
}

fn truncate_excerpt(raw: &str) -> String {
    raw.trim().chars().take(MAX_EXCERPT_CHARS).collect()
}

/// Window of at most [`MAX_EXCERPT_CHARS`] characters around `text[start..end]`.
fn excerpt_around(text: &str, start: usize, end: usize) -> String {
    let chars: Vec<char> = text.chars().collect();
    let start_char = text[..start].chars().count();
    let match_chars = text[start..end].chars().count();
    let lead = MAX_EXCERPT_CHARS.saturating_sub(match_chars) / 2;
    let from = start_char.saturating_sub(lead);
    let to = (from + MAX_EXCERPT_CHARS).min(chars.len());
    chars[from..to].iter().collect::<String>().trim().to_string()
}

/// Trim, drop blanks and the target's own names, dedupe case-insensitively.
fn clean_competitor_names(names: &[String], context: &CompanyContext) -> Vec<String> {
    let mut seen = HashSet::new();
    names
        .iter()
        .map(|n| n.trim())
        .filter(|n| !n.is_empty() && !context.is_target_name(n))
        .filter(|n| seen.insert(competitor_key(n)))
        .map(str::to_string)
        .collect()
}

/// Declared competitors named in `text`, used when no judge list is available.
fn competitors_in_text(text: &str, context: &CompanyContext) -> Vec<String> {
    context
        .competitors
        .iter()
        .filter(|c| word_pattern(&c.name).is_some_and(|re| re.is_match(text)))
        .map(|c| c.name.clone())
        .collect()
}

fn classify_citations(
    citations: &[Citation],
    context: &CompanyContext,
    surfaced: &[String],
    judged: &[RawCitationJudgment],
) -> Vec<CitationClassification> {
    citations
        .iter()
        .map(|c| classify_citation(c, context, surfaced, judged))
        .collect()
}

/// Classify one citation. Declared ownership wins over competitor heuristics,
/// which win over the judge's bucket; anything left is earned.
#[must_use]
pub fn classify_citation(
    citation: &Citation,
    context: &CompanyContext,
    surfaced: &[String],
    judged: &[RawCitationJudgment],
) -> CitationClassification {
    let domain = normalize_domain(&citation.url).unwrap_or_default();
    let judgment = find_citation_judgment(&citation.url, &domain, judged);

    let bucket = if context.is_owned_host(&domain) {
        CitationBucket::Owned
    } else if context.is_operated_host(&domain) {
        CitationBucket::Operated
    } else if competitor_for_host(&domain, context, surfaced).is_some() {
        CitationBucket::Competitor
    } else {
        judgment
            .and_then(|j| j.bucket.as_deref())
            .and_then(|b| b.parse::<CitationBucket>().ok())
            .unwrap_or(CitationBucket::Earned)
    };

    let influence_score = judgment
        .and_then(|j| j.influence_score)
        .map_or(DEFAULT_INFLUENCE, clamp_unit);

    CitationClassification {
        url: citation.url.clone(),
        domain,
        bucket,
        influence_score,
    }
}

/// The competitor a cited host belongs to: a declared competitor domain, or a
/// host label equal to a declared or surfaced competitor name.
pub(crate) fn competitor_for_host<'a>(
    domain: &str,
    context: &'a CompanyContext,
    surfaced: &'a [String],
) -> Option<&'a str> {
    if domain.is_empty() {
        return None;
    }
    if let Some(known) = context.competitor_for_host(domain) {
        return Some(known.name.as_str());
    }
    let labels: Vec<String> = domain.split('.').map(|l| l.replace('-', "")).collect();
    context
        .competitors
        .iter()
        .map(|c| c.name.as_str())
        .chain(surfaced.iter().map(String::as_str))
        .find(|name| {
            let key: String = name
                .chars()
                .filter(char::is_ascii_alphanumeric)
                .collect::<String>()
                .to_ascii_lowercase();
            key.len() >= 3 && labels.iter().any(|label| *label == key)
        })
}

fn find_citation_judgment<'a>(
    url: &str,
    domain: &str,
    judged: &'a [RawCitationJudgment],
) -> Option<&'a RawCitationJudgment> {
    let wanted = url_key(url);
    judged
        .iter()
        .find(|j| j.url.as_deref().is_some_and(|u| url_key(u) == wanted))
        .or_else(|| {
            if domain.is_empty() {
                return None;
            }
            judged.iter().find(|j| {
                j.domain
                    .as_deref()
                    .or(j.url.as_deref())
                    .and_then(normalize_domain)
                    .is_some_and(|d| d == domain)
            })
        })
}

fn url_key(url: &str) -> String {
    url.trim().trim_end_matches('/').to_lowercase()
}

#[cfg(test)]
#[path = "analyzer_test.rs"]
mod tests;
