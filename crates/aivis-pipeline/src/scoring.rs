//! Visibility scoring.
//!
//! Pure and single-pass over finalised data. Inputs are ordered by question
//! position before any summation, so the same analyses in any arrival order
//! produce a bit-identical [`ScoreResult`].

use std::collections::BTreeMap;

use aivis_core::{
    Grade, MentionPosition, QuestionType, ScoreComponent, ScoreResult, Sentiment,
};

use crate::analyzer::AnalyzedResponse;
use crate::competitive::CompetitiveMetrics;
use crate::error::PipelineError;

/// Exponent of the toughening curve applied to the raw composite.
pub const CURVE_EXPONENT: f64 = 1.35;

const WEIGHT_MENTION_RATE: f64 = 0.40;
const WEIGHT_MENTION_QUALITY: f64 = 0.25;
const WEIGHT_SOURCE_INFLUENCE: f64 = 0.20;
const WEIGHT_COMPETITIVE: f64 = 0.10;
const WEIGHT_CONSISTENCY: f64 = 0.05;

const fn position_weight(position: MentionPosition) -> f64 {
    match position {
        MentionPosition::Primary => 1.0,
        MentionPosition::Secondary => 0.6,
        MentionPosition::Passing => 0.3,
        MentionPosition::None => 0.0,
    }
}

const fn sentiment_weight(sentiment: Sentiment) -> f64 {
    match sentiment {
        Sentiment::VeryPositive => 1.0,
        Sentiment::Positive => 0.8,
        Sentiment::Neutral => 0.5,
        Sentiment::Negative => 0.2,
        Sentiment::VeryNegative => 0.0,
    }
}

/// Compute the visibility score for a run.
///
/// # Errors
///
/// Returns [`PipelineError::ScoringInputInsufficient`] when `analyzed` is empty.
pub fn score(
    analyzed: &[AnalyzedResponse],
    metrics: &CompetitiveMetrics,
) -> Result<ScoreResult, PipelineError> {
    if analyzed.is_empty() {
        return Err(PipelineError::ScoringInputInsufficient);
    }

    let mut ordered: Vec<&AnalyzedResponse> = analyzed.iter().collect();
    ordered.sort_by(|a, b| a.position.cmp(&b.position).then(a.question_id.cmp(&b.question_id)));

    let total = ordered.len();
    let mentioned: Vec<&AnalyzedResponse> = ordered
        .iter()
        .copied()
        .filter(|a| a.mention.mention_detected)
        .collect();

    #[allow(clippy::cast_precision_loss)]
    let mention_rate = mentioned.len() as f64 / total as f64;
    let difficulty_weighted_mention = difficulty_weighted(&ordered);
    let mention_quality = mention_quality(&mentioned);
    let source_influence = source_influence(&ordered);
    let competitive_positioning =
        (metrics.share_of_voice * metrics.niche_size.multiplier()).min(1.0);
    let consistency = consistency(&ordered);

    let breakdown: Vec<ScoreComponent> = [
        ("mention_rate", mention_rate, WEIGHT_MENTION_RATE),
        ("mention_quality", mention_quality, WEIGHT_MENTION_QUALITY),
        ("source_influence", source_influence, WEIGHT_SOURCE_INFLUENCE),
        ("competitive_positioning", competitive_positioning, WEIGHT_COMPETITIVE),
        ("consistency", consistency, WEIGHT_CONSISTENCY),
    ]
    .into_iter()
    .map(|(name, value, weight)| ScoreComponent {
        name: name.to_string(),
        value,
        weight,
        contribution: value * weight,
    })
    .collect();

    let raw_score = breakdown
        .iter()
        .map(|c| c.contribution)
        .sum::<f64>()
        .clamp(0.0, 1.0);
    let overall_score = raw_score.powf(CURVE_EXPONENT).clamp(0.0, 1.0);
    let grade = Grade::from_percent(overall_score * 100.0);

    let summary = format!(
        "Mentioned in {mentions} of {total} answers ({rate:.1}%), difficulty-weighted {dw:.1}%. \
         Mention quality {mq:.2}, first-party source influence {si:.2}, \
         share of voice {sov:.1}% across {competitors} competitors ({niche} market), \
         consistency {cons:.2}. Raw composite {raw:.3} curves to {display:.1}/100: grade {grade} ({label}).",
        mentions = mentioned.len(),
        rate = mention_rate * 100.0,
        dw = difficulty_weighted_mention * 100.0,
        mq = mention_quality,
        si = source_influence,
        sov = metrics.share_of_voice * 100.0,
        competitors = metrics.total_competitors,
        niche = metrics.niche_size,
        cons = consistency,
        raw = raw_score,
        display = overall_score * 100.0,
        label = grade.label(),
    );

    Ok(ScoreResult {
        overall_score,
        raw_score,
        grade,
        mention_rate,
        difficulty_weighted_mention,
        mention_quality,
        source_influence,
        competitive_positioning,
        consistency,
        niche_size: metrics.niche_size,
        analyzed_responses: total,
        mentions_detected: mentioned.len(),
        breakdown,
        summary,
    })
}

fn difficulty_weighted(ordered: &[&AnalyzedResponse]) -> f64 {
    let total: f64 = ordered.iter().map(|a| a.difficulty_weight).sum();
    if total <= 0.0 {
        return 0.0;
    }
    let hit: f64 = ordered
        .iter()
        .filter(|a| a.mention.mention_detected)
        .map(|a| a.difficulty_weight)
        .sum();
    hit / total
}

fn mention_quality(mentioned: &[&AnalyzedResponse]) -> f64 {
    if mentioned.is_empty() {
        return 0.0;
    }
    let sum: f64 = mentioned
        .iter()
        .map(|a| {
            position_weight(a.mention.position)
                * sentiment_weight(a.mention.sentiment)
                * a.mention.confidence
        })
        .sum();
    #[allow(clippy::cast_precision_loss)]
    let mean = sum / mentioned.len() as f64;
    mean
}

/// Mean influence of first-party citations relative to all citations.
///
/// This is a ratio of means, not a share of citations. It saturates at 1.0 as
/// soon as first-party citations are at least as influential as the run
/// average, so one owned citation among many earned ones can score the same
/// as an all-owned run.
fn source_influence(ordered: &[&AnalyzedResponse]) -> f64 {
    let mut all = (0.0_f64, 0usize);
    let mut first_party = (0.0_f64, 0usize);
    for citation in ordered.iter().flat_map(|a| a.citations.iter()) {
        all.0 += citation.influence_score;
        all.1 += 1;
        if citation.bucket.is_first_party() {
            first_party.0 += citation.influence_score;
            first_party.1 += 1;
        }
    }
    if first_party.1 == 0 || all.0 <= 0.0 {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let ratio = (first_party.0 / first_party.1 as f64) / (all.0 / all.1 as f64);
    ratio.clamp(0.0, 1.0)
}

/// One minus the normalised coefficient of variation of per-type mention rates.
fn consistency(ordered: &[&AnalyzedResponse]) -> f64 {
    let mut groups: BTreeMap<QuestionType, (usize, usize)> = BTreeMap::new();
    for a in ordered {
        let group = groups.entry(a.question_type).or_default();
        group.1 += 1;
        if a.mention.mention_detected {
            group.0 += 1;
        }
    }

    #[allow(clippy::cast_precision_loss)]
    let rates: Vec<f64> = groups
        .values()
        .map(|&(hit, n)| hit as f64 / n as f64)
        .collect();
    #[allow(clippy::cast_precision_loss)]
    let k = rates.len() as f64;
    let mean = rates.iter().sum::<f64>() / k;
    if mean <= 0.0 {
        return 0.0;
    }
    if rates.len() == 1 {
        return mean;
    }
    let variance = rates.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / k;
    let cv = variance.sqrt() / mean;
    (1.0 - cv / (k - 1.0).sqrt()).clamp(0.0, 1.0)
}

#[cfg(test)]
#[path = "scoring_test.rs"]
mod tests;
