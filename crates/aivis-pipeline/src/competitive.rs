use std::collections::{BTreeMap, HashSet};

use aivis_core::{competitor_key, CitationBucket, CompanyContext, CompetitorRecord, NicheSize};
use serde::Serialize;

use crate::analyzer::{competitor_for_host, AnalyzedResponse};

/// Competitive landscape observed across one run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompetitiveMetrics {
    /// Sorted by `mention_count` descending, then key.
    pub competitors: Vec<CompetitorRecord>,
    pub total_competitors: usize,
    pub target_mentions: usize,
    /// Owned plus operated citations.
    pub target_citations: usize,
    pub total_competitor_mentions: usize,
    pub share_of_voice: f64,
    pub niche_size: NicheSize,
}

/// Aggregate competitor mentions and citations. Deterministic, no I/O.
#[must_use]
pub fn extract_competitive_metrics(
    analyzed: &[AnalyzedResponse],
    context: &CompanyContext,
) -> CompetitiveMetrics {
    let mut records: BTreeMap<String, CompetitorRecord> = BTreeMap::new();
    let mut target_mentions = 0usize;
    let mut target_citations = 0usize;

    let mut ordered: Vec<&AnalyzedResponse> = analyzed.iter().collect();
    ordered.sort_by(|a, b| a.position.cmp(&b.position).then(a.question_id.cmp(&b.question_id)));

    for item in ordered {
        if item.mention.mention_detected {
            target_mentions += 1;
        }

        let mut counted = HashSet::new();
        for name in &item.competitors {
            let key = competitor_key(name);
            if key.is_empty() || context.is_target_name(name) || !counted.insert(key.clone()) {
                continue;
            }
            records
                .entry(key)
                .or_insert_with(|| CompetitorRecord::new(name))
                .mention_count += 1;
        }

        for citation in &item.citations {
            match citation.bucket {
                CitationBucket::Owned | CitationBucket::Operated => target_citations += 1,
                CitationBucket::Competitor if !citation.domain.is_empty() => {
                    // One record per competitor: join the name the analyzer matched.
                    let name = competitor_for_host(&citation.domain, context, &item.competitors)
                        .unwrap_or(citation.domain.as_str());
                    let key = competitor_key(name);
                    let record = records
                        .entry(key)
                        .or_insert_with(|| CompetitorRecord::new(name));
                    record.add_domain(&citation.domain);
                }
                CitationBucket::Competitor | CitationBucket::Earned => {}
            }
        }
    }

    let mut competitors: Vec<CompetitorRecord> = records.into_values().collect();
    competitors.sort_by(|a, b| b.mention_count.cmp(&a.mention_count).then_with(|| a.key.cmp(&b.key)));

    let total_competitors = competitors.len();
    let total_competitor_mentions: usize = competitors.iter().map(|c| c.mention_count).sum();
    let denominator = target_mentions + total_competitor_mentions;
    #[allow(clippy::cast_precision_loss)]
    let share_of_voice = if denominator == 0 {
        0.0
    } else {
        target_mentions as f64 / denominator as f64
    };

    CompetitiveMetrics {
        competitors,
        total_competitors,
        target_mentions,
        target_citations,
        total_competitor_mentions,
        share_of_voice,
        niche_size: NicheSize::for_competitor_count(total_competitors),
    }
}

#[cfg(test)]
mod tests {
    use aivis_core::{
        Citation, CitationClassification, KnownCompetitor, MentionAnalysis, QuestionType,
        Response,
    };
    use chrono::Utc;
    use uuid::Uuid;

    use super::*;
    use crate::analyzer::interpret_judgment;
    use crate::services::RawJudgment;

    fn context() -> CompanyContext {
        CompanyContext {
            id: "acme".to_string(),
            name: "Acme".to_string(),
            domain: "acme.io".to_string(),
            industry: String::new(),
            overview: vec![],
            knowledge: vec![],
            aliases: vec![],
            owned_domains: vec!["acme.io".to_string()],
            operated_domains: vec![],
            competitors: vec![KnownCompetitor {
                name: "Mixpanel".to_string(),
                domain: Some("mixpanel.com".to_string()),
            }],
        }
    }

    fn analyzed(
        position: usize,
        mentioned: bool,
        competitors: &[&str],
        citations: &[(&str, CitationBucket)],
    ) -> AnalyzedResponse {
        let question_id = Uuid::new_v4();
        AnalyzedResponse {
            question_id,
            question_type: QuestionType::IndirectConversational,
            difficulty_weight: 1.0,
            position,
            response: Response {
                question_id,
                text: String::new(),
                citations: vec![],
                success: true,
                retrieved_at: Utc::now(),
            },
            mention: MentionAnalysis {
                mention_detected: mentioned,
                ..MentionAnalysis::default()
            },
            citations: citations
                .iter()
                .map(|(domain, bucket)| CitationClassification {
                    url: format!("https://{domain}"),
                    domain: (*domain).to_string(),
                    bucket: *bucket,
                    influence_score: 0.5,
                })
                .collect(),
            competitors: competitors.iter().map(|c| (*c).to_string()).collect(),
            degraded: false,
        }
    }

    #[test]
    fn counts_each_competitor_once_per_response() {
        let items = vec![
            analyzed(0, true, &["Mixpanel", "mixpanel", "Heap"], &[]),
            analyzed(1, false, &["MIXPANEL"], &[]),
        ];
        let metrics = extract_competitive_metrics(&items, &context());
        assert_eq!(metrics.total_competitors, 2);
        assert_eq!(metrics.competitors[0].name, "Mixpanel", "first-seen spelling");
        assert_eq!(metrics.competitors[0].mention_count, 2);
        assert_eq!(metrics.competitors[1].key, "heap");
        assert_eq!(metrics.total_competitor_mentions, 3);
        assert_eq!(metrics.target_mentions, 1);
        assert!((metrics.share_of_voice - 0.25).abs() < 1e-12);
    }

    #[test]
    fn competitor_citations_attach_domains() {
        let items = vec![analyzed(
            0,
            false,
            &[],
            &[
                ("blog.mixpanel.com", CitationBucket::Competitor),
                ("acme.io", CitationBucket::Owned),
                ("acme.medium.com", CitationBucket::Operated),
                ("news.example.com", CitationBucket::Earned),
            ],
        )];
        let metrics = extract_competitive_metrics(&items, &context());
        assert_eq!(metrics.target_citations, 2);
        assert_eq!(metrics.total_competitors, 1);
        let mixpanel = &metrics.competitors[0];
        assert_eq!(mixpanel.key, "mixpanel");
        assert_eq!(mixpanel.mention_count, 0);
        assert_eq!(mixpanel.domains, vec!["blog.mixpanel.com".to_string()]);
        assert!(metrics.share_of_voice.abs() < f64::EPSILON);
    }

    #[test]
    fn judged_competitor_domains_join_their_named_records() {
        let raw = RawJudgment {
            competitors: Some(vec!["Amplitude".to_string(), "PostHog".to_string()]),
            ..RawJudgment::default()
        };
        let question_id = Uuid::new_v4();
        let response = Response {
            question_id,
            text: "Amplitude and PostHog both cover funnels.".to_string(),
            citations: ["https://amplitude.com/pricing", "https://posthog.com/docs"]
                .iter()
                .map(|u| Citation {
                    url: (*u).to_string(),
                    title: String::new(),
                })
                .collect(),
            success: true,
            retrieved_at: Utc::now(),
        };
        let (mention, citations, competitors) = interpret_judgment(&raw, &response, &context());
        assert!(citations.iter().all(|c| c.bucket == CitationBucket::Competitor));

        let item = AnalyzedResponse {
            question_id,
            question_type: QuestionType::IndirectConversational,
            difficulty_weight: 1.0,
            position: 0,
            response,
            mention,
            citations,
            competitors,
            degraded: false,
        };
        let metrics = extract_competitive_metrics(&[item], &context());

        let keys: Vec<&str> = metrics.competitors.iter().map(|c| c.key.as_str()).collect();
        assert_eq!(keys, vec!["amplitude", "posthog"]);
        assert_eq!(metrics.total_competitors, 2);
        assert_eq!(metrics.niche_size, NicheSize::Micro);
        assert_eq!(metrics.competitors[0].domains, vec!["amplitude.com".to_string()]);
        assert_eq!(metrics.competitors[1].domains, vec!["posthog.com".to_string()]);
        assert_eq!(metrics.total_competitor_mentions, 2);
    }

    #[test]
    fn unmatched_competitor_citation_falls_back_to_domain_key() {
        let items = vec![analyzed(
            0,
            false,
            &["Heap"],
            &[("rival.example", CitationBucket::Competitor)],
        )];
        let metrics = extract_competitive_metrics(&items, &context());
        let keys: Vec<&str> = metrics.competitors.iter().map(|c| c.key.as_str()).collect();
        assert_eq!(keys, vec!["heap", "rival.example"]);
    }

    #[test]
    fn sorted_by_count_then_key() {
        let items = vec![
            analyzed(0, false, &["Zeta", "Beta"], &[]),
            analyzed(1, false, &["Zeta", "Alpha"], &[]),
        ];
        let metrics = extract_competitive_metrics(&items, &context());
        let keys: Vec<&str> = metrics.competitors.iter().map(|c| c.key.as_str()).collect();
        assert_eq!(keys, vec!["zeta", "alpha", "beta"]);
    }

    #[test]
    fn empty_input_has_zero_share_and_micro_niche() {
        let metrics = extract_competitive_metrics(&[], &context());
        assert_eq!(metrics.total_competitors, 0);
        assert!(metrics.share_of_voice.abs() < f64::EPSILON);
        assert_eq!(metrics.niche_size, NicheSize::Micro);
    }

    #[test]
    fn niche_follows_distinct_competitor_count() {
        let names: Vec<String> = (0..11).map(|i| format!("Rival {i}")).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        for (count, expected) in [
            (3, NicheSize::Micro),
            (4, NicheSize::Niche),
            (10, NicheSize::Niche),
            (11, NicheSize::Broad),
        ] {
            let items = vec![analyzed(0, false, &refs[..count], &[])];
            assert_eq!(extract_competitive_metrics(&items, &context()).niche_size, expected);
        }
    }
}
