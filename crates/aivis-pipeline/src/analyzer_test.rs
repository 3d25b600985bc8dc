use std::time::Duration;

use aivis_core::KnownCompetitor;
use async_trait::async_trait;
use chrono::Utc;

use super::*;
use crate::cancel::{cancel_pair, CancelSignal};

fn context() -> CompanyContext {
    CompanyContext {
        id: "acme-analytics".to_string(),
        name: "Acme Analytics".to_string(),
        domain: "acme.io".to_string(),
        industry: "product analytics".to_string(),
        overview: vec!["Analytics for SaaS.".to_string()],
        knowledge: vec![],
        aliases: vec!["Acme".to_string()],
        owned_domains: vec!["acme.io".to_string(), "docs.acme.io".to_string()],
        operated_domains: vec!["acme.medium.com".to_string()],
        competitors: vec![
            KnownCompetitor {
                name: "Mixpanel".to_string(),
                domain: Some("mixpanel.com".to_string()),
            },
            KnownCompetitor {
                name: "PostHog".to_string(),
                domain: None,
            },
        ],
    }
}

fn response(text: &str, urls: &[&str]) -> Response {
    Response {
        question_id: Uuid::new_v4(),
        text: text.to_string(),
        citations: urls
            .iter()
            .map(|u| Citation {
                url: (*u).to_string(),
                title: String::new(),
            })
            .collect(),
        success: true,
        retrieved_at: Utc::now(),
    }
}

fn mention(raw: &RawJudgment, text: &str) -> MentionAnalysis {
    interpret_judgment(raw, &response(text, &[]), &context()).0
}

const NAMED: &str = "For funnels, Acme Analytics is the strongest option.";

#[test]
fn explicit_position_implies_mention_when_flag_missing() {
    let raw = RawJudgment {
        position: Some("Primary".to_string()),
        ..RawJudgment::default()
    };
    let m = mention(&raw, NAMED);
    assert!(m.mention_detected);
    assert_eq!(m.position, MentionPosition::Primary);
    assert!((m.confidence - 0.5).abs() < f64::EPSILON, "default confidence when mentioned");
}

#[test]
fn missing_flag_and_position_means_not_mentioned() {
    let m = mention(&RawJudgment::default(), NAMED);
    assert!(!m.mention_detected);
    assert_eq!(m.position, MentionPosition::None);
    assert!(m.confidence.abs() < f64::EPSILON);
}

#[test]
fn mentioned_without_position_is_passing() {
    let raw = RawJudgment {
        mention_detected: Some(true),
        position: Some("none".to_string()),
        confidence: Some(0.8),
        ..RawJudgment::default()
    };
    let m = mention(&raw, NAMED);
    assert_eq!(m.position, MentionPosition::Passing);
    assert!((m.confidence - 0.8).abs() < f64::EPSILON);
}

#[test]
fn not_mentioned_forces_position_none() {
    let raw = RawJudgment {
        mention_detected: Some(false),
        position: Some("primary".to_string()),
        ..RawJudgment::default()
    };
    assert_eq!(mention(&raw, NAMED).position, MentionPosition::None);
}

#[test]
fn confidence_is_clamped_and_nan_is_zero() {
    let mut raw = RawJudgment {
        mention_detected: Some(true),
        position: Some("secondary".to_string()),
        confidence: Some(1.7),
        ..RawJudgment::default()
    };
    assert!((mention(&raw, NAMED).confidence - 1.0).abs() < f64::EPSILON);
    raw.confidence = Some(-0.3);
    assert!(mention(&raw, NAMED).confidence.abs() < f64::EPSILON);
    raw.confidence = Some(f64::NAN);
    assert!(mention(&raw, NAMED).confidence.abs() < f64::EPSILON);
}

#[test]
fn unsupported_mention_claim_halves_confidence() {
    let raw = RawJudgment {
        mention_detected: Some(true),
        position: Some("primary".to_string()),
        confidence: Some(0.9),
        ..RawJudgment::default()
    };
    let m = mention(&raw, "Mixpanel and PostHog dominate this space.");
    assert!(m.mention_detected);
    assert!((m.confidence - 0.45).abs() < 1e-12);
}

#[test]
fn mention_guard_uses_word_boundaries_aliases_and_domain() {
    let ctx = context();
    assert!(find_target_mention("Try Acmeville instead.", &ctx).is_none());
    assert!(find_target_mention("acme is popular", &ctx).is_some());
    assert!(find_target_mention("see ACME.IO for details", &ctx).is_some());
    assert_eq!(find_target_mention("I like Acme Analytics", &ctx), Some((7, 11)));
}

#[test]
fn sentiment_labels_are_lenient_and_unknown_is_neutral() {
    let mut raw = RawJudgment {
        mention_detected: Some(true),
        sentiment: Some("Very-Positive".to_string()),
        ..RawJudgment::default()
    };
    assert_eq!(mention(&raw, NAMED).sentiment, Sentiment::VeryPositive);
    raw.sentiment = Some("ecstatic".to_string());
    assert_eq!(mention(&raw, NAMED).sentiment, Sentiment::Neutral);
}

#[test]
fn excerpts_are_bounded() {
    let long = format!("{} Acme Analytics {}", "x".repeat(500), "y".repeat(500));
    let raw = RawJudgment {
        mention_detected: Some(true),
        ..RawJudgment::default()
    };
    let m = mention(&raw, &long);
    assert!(m.context.chars().count() <= MAX_EXCERPT_CHARS);
    assert!(m.context.contains("Acme Analytics"));

    let raw = RawJudgment {
        mention_detected: Some(true),
        context: Some("é".repeat(400)),
        ..RawJudgment::default()
    };
    assert_eq!(mention(&raw, NAMED).context.chars().count(), MAX_EXCERPT_CHARS);
}

#[test]
fn citation_buckets_follow_declared_then_heuristic_then_judge() {
    let ctx = context();
    let judged = vec![
        RawCitationJudgment {
            url: Some("https://docs.acme.io/guide".to_string()),
            bucket: Some("earned".to_string()),
            influence_score: Some(0.9),
            ..RawCitationJudgment::default()
        },
        RawCitationJudgment {
            url: Some("https://partner.example.org/".to_string()),
            bucket: Some("operated".to_string()),
            ..RawCitationJudgment::default()
        },
        RawCitationJudgment {
            domain: Some("news.example.com".to_string()),
            bucket: Some("bogus".to_string()),
            influence_score: Some(0.2),
            ..RawCitationJudgment::default()
        },
    ];
    let classify = |url: &str| {
        classify_citation(
            &Citation {
                url: url.to_string(),
                title: String::new(),
            },
            &ctx,
            &["Amplitude".to_string()],
            &judged,
        )
    };

    let owned = classify("https://docs.acme.io/guide");
    assert_eq!(owned.bucket, CitationBucket::Owned, "declared beats judge");
    assert!((owned.influence_score - 0.9).abs() < f64::EPSILON);
    assert_eq!(classify("https://www.acme.io").bucket, CitationBucket::Owned);
    assert_eq!(classify("https://acme.medium.com/post").bucket, CitationBucket::Operated);
    assert_eq!(classify("https://blog.mixpanel.com/x").bucket, CitationBucket::Competitor);
    assert_eq!(classify("https://posthog.gitbook.io").bucket, CitationBucket::Competitor);
    assert_eq!(classify("https://amplitude.com/pricing").bucket, CitationBucket::Competitor);
    assert_eq!(classify("https://partner.example.org").bucket, CitationBucket::Operated);

    let news = classify("https://news.example.com/story");
    assert_eq!(news.bucket, CitationBucket::Earned, "invalid judge bucket falls back");
    assert!((news.influence_score - 0.2).abs() < f64::EPSILON, "matched by domain");

    let unknown = classify("https://cheapflights.com");
    assert_eq!(unknown.bucket, CitationBucket::Earned);
    assert!((unknown.influence_score - 0.5).abs() < f64::EPSILON);
    assert_eq!(unknown.domain, "cheapflights.com");
}

#[test]
fn surfaced_competitors_are_cleaned() {
    let raw = RawJudgment {
        competitors: Some(vec![
            " Mixpanel ".to_string(),
            "mixpanel".to_string(),
            String::new(),
            "Acme".to_string(),
            "acme analytics".to_string(),
            "Heap".to_string(),
        ]),
        ..RawJudgment::default()
    };
    let (_, _, competitors) = interpret_judgment(&raw, &response(NAMED, &[]), &context());
    assert_eq!(competitors, vec!["Mixpanel".to_string(), "Heap".to_string()]);
}

#[test]
fn missing_competitor_list_falls_back_to_declared_names_in_text() {
    let (_, _, competitors) = interpret_judgment(
        &RawJudgment::default(),
        &response("Mixpanel is older than PostHog.", &[]),
        &context(),
    );
    assert_eq!(competitors, vec!["Mixpanel".to_string(), "PostHog".to_string()]);
}

#[test]
fn competitor_host_resolves_to_the_matched_name() {
    let ctx = context();
    let surfaced = vec!["Amplitude".to_string()];
    assert_eq!(competitor_for_host("blog.mixpanel.com", &ctx, &surfaced), Some("Mixpanel"));
    assert_eq!(competitor_for_host("posthog.gitbook.io", &ctx, &surfaced), Some("PostHog"));
    assert_eq!(competitor_for_host("amplitude.com", &ctx, &surfaced), Some("Amplitude"));
    assert_eq!(competitor_for_host("news.example.com", &ctx, &surfaced), None);
    assert_eq!(competitor_for_host("", &ctx, &surfaced), None);
}

struct FixedJudge(Result<RawJudgment, ProviderError>);

#[async_trait]
impl JudgmentService for FixedJudge {
    async fn analyze(
        &self,
        _response_text: &str,
        _target: &TargetDescriptor,
    ) -> Result<RawJudgment, ProviderError> {
        self.0.clone()
    }
}

struct HangingJudge;

#[async_trait]
impl JudgmentService for HangingJudge {
    async fn analyze(
        &self,
        _response_text: &str,
        _target: &TargetDescriptor,
    ) -> Result<RawJudgment, ProviderError> {
        std::future::pending().await
    }
}

fn settings() -> DispatchSettings {
    DispatchSettings {
        max_concurrent: 2,
        request_timeout: Duration::from_secs(600),
        max_retries: 0,
        backoff_base_ms: 0,
    }
}

fn question_for(resp: &mut Response, position: usize) -> Question {
    let q = Question::new("q", QuestionType::RecommendationRequest, position, "t");
    resp.question_id = q.id;
    q
}

#[tokio::test]
async fn judge_failure_degrades_to_conservative_default() {
    let analyzer = ResponseAnalyzer::new(
        Arc::new(FixedJudge(Err(ProviderError::Malformed("not json".to_string())))),
        settings(),
    );
    let ctx = context();
    let mut resp = response(NAMED, &["https://docs.acme.io/a", "https://mixpanel.com"]);
    let q = question_for(&mut resp, 0);
    let (analyzed, failure) = analyzer
        .analyze(&q, resp, &ctx, &TargetDescriptor::from(&ctx))
        .await;

    assert!(analyzed.degraded);
    assert_eq!(analyzed.mention, MentionAnalysis::default());
    assert_eq!(failure.unwrap().question_id, q.id);
    let buckets: Vec<CitationBucket> = analyzed.citations.iter().map(|c| c.bucket).collect();
    assert_eq!(buckets, vec![CitationBucket::Owned, CitationBucket::Competitor]);
    assert!((analyzed.difficulty_weight - 1.5).abs() < f64::EPSILON);
}

#[tokio::test]
async fn analyze_all_orders_by_position_and_counts() {
    let judgment = RawJudgment {
        mention_detected: Some(true),
        position: Some("primary".to_string()),
        confidence: Some(0.9),
        ..RawJudgment::default()
    };
    let analyzer = ResponseAnalyzer::new(Arc::new(FixedJudge(Ok(judgment))), settings());
    let ctx = context();
    let mut questions = Vec::new();
    let mut responses = HashMap::new();
    for position in 0..5 {
        let mut resp = response(NAMED, &[]);
        questions.push(question_for(&mut resp, position));
        responses.insert(resp.question_id, resp);
    }
    let mut run_ctx = RunContext::new(Uuid::new_v4(), CancelSignal::never(), Duration::from_secs(1), None);
    let outcome = analyzer
        .analyze_all(&questions, responses, &ctx, &mut run_ctx)
        .await;

    assert_eq!(outcome.analyzed.len(), 5);
    assert!(outcome.failures.is_empty());
    let positions: Vec<usize> = outcome.analyzed.iter().map(|a| a.position).collect();
    assert_eq!(positions, vec![0, 1, 2, 3, 4]);
    assert!(outcome.analyzed.iter().all(|a| a.mention.mention_detected));
    assert_eq!(run_ctx.counters.analyzed, 5);
}

#[tokio::test(start_paused = true)]
async fn analysis_is_aborted_after_cancel_grace() {
    let analyzer = ResponseAnalyzer::new(Arc::new(HangingJudge), settings());
    let ctx = context();
    let mut resp = response(NAMED, &[]);
    let questions = vec![question_for(&mut resp, 0)];
    let responses = HashMap::from([(resp.question_id, resp)]);

    let (handle, signal) = cancel_pair();
    handle.cancel();
    let mut run_ctx = RunContext::new(Uuid::new_v4(), signal, Duration::from_secs(3), None);
    let outcome = analyzer
        .analyze_all(&questions, responses, &ctx, &mut run_ctx)
        .await;

    assert!(outcome.analyzed.is_empty());
    assert_eq!(outcome.aborted, 1);
}
