use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use aivis_core::{Citation, Question, Response};
use chrono::Utc;
use futures::{future, stream, StreamExt};
use uuid::Uuid;

use crate::cancel::CancelSignal;
use crate::error::{PipelineError, ProviderError};
use crate::progress::{RunContext, RunStage};
use crate::retry::retry_with_backoff;
use crate::services::{Answer, QuestionAnsweringService};

/// Limits applied to every provider dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchSettings {
    pub max_concurrent: usize,
    pub request_timeout: Duration,
    pub max_retries: u32,
    pub backoff_base_ms: u64,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            max_concurrent: 5,
            request_timeout: Duration::from_secs(60),
            max_retries: 2,
            backoff_base_ms: 1_000,
        }
    }
}

/// A question whose dispatch failed after all retries.
#[derive(Debug, Clone)]
pub struct QuestionFailure {
    pub question_id: Uuid,
    pub error: ProviderError,
}

/// Everything the collection stage produced.
#[derive(Debug, Default)]
pub struct CollectionOutcome {
    /// Successful responses keyed by question id.
    pub responses: HashMap<Uuid, Response>,
    pub failures: Vec<QuestionFailure>,
    /// In-flight dispatches hard-aborted after cancellation.
    pub aborted: usize,
    /// Questions never dispatched because the run was cancelled first.
    pub skipped: usize,
}

enum Dispatch {
    Answered(Response),
    Failed(ProviderError),
    Aborted,
}

/// Sends every question to the answering service through a bounded pool.
pub struct ResponseCollector {
    service: Arc<dyn QuestionAnsweringService>,
    settings: DispatchSettings,
}

impl ResponseCollector {
    #[must_use]
    pub fn new(service: Arc<dyn QuestionAnsweringService>, settings: DispatchSettings) -> Self {
        Self { service, settings }
    }

    /// Collect answers for `questions`. Per-question failures are recorded,
    /// never raised. Cancellation stops new dispatches; in-flight ones are
    /// aborted once the grace period runs out.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::ResponseCollectionFailure`] if no question
    /// produced a response.
    pub async fn collect(
        &self,
        questions: &[Question],
        ctx: &mut RunContext,
    ) -> Result<CollectionOutcome, PipelineError> {
        let total = questions.len();
        let cancel = ctx.cancel.clone();
        let grace = ctx.cancel_grace;
        let mut outcome = CollectionOutcome::default();
        let mut settled = 0usize;

        ctx.report(RunStage::Collecting, 0, total, format!("dispatching {total} questions"));

        let mut results = stream::iter(questions)
            .take_while(|_| future::ready(!cancel.is_cancelled()))
            .map(|question| {
                let cancel = cancel.clone();
                async move { (question, self.dispatch(question, &cancel, grace).await) }
            })
            .buffer_unordered(self.settings.max_concurrent.max(1));

        while let Some((question, dispatch)) = results.next().await {
            settled += 1;
            match dispatch {
                Dispatch::Answered(response) => {
                    tracing::debug!(
                        run_id = %ctx.run_id,
                        question_id = %question.id,
                        citations = response.citations.len(),
                        "response collected"
                    );
                    outcome.responses.insert(question.id, response);
                }
                Dispatch::Failed(error) => {
                    tracing::warn!(
                        run_id = %ctx.run_id,
                        question_id = %question.id,
                        error = %error,
                        "response collection failed for question"
                    );
                    outcome.failures.push(QuestionFailure {
                        question_id: question.id,
                        error,
                    });
                }
                Dispatch::Aborted => {
                    tracing::warn!(
                        run_id = %ctx.run_id,
                        question_id = %question.id,
                        "dispatch aborted after cancellation grace period"
                    );
                    outcome.aborted += 1;
                }
            }
            ctx.report(
                RunStage::Collecting,
                settled,
                total,
                format!("{settled}/{total} questions settled"),
            );
        }
        drop(results);

        outcome.skipped = total - settled;
        ctx.counters.collected = outcome.responses.len();
        ctx.counters.collection_failures = outcome.failures.len();
        ctx.counters.collection_aborted = outcome.aborted;
        ctx.counters.collection_skipped = outcome.skipped;

        if outcome.skipped > 0 {
            tracing::warn!(
                run_id = %ctx.run_id,
                skipped = outcome.skipped,
                "run cancelled; remaining questions were not dispatched"
            );
        }

        if outcome.responses.is_empty() {
            return Err(PipelineError::ResponseCollectionFailure {
                attempted: total,
                failed: outcome.failures.len(),
                aborted: outcome.aborted + outcome.skipped,
            });
        }

        tracing::info!(
            run_id = %ctx.run_id,
            collected = outcome.responses.len(),
            failed = outcome.failures.len(),
            "collection complete"
        );
        Ok(outcome)
    }

    async fn dispatch(&self, question: &Question, cancel: &CancelSignal, grace: Duration) -> Dispatch {
        let service = &self.service;
        let text = question.text.as_str();
        let timeout = self.settings.request_timeout;

        let attempt = retry_with_backoff(
            self.settings.max_retries,
            self.settings.backoff_base_ms,
            move || async move {
                match tokio::time::timeout(timeout, service.ask(text)).await {
                    Ok(result) => result,
                    Err(_) => Err(ProviderError::Timeout(timeout)),
                }
            },
        );

        tokio::select! {
            biased;
            result = attempt => match result.and_then(|answer| clean_answer(question.id, answer)) {
                Ok(response) => Dispatch::Answered(response),
                Err(error) => Dispatch::Failed(error),
            },
            () = cancel.hard_deadline(grace) => Dispatch::Aborted,
        }
    }
}

/// Turn a raw answer into a `Response`: blank text is a failure, blank
/// citation URLs are dropped, repeated URLs keep their first occurrence.
fn clean_answer(question_id: Uuid, answer: Answer) -> Result<Response, ProviderError> {
    let text = answer.text.trim();
    if text.is_empty() {
        return Err(ProviderError::Malformed("answer text is empty".to_string()));
    }

    let mut seen = HashSet::new();
    let citations: Vec<Citation> = answer
        .citations
        .into_iter()
        .filter_map(|c| {
            let url = c.url.trim().to_string();
            if url.is_empty() || !seen.insert(url.clone()) {
                return None;
            }
            Some(Citation {
                url,
                title: c.title.trim().to_string(),
            })
        })
        .collect();

    Ok(Response {
        question_id,
        text: text.to_string(),
        citations,
        success: true,
        retrieved_at: Utc::now(),
    })
}

#[cfg(test)]
#[path = "collector_test.rs"]
mod tests;
