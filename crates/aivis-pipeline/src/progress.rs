use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use uuid::Uuid;

use crate::cancel::CancelSignal;

/// Pipeline stage reported to progress sinks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStage {
    Context,
    Questions,
    Collecting,
    Analyzing,
    Competitive,
    Scoring,
    Completed,
    Failed,
}

impl RunStage {
    /// Overall percent range covered by the stage.
    const fn span(self) -> (u8, u8) {
        match self {
            RunStage::Context => (0, 5),
            RunStage::Questions => (5, 15),
            RunStage::Collecting => (15, 60),
            RunStage::Analyzing => (60, 90),
            RunStage::Competitive => (90, 95),
            RunStage::Scoring => (95, 99),
            RunStage::Completed | RunStage::Failed => (100, 100),
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            RunStage::Context => "context",
            RunStage::Questions => "questions",
            RunStage::Collecting => "collecting",
            RunStage::Analyzing => "analyzing",
            RunStage::Competitive => "competitive",
            RunStage::Scoring => "scoring",
            RunStage::Completed => "completed",
            RunStage::Failed => "failed",
        }
    }
}

impl std::fmt::Display for RunStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressEvent {
    pub run_id: Uuid,
    pub stage: RunStage,
    pub percent: u8,
    pub message: String,
}

/// Receives progress updates. Implemented for plain closures.
pub trait ProgressSink: Send + Sync {
    fn report(&self, event: ProgressEvent);
}

impl<F> ProgressSink for F
where
    F: Fn(ProgressEvent) + Send + Sync,
{
    fn report(&self, event: ProgressEvent) {
        self(event);
    }
}

/// Per-stage tallies for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunCounters {
    pub questions: usize,
    pub collected: usize,
    pub collection_failures: usize,
    pub collection_aborted: usize,
    pub collection_skipped: usize,
    pub analyzed: usize,
    pub degraded: usize,
    pub analysis_aborted: usize,
}

/// State scoped to a single run: identity, cancellation, progress reporting
/// and counters. Never shared between runs.
pub struct RunContext {
    pub run_id: Uuid,
    pub cancel: CancelSignal,
    pub cancel_grace: Duration,
    pub counters: RunCounters,
    sink: Option<Arc<dyn ProgressSink>>,
}

impl RunContext {
    #[must_use]
    pub fn new(
        run_id: Uuid,
        cancel: CancelSignal,
        cancel_grace: Duration,
        sink: Option<Arc<dyn ProgressSink>>,
    ) -> Self {
        Self {
            run_id,
            cancel,
            cancel_grace,
            counters: RunCounters::default(),
            sink,
        }
    }

    /// Report `done` of `total` units of work inside `stage`.
    pub fn report(&self, stage: RunStage, done: usize, total: usize, message: impl Into<String>) {
        let Some(sink) = &self.sink else {
            return;
        };
        let (start, end) = stage.span();
        let fraction = if total == 0 {
            1.0
        } else {
            #[allow(clippy::cast_precision_loss)]
            let f = done.min(total) as f64 / total as f64;
            f
        };
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let percent = start + (f64::from(end - start) * fraction).round() as u8;
        sink.report(ProgressEvent {
            run_id: self.run_id,
            stage,
            percent,
            message: message.into(),
        });
    }

    /// Report the start of `stage`.
    pub fn enter(&self, stage: RunStage, message: impl Into<String>) {
        self.report(stage, 0, 1, message);
    }
}

impl std::fmt::Debug for RunContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunContext")
            .field("run_id", &self.run_id)
            .field("cancelled", &self.cancel.is_cancelled())
            .field("cancel_grace", &self.cancel_grace)
            .field("counters", &self.counters)
            .field("sink", &self.sink.is_some())
            .finish()
    }
}
