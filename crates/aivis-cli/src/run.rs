//! `aivis run`: wire the configured providers into a pipeline and execute
//! one scoring run.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use aivis_core::{load_companies, AppConfig, QuestionType};
use aivis_pipeline::{
    cancel_pair, CancelHandle, CompanyContextBuilder, InMemoryRunRepository, PipelineServices,
    PipelineSettings, ProgressEvent, QuestionGenerator, QuestionSource, RegistryCompanySource,
    RunOptions, RunReport, RunRepository, TemplateQuestionSource, VisibilityPipeline,
};
use aivis_providers::{AnswerClient, JudgeClient, QuestionClient};
use anyhow::Context;

#[derive(Debug)]
pub(crate) struct RunRequest {
    pub company: String,
    pub question_count: usize,
    pub types: Option<Vec<QuestionType>>,
    pub timeout_secs: Option<u64>,
    pub json: bool,
}

fn company_source(config: &AppConfig) -> anyhow::Result<Arc<RegistryCompanySource>> {
    let companies = load_companies(&config.companies_path).with_context(|| {
        format!(
            "failed to load companies from {}",
            config.companies_path.display()
        )
    })?;
    Ok(Arc::new(RegistryCompanySource::new(companies)))
}

fn question_source(config: &AppConfig) -> anyhow::Result<Arc<dyn QuestionSource>> {
    if config.question_url.is_some() {
        let client =
            QuestionClient::from_app_config(config).context("failed to build question client")?;
        Ok(Arc::new(client))
    } else {
        tracing::info!("AIVIS_QUESTION_URL not set; using built-in question templates");
        Ok(Arc::new(TemplateQuestionSource))
    }
}

async fn run_repository(config: &AppConfig) -> anyhow::Result<Arc<dyn RunRepository>> {
    if config.database_url.is_none() {
        tracing::warn!("DATABASE_URL not set; run results are kept in memory only");
        return Ok(Arc::new(InMemoryRunRepository::new()));
    }
    let pool = aivis_db::connect_pool_from_config(config)
        .await
        .context("failed to connect to database")?;
    Ok(Arc::new(aivis_db::PgRunRepository::new(pool)))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CancelCause {
    Interrupt,
    Timeout,
}

/// Wait for an interrupt or for `timeout` to elapse, whichever comes first.
///
/// A failing interrupt listener is logged and the timeout still applies.
/// Returns `None` only when the listener fails and no timeout is set.
pub(crate) async fn wait_for_cancel<F>(interrupt: F, timeout: Option<Duration>) -> Option<CancelCause>
where
    F: Future<Output = std::io::Result<()>>,
{
    let deadline = async {
        match timeout {
            Some(t) => tokio::time::sleep(t).await,
            None => std::future::pending::<()>().await,
        }
    };
    tokio::pin!(deadline);

    tokio::select! {
        result = interrupt => match result {
            Ok(()) => return Some(CancelCause::Interrupt),
            Err(e) => tracing::error!(error = %e, "failed to listen for ctrl-c; timeout still applies"),
        },
        () = &mut deadline => return Some(CancelCause::Timeout),
    }

    timeout?;
    deadline.await;
    Some(CancelCause::Timeout)
}

/// Cancel the run on Ctrl-C or once `timeout` elapses.
fn spawn_cancel_watch(handle: CancelHandle, timeout: Option<Duration>) {
    tokio::spawn(async move {
        match wait_for_cancel(tokio::signal::ctrl_c(), timeout).await {
            Some(CancelCause::Interrupt) => tracing::warn!("interrupt received; cancelling run"),
            Some(CancelCause::Timeout) => tracing::warn!(
                timeout_secs = timeout.map_or(0, |t| t.as_secs()),
                "run timeout reached; cancelling"
            ),
            None => return,
        }
        handle.cancel();
    });
}

/// Execute a full scoring run and print the result.
///
/// # Errors
///
/// Returns an error if configuration is incomplete, a provider client cannot
/// be built, or the run fails.
pub(crate) async fn run_scoring(config: &AppConfig, request: RunRequest) -> anyhow::Result<()> {
    let answers = AnswerClient::from_app_config(config)
        .context("an answer provider is required (set AIVIS_ANSWER_URL)")?;
    let judge = JudgeClient::from_app_config(config)
        .context("a judgment provider is required (set AIVIS_JUDGE_URL)")?;

    let services = PipelineServices {
        companies: company_source(config)?,
        questions: question_source(config)?,
        answers: Arc::new(answers),
        judge: Arc::new(judge),
        repository: run_repository(config).await?,
    };
    let pipeline = VisibilityPipeline::new(services, PipelineSettings::from_app_config(config));

    let (handle, cancel) = cancel_pair();
    spawn_cancel_watch(handle, request.timeout_secs.map(Duration::from_secs));

    let options = RunOptions {
        question_types: request.types,
        cancel,
        progress: Some(Arc::new(|event: ProgressEvent| {
            tracing::info!(
                run_id = %event.run_id,
                stage = %event.stage,
                percent = event.percent,
                "{}",
                event.message
            );
        })),
    };

    let report = pipeline
        .run(&request.company, request.question_count, options)
        .await
        .with_context(|| format!("scoring run for '{}' failed", request.company))?;

    if request.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

/// Build the context and question set for a company and print them.
///
/// # Errors
///
/// Returns an error if the context cannot be built or no questions can be
/// generated.
pub(crate) async fn run_dry(config: &AppConfig, request: &RunRequest) -> anyhow::Result<()> {
    aivis_pipeline::allocate(request.question_count, request.types.as_deref())?;

    let context = CompanyContextBuilder::new(company_source(config)?)
        .build(&request.company)
        .await?;
    let questions = QuestionGenerator::new(question_source(config)?)
        .generate(&context, request.question_count, request.types.as_deref())
        .await?;

    if request.json {
        let payload = serde_json::json!({ "context": context, "questions": questions });
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    println!("dry-run: {} ({})", context.name, context.domain);
    println!("  owned domains: {}", context.owned_domains.join(", "));
    println!("  known competitors: {}", context.competitors.len());
    println!();
    for q in &questions {
        println!("{:>3}. [{}] {}", q.position + 1, q.question_type, q.text);
    }
    Ok(())
}

fn print_report(report: &RunReport) {
    let score = &report.score;
    println!(
        "{}: visibility {:.1}/100, grade {} ({})",
        report.context.name,
        score.display_score(),
        score.grade,
        score.grade.label()
    );
    println!("run {}", report.run.id);
    if report.cancelled {
        println!(
            "cancelled: scored {} of {} questions ({} aborted, {} not sent)",
            report.counters.analyzed,
            report.counters.questions,
            report.counters.collection_aborted,
            report.counters.collection_skipped
        );
    }
    println!();
    for component in &score.breakdown {
        println!(
            "  {:<24} {:>6.3} x {:.2} = {:.3}",
            component.name, component.value, component.weight, component.contribution
        );
    }
    println!();
    println!(
        "  competitors: {} ({} market), share of voice {:.1}%",
        report.metrics.total_competitors,
        report.metrics.niche_size,
        report.metrics.share_of_voice * 100.0
    );
    for competitor in report.metrics.competitors.iter().take(5) {
        println!("    {:<24} {}", competitor.name, competitor.mention_count);
    }
    println!();
    println!("{}", score.summary);
}
