//! Read-only and maintenance commands: `companies`, `runs` and `db`.

use aivis_core::{load_companies, AppConfig};
use aivis_db::PgRunRepository;
use aivis_pipeline::RunRepository;
use anyhow::Context;
use clap::Subcommand;
use uuid::Uuid;

#[derive(Debug, Subcommand)]
pub enum CompaniesCommands {
    /// List companies in the registry
    List,
}

#[derive(Debug, Subcommand)]
pub enum RunsCommands {
    /// List recent runs
    List {
        /// Only runs for this company id
        #[arg(long)]
        company: Option<String>,
        /// Maximum number of runs to show
        #[arg(long, default_value = "20")]
        limit: i64,
    },
    /// Show one run and its score
    Show {
        /// Run id
        id: Uuid,
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug, Subcommand)]
pub enum DbCommands {
    /// Check database connectivity
    Ping,
    /// Apply pending migrations
    Migrate,
}

pub(crate) fn run_companies(config: &AppConfig, command: &CompaniesCommands) -> anyhow::Result<()> {
    match command {
        CompaniesCommands::List => {
            let registry = load_companies(&config.companies_path).with_context(|| {
                format!(
                    "failed to load companies from {}",
                    config.companies_path.display()
                )
            })?;
            println!("{:<24} {:<28} {:<24} competitors", "id", "name", "domain");
            for company in &registry.companies {
                println!(
                    "{:<24} {:<28} {:<24} {}",
                    company.slug(),
                    company.name,
                    company.domain,
                    company.competitors.len()
                );
            }
        }
    }
    Ok(())
}

async fn repository(config: &AppConfig) -> anyhow::Result<PgRunRepository> {
    let pool = aivis_db::connect_pool_from_config(config)
        .await
        .context("stored runs need DATABASE_URL")?;
    Ok(PgRunRepository::new(pool))
}

pub(crate) async fn run_runs(config: &AppConfig, command: &RunsCommands) -> anyhow::Result<()> {
    let repo = repository(config).await?;
    match command {
        RunsCommands::List { company, limit } => {
            let runs = repo.list_runs(company.as_deref(), *limit).await?;
            if runs.is_empty() {
                println!("no runs found");
            }
            for run in runs {
                println!(
                    "{}  {:<20} {:<10} {:>3} questions  {}",
                    run.id,
                    run.company_id,
                    run.status.as_str(),
                    run.question_count,
                    run.created_at.format("%Y-%m-%d %H:%M")
                );
            }
        }
        RunsCommands::Show { id, json } => {
            let run = repo
                .get_run(*id)
                .await?
                .with_context(|| format!("run {id} not found"))?;
            let score = repo.get_score(*id).await?;

            if *json {
                let payload = serde_json::json!({ "run": run, "score": score });
                println!("{}", serde_json::to_string_pretty(&payload)?);
                return Ok(());
            }

            println!("run {} ({})", run.id, run.company_id);
            println!("  status:   {}", run.status);
            println!("  created:  {}", run.created_at.to_rfc3339());
            if let Some(message) = &run.error_message {
                println!("  error:    {message}");
            }
            match score {
                Some(score) => {
                    println!(
                        "  score:    {:.1}/100, grade {}",
                        score.display_score(),
                        score.grade
                    );
                    println!("  {}", score.summary);
                }
                None => println!("  score:    -"),
            }
        }
    }
    Ok(())
}

pub(crate) async fn run_db(config: &AppConfig, command: &DbCommands) -> anyhow::Result<()> {
    let pool = aivis_db::connect_pool_from_config(config)
        .await
        .context("failed to connect to database")?;
    match command {
        DbCommands::Ping => {
            aivis_db::ping(&pool).await?;
            println!("database reachable");
        }
        DbCommands::Migrate => {
            let applied = aivis_db::run_migrations(&pool).await?;
            tracing::info!(applied, "migrations complete");
            println!("applied {applied} migration(s)");
        }
    }
    Ok(())
}
