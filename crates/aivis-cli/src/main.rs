mod inspect;
mod run;

use aivis_core::QuestionType;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::inspect::{CompaniesCommands, DbCommands, RunsCommands};

#[derive(Debug, Parser)]
#[command(name = "aivis")]
#[command(about = "Score how visible a company is in AI assistant answers")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run a visibility scoring pass for one company
    Run {
        /// Company id (slug from companies.yaml)
        #[arg(long)]
        company: String,
        /// Number of probe questions (1-100); defaults to `AIVIS_DEFAULT_QUESTION_COUNT`
        #[arg(long)]
        questions: Option<usize>,
        /// Restrict to question types (repeatable), e.g. `--type comparison`
        #[arg(long = "type")]
        types: Vec<QuestionType>,
        /// Cancel the run after this many seconds, scoring what was collected
        #[arg(long)]
        timeout_secs: Option<u64>,
        /// Build the context and questions without contacting any provider
        #[arg(long)]
        dry_run: bool,
        /// Print the full run report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Inspect the company registry
    Companies {
        #[command(subcommand)]
        command: CompaniesCommands,
    },
    /// Inspect stored runs
    Runs {
        #[command(subcommand)]
        command: RunsCommands,
    },
    /// Database maintenance
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    dotenvy::dotenv().ok();
    let config = aivis_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Some(Commands::Run {
            company,
            questions,
            types,
            timeout_secs,
            dry_run,
            json,
        }) => {
            let request = run::RunRequest {
                company,
                question_count: questions.unwrap_or(config.default_question_count),
                types: (!types.is_empty()).then_some(types),
                timeout_secs,
                json,
            };
            if dry_run {
                run::run_dry(&config, &request).await?;
            } else {
                run::run_scoring(&config, request).await?;
            }
        }
        Some(Commands::Companies { command }) => inspect::run_companies(&config, &command)?,
        Some(Commands::Runs { command }) => inspect::run_runs(&config, &command).await?,
        Some(Commands::Db { command }) => inspect::run_db(&config, &command).await?,
        None => println!("aivis ready; see `aivis --help`"),
    }

    Ok(())
}

#[cfg(test)]
mod tests;
