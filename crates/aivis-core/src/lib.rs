//! Shared configuration and domain model for the AI visibility scoring workspace.

pub mod analysis;
pub mod app_config;
pub mod companies;
pub mod competitor;
pub mod config;
pub mod context;
pub mod labels;
pub mod question;
pub mod response;
pub mod run;
pub mod score;

use thiserror::Error;

pub use analysis::{
    CitationBucket, CitationClassification, MentionAnalysis, MentionPosition, Sentiment,
};
pub use app_config::{AppConfig, Environment};
pub use companies::{
    domain_matches, load_companies, normalize_domain, CompaniesFile, CompanyConfig,
    CompetitorConfig,
};
pub use competitor::{competitor_key, CompetitorRecord};
pub use config::{load_app_config, load_app_config_from_env};
pub use context::{CompanyContext, KnownCompetitor};
pub use labels::normalize_label;
pub use question::{Question, QuestionType};
pub use response::{Citation, Response};
pub use run::{RunRecord, RunStatus};
pub use score::{Grade, NicheSize, ScoreComponent, ScoreResult};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read companies file {path}: {source}")]
    CompaniesFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse companies file: {0}")]
    CompaniesFileParse(#[from] serde_yaml::Error),

    #[error("invalid companies file: {0}")]
    Validation(String),
}

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("unknown {kind}: '{value}'")]
    UnknownLabel { kind: &'static str, value: String },
}
