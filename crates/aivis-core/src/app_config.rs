use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    /// Postgres URL. When unset the CLI keeps runs in memory.
    pub database_url: Option<String>,
    pub env: Environment,
    pub log_level: String,
    pub companies_path: PathBuf,
    pub answer_url: Option<String>,
    pub answer_api_key: Option<String>,
    pub judge_url: Option<String>,
    pub judge_api_key: Option<String>,
    /// Question provider. When unset, questions come from built-in templates.
    pub question_url: Option<String>,
    pub question_api_key: Option<String>,
    pub request_timeout_secs: u64,
    pub user_agent: String,
    pub max_concurrent_requests: usize,
    pub max_retries: u32,
    pub retry_backoff_base_ms: u64,
    pub default_question_count: usize,
    pub cancel_grace_secs: u64,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("log_level", &self.log_level)
            .field("companies_path", &self.companies_path)
            .field(
                "database_url",
                &self.database_url.as_ref().map(|_| "[redacted]"),
            )
            .field("answer_url", &self.answer_url)
            .field(
                "answer_api_key",
                &self.answer_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field("judge_url", &self.judge_url)
            .field(
                "judge_api_key",
                &self.judge_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field("question_url", &self.question_url)
            .field(
                "question_api_key",
                &self.question_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("user_agent", &self.user_agent)
            .field("max_concurrent_requests", &self.max_concurrent_requests)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_base_ms", &self.retry_backoff_base_ms)
            .field("default_question_count", &self.default_question_count)
            .field("cancel_grace_secs", &self.cancel_grace_secs)
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .finish()
    }
}
