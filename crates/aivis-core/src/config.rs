use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if values are present but invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files. Useful for testing
/// or when the caller manages env setup.
///
/// # Errors
///
/// Returns `ConfigError` if values are present but invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// This is the core parsing/validation logic, decoupled from the actual environment
/// so it can be tested with a pure `HashMap` lookup, without `set_var`/`remove_var`.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::path::PathBuf;

    let optional = |var: &str| -> Option<String> {
        lookup(var).ok().filter(|v| !v.trim().is_empty())
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_positive_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        let value = or_default(var, default)
            .parse::<usize>()
            .map_err(|e| invalid(var, e.to_string()))?;
        if value == 0 {
            return Err(invalid(var, "must be at least 1".to_string()));
        }
        Ok(value)
    };

    let env = parse_environment(&or_default("AIVIS_ENV", "development"))?;
    let log_level = or_default("AIVIS_LOG_LEVEL", "info");
    let companies_path = PathBuf::from(or_default(
        "AIVIS_COMPANIES_PATH",
        "./config/companies.yaml",
    ));

    let request_timeout_secs = parse_u64("AIVIS_REQUEST_TIMEOUT_SECS", "60")?;
    if request_timeout_secs == 0 {
        return Err(invalid(
            "AIVIS_REQUEST_TIMEOUT_SECS",
            "must be at least 1".to_string(),
        ));
    }

    Ok(AppConfig {
        database_url: optional("DATABASE_URL"),
        env,
        log_level,
        companies_path,
        answer_url: optional("AIVIS_ANSWER_URL"),
        answer_api_key: optional("AIVIS_ANSWER_API_KEY"),
        judge_url: optional("AIVIS_JUDGE_URL"),
        judge_api_key: optional("AIVIS_JUDGE_API_KEY"),
        question_url: optional("AIVIS_QUESTION_URL"),
        question_api_key: optional("AIVIS_QUESTION_API_KEY"),
        request_timeout_secs,
        user_agent: or_default("AIVIS_USER_AGENT", "aivis/0.1 (visibility-scoring)"),
        max_concurrent_requests: parse_positive_usize("AIVIS_MAX_CONCURRENT_REQUESTS", "5")?,
        max_retries: parse_u32("AIVIS_MAX_RETRIES", "2")?,
        retry_backoff_base_ms: parse_u64("AIVIS_RETRY_BACKOFF_BASE_MS", "1000")?,
        default_question_count: parse_positive_usize("AIVIS_DEFAULT_QUESTION_COUNT", "20")?,
        cancel_grace_secs: parse_u64("AIVIS_CANCEL_GRACE_SECS", "10")?,
        db_max_connections: parse_u32("AIVIS_DB_MAX_CONNECTIONS", "10")?,
        db_min_connections: parse_u32("AIVIS_DB_MIN_CONNECTIONS", "1")?,
        db_acquire_timeout_secs: parse_u64("AIVIS_DB_ACQUIRE_TIMEOUT_SECS", "10")?,
    })
}

/// Parse a string into an `Environment` variant.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "AIVIS_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
