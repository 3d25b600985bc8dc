//! Offline tests for aivis-db pool configuration and row types.
//! These tests do not require a live database connection.

use std::path::PathBuf;

use aivis_core::{AppConfig, Environment, RunRecord, RunStatus};
use aivis_db::{PoolConfig, RunRow};

fn app_config() -> AppConfig {
    AppConfig {
        database_url: Some("postgres://example".to_string()),
        env: Environment::Test,
        log_level: "info".to_string(),
        companies_path: PathBuf::from("./config/companies.yaml"),
        answer_url: None,
        answer_api_key: None,
        judge_url: None,
        judge_api_key: None,
        question_url: None,
        question_api_key: None,
        request_timeout_secs: 60,
        user_agent: "ua".to_string(),
        max_concurrent_requests: 5,
        max_retries: 2,
        retry_backoff_base_ms: 1000,
        default_question_count: 20,
        cancel_grace_secs: 10,
        db_max_connections: 42,
        db_min_connections: 7,
        db_acquire_timeout_secs: 9,
    }
}

#[test]
fn pool_config_from_app_config_uses_core_values() {
    let pool_config = PoolConfig::from_app_config(&app_config());
    assert_eq!(pool_config.max_connections, 42);
    assert_eq!(pool_config.min_connections, 7);
    assert_eq!(pool_config.acquire_timeout_secs, 9);
}

#[test]
fn failed_run_row_keeps_its_message() {
    use chrono::Utc;
    use uuid::Uuid;

    let row = RunRow {
        id: Uuid::new_v4(),
        company_id: "acme-analytics".to_string(),
        question_count: 15,
        status: "failed".to_string(),
        error_message: Some("response collection failed".to_string()),
        created_at: Utc::now(),
        started_at: Some(Utc::now()),
        completed_at: Some(Utc::now()),
    };

    let record = RunRecord::try_from(row).expect("valid row");
    assert_eq!(record.status, RunStatus::Failed);
    assert_eq!(
        record.error_message.as_deref(),
        Some("response collection failed")
    );
}
