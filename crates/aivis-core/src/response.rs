use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A source cited by an AI answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    pub url: String,
    #[serde(default)]
    pub title: String,
}

/// One collected answer. Only successful dispatches produce a `Response`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub question_id: Uuid,
    pub text: String,
    pub citations: Vec<Citation>,
    pub success: bool,
    pub retrieved_at: DateTime<Utc>,
}
