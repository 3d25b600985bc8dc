use aivis_core::{AppConfig, Citation};
use aivis_pipeline::{Answer, ProviderError, QuestionAnsweringService};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ClientError;
use crate::http::{ClientSettings, JsonClient};

#[derive(Serialize)]
struct AskRequest<'a> {
    question: &'a str,
}

#[derive(Deserialize)]
struct AskResponse {
    #[serde(alias = "answer")]
    text: String,
    #[serde(default)]
    citations: Vec<Citation>,
}

/// HTTP client for the assistant being probed (`POST {base}/ask`).
pub struct AnswerClient {
    http: JsonClient,
}

impl AnswerClient {
    /// Build from `AIVIS_ANSWER_URL` / `AIVIS_ANSWER_API_KEY`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NotConfigured`] when no answer URL is set, or a
    /// construction error from [`AnswerClient::with_base_url`].
    pub fn from_app_config(config: &AppConfig) -> Result<Self, ClientError> {
        let url = config
            .answer_url
            .as_deref()
            .ok_or(ClientError::NotConfigured("AIVIS_ANSWER_URL"))?;
        Self::with_base_url(
            url,
            config.answer_api_key.as_deref(),
            &ClientSettings::from_app_config(config),
        )
    }

    /// # Errors
    ///
    /// Returns [`ClientError`] if the HTTP client cannot be built or
    /// `base_url` does not parse.
    pub fn with_base_url(
        base_url: &str,
        api_key: Option<&str>,
        settings: &ClientSettings,
    ) -> Result<Self, ClientError> {
        Ok(Self {
            http: JsonClient::new(base_url, api_key, settings)?,
        })
    }
}

#[async_trait]
impl QuestionAnsweringService for AnswerClient {
    async fn ask(&self, question: &str) -> Result<Answer, ProviderError> {
        let reply: AskResponse = self.http.post("ask", &AskRequest { question }).await?;
        Ok(Answer {
            text: reply.text,
            citations: reply.citations,
        })
    }
}
