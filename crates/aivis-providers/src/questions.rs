use aivis_core::{AppConfig, CompanyContext, QuestionType};
use aivis_pipeline::{GeneratedQuestion, ProviderError, QuestionSource};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ClientError;
use crate::http::{ClientSettings, JsonClient};

#[derive(Serialize)]
struct QuestionsRequest<'a> {
    company: &'a str,
    industry: &'a str,
    question_type: &'static str,
    count: usize,
    overview: &'a [String],
}

#[derive(Deserialize)]
struct QuestionsResponse {
    questions: Vec<WireQuestion>,
}

/// Providers may return bare strings or `{text, template}` objects.
#[derive(Deserialize)]
#[serde(untagged)]
enum WireQuestion {
    Text(String),
    Detailed {
        text: String,
        #[serde(default)]
        template: Option<String>,
    },
}

/// HTTP question provider (`POST {base}/questions`).
pub struct QuestionClient {
    http: JsonClient,
}

impl QuestionClient {
    /// Build from `AIVIS_QUESTION_URL` / `AIVIS_QUESTION_API_KEY`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NotConfigured`] when no question URL is set.
    pub fn from_app_config(config: &AppConfig) -> Result<Self, ClientError> {
        let url = config
            .question_url
            .as_deref()
            .ok_or(ClientError::NotConfigured("AIVIS_QUESTION_URL"))?;
        Self::with_base_url(
            url,
            config.question_api_key.as_deref(),
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
impl QuestionSource for QuestionClient {
    async fn generate(
        &self,
        context: &CompanyContext,
        question_type: QuestionType,
        count: usize,
    ) -> Result<Vec<GeneratedQuestion>, ProviderError> {
        let request = QuestionsRequest {
            company: &context.name,
            industry: &context.industry,
            question_type: question_type.as_str(),
            count,
            overview: &context.overview,
        };
        let reply: QuestionsResponse = self.http.post("questions", &request).await?;

        Ok(reply
            .questions
            .into_iter()
            .enumerate()
            .map(|(idx, q)| {
                let (text, template) = match q {
                    WireQuestion::Text(text) => (text, None),
                    WireQuestion::Detailed { text, template } => (text, template),
                };
                GeneratedQuestion {
                    text,
                    template: template
                        .filter(|t| !t.trim().is_empty())
                        .unwrap_or_else(|| format!("remote/{}/{idx}", question_type.as_str())),
                }
            })
            .collect())
    }
}
