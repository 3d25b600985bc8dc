use aivis_core::AppConfig;
use aivis_pipeline::{JudgmentService, ProviderError, RawJudgment, TargetDescriptor};
use async_trait::async_trait;
use serde::Serialize;

use crate::error::ClientError;
use crate::http::{ClientSettings, JsonClient};

#[derive(Serialize)]
struct AnalyzeRequest<'a> {
    response_text: &'a str,
    target: &'a TargetDescriptor,
}

/// HTTP client for the judgment model (`POST {base}/analyze`).
///
/// The reply is decoded leniently into [`RawJudgment`]; only a body that is
/// not a JSON object is treated as malformed.
pub struct JudgeClient {
    http: JsonClient,
}

impl JudgeClient {
    /// Build from `AIVIS_JUDGE_URL` / `AIVIS_JUDGE_API_KEY`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NotConfigured`] when no judge URL is set.
    pub fn from_app_config(config: &AppConfig) -> Result<Self, ClientError> {
        let url = config
            .judge_url
            .as_deref()
            .ok_or(ClientError::NotConfigured("AIVIS_JUDGE_URL"))?;
        Self::with_base_url(
            url,
            config.judge_api_key.as_deref(),
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
impl JudgmentService for JudgeClient {
    async fn analyze(
        &self,
        response_text: &str,
        target: &TargetDescriptor,
    ) -> Result<RawJudgment, ProviderError> {
        self.http
            .post(
                "analyze",
                &AnalyzeRequest {
                    response_text,
                    target,
                },
            )
            .await
    }
}
