//! Shared JSON-over-POST transport for the provider clients.
//!
//! Maps every failure onto [`ProviderError`] so the pipeline's retry policy
//! can tell transient failures from permanent ones.

use std::time::{Duration, Instant};

use aivis_core::AppConfig;
use aivis_pipeline::ProviderError;
use reqwest::header::RETRY_AFTER;
use reqwest::{Client, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::ClientError;

/// Longest response-body excerpt carried in a rejection message.
const MAX_ERROR_BODY_CHARS: usize = 200;

/// Transport settings shared by all provider clients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    pub timeout: Duration,
    pub user_agent: String,
}

impl ClientSettings {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            timeout: Duration::from_secs(config.request_timeout_secs),
            user_agent: config.user_agent.clone(),
        }
    }
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            user_agent: "aivis/0.1 (visibility-scoring)".to_string(),
        }
    }
}

pub(crate) struct JsonClient {
    client: Client,
    base_url: Url,
    api_key: Option<String>,
    timeout: Duration,
}

impl JsonClient {
    pub(crate) fn new(
        base_url: &str,
        api_key: Option<&str>,
        settings: &ClientSettings,
    ) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(settings.timeout)
            .connect_timeout(Duration::from_secs(10))
            .user_agent(settings.user_agent.as_str())
            .build()?;

        // Exactly one trailing slash, so `join` appends instead of replacing
        // the last path segment.
        let normalised = format!("{}/", base_url.trim().trim_end_matches('/'));
        let base_url = Url::parse(&normalised).map_err(|e| ClientError::InvalidBaseUrl {
            url: base_url.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            client,
            base_url,
            api_key: api_key
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .map(str::to_owned),
            timeout: settings.timeout,
        })
    }

    pub(crate) fn endpoint(&self, path: &str) -> Result<Url, ProviderError> {
        self.base_url
            .join(path)
            .map_err(|e| ProviderError::Transport {
                message: format!("cannot build URL for '{path}': {e}"),
                transient: false,
            })
    }

    /// POST `body` to `path` and decode the JSON reply.
    pub(crate) async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, ProviderError>
    where
        B: Serialize + Sync + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.endpoint(path)?;
        let started = Instant::now();

        let mut request = self.client.post(url.clone()).json(body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        let response = request
            .send()
            .await
            .map_err(|e| self.transport_error(&e))?;

        let status = response.status();
        tracing::debug!(
            url = %url,
            status = status.as_u16(),
            elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            "provider responded"
        );

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.trim().parse::<u64>().ok());
            return Err(ProviderError::RateLimited { retry_after_secs });
        }

        let text = response
            .text()
            .await
            .map_err(|e| self.transport_error(&e))?;

        if !status.is_success() {
            return Err(status_error(status, &text));
        }

        serde_json::from_str(&text)
            .map_err(|e| ProviderError::Malformed(format!("{url}: {e}")))
    }

    fn transport_error(&self, err: &reqwest::Error) -> ProviderError {
        if err.is_timeout() {
            return ProviderError::Timeout(self.timeout);
        }
        if err.is_decode() {
            return ProviderError::Malformed(err.to_string());
        }
        ProviderError::Transport {
            message: err.to_string(),
            transient: err.is_connect() || err.is_request() || err.is_body(),
        }
    }
}

/// Map a non-2xx, non-429 status onto a [`ProviderError`].
pub(crate) fn status_error(status: StatusCode, body: &str) -> ProviderError {
    if status.is_server_error() {
        return ProviderError::Unavailable {
            status: status.as_u16(),
        };
    }
    let excerpt: String = body.trim().chars().take(MAX_ERROR_BODY_CHARS).collect();
    let message = if excerpt.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("request rejected")
            .to_string()
    } else {
        excerpt
    };
    ProviderError::Rejected {
        status: status.as_u16(),
        message,
    }
}
