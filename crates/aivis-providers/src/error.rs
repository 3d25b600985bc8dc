use thiserror::Error;

/// Errors constructing a provider client. Request-time failures are reported
/// as `aivis_pipeline::ProviderError`.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("{0} is not configured")]
    NotConfigured(&'static str),
}
