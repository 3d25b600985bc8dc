//! Reference HTTP adapters for the pipeline's external services.
//!
//! Each client speaks a small JSON-over-POST contract with an optional bearer
//! key. Failures map onto `aivis_pipeline::ProviderError`: 429 is rate
//! limited (honouring `Retry-After`), 5xx is unavailable, other non-2xx is
//! rejected, and bodies that do not decode are malformed.

pub mod answer;
pub mod error;
pub mod http;
pub mod judge;
pub mod questions;

pub use answer::AnswerClient;
pub use error::ClientError;
pub use http::ClientSettings;
pub use judge::JudgeClient;
pub use questions::QuestionClient;
