use crate::models::{ErrorResponse, Rate};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid client configuration: {0}")]
    Configuration(String),

    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("request cancelled")]
    Cancelled,

    #[error("{0}")]
    Deferred(AcceptedResponse),

    #[error("two-factor authentication required: {0}")]
    TwoFactorRequired(ErrorResponse),

    #[error("{0}")]
    RateLimited(RateLimitError),

    #[error("{0}")]
    SecondaryRateLimited(SecondaryRateLimitError),

    #[error("api error: {0}")]
    Api(ErrorResponse),

    #[error("encode error: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// The service accepted the request and scheduled it asynchronously.
///
/// Two values are equal when their raw bodies are byte-equal.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AcceptedResponse {
    pub raw: Vec<u8>,
}

impl std::fmt::Display for AcceptedResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("job scheduled on the search service; try again later")
    }
}

#[derive(Debug, Clone)]
pub struct RateLimitError {
    pub rate: Rate,
    pub message: String,
    pub response: ErrorResponse,
}

impl std::fmt::Display for RateLimitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "primary rate limit exceeded: {}", self.message)?;
        if let Some(reset) = self.rate.reset {
            write!(f, " (resets at {})", reset.to_rfc3339())?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct SecondaryRateLimitError {
    pub message: String,
    pub retry_after: Option<Duration>,
    pub response: ErrorResponse,
}

impl std::fmt::Display for SecondaryRateLimitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "secondary rate limit exceeded: {}", self.message)?;
        if let Some(retry_after) = self.retry_after {
            write!(f, " (retry after {}s)", retry_after.as_secs())?;
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum HarvestError {
    #[error(transparent)]
    Client(#[from] ClientError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to decode batch file {}: {source}", path.display())]
    BatchDecode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode result page: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("requested page {requested} but the service returned page {returned}")]
    PageMismatch { requested: u32, returned: u32 },

    #[error("unknown search template: {0}")]
    UnknownTemplate(String),

    #[error("batch reader task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

pub type Result<T, E = HarvestError> = std::result::Result<T, E>;
