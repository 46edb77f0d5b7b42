use crate::auth::{Credentials, RequestOption};
use crate::classify::check_response;
use crate::config::ClientConfig;
use crate::error::ClientError;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE, USER_AGENT};
use reqwest::{Client, Method, Request, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use url::Url;

/// Rate-limit bookkeeping shared by every request made through one client.
#[derive(Debug, Default)]
pub struct RateLimitState {
    secondary_reset: Mutex<Option<DateTime<Utc>>>,
}

impl RateLimitState {
    /// When the most recently observed secondary rate limit clears.
    pub fn secondary_rate_limit_reset(&self) -> Option<DateTime<Utc>> {
        *self
            .secondary_reset
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn record_secondary_rate_limit(
        &self,
        retry_after: Duration,
    ) -> Option<DateTime<Utc>> {
        let reset = chrono::Duration::from_std(retry_after)
            .ok()
            .and_then(|delta| Utc::now().checked_add_signed(delta))?;
        *self
            .secondary_reset
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(reset);
        Some(reset)
    }
}

/// Status, headers and fully buffered body of a successful exchange.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct SearchClient {
    http: Client,
    base_url: Url,
    user_agent: Option<String>,
    credentials: Credentials,
    rate_limits: Arc<RateLimitState>,
}

impl SearchClient {
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        Self::with_http_client(Client::new(), config)
    }

    pub fn with_http_client(http: Client, config: ClientConfig) -> Result<Self, ClientError> {
        Ok(Self {
            http,
            base_url: Url::parse(&config.base_url)?,
            user_agent: config.user_agent,
            credentials: config.credentials,
            rate_limits: Arc::new(RateLimitState::default()),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn rate_limits(&self) -> &RateLimitState {
        &self.rate_limits
    }

    /// Resolves `path` against the base URL and attaches credentials, then
    /// any extra `options` in order. A supplied body is sent as JSON.
    pub fn new_request<B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        options: &[&dyn RequestOption],
    ) -> Result<Request, ClientError>
    where
        B: Serialize + ?Sized,
    {
        if !self.base_url.path().ends_with('/') {
            return Err(ClientError::Configuration(format!(
                "base url must have a trailing slash, but {:?} does not",
                self.base_url.as_str()
            )));
        }

        let url = self.base_url.join(path)?;
        let mut request = Request::new(method, url);

        if let Some(body) = body {
            // serde_json leaves `<` and `>` unescaped, which search syntax relies on.
            let encoded = serde_json::to_vec(body).map_err(ClientError::Encode)?;
            request
                .headers_mut()
                .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
            *request.body_mut() = Some(encoded.into());
        }

        if let Some(agent) = &self.user_agent {
            let value = HeaderValue::from_str(agent).map_err(|error| {
                ClientError::Configuration(format!("invalid user agent: {error}"))
            })?;
            request.headers_mut().insert(USER_AGENT, value);
        }

        self.credentials.apply(&mut request)?;
        for option in options {
            option.apply(&mut request)?;
        }

        Ok(request)
    }

    /// Sends `request` and classifies the reply. Any outcome other than a
    /// 2xx (202 excluded) comes back as an error.
    pub async fn bare_execute(
        &self,
        cancel: &CancellationToken,
        request: Request,
    ) -> Result<RawResponse, ClientError> {
        debug!(method = %request.method(), url = %sanitize_url(request.url()), "sending request");

        let exchange = async {
            let response = self.http.execute(request).await?;
            let status = response.status();
            let headers = response.headers().clone();
            let body = response.bytes().await?;
            Ok::<_, reqwest::Error>((status, headers, body.to_vec()))
        };

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ClientError::Cancelled),
            outcome = exchange => outcome,
        };

        let (status, headers, body) = match outcome {
            Ok(parts) => parts,
            Err(_) if cancel.is_cancelled() => return Err(ClientError::Cancelled),
            Err(error) => return Err(ClientError::Http(redact_error(error))),
        };

        if let Err(error) = check_response(status, &headers, &body) {
            if let ClientError::SecondaryRateLimited(limit) = &error {
                if let Some(retry_after) = limit.retry_after {
                    let reset = self.rate_limits.record_secondary_rate_limit(retry_after);
                    warn!(
                        retry_after_secs = retry_after.as_secs(),
                        reset = ?reset.map(|at| at.to_rfc3339()),
                        "secondary rate limit hit"
                    );
                }
            }
            return Err(error);
        }

        Ok(RawResponse {
            status,
            headers,
            body,
        })
    }

    /// Decodes the body as JSON. An empty body yields `T::default()`.
    pub async fn execute<T>(
        &self,
        cancel: &CancellationToken,
        request: Request,
    ) -> Result<T, ClientError>
    where
        T: DeserializeOwned + Default,
    {
        let response = self.bare_execute(cancel, request).await?;
        if response.body.iter().all(u8::is_ascii_whitespace) {
            return Ok(T::default());
        }
        Ok(serde_json::from_slice(&response.body)?)
    }

    /// Copies the body verbatim into `sink` and returns the byte count.
    pub async fn execute_into<W>(
        &self,
        cancel: &CancellationToken,
        request: Request,
        sink: &mut W,
    ) -> Result<u64, ClientError>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        let response = self.bare_execute(cancel, request).await?;
        sink.write_all(&response.body).await?;
        sink.flush().await?;
        Ok(response.body.len() as u64)
    }
}

pub(crate) fn sanitize_url(url: &Url) -> Url {
    if !url.query_pairs().any(|(key, _)| key == "client_secret") {
        return url.clone();
    }

    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(key, value)| {
            let value = if key == "client_secret" {
                "REDACTED".to_string()
            } else {
                value.into_owned()
            };
            (key.into_owned(), value)
        })
        .collect();

    let mut sanitized = url.clone();
    sanitized.query_pairs_mut().clear().extend_pairs(pairs);
    sanitized
}

fn redact_error(error: reqwest::Error) -> reqwest::Error {
    let sanitized = error.url().map(sanitize_url);
    match sanitized {
        Some(url) => error.with_url(url),
        None => error,
    }
}
