use crate::error::{AcceptedResponse, ClientError, RateLimitError, SecondaryRateLimitError};
use crate::models::{ErrorBody, ErrorResponse, Rate};
use chrono::DateTime;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::StatusCode;
use std::time::Duration;

pub const HEADER_RATE_LIMIT: &str = "X-RateLimit-Limit";
pub const HEADER_RATE_REMAINING: &str = "X-RateLimit-Remaining";
pub const HEADER_RATE_RESET: &str = "X-RateLimit-Reset";
pub const HEADER_OTP: &str = "X-GitHub-OTP";

const SECONDARY_LIMIT_SUFFIXES: [&str; 2] = ["#abuse-rate-limits", "#secondary-rate-limits"];

/// Maps a response to `Ok(())` for 2xx (except 202) or to the typed error it
/// represents. Rules are checked in order and the first match wins.
pub fn check_response(
    status: StatusCode,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<(), ClientError> {
    if status == StatusCode::ACCEPTED {
        return Err(ClientError::Deferred(AcceptedResponse { raw: body.to_vec() }));
    }
    if status.is_success() {
        return Ok(());
    }

    let parsed: ErrorBody = serde_json::from_slice(body).unwrap_or_default();
    let response = ErrorResponse {
        status: status.as_u16(),
        message: parsed.message,
        documentation_url: Some(parsed.documentation_url).filter(|url| !url.is_empty()),
        body: body.to_vec(),
    };

    if status == StatusCode::UNAUTHORIZED
        && header_str(headers, HEADER_OTP).is_some_and(|otp| otp.starts_with("required"))
    {
        return Err(ClientError::TwoFactorRequired(response));
    }

    if status == StatusCode::FORBIDDEN && header_str(headers, HEADER_RATE_REMAINING) == Some("0") {
        return Err(ClientError::RateLimited(RateLimitError {
            rate: parse_rate(headers),
            message: response.message.clone(),
            response,
        }));
    }

    if status == StatusCode::FORBIDDEN && is_secondary_limit(response.documentation_url.as_deref())
    {
        return Err(ClientError::SecondaryRateLimited(SecondaryRateLimitError {
            message: response.message.clone(),
            retry_after: parse_retry_after(headers),
            response,
        }));
    }

    Err(ClientError::Api(response))
}

pub fn parse_rate(headers: &HeaderMap) -> Rate {
    let number = |name: &str| {
        header_str(headers, name).and_then(|raw| raw.trim().parse::<u64>().ok())
    };
    Rate {
        limit: number(HEADER_RATE_LIMIT),
        remaining: number(HEADER_RATE_REMAINING),
        reset: header_str(headers, HEADER_RATE_RESET)
            .and_then(|raw| raw.trim().parse::<i64>().ok())
            .and_then(|secs| DateTime::from_timestamp(secs, 0)),
    }
}

/// `Retry-After` as integer seconds. Anything else is treated as absent.
pub fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    header_str(headers, RETRY_AFTER.as_str())
        .and_then(|raw| raw.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

fn is_secondary_limit(documentation_url: Option<&str>) -> bool {
    documentation_url.is_some_and(|url| {
        SECONDARY_LIMIT_SUFFIXES
            .iter()
            .any(|suffix| url.ends_with(suffix))
    })
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}
