//! Remote API error taxonomy
//!
//! Every remote-call failure is folded into [`ApiError`] so the command
//! boundary can map it to a human-readable message plus a remedy.

use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// No key from flag, environment, or config.
    #[error("no API key configured")]
    MissingKey,

    #[error("invalid or missing API key")]
    Auth,

    #[error("rate limit exceeded")]
    RateLimited,

    #[error("bad request: {message}")]
    BadRequest { message: String },

    #[error("request timed out")]
    Timeout,

    #[error("unable to connect to the API")]
    Connect(#[source] reqwest::Error),

    #[error("API server error (status {status})")]
    Server { status: u16, message: String },

    #[error("API returned status {status}: {message}")]
    Status { status: u16, message: String },

    /// Response arrived but could not be understood.
    #[error("malformed API response: {0}")]
    Protocol(String),
}

impl ApiError {
    pub fn from_status(status: StatusCode, message: String) -> Self {
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Self::Auth,
            StatusCode::TOO_MANY_REQUESTS => Self::RateLimited,
            StatusCode::BAD_REQUEST => Self::BadRequest { message },
            s if s.is_server_error() => Self::Server {
                status: s.as_u16(),
                message,
            },
            s => Self::Status {
                status: s.as_u16(),
                message,
            },
        }
    }

    pub fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::Connect(err)
        }
    }
}

/// Pull a human-readable message out of an error response body.
///
/// The API wraps errors a few different ways; fall back to the raw body,
/// truncated, when none of the known shapes match.
pub fn extract_message(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        for path in [
            value.pointer("/error/message"),
            value.get("error"),
            value.get("message"),
            value.get("detail"),
        ]
        .into_iter()
        .flatten()
        {
            if let Some(text) = path.as_str() {
                return text.to_string();
            }
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        "no details provided".to_string()
    } else {
        trimmed.chars().take(300).collect()
    }
}
