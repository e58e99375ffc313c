//! Shared error taxonomy for provider calls.

use std::fmt;

use thiserror::Error;

pub type ProviderResult<T> = Result<T, ProviderError>;

/// Normalized failure category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderErrorKind {
    /// Request rejected as malformed or referencing unknown resources
    BadRequest,
    /// Credentials missing or rejected
    Unauthorized,
    RateLimited,
    /// Provider-side failure (5xx)
    Unavailable,
    Timeout,
    /// Response could not be understood
    InvalidResponse,
    /// Connection-level failure
    Network,
}

impl fmt::Display for ProviderErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProviderErrorKind::BadRequest => "bad request",
            ProviderErrorKind::Unauthorized => "unauthorized",
            ProviderErrorKind::RateLimited => "rate limited",
            ProviderErrorKind::Unavailable => "unavailable",
            ProviderErrorKind::Timeout => "timeout",
            ProviderErrorKind::InvalidResponse => "invalid response",
            ProviderErrorKind::Network => "network error",
        };
        write!(f, "{}", s)
    }
}

/// Error from an external provider call.
#[derive(Debug, Clone, Error)]
#[error("{provider} {kind}: {message}")]
pub struct ProviderError {
    pub provider: &'static str,
    pub kind: ProviderErrorKind,
    pub message: String,
}

/// Longest provider error text kept in messages.
const MAX_MESSAGE_LEN: usize = 500;

impl ProviderError {
    pub fn new(provider: &'static str, kind: ProviderErrorKind, message: impl Into<String>) -> Self {
        let mut message: String = message.into();
        if message.len() > MAX_MESSAGE_LEN {
            let mut cut = MAX_MESSAGE_LEN;
            while !message.is_char_boundary(cut) {
                cut -= 1;
            }
            message.truncate(cut);
        }
        Self {
            provider,
            kind,
            message,
        }
    }

    /// Map an HTTP status and body to the taxonomy.
    pub fn from_status(provider: &'static str, status: u16, body: &str) -> Self {
        let kind = match status {
            401 | 403 => ProviderErrorKind::Unauthorized,
            408 | 504 => ProviderErrorKind::Timeout,
            429 => ProviderErrorKind::RateLimited,
            500..=599 => ProviderErrorKind::Unavailable,
            _ => ProviderErrorKind::BadRequest,
        };
        let detail = extract_message(body).unwrap_or_else(|| body.trim().to_string());
        Self::new(provider, kind, format!("HTTP {}: {}", status, detail))
    }

    pub fn from_reqwest(provider: &'static str, err: reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            ProviderErrorKind::Timeout
        } else if err.is_decode() {
            ProviderErrorKind::InvalidResponse
        } else {
            ProviderErrorKind::Network
        };
        Self::new(provider, kind, err.to_string())
    }

    pub fn invalid_response(provider: &'static str, message: impl Into<String>) -> Self {
        Self::new(provider, ProviderErrorKind::InvalidResponse, message)
    }

    pub fn bad_request(provider: &'static str, message: impl Into<String>) -> Self {
        Self::new(provider, ProviderErrorKind::BadRequest, message)
    }

    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind,
            ProviderErrorKind::RateLimited
                | ProviderErrorKind::Unavailable
                | ProviderErrorKind::Timeout
                | ProviderErrorKind::Network
        )
    }

    /// Text safe to persist on a FAILED row.
    pub fn user_message(&self) -> String {
        format!("{} failed ({}): {}", self.provider, self.kind, self.message)
    }
}

/// Pull a human-readable message out of common JSON error bodies.
fn extract_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    let candidates = [
        value.pointer("/error/message"),
        value.pointer("/detail/message"),
        value.pointer("/message"),
        value.pointer("/error"),
        value.pointer("/detail"),
    ];
    let message = candidates
        .into_iter()
        .flatten()
        .find_map(|v| v.as_str().map(str::to_string));
    message
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (400, ProviderErrorKind::BadRequest, false),
            (401, ProviderErrorKind::Unauthorized, false),
            (404, ProviderErrorKind::BadRequest, false),
            (429, ProviderErrorKind::RateLimited, true),
            (500, ProviderErrorKind::Unavailable, true),
            (503, ProviderErrorKind::Unavailable, true),
            (504, ProviderErrorKind::Timeout, true),
        ];
        for (status, kind, retryable) in cases {
            let err = ProviderError::from_status("heygen", status, "");
            assert_eq!(err.kind, kind, "status {}", status);
            assert_eq!(err.is_retryable(), retryable, "status {}", status);
        }
    }

    #[test]
    fn test_json_error_message_is_extracted() {
        let err = ProviderError::from_status(
            "openai",
            400,
            r#"{"error":{"message":"model not found","type":"invalid_request_error"}}"#,
        );
        assert_eq!(err.message, "HTTP 400: model not found");
        assert_eq!(
            err.user_message(),
            "openai failed (bad request): HTTP 400: model not found"
        );
    }

    #[test]
    fn test_long_messages_are_truncated() {
        let err = ProviderError::new("x", ProviderErrorKind::Unavailable, "é".repeat(600));
        assert!(err.message.len() <= MAX_MESSAGE_LEN);
    }
}
