use std::fmt;

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// Human-readable part of a failed response, as sent by the server.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ErrorBody {
    pub message: String,
    pub code: Option<String>,
    pub details: Option<Value>,
}

impl fmt::Display for ErrorBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Shapes the server is known to use for error payloads.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ErrorPayload {
    Nested {
        error: NestedError,
    },
    Flat {
        #[serde(alias = "error")]
        message: String,
        #[serde(default)]
        code: Option<String>,
        #[serde(default)]
        details: Option<Value>,
    },
}

#[derive(Debug, Deserialize)]
struct NestedError {
    message: String,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    details: Option<Value>,
}

impl ErrorBody {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
        }
    }

    /// Parse a response body, falling back to the (truncated) raw text.
    pub fn parse(body: &str) -> Self {
        match serde_json::from_str::<ErrorPayload>(body) {
            Ok(ErrorPayload::Nested { error }) => Self {
                message: error.message,
                code: error.code,
                details: error.details,
            },
            Ok(ErrorPayload::Flat { message, code, details }) => Self {
                message,
                code,
                details,
            },
            Err(_) => Self {
                message: Self::truncate_body(body.trim()),
                code: None,
                details: None,
            },
        }
    }
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Unauthorized - please log in again")]
    Unauthorized(ErrorBody),

    #[error("Access denied: {0}")]
    AccessDenied(ErrorBody),

    #[error("Resource not found: {0}")]
    NotFound(ErrorBody),

    #[error("Rate limited - please wait before retrying")]
    RateLimited,

    #[error("Request rejected ({status}): {body}")]
    Rejected { status: u16, body: ErrorBody },

    #[error("Server error ({status}): {body}")]
    ServerError { status: u16, body: ErrorBody },

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("{0}")]
    Local(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let parsed = ErrorBody::parse(body);
        match status.as_u16() {
            401 => ApiError::Unauthorized(parsed),
            403 => ApiError::AccessDenied(parsed),
            404 => ApiError::NotFound(parsed),
            429 => ApiError::RateLimited,
            code @ 500..=599 => ApiError::ServerError { status: code, body: parsed },
            code => ApiError::Rejected { status: code, body: parsed },
        }
    }

    /// Error for a local mutator that refused to produce a new value.
    pub fn local(message: impl Into<String>) -> Self {
        ApiError::Local(message.into())
    }

    /// HTTP status that produced this error, if it came from a response.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Unauthorized(_) => Some(401),
            ApiError::AccessDenied(_) => Some(403),
            ApiError::NotFound(_) => Some(404),
            ApiError::RateLimited => Some(429),
            ApiError::Rejected { status, .. } | ApiError::ServerError { status, .. } => Some(*status),
            ApiError::NetworkError(e) => e.status().map(|s| s.as_u16()),
            ApiError::InvalidResponse(_) | ApiError::Local(_) => None,
        }
    }

    /// Machine-readable code. A code sent by the server wins over the default.
    pub fn code(&self) -> &str {
        let (body, default) = match self {
            ApiError::Unauthorized(body) => (Some(body), "UNAUTHORIZED"),
            ApiError::AccessDenied(body) => (Some(body), "FORBIDDEN"),
            ApiError::NotFound(body) => (Some(body), "NOT_FOUND"),
            ApiError::RateLimited => (None, "RATE_LIMITED"),
            ApiError::Rejected { body, .. } => (Some(body), "REQUEST_REJECTED"),
            ApiError::ServerError { body, .. } => (Some(body), "SERVER_ERROR"),
            ApiError::NetworkError(_) => (None, "NETWORK_ERROR"),
            ApiError::InvalidResponse(_) => (None, "INVALID_RESPONSE"),
            ApiError::Local(_) => (None, "LOCAL_MUTATION_FAILED"),
        };
        body.and_then(|b| b.code.as_deref()).unwrap_or(default)
    }

    /// Message suitable for a toast or status line.
    pub fn message(&self) -> String {
        match self {
            ApiError::Unauthorized(body)
            | ApiError::AccessDenied(body)
            | ApiError::NotFound(body)
            | ApiError::Rejected { body, .. }
            | ApiError::ServerError { body, .. }
                if !body.message.is_empty() =>
            {
                body.message.clone()
            }
            other => other.to_string(),
        }
    }

    pub fn details(&self) -> Option<&Value> {
        match self {
            ApiError::Unauthorized(body)
            | ApiError::AccessDenied(body)
            | ApiError::NotFound(body)
            | ApiError::Rejected { body, .. }
            | ApiError::ServerError { body, .. } => body.details.as_ref(),
            _ => None,
        }
    }

    pub fn is_client_error(&self) -> bool {
        matches!(self.status(), Some(400..=499))
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized(_))
    }

    /// Whether `retry_request` may try again. 4xx responses are final.
    pub fn is_retryable(&self) -> bool {
        !self.is_client_error() && !matches!(self, ApiError::Local(_))
    }
}
