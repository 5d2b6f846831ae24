use http::StatusCode;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("backend replied {status}: {message}")]
    Status {
        status: StatusCode,
        code: Option<String>,
        message: String,
    },
    #[error("request to backend failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("backend did not answer within {0:?}")]
    Timeout(Duration),
    #[error("unexpected backend reply: {0}")]
    Malformed(String),
    /// Failure from a source that only gives a description.
    #[error("{0}")]
    Opaque(String),
}

/// What a failed completion means to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    InvalidCredential,
    ModelUnavailable,
    RateLimited,
    Other,
}

impl BackendError {
    pub fn kind(&self) -> FailureKind {
        match self {
            BackendError::Status {
                status,
                code,
                message,
            } => classify_code(code.as_deref())
                .or_else(|| classify_status(*status))
                .unwrap_or_else(|| classify_description(message)),
            BackendError::Transport(e) => e
                .status()
                .and_then(classify_status)
                .unwrap_or(FailureKind::Other),
            BackendError::Timeout(_) | BackendError::Malformed(_) => FailureKind::Other,
            BackendError::Opaque(description) => classify_description(description),
        }
    }
}

fn classify_code(code: Option<&str>) -> Option<FailureKind> {
    match code? {
        "invalid_api_key" | "invalid_authentication" => Some(FailureKind::InvalidCredential),
        "model_not_found" => Some(FailureKind::ModelUnavailable),
        "rate_limit_exceeded" | "insufficient_quota" => Some(FailureKind::RateLimited),
        _ => None,
    }
}

fn classify_status(status: StatusCode) -> Option<FailureKind> {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Some(FailureKind::InvalidCredential),
        StatusCode::NOT_FOUND => Some(FailureKind::ModelUnavailable),
        StatusCode::TOO_MANY_REQUESTS => Some(FailureKind::RateLimited),
        _ => None,
    }
}

/// Last resort for errors that carry nothing but text.
pub fn classify_description(description: &str) -> FailureKind {
    let description = description.to_ascii_lowercase();

    if description.contains("api key") || description.contains("unauthorized") {
        FailureKind::InvalidCredential
    } else if description.contains("model") {
        FailureKind::ModelUnavailable
    } else if description.contains("rate limit") || description.contains("too many requests") {
        FailureKind::RateLimited
    } else {
        FailureKind::Other
    }
}
