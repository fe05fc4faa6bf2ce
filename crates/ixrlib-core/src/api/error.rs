use reqwest::{Method, StatusCode};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Authentication failed: {reason}")]
    Authentication {
        reason: String,
        #[source]
        source: Option<Box<ApiError>>,
    },

    #[error("Network error on {method} {path}: {source}")]
    Transport {
        method: Method,
        path: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{method} {path} still failing with {status} after {retries} retries: {body}")]
    RetryExhausted {
        method: Method,
        path: String,
        status: StatusCode,
        retries: u32,
        body: String,
    },

    #[error("{method} {path} failed with {status}: {body}")]
    Server {
        method: Method,
        path: String,
        status: StatusCode,
        body: String,
    },
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    pub(crate) fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            return body.to_string();
        }
        let mut end = MAX_ERROR_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
    }

    pub(crate) fn authentication(reason: impl Into<String>, source: ApiError) -> Self {
        ApiError::Authentication {
            reason: reason.into(),
            source: Some(Box::new(source)),
        }
    }

    /// HTTP status observed by the failing call, if the server answered at all.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Server { status, .. } | ApiError::RetryExhausted { status, .. } => {
                Some(*status)
            }
            ApiError::Transport { source, .. } => source.status(),
            ApiError::Authentication {
                source: Some(inner),
                ..
            } => inner.status(),
            _ => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, ApiError::Transport { source, .. } if source.is_timeout())
    }
}
