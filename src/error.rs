use std::collections::BTreeMap;

use serde_json::Value;
use thiserror::Error;

const NETWORK_MESSAGE: &str =
    "Could not connect to the server. Check your internet connection.";

/// Outcome of a backend call that did not produce a usable JSON body.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ApiError {
    #[error("not found: {}", .message.as_deref().unwrap_or("-"))]
    NotFound { message: Option<String> },

    #[error("validation failed: {}", .message.as_deref().unwrap_or("-"))]
    Validation {
        field: Option<String>,
        message: Option<String>,
    },

    #[error("unauthorized (HTTP {status})")]
    Unauthorized { status: u16 },

    #[error("conflict: {}", .message.as_deref().unwrap_or("-"))]
    Conflict { message: Option<String> },

    #[error("server error (HTTP {status}): {}", .message.as_deref().unwrap_or("-"))]
    ServerError { status: u16, message: Option<String> },

    #[error("request rejected (HTTP {status}): {}", .message.as_deref().unwrap_or("-"))]
    Rejected { status: u16, message: Option<String> },

    #[error("network error: {message}")]
    Network { message: String },

    #[error("request timed out")]
    Timeout,

    #[error("malformed response: {reason}")]
    MalformedResponse { reason: String },

    #[error("precondition failed: {message}")]
    PreconditionFailed { message: String },
}

impl ApiError {
    /// Classify a non-2xx response. `body` is the raw response text; the
    /// backend puts its message under `error` (sometimes `message`).
    pub fn from_status(status: u16, body: &str) -> Self {
        let parsed: Option<Value> = serde_json::from_str(body).ok();
        let field_str = |key: &str| {
            parsed
                .as_ref()
                .and_then(|v| v.get(key))
                .and_then(Value::as_str)
                .map(str::to_string)
        };
        let message = field_str("error").or_else(|| field_str("message"));

        match status {
            404 => ApiError::NotFound { message },
            400 | 422 => ApiError::Validation {
                field: field_str("field"),
                message,
            },
            401 | 403 => ApiError::Unauthorized { status },
            409 => ApiError::Conflict { message },
            500..=599 => ApiError::ServerError { status, message },
            _ => ApiError::Rejected { status, message },
        }
    }

    pub fn malformed(reason: impl Into<String>) -> Self {
        ApiError::MalformedResponse {
            reason: reason.into(),
        }
    }

    pub fn precondition(message: impl Into<String>) -> Self {
        ApiError::PreconditionFailed {
            message: message.into(),
        }
    }

    pub fn is_network(&self) -> bool {
        matches!(self, ApiError::Network { .. } | ApiError::Timeout)
    }

    /// Single user-facing sentence for a banner. Prefers the server's own
    /// message and falls back to a generic one per kind.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::NotFound { message } => message
                .clone()
                .unwrap_or_else(|| "The requested resource was not found.".into()),
            ApiError::Validation { message, .. } => message
                .clone()
                .unwrap_or_else(|| "The submitted data is not valid.".into()),
            ApiError::Unauthorized { status: 403 } => {
                "You do not have permission to access this resource.".into()
            }
            ApiError::Unauthorized { .. } => {
                "You are not authorized to perform this action.".into()
            }
            ApiError::Conflict { message } => message
                .clone()
                .unwrap_or_else(|| "A record with this data already exists.".into()),
            ApiError::ServerError { status: 500, .. } => {
                "Internal server error. Try again later.".into()
            }
            ApiError::ServerError { status: 503, .. } => {
                "The service is temporarily unavailable.".into()
            }
            ApiError::ServerError { status, message } | ApiError::Rejected { status, message } => {
                message
                    .clone()
                    .unwrap_or_else(|| format!("Server error ({status})."))
            }
            ApiError::Network { .. } | ApiError::Timeout => NETWORK_MESSAGE.into(),
            ApiError::MalformedResponse { .. } => {
                "The server returned an unexpected response.".into()
            }
            ApiError::PreconditionFailed { message } => message.clone(),
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Timeout
        } else if err.is_decode() {
            ApiError::malformed(err.to_string())
        } else {
            ApiError::Network {
                message: err.to_string(),
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FormError {
    /// Client-side validation failed; nothing was sent.
    #[error("{} field(s) failed validation", .0.len())]
    Invalid(BTreeMap<String, String>),

    /// A submit from this form is still outstanding.
    #[error("a submission is already in progress")]
    InFlight,

    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Aggregate of a bulk operation where some requests failed. The succeeded
/// subset is not rolled back.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{} failed ({} of {} requests succeeded)", .failures.len(), .succeeded, .succeeded + .failures.len())]
pub struct BulkError {
    pub succeeded: usize,
    pub failures: Vec<(i64, ApiError)>,
}

impl BulkError {
    pub fn total(&self) -> usize {
        self.succeeded + self.failures.len()
    }

    pub fn failed(&self) -> usize {
        self.failures.len()
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("could not prepare data directory: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not encode persisted value: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown filter '{0}'")]
pub struct UnknownFilter(pub String);
