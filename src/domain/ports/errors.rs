use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Semantic error codes the matching backend attaches to failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    RateLimited,
    ServiceUnavailable,
    InsufficientData,
    AuthenticationFailed,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RateLimited => "RATE_LIMITED",
            Self::ServiceUnavailable => "SERVICE_UNAVAILABLE",
            Self::InsufficientData => "INSUFFICIENT_DATA",
            Self::AuthenticationFailed => "AUTHENTICATION_FAILED",
        }
    }

    /// Parse a wire code, ignoring codes this client does not know.
    pub fn parse(code: &str) -> Option<Self> {
        match code {
            "RATE_LIMITED" => Some(Self::RateLimited),
            "SERVICE_UNAVAILABLE" => Some(Self::ServiceUnavailable),
            "INSUFFICIENT_DATA" => Some(Self::InsufficientData),
            "AUTHENTICATION_FAILED" => Some(Self::AuthenticationFailed),
            _ => None,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised by the matching backend, its record store, or the
/// transport between them and the client.
#[derive(Error, Debug)]
pub enum GatewayError {
    /// Backend answered with a non-success status
    #[error("Backend returned {code}: {message}")]
    Status {
        code: u16,
        error_code: Option<ErrorCode>,
        message: String,
    },

    /// Connection refused, DNS failure, reset, ...
    #[error("Network error: {0}")]
    Network(String),

    /// The call exceeded its deadline
    #[error("Request timeout")]
    Timeout,

    /// Response body could not be decoded
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The session has no user identifier
    #[error("No user identity available")]
    MissingIdentity,

    /// Anything without structure
    #[error("Unknown error: {0}")]
    Unknown(String),
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl GatewayError {
    /// Create error from HTTP status code and response body.
    ///
    /// Bodies shaped `{"error": {"code": "...", "message": "..."}}` contribute
    /// their semantic code and message; anything else is kept verbatim.
    pub fn from_status(code: u16, body: &str) -> Self {
        match serde_json::from_str::<ErrorEnvelope>(body) {
            Ok(envelope) => Self::Status {
                code,
                error_code: envelope.error.code.as_deref().and_then(ErrorCode::parse),
                message: envelope.error.message.unwrap_or_else(|| body.to_string()),
            },
            Err(_) => Self::Status {
                code,
                error_code: None,
                message: body.to_string(),
            },
        }
    }

    /// Status error carrying a semantic code.
    pub fn coded(code: u16, error_code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Status {
            code,
            error_code: Some(error_code),
            message: message.into(),
        }
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status { code, .. } => Some(*code),
            _ => None,
        }
    }

    pub fn error_code(&self) -> Option<ErrorCode> {
        match self {
            Self::Status { error_code, .. } => *error_code,
            Self::MissingIdentity => Some(ErrorCode::AuthenticationFailed),
            _ => None,
        }
    }

    /// Returns true if this error is transient and should be retried
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Status { code, .. } => *code >= 500 || *code == 429 || *code == 408,
            Self::Network(_) | Self::Timeout | Self::Unknown(_) => true,
            Self::Serialization(_) | Self::MissingIdentity => false,
        }
    }

    /// Returns true if this is a permanent error that should not be retried
    pub fn is_permanent(&self) -> bool {
        !self.is_transient()
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(err: serde_json::Error) -> Self {
        GatewayError::Serialization(err.to_string())
    }
}

pub type GatewayResult<T> = Result<T, GatewayError>;
