//! Failure classification shared by the aggregator, the fallback gateway
//! and the synchronizer.

use crate::domain::ports::{ErrorCode, GatewayError};

const DEFAULT_MESSAGE: &str = "Something went wrong. Please try again.";

/// Outcome of classifying a failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    /// Whether retrying may succeed
    pub retryable: bool,
    /// Sanitized message safe to show an end user
    pub user_message: &'static str,
    /// Semantic code, when the failure carried one
    pub error_code: Option<ErrorCode>,
}

/// Maps failures to retryability and a user-facing message.
///
/// Raw exception text never reaches `user_message`; it is always picked
/// from a static table.
pub struct ErrorClassifier;

impl ErrorClassifier {
    pub fn classify(error: &GatewayError) -> Classification {
        let error_code = error.error_code();
        Classification {
            retryable: error.is_transient(),
            user_message: Self::user_message(error_code),
            error_code,
        }
    }

    /// Classify an `anyhow` chain, looking through every cause.
    pub fn classify_anyhow(error: &anyhow::Error) -> Classification {
        error
            .chain()
            .find_map(|cause| cause.downcast_ref::<GatewayError>())
            .map_or(
                Classification {
                    retryable: true,
                    user_message: DEFAULT_MESSAGE,
                    error_code: None,
                },
                Self::classify,
            )
    }

    pub fn user_message(code: Option<ErrorCode>) -> &'static str {
        match code {
            Some(ErrorCode::RateLimited) => {
                "Too many requests. Please wait a moment and try again."
            }
            Some(ErrorCode::ServiceUnavailable) => {
                "The matching service is temporarily unavailable. Please try again later."
            }
            Some(ErrorCode::InsufficientData) => {
                "Not enough conversation data to find a match yet. Add more chats and try again."
            }
            Some(ErrorCode::AuthenticationFailed) => {
                "Your session has expired. Please sign in again."
            }
            None => DEFAULT_MESSAGE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_and_throttle_codes_are_retryable() {
        for code in [500, 502, 503, 504, 429, 408] {
            let c = ErrorClassifier::classify(&GatewayError::from_status(code, ""));
            assert!(c.retryable, "{code} should be retryable");
        }
    }

    #[test]
    fn test_other_client_codes_are_fatal() {
        for code in [400, 401, 403, 404, 409, 422] {
            let c = ErrorClassifier::classify(&GatewayError::from_status(code, ""));
            assert!(!c.retryable, "{code} should be fatal");
        }
    }

    #[test]
    fn test_transport_failures_are_retryable() {
        assert!(ErrorClassifier::classify(&GatewayError::Network("dns".into())).retryable);
        assert!(ErrorClassifier::classify(&GatewayError::Timeout).retryable);
    }

    #[test]
    fn test_unknown_errors_default_to_retryable() {
        let c = ErrorClassifier::classify_anyhow(&anyhow::anyhow!("opaque"));
        assert!(c.retryable);
        assert_eq!(c.user_message, DEFAULT_MESSAGE);
    }

    #[test]
    fn test_anyhow_chain_finds_gateway_error() {
        let err = anyhow::Error::new(GatewayError::from_status(401, ""))
            .context("fetching status");
        let c = ErrorClassifier::classify_anyhow(&err);
        assert!(!c.retryable);
    }

    #[test]
    fn test_messages_come_from_static_table() {
        let err = GatewayError::from_status(
            503,
            r#"{"error": {"code": "SERVICE_UNAVAILABLE", "message": "db pool exhausted at node-7"}}"#,
        );
        let c = ErrorClassifier::classify(&err);
        assert_eq!(c.error_code, Some(ErrorCode::ServiceUnavailable));
        assert!(!c.user_message.contains("node-7"));
        assert!(c.user_message.contains("temporarily unavailable"));
    }

    #[test]
    fn test_default_message_for_uncoded_errors() {
        let c = ErrorClassifier::classify(&GatewayError::from_status(500, "stack trace here"));
        assert_eq!(c.user_message, DEFAULT_MESSAGE);
    }
}
