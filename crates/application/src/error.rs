//! Application-level errors

use domain::DomainError;
use thiserror::Error;

/// Errors that can occur in the application layer
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Domain-level error
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Configuration was structurally invalid
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Input failed validation and was never dispatched
    #[error("validation error: {0}")]
    Validation(String),

    /// A remote call failed for a reason that may clear on retry
    #[error("transport error: {0}")]
    Retryable(String),

    /// A remote call was rejected by the engine itself and will not
    /// succeed on retry
    #[error("engine error: {0}")]
    Engine(String),

    /// A requested resource (mapping, contact, group, channel) was not found
    #[error("not found: {0}")]
    NotFound(String),

    /// The operation conflicts with existing state
    #[error("conflict: {0}")]
    Conflict(String),

    /// Operating in degraded mode because a circuit breaker is open
    #[error("degraded mode: {0}")]
    Degraded(String),

    /// Unrecoverable error; the caller should not retry
    #[error("fatal error: {0}")]
    Fatal(String),
}

impl BridgeError {
    /// Classify an error as retryable per the poller's closed taxonomy.
    ///
    /// `nil`/success is not represented here since this type only
    /// exists for the error path; callers check `Result::is_ok` first.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Retryable(_))
    }

    /// Classify a raw error message against the Signal poller's closed
    /// retryability taxonomy (spec §4.H).
    #[must_use]
    pub fn classify_message(message: &str) -> bool {
        let lower = message.to_ascii_lowercase();
        if lower.contains("cancelled") || lower.contains("canceled") {
            return false;
        }
        if lower.contains("unauthorized")
            || lower.contains("forbidden")
            || lower.contains("invalid")
            || lower.contains("malformed")
        {
            return false;
        }
        if lower.contains("deadline exceeded")
            || lower.contains("connection refused")
            || lower.contains("connection reset")
            || lower.contains("eof")
            || lower.contains("timeout")
        {
            return true;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_variant_is_retryable() {
        assert!(BridgeError::Retryable("timeout".to_string()).is_retryable());
    }

    #[test]
    fn engine_variant_is_not_retryable() {
        assert!(!BridgeError::Engine("rejected".to_string()).is_retryable());
    }

    #[test]
    fn classifier_rejects_cancellation() {
        assert!(!BridgeError::classify_message("context cancelled"));
    }

    #[test]
    fn classifier_accepts_deadline_exceeded() {
        assert!(BridgeError::classify_message("context deadline exceeded"));
    }

    #[test]
    fn classifier_rejects_auth_failures() {
        assert!(!BridgeError::classify_message("401 unauthorized"));
        assert!(!BridgeError::classify_message("403 forbidden"));
    }

    #[test]
    fn classifier_rejects_malformed_input() {
        assert!(!BridgeError::classify_message("invalid payload"));
        assert!(!BridgeError::classify_message("malformed json"));
    }

    #[test]
    fn classifier_accepts_connection_errors() {
        assert!(BridgeError::classify_message("connection refused"));
        assert!(BridgeError::classify_message("connection reset by peer"));
        assert!(BridgeError::classify_message("unexpected EOF"));
        assert!(BridgeError::classify_message("request timeout"));
    }

    #[test]
    fn classifier_defaults_to_retryable_for_unknown_errors() {
        assert!(BridgeError::classify_message("something went sideways"));
    }

    #[test]
    fn domain_error_converts() {
        let domain_err = DomainError::InvalidPhoneNumber("bad".to_string());
        let app_err: BridgeError = domain_err.into();
        assert!(matches!(app_err, BridgeError::Domain(_)));
    }
}
