//! Signal daemon client errors
//!
//! Mirrors `integration_whatsapp::WhatsAppError`: a small error type
//! owned by the transport, converted into `BridgeError` at the port
//! boundary rather than threading `reqwest`/`serde_json` errors
//! further up the stack.

use application::error::BridgeError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SignalError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("signal daemon rejected the request: {status} {body}")]
    Daemon { status: u16, body: String },

    #[error("signal daemon response was malformed: {0}")]
    MalformedResponse(String),
}

impl From<SignalError> for BridgeError {
    fn from(err: SignalError) -> Self {
        let message = err.to_string();
        if BridgeError::classify_message(&message) {
            Self::Retryable(message)
        } else {
            Self::Engine(message)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn daemon_auth_rejection_is_not_retryable() {
        let err = SignalError::Daemon { status: 401, body: "unauthorized".to_string() };
        assert!(!BridgeError::from(err).is_retryable());
    }

    #[test]
    fn daemon_timeout_message_is_retryable() {
        let err = SignalError::Daemon { status: 504, body: "gateway timeout".to_string() };
        assert!(BridgeError::from(err).is_retryable());
    }

    #[test]
    fn malformed_response_is_not_retryable() {
        let err = SignalError::MalformedResponse("malformed json body".to_string());
        assert!(!BridgeError::from(err).is_retryable());
    }
}
