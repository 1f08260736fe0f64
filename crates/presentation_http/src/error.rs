//! Maps `BridgeError` onto HTTP responses (spec §7)
//!
//! Webhook handlers respond 2xx once a message is durably accepted (or
//! validly dropped), 4xx only for malformed requests, and 5xx only for
//! internal failures the caller should retry — the WhatsApp engine
//! redelivers a webhook on 5xx, which is how retryable forward
//! failures eventually succeed without a separate durable queue.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tracing::{error, warn};

use application::error::BridgeError;

/// Newtype so the presentation layer, not `application`, owns the HTTP
/// mapping of `BridgeError`.
#[derive(Debug)]
pub struct ApiError(pub BridgeError);

impl From<BridgeError> for ApiError {
    fn from(err: BridgeError) -> Self {
        Self(err)
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    kind: &'static str,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind) = match &self.0 {
            BridgeError::Domain(_) | BridgeError::Validation(_) => (StatusCode::BAD_REQUEST, "validation"),
            BridgeError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            BridgeError::Conflict(_) => (StatusCode::CONFLICT, "conflict"),
            BridgeError::Degraded(_) => (StatusCode::SERVICE_UNAVAILABLE, "degraded"),
            BridgeError::Retryable(_) => (StatusCode::SERVICE_UNAVAILABLE, "retryable"),
            BridgeError::Engine(_) => (StatusCode::BAD_GATEWAY, "engine"),
            BridgeError::Configuration(_) | BridgeError::Fatal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "fatal")
            },
        };

        if status.is_server_error() {
            error!(error = %self.0, %status, "webhook request failed");
        } else {
            warn!(error = %self.0, %status, "webhook request rejected");
        }

        (status, Json(ErrorBody { error: self.0.to_string(), kind })).into_response()
    }
}
