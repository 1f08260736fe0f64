//! Route table and middleware stack.

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::health::health;
use crate::state::AppState;
use crate::webhook::receive_whatsapp_webhook;

/// Inbound webhook bodies can carry a base64 media payload; cap well
/// above a typical document but below an unbounded upload.
const MAX_WEBHOOK_BODY_BYTES: usize = 50 * 1024 * 1024;

#[must_use]
pub fn build_router(state: AppState, cors_enabled: bool) -> Router {
    let mut router = Router::new()
        .route("/health", get(health))
        .route("/webhook/whatsapp", post(receive_whatsapp_webhook))
        .layer(RequestBodyLimitLayer::new(MAX_WEBHOOK_BODY_BYTES))
        .layer(TraceLayer::new_for_http());

    if cors_enabled {
        router = router.layer(CorsLayer::permissive());
    }

    router.with_state(state)
}
