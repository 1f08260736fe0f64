//! `GET /health` — channel count, WhatsApp session states, Signal
//! poller state, cache circuit-breaker states, and DB reachability.
//! No metrics exporter; this endpoint is the only liveness surface.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde::Serialize;

use application::services::CircuitState;

use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub channel_count: usize,
    pub sessions: Vec<SessionHealth>,
    pub signal_poller_running: bool,
    pub contact_cache_breaker: &'static str,
    pub group_cache_breaker: &'static str,
    pub database_reachable: bool,
}

#[derive(Serialize)]
pub struct SessionHealth {
    pub session: String,
    pub status: Option<String>,
}

fn breaker_label(state: CircuitState) -> &'static str {
    match state {
        CircuitState::Closed => "closed",
        CircuitState::Open => "open",
        CircuitState::HalfOpen => "half-open",
    }
}

pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let sessions = state
        .router
        .all_sessions()
        .into_iter()
        .map(|session| {
            let status = state.session_monitor.last_known_status(&session);
            SessionHealth { session, status }
        })
        .collect();

    let database_reachable = state.db_pool.get().is_ok();
    let signal_poller_running = state.signal_poller.is_running();
    let contact_cache_breaker = breaker_label(state.contacts.breaker_state());
    let group_cache_breaker = breaker_label(state.groups.breaker_state());

    let healthy = database_reachable && signal_poller_running;
    let response = HealthResponse {
        status: if healthy { "ok" } else { "degraded" },
        channel_count: state.router.count(),
        sessions,
        signal_poller_running,
        contact_cache_breaker,
        group_cache_breaker,
        database_reachable,
    };

    let code = if healthy { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (code, Json(response))
}
