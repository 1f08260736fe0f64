//! Shared application state wired together in `main` and exercised by
//! the route handlers and background tasks.

use std::sync::Arc;

use application::ports::{MessageMappingStore, WhatsAppEnginePort};
use application::services::{ChannelRouter, ContactCache, GroupCache, MessageService, SessionMonitor};
use arc_swap::ArcSwap;
use infrastructure::config::AppConfig;
use infrastructure::persistence::connection::ConnectionPool;
use integration_signal::SignalPoller;

/// Everything a request handler or background task needs, cloned
/// cheaply since every field is an `Arc` (or `Arc`-backed pool).
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ArcSwap<AppConfig>>,
    pub router: Arc<ChannelRouter>,
    pub message_service: Arc<MessageService>,
    pub mappings: Arc<dyn MessageMappingStore>,
    pub contacts: Arc<ContactCache>,
    pub groups: Arc<GroupCache>,
    pub session_monitor: Arc<SessionMonitor>,
    pub signal_poller: Arc<SignalPoller>,
    pub whatsapp_engine: Arc<dyn WhatsAppEnginePort>,
    pub db_pool: ConnectionPool,
}
