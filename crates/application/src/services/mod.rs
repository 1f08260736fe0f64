//! Application services - Use case implementations

mod bridge;
mod channel_router;
mod circuit_breaker;
mod contact_cache;
mod group_cache;
mod media_handler;
mod message_service;
mod scheduler;
mod session_monitor;

pub use bridge::{Bridge, CleanupOutcome, ForwardOutcome, MediaInput, OutboundMessage, Platform};
pub use channel_router::ChannelRouter;
pub use circuit_breaker::{
    CircuitBreaker, CircuitBreakerConfig, CircuitBreakerError, CircuitOpenError, CircuitState,
};
pub use contact_cache::ContactCache;
pub use group_cache::GroupCache;
pub use media_handler::{MediaConfig, MediaHandler};
pub use message_service::MessageService;
pub use scheduler::{RetentionConfig, RetentionScheduler};
pub use session_monitor::{SessionMonitor, SessionMonitorConfig};
