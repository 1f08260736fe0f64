//! Port definitions for the application layer
//!
//! Ports are interfaces describing how the application interacts with
//! external systems. Adapters in the infrastructure and integration
//! layers implement these ports.

mod container_restart_port;
mod contact_cache_store;
mod group_cache_store;
mod media_store;
mod message_mapping_store;
mod pending_signal_message_store;
mod signal_daemon_port;
mod whatsapp_engine_port;

#[cfg(test)]
pub use container_restart_port::MockContainerRestartPort;
pub use container_restart_port::ContainerRestartPort;
#[cfg(test)]
pub use contact_cache_store::MockContactCacheStore;
pub use contact_cache_store::ContactCacheStore;
#[cfg(test)]
pub use group_cache_store::MockGroupCacheStore;
pub use group_cache_store::GroupCacheStore;
#[cfg(test)]
pub use media_store::MockMediaStore;
pub use media_store::MediaStore;
#[cfg(test)]
pub use message_mapping_store::MockMessageMappingStore;
pub use message_mapping_store::MessageMappingStore;
#[cfg(test)]
pub use pending_signal_message_store::MockPendingSignalMessageStore;
pub use pending_signal_message_store::PendingSignalMessageStore;
#[cfg(test)]
pub use signal_daemon_port::MockSignalDaemonPort;
pub use signal_daemon_port::{
    SignalAttachment, SignalDaemonPort, SignalDeletion, SignalMessage, SignalQuotedMessage,
    SignalReaction, SignalSendResult,
};
#[cfg(test)]
pub use whatsapp_engine_port::MockWhatsAppEnginePort;
pub use whatsapp_engine_port::{
    EngineContact, EngineGroup, SessionStatus, WhatsAppEnginePort, WhatsAppSendResult,
};
