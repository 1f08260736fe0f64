//! Concrete port adapters: encryption, media storage, and
//! container-restart escalation

pub mod container_restart_adapter;
pub mod crypto;
pub mod media_store;

pub use container_restart_adapter::{
    NoOpContainerRestartAdapter, WebhookContainerRestartAdapter, build_container_restart_adapter,
};
pub use crypto::{ColumnCipher, CryptoError, LookupHasher};
pub use media_store::FilesystemMediaStore;
