//! Infrastructure layer - Adapters, persistence, and configuration
//!
//! Implements the application layer's ports against SQLite, the
//! filesystem, and the encrypted-column crypto contract. Never
//! referenced by `domain` or `application`.

pub mod adapters;
pub mod config;
pub mod persistence;

pub use adapters::{ColumnCipher, CryptoError, FilesystemMediaStore, LookupHasher};
pub use config::AppConfig;
pub use persistence::{
    SqliteContactCacheStore, SqliteGroupCacheStore, SqliteMessageMappingStore, SqlitePendingSignalMessageStore,
};
