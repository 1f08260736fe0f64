//! SQLite persistence adapters
//!
//! - `connection`: pool creation and PRAGMA setup
//! - `migrations`: versioned schema migrations
//! - `message_mapping_store`, `contact_cache_store`, `group_cache_store`,
//!   `pending_signal_message_store`: port implementations over the
//!   tables `migrations` creates

pub mod connection;
mod contact_cache_store;
mod group_cache_store;
mod message_mapping_store;
pub mod migrations;
mod pending_signal_message_store;

use chrono::{DateTime, Utc};

pub use contact_cache_store::SqliteContactCacheStore;
pub use group_cache_store::SqliteGroupCacheStore;
pub use message_mapping_store::SqliteMessageMappingStore;
pub use pending_signal_message_store::SqlitePendingSignalMessageStore;

pub(crate) fn parse_ts(raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e)))
}
