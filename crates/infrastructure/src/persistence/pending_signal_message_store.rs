//! SQLite-backed `PendingSignalMessageStore`
//!
//! The natural key passed in by callers embeds phone numbers, so only
//! its `LookupHasher` hash is stored as the primary key; `destination`
//! is `ColumnCipher`-encrypted like the identifier columns in
//! `message_mapping_store`.

use std::sync::Arc;

use application::error::BridgeError;
use application::ports::PendingSignalMessageStore;
use async_trait::async_trait;
use chrono::Utc;
use domain::entities::PendingSignalMessage;
use domain::value_objects::PhoneNumber;
use rusqlite::{OptionalExtension, Row, params};
use tokio::task;
use tracing::{debug, instrument};

use super::connection::ConnectionPool;
use super::parse_ts;
use crate::adapters::crypto::{ColumnCipher, LookupHasher};

fn internal(e: impl std::fmt::Display) -> BridgeError {
    BridgeError::Fatal(e.to_string())
}

fn row_to_pending(row: &Row<'_>, cipher: &ColumnCipher) -> rusqlite::Result<PendingSignalMessage> {
    let destination_enc: Vec<u8> = row.get("destination_enc")?;
    let raw_payload: String = row.get("raw_payload")?;
    let retry_count: u32 = row.get("retry_count")?;
    let last_error: Option<String> = row.get("last_error")?;
    let created_at: String = row.get("created_at")?;

    let destination = cipher
        .decrypt(&destination_enc)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Blob, Box::new(e)))?;

    Ok(PendingSignalMessage {
        destination: PhoneNumber::new(destination)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e)))?,
        raw_payload: serde_json::from_str(&raw_payload)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e)))?,
        retry_count,
        created_at: parse_ts(&created_at)?,
        last_error,
    })
}

/// SQLite-based durable pending-Signal-forward queue.
pub struct SqlitePendingSignalMessageStore {
    pool: Arc<ConnectionPool>,
    cipher: Arc<ColumnCipher>,
    hasher: Arc<LookupHasher>,
}

impl SqlitePendingSignalMessageStore {
    #[must_use]
    pub const fn new(pool: Arc<ConnectionPool>, cipher: Arc<ColumnCipher>, hasher: Arc<LookupHasher>) -> Self {
        Self { pool, cipher, hasher }
    }
}

#[async_trait]
impl PendingSignalMessageStore for SqlitePendingSignalMessageStore {
    #[instrument(skip(self, id, pending))]
    async fn insert(&self, id: &str, pending: &PendingSignalMessage) -> Result<(), BridgeError> {
        let pool = Arc::clone(&self.pool);
        let cipher = Arc::clone(&self.cipher);
        let id_hash = self.hasher.hash(id);
        let destination_enc = cipher.encrypt(pending.destination.as_str()).map_err(internal)?;
        let raw_payload = serde_json::to_string(&pending.raw_payload).map_err(internal)?;
        let created_at = pending.created_at.to_rfc3339();

        task::spawn_blocking(move || {
            let conn = pool.get().map_err(internal)?;
            conn.execute(
                "INSERT INTO pending_signal_messages (
                    id_hash, destination_enc, raw_payload, retry_count, last_error, created_at
                ) VALUES (?1,?2,?3,0,NULL,?4)
                ON CONFLICT(id_hash) DO NOTHING",
                params![id_hash, destination_enc, raw_payload, created_at],
            )
            .map_err(internal)?;

            debug!("recorded pending signal message");
            Ok(())
        })
        .await
        .map_err(internal)?
    }

    #[instrument(skip(self, id))]
    async fn delete(&self, id: &str) -> Result<(), BridgeError> {
        let pool = Arc::clone(&self.pool);
        let id_hash = self.hasher.hash(id);

        task::spawn_blocking(move || {
            let conn = pool.get().map_err(internal)?;
            conn.execute("DELETE FROM pending_signal_messages WHERE id_hash = ?1", [&id_hash])
                .map_err(internal)?;
            Ok(())
        })
        .await
        .map_err(internal)?
    }

    #[instrument(skip(self, id, error))]
    async fn record_failure(&self, id: &str, error: &str) -> Result<(), BridgeError> {
        let pool = Arc::clone(&self.pool);
        let id_hash = self.hasher.hash(id);
        let error = error.to_string();

        task::spawn_blocking(move || {
            let conn = pool.get().map_err(internal)?;
            conn.execute(
                "UPDATE pending_signal_messages
                 SET retry_count = retry_count + 1, last_error = ?1
                 WHERE id_hash = ?2",
                params![error, id_hash],
            )
            .map_err(internal)?;
            Ok(())
        })
        .await
        .map_err(internal)?
    }

    #[instrument(skip(self))]
    async fn list_recoverable(
        &self,
        max_retries: u32,
    ) -> Result<Vec<(String, PendingSignalMessage)>, BridgeError> {
        let pool = Arc::clone(&self.pool);
        let cipher = Arc::clone(&self.cipher);

        task::spawn_blocking(move || {
            let conn = pool.get().map_err(internal)?;
            let mut stmt = conn
                .prepare(
                    "SELECT id_hash, destination_enc, raw_payload, retry_count, last_error, created_at
                     FROM pending_signal_messages WHERE retry_count < ?1",
                )
                .map_err(internal)?;

            let rows = stmt
                .query_map([max_retries], |row| {
                    let id_hash: String = row.get("id_hash")?;
                    let pending = row_to_pending(row, &cipher)?;
                    Ok((id_hash, pending))
                })
                .map_err(internal)?
                .collect::<rusqlite::Result<Vec<_>>>()
                .map_err(internal)?;

            Ok(rows)
        })
        .await
        .map_err(internal)?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DatabaseConfig;
    use crate::persistence::connection::create_pool;
    use secrecy::SecretString;

    fn store() -> SqlitePendingSignalMessageStore {
        let config = DatabaseConfig { path: ":memory:".to_string(), max_connections: 1, run_migrations: true };
        let pool = Arc::new(create_pool(&config).unwrap());
        let cipher = Arc::new(ColumnCipher::new(
            &SecretString::from("secret".to_string()),
            &SecretString::from("salt".to_string()),
        ));
        let hasher = Arc::new(LookupHasher::new(&SecretString::from("lookup-salt".to_string())));
        SqlitePendingSignalMessageStore::new(pool, cipher, hasher)
    }

    fn sample() -> PendingSignalMessage {
        PendingSignalMessage::new(
            PhoneNumber::new("+15551234567").unwrap(),
            serde_json::json!({"text": "hi"}),
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn insert_then_list_recoverable() {
        let store = store();
        store.insert("k1", &sample()).await.unwrap();
        let rows = store.list_recoverable(5).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].1.destination.as_str(), "+15551234567");
    }

    #[tokio::test]
    async fn insert_is_idempotent_on_conflict() {
        let store = store();
        store.insert("k1", &sample()).await.unwrap();
        store.insert("k1", &sample()).await.unwrap();
        let rows = store.list_recoverable(5).await.unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn delete_removes_row() {
        let store = store();
        store.insert("k1", &sample()).await.unwrap();
        store.delete("k1").await.unwrap();
        assert!(store.list_recoverable(5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn record_failure_increments_retry_count_and_excludes_past_bound() {
        let store = store();
        store.insert("k1", &sample()).await.unwrap();
        for _ in 0..3 {
            store.record_failure("k1", "timeout").await.unwrap();
        }
        let rows = store.list_recoverable(5).await.unwrap();
        assert_eq!(rows[0].1.retry_count, 3);
        assert_eq!(rows[0].1.last_error.as_deref(), Some("timeout"));

        let rows = store.list_recoverable(3).await.unwrap();
        assert!(rows.is_empty());
    }
}
