//! SQLite-backed `MessageMappingStore`
//!
//! Identifier columns (`whatsapp_chat_id`, `whatsapp_msg_id`,
//! `signal_msg_id`) are stored as `ColumnCipher`-encrypted blobs with a
//! sibling `LookupHasher` hash used for equality lookups.

use std::sync::Arc;

use application::error::BridgeError;
use application::ports::MessageMappingStore;
use async_trait::async_trait;
use chrono::Utc;
use domain::entities::MessageMapping;
use domain::value_objects::{DeliveryStatus, MediaType, SessionName, WhatsAppChatId};
use rusqlite::{OptionalExtension, Row, params};
use tokio::task;
use tracing::{debug, instrument};

use super::connection::ConnectionPool;
use super::parse_ts;
use crate::adapters::crypto::{ColumnCipher, LookupHasher};

fn internal(e: impl std::fmt::Display) -> BridgeError {
    BridgeError::Fatal(e.to_string())
}

fn row_to_mapping(row: &Row<'_>, cipher: &ColumnCipher) -> rusqlite::Result<MessageMapping> {
    let chat_id_enc: Vec<u8> = row.get("whatsapp_chat_id_enc")?;
    let whatsapp_msg_id_enc: Vec<u8> = row.get("whatsapp_msg_id_enc")?;
    let signal_msg_id_enc: Vec<u8> = row.get("signal_msg_id_enc")?;
    let session_name: String = row.get("session_name")?;
    let signal_timestamp: String = row.get("signal_timestamp")?;
    let forwarded_at: String = row.get("forwarded_at")?;
    let delivery_status: String = row.get("delivery_status")?;
    let media_path: Option<String> = row.get("media_path")?;
    let media_type: Option<String> = row.get("media_type")?;
    let created_at: String = row.get("created_at")?;
    let updated_at: String = row.get("updated_at")?;

    let decrypt = |blob: &[u8]| -> rusqlite::Result<String> {
        cipher
            .decrypt(blob)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Blob, Box::new(e)))
    };

    let chat_id = decrypt(&chat_id_enc)?;
    let whatsapp_msg_id = decrypt(&whatsapp_msg_id_enc)?;
    let signal_msg_id = decrypt(&signal_msg_id_enc)?;

    Ok(MessageMapping {
        whatsapp_chat_id: WhatsAppChatId::new(chat_id)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e)))?,
        whatsapp_msg_id,
        signal_msg_id,
        signal_timestamp: parse_ts(&signal_timestamp)?,
        forwarded_at: parse_ts(&forwarded_at)?,
        delivery_status: delivery_status
            .parse::<DeliveryStatus>()
            .map_err(|e: String| rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, e.into()))?,
        media_path,
        media_type: media_type
            .map(|m| m.parse::<MediaType>())
            .transpose()
            .map_err(|e: String| rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, e.into()))?,
        session_name: SessionName::new(session_name)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e)))?,
        created_at: parse_ts(&created_at)?,
        updated_at: parse_ts(&updated_at)?,
    })
}

const SELECT_ALL: &str = "SELECT id, session_name,
    whatsapp_chat_id_enc, whatsapp_chat_id_hash,
    whatsapp_msg_id_enc, whatsapp_msg_id_hash,
    signal_msg_id_enc, signal_msg_id_hash,
    signal_timestamp, forwarded_at, delivery_status,
    media_path, media_type, created_at, updated_at
    FROM message_mappings";

/// SQLite-based message mapping store.
pub struct SqliteMessageMappingStore {
    pool: Arc<ConnectionPool>,
    cipher: Arc<ColumnCipher>,
    hasher: Arc<LookupHasher>,
}

impl SqliteMessageMappingStore {
    #[must_use]
    pub const fn new(pool: Arc<ConnectionPool>, cipher: Arc<ColumnCipher>, hasher: Arc<LookupHasher>) -> Self {
        Self { pool, cipher, hasher }
    }

    /// The WhatsApp-chat-id candidate used to answer
    /// `has_history_between`: a Signal sender's phone number is mapped
    /// onto the 1:1 WhatsApp chat id it would correspond to.
    fn candidate_chat_id(signal_sender: &str) -> String {
        let digits: String = signal_sender.chars().filter(char::is_ascii_digit).collect();
        format!("{digits}@c.us")
    }

    async fn by_hash_column(&self, column: &'static str, hash: String) -> Result<Option<MessageMapping>, BridgeError> {
        let pool = Arc::clone(&self.pool);
        let cipher = Arc::clone(&self.cipher);
        let query = format!("{SELECT_ALL} WHERE {column} = ?1");

        task::spawn_blocking(move || {
            let conn = pool.get().map_err(internal)?;
            conn.query_row(&query, [&hash], |row| row_to_mapping(row, &cipher))
                .optional()
                .map_err(internal)
        })
        .await
        .map_err(internal)?
    }
}

#[async_trait]
impl MessageMappingStore for SqliteMessageMappingStore {
    #[instrument(skip(self, mapping), fields(whatsapp_msg_id = %mapping.whatsapp_msg_id))]
    async fn save(&self, mapping: &MessageMapping) -> Result<(), BridgeError> {
        let pool = Arc::clone(&self.pool);
        let cipher = Arc::clone(&self.cipher);
        let hasher = Arc::clone(&self.hasher);
        let mapping = mapping.clone();

        task::spawn_blocking(move || {
            let conn = pool.get().map_err(internal)?;

            let chat_id = mapping.whatsapp_chat_id.as_str();
            let chat_id_enc = cipher.encrypt(chat_id).map_err(internal)?;
            let chat_id_hash = hasher.hash(chat_id);
            let wa_msg_enc = cipher.encrypt(&mapping.whatsapp_msg_id).map_err(internal)?;
            let wa_msg_hash = hasher.hash(&mapping.whatsapp_msg_id);
            let sig_msg_enc = cipher.encrypt(&mapping.signal_msg_id).map_err(internal)?;
            let sig_msg_hash = hasher.hash(&mapping.signal_msg_id);
            let id = format!("{wa_msg_hash}:{sig_msg_hash}");

            conn.execute(
                "INSERT INTO message_mappings (
                    id, session_name,
                    whatsapp_chat_id_enc, whatsapp_chat_id_hash,
                    whatsapp_msg_id_enc, whatsapp_msg_id_hash,
                    signal_msg_id_enc, signal_msg_id_hash,
                    signal_timestamp, forwarded_at, delivery_status,
                    media_path, media_type, created_at, updated_at
                ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15)
                ON CONFLICT(id) DO UPDATE SET
                    delivery_status = excluded.delivery_status,
                    media_path = excluded.media_path,
                    media_type = excluded.media_type,
                    updated_at = excluded.updated_at",
                params![
                    id,
                    mapping.session_name.as_str(),
                    chat_id_enc,
                    chat_id_hash,
                    wa_msg_enc,
                    wa_msg_hash,
                    sig_msg_enc,
                    sig_msg_hash,
                    mapping.signal_timestamp.to_rfc3339(),
                    mapping.forwarded_at.to_rfc3339(),
                    mapping.delivery_status.as_str(),
                    mapping.media_path,
                    mapping.media_type.map(MediaType::as_str),
                    mapping.created_at.to_rfc3339(),
                    mapping.updated_at.to_rfc3339(),
                ],
            )
            .map_err(internal)?;

            debug!("saved message mapping");
            Ok(())
        })
        .await
        .map_err(internal)?
    }

    async fn by_whatsapp_id(&self, id: &str) -> Result<Option<MessageMapping>, BridgeError> {
        let hash = self.hasher.hash(id);
        self.by_hash_column("whatsapp_msg_id_hash", hash).await
    }

    async fn by_signal_id(&self, id: &str) -> Result<Option<MessageMapping>, BridgeError> {
        let hash = self.hasher.hash(id);
        self.by_hash_column("signal_msg_id_hash", hash).await
    }

    async fn by_id(&self, id: &str) -> Result<Option<MessageMapping>, BridgeError> {
        if let Some(found) = self.by_whatsapp_id(id).await? {
            return Ok(Some(found));
        }
        self.by_signal_id(id).await
    }

    async fn latest_by_session(&self, session: &str) -> Result<Option<MessageMapping>, BridgeError> {
        let pool = Arc::clone(&self.pool);
        let cipher = Arc::clone(&self.cipher);
        let session = session.to_string();
        let query = format!("{SELECT_ALL} WHERE session_name = ?1 ORDER BY updated_at DESC LIMIT 1");

        task::spawn_blocking(move || {
            let conn = pool.get().map_err(internal)?;
            conn.query_row(&query, [&session], |row| row_to_mapping(row, &cipher))
                .optional()
                .map_err(internal)
        })
        .await
        .map_err(internal)?
    }

    #[instrument(skip(self), fields(session = %session))]
    async fn has_history_between(&self, session: &str, signal_sender: &str) -> Result<bool, BridgeError> {
        let pool = Arc::clone(&self.pool);
        let session = session.to_string();
        let candidate_hash = self.hasher.hash(&Self::candidate_chat_id(signal_sender));

        task::spawn_blocking(move || {
            let conn = pool.get().map_err(internal)?;
            let count: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM message_mappings
                     WHERE session_name = ?1 AND whatsapp_chat_id_hash = ?2",
                    params![session, candidate_hash],
                    |row| row.get(0),
                )
                .map_err(internal)?;
            Ok(count > 0)
        })
        .await
        .map_err(internal)?
    }

    #[instrument(skip(self))]
    async fn update_delivery_status(&self, id: &str, status: DeliveryStatus) -> Result<(), BridgeError> {
        let pool = Arc::clone(&self.pool);
        let hash = self.hasher.hash(id);
        let now = Utc::now().to_rfc3339();
        let id = id.to_string();

        task::spawn_blocking(move || {
            let conn = pool.get().map_err(internal)?;
            let updated = conn
                .execute(
                    "UPDATE message_mappings SET delivery_status = ?1, updated_at = ?2
                     WHERE whatsapp_msg_id_hash = ?3 OR signal_msg_id_hash = ?3",
                    params![status.as_str(), now, hash],
                )
                .map_err(internal)?;

            if updated == 0 {
                return Err(BridgeError::NotFound(format!("message mapping {id}")));
            }
            Ok(())
        })
        .await
        .map_err(internal)?
    }

    #[instrument(skip(self))]
    async fn cleanup_older_than(&self, days: u32) -> Result<u64, BridgeError> {
        let pool = Arc::clone(&self.pool);
        let cutoff = (Utc::now() - chrono::Duration::days(i64::from(days))).to_rfc3339();

        task::spawn_blocking(move || {
            let conn = pool.get().map_err(internal)?;
            let removed = conn
                .execute("DELETE FROM message_mappings WHERE updated_at < ?1", [&cutoff])
                .map_err(internal)?;
            Ok(removed as u64)
        })
        .await
        .map_err(internal)?
    }
}
