//! SQLite-backed `ContactCacheStore`
//!
//! Rows are keyed on a hash of the raw `contact_id`; the phone number
//! is stored encrypted but not separately indexed since lookups always
//! go through `contact_id`.

use std::sync::Arc;

use application::error::BridgeError;
use application::ports::ContactCacheStore;
use async_trait::async_trait;
use chrono::Utc;
use domain::entities::Contact;
use rusqlite::{OptionalExtension, Row, params};
use tokio::task;
use tracing::{debug, instrument};

use super::connection::ConnectionPool;
use super::parse_ts;
use crate::adapters::crypto::{ColumnCipher, LookupHasher};

fn internal(e: impl std::fmt::Display) -> BridgeError {
    BridgeError::Fatal(e.to_string())
}

fn row_to_contact(row: &Row<'_>, cipher: &ColumnCipher) -> rusqlite::Result<Contact> {
    let contact_id_enc: Vec<u8> = row.get("contact_id_enc")?;
    let phone_number_enc: Vec<u8> = row.get("phone_number_enc")?;
    let decrypt = |blob: &[u8]| -> rusqlite::Result<String> {
        cipher
            .decrypt(blob)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Blob, Box::new(e)))
    };

    Ok(Contact {
        contact_id: decrypt(&contact_id_enc)?,
        phone_number: decrypt(&phone_number_enc)?,
        name: row.get("name")?,
        push_name: row.get("push_name")?,
        short_name: row.get("short_name")?,
        is_group: row.get::<_, i64>("is_group")? != 0,
        is_blocked: row.get::<_, i64>("is_blocked")? != 0,
        is_my_contact: row.get::<_, i64>("is_my_contact")? != 0,
        cached_at: parse_ts(&row.get::<_, String>("cached_at")?)?,
        updated_at: parse_ts(&row.get::<_, String>("updated_at")?)?,
    })
}

/// SQLite-based contact cache store.
pub struct SqliteContactCacheStore {
    pool: Arc<ConnectionPool>,
    cipher: Arc<ColumnCipher>,
    hasher: Arc<LookupHasher>,
}

impl SqliteContactCacheStore {
    #[must_use]
    pub const fn new(pool: Arc<ConnectionPool>, cipher: Arc<ColumnCipher>, hasher: Arc<LookupHasher>) -> Self {
        Self { pool, cipher, hasher }
    }
}

#[async_trait]
impl ContactCacheStore for SqliteContactCacheStore {
    async fn get(&self, contact_id: &str) -> Result<Option<Contact>, BridgeError> {
        let pool = Arc::clone(&self.pool);
        let cipher = Arc::clone(&self.cipher);
        let hash = self.hasher.hash(contact_id);

        task::spawn_blocking(move || {
            let conn = pool.get().map_err(internal)?;
            conn.query_row(
                "SELECT contact_id_enc, phone_number_enc, name, push_name, short_name,
                        is_group, is_blocked, is_my_contact, cached_at, updated_at
                 FROM contacts WHERE contact_id_hash = ?1",
                [&hash],
                |row| row_to_contact(row, &cipher),
            )
            .optional()
            .map_err(internal)
        })
        .await
        .map_err(internal)?
    }

    #[instrument(skip(self, contact), fields(contact_id = %contact.contact_id))]
    async fn upsert(&self, contact: &Contact) -> Result<(), BridgeError> {
        let pool = Arc::clone(&self.pool);
        let cipher = Arc::clone(&self.cipher);
        let hash = self.hasher.hash(&contact.contact_id);
        let contact = contact.clone();

        task::spawn_blocking(move || {
            let conn = pool.get().map_err(internal)?;
            let contact_id_enc = cipher.encrypt(&contact.contact_id).map_err(internal)?;
            let phone_number_enc = cipher.encrypt(&contact.phone_number).map_err(internal)?;

            conn.execute(
                "INSERT INTO contacts (
                    contact_id_hash, contact_id_enc, session_name, phone_number_enc,
                    name, push_name, short_name, is_group, is_blocked, is_my_contact,
                    cached_at, updated_at
                ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12)
                ON CONFLICT(contact_id_hash) DO UPDATE SET
                    name = excluded.name,
                    push_name = excluded.push_name,
                    short_name = excluded.short_name,
                    is_group = excluded.is_group,
                    is_blocked = excluded.is_blocked,
                    is_my_contact = excluded.is_my_contact,
                    updated_at = excluded.updated_at",
                params![
                    hash,
                    contact_id_enc,
                    Option::<String>::None,
                    phone_number_enc,
                    contact.name,
                    contact.push_name,
                    contact.short_name,
                    i64::from(contact.is_group),
                    i64::from(contact.is_blocked),
                    i64::from(contact.is_my_contact),
                    contact.cached_at.to_rfc3339(),
                    contact.updated_at.to_rfc3339(),
                ],
            )
            .map_err(internal)?;

            debug!("upserted contact");
            Ok(())
        })
        .await
        .map_err(internal)?
    }

    async fn cleanup_older_than(&self, days: u32) -> Result<u64, BridgeError> {
        let pool = Arc::clone(&self.pool);
        let cutoff = (Utc::now() - chrono::Duration::days(i64::from(days))).to_rfc3339();

        task::spawn_blocking(move || {
            let conn = pool.get().map_err(internal)?;
            let removed = conn
                .execute("DELETE FROM contacts WHERE updated_at < ?1", [&cutoff])
                .map_err(internal)?;
            Ok(removed as u64)
        })
        .await
        .map_err(internal)?
    }
}
