//! Database migrations
//!
//! Manages schema versioning for the mapping/contact/group tables.

use rusqlite::Connection;
use tracing::{debug, info};

use super::connection::DatabaseError;

const SCHEMA_VERSION: i32 = 1;

pub fn run_migrations(conn: &Connection) -> Result<(), DatabaseError> {
    let current_version = get_schema_version(conn)?;

    if current_version < SCHEMA_VERSION {
        info!(from_version = current_version, to_version = SCHEMA_VERSION, "running database migrations");

        if current_version < 1 {
            migrate_v1(conn)?;
        }

        set_schema_version(conn, SCHEMA_VERSION)?;
        info!(version = SCHEMA_VERSION, "database migrations complete");
    } else {
        debug!(version = current_version, "database schema is up to date");
    }

    Ok(())
}

fn get_schema_version(conn: &Connection) -> Result<i32, DatabaseError> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (version INTEGER PRIMARY KEY)",
        [],
    )?;

    let version: i32 = conn
        .query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |row| row.get(0))
        .unwrap_or(0);

    Ok(version)
}

fn set_schema_version(conn: &Connection, version: i32) -> Result<(), DatabaseError> {
    conn.execute("DELETE FROM schema_version", [])?;
    conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])?;
    Ok(())
}

fn migrate_v1(conn: &Connection) -> Result<(), DatabaseError> {
    debug!("applying migration v1: initial schema");

    conn.execute_batch(
        "
        -- Message mappings. Identifier columns are AES-GCM encrypted;
        -- the *_hash sibling columns hold a deterministic keyed hash
        -- used for equality lookups against the ciphertext.
        CREATE TABLE IF NOT EXISTS message_mappings (
            id TEXT PRIMARY KEY,
            session_name TEXT NOT NULL,
            whatsapp_chat_id_enc BLOB NOT NULL,
            whatsapp_chat_id_hash TEXT NOT NULL,
            whatsapp_msg_id_enc BLOB NOT NULL,
            whatsapp_msg_id_hash TEXT NOT NULL,
            signal_msg_id_enc BLOB NOT NULL,
            signal_msg_id_hash TEXT NOT NULL,
            signal_timestamp TEXT NOT NULL,
            forwarded_at TEXT NOT NULL,
            delivery_status TEXT NOT NULL,
            media_path TEXT,
            media_type TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE UNIQUE INDEX IF NOT EXISTS idx_mappings_whatsapp_msg_id_hash
            ON message_mappings(whatsapp_msg_id_hash);
        CREATE UNIQUE INDEX IF NOT EXISTS idx_mappings_signal_msg_id_hash
            ON message_mappings(signal_msg_id_hash);
        CREATE INDEX IF NOT EXISTS idx_mappings_whatsapp_chat_id_hash
            ON message_mappings(whatsapp_chat_id_hash);
        CREATE INDEX IF NOT EXISTS idx_mappings_session_name
            ON message_mappings(session_name);
        CREATE INDEX IF NOT EXISTS idx_mappings_updated_at
            ON message_mappings(updated_at);

        -- Contact cache (component C). Keyed on the hash of the raw
        -- contact id, matching the ContactCacheStore::get(contact_id)
        -- lookup contract.
        CREATE TABLE IF NOT EXISTS contacts (
            contact_id_hash TEXT PRIMARY KEY,
            contact_id_enc BLOB NOT NULL,
            session_name TEXT,
            phone_number_enc BLOB NOT NULL,
            name TEXT,
            push_name TEXT,
            short_name TEXT,
            is_group INTEGER NOT NULL,
            is_blocked INTEGER NOT NULL,
            is_my_contact INTEGER NOT NULL,
            cached_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_contacts_updated_at ON contacts(updated_at);

        -- Group cache (component D).
        CREATE TABLE IF NOT EXISTS groups (
            group_id TEXT NOT NULL,
            session_name TEXT NOT NULL,
            subject TEXT,
            description TEXT,
            participant_count INTEGER NOT NULL,
            cached_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            PRIMARY KEY (group_id, session_name)
        );

        CREATE INDEX IF NOT EXISTS idx_groups_updated_at ON groups(updated_at);

        -- Durable pending-Signal-forward queue (spec §3): a row exists
        -- iff a polled message has been accepted but not yet
        -- acknowledged as forwarded. Deleted on success. `id_hash` is
        -- the lookup-hashed natural key; the id itself embeds phone
        -- numbers and is never stored in the clear.
        CREATE TABLE IF NOT EXISTS pending_signal_messages (
            id_hash TEXT PRIMARY KEY,
            destination_enc BLOB NOT NULL,
            raw_payload TEXT NOT NULL,
            retry_count INTEGER NOT NULL,
            last_error TEXT,
            created_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_pending_signal_retry_count
            ON pending_signal_messages(retry_count);
        ",
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migration_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();
        let version = get_schema_version(&conn).unwrap();
        assert_eq!(version, SCHEMA_VERSION);
    }

    #[test]
    fn creates_expected_tables() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        let count: i32 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='message_mappings'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 1);
    }
}
