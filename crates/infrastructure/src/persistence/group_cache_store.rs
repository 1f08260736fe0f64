//! SQLite-backed `GroupCacheStore`
//!
//! Group ids and session names are stored as plain text: unlike
//! contacts, a group id carries no individual phone number and is not
//! subject to the encrypted-column contract.

use std::sync::Arc;

use application::error::BridgeError;
use application::ports::GroupCacheStore;
use async_trait::async_trait;
use chrono::Utc;
use domain::entities::Group;
use domain::value_objects::SessionName;
use rusqlite::{OptionalExtension, Row, params};
use tokio::task;
use tracing::{debug, instrument};

use super::connection::ConnectionPool;
use super::parse_ts;

fn internal(e: impl std::fmt::Display) -> BridgeError {
    BridgeError::Fatal(e.to_string())
}

fn row_to_group(row: &Row<'_>) -> rusqlite::Result<Group> {
    let session_name: String = row.get("session_name")?;
    Ok(Group {
        group_id: row.get("group_id")?,
        subject: row.get("subject")?,
        description: row.get("description")?,
        participant_count: row.get::<_, i64>("participant_count")? as u32,
        session_name: SessionName::new(session_name)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e)))?,
        cached_at: parse_ts(&row.get::<_, String>("cached_at")?)?,
        updated_at: parse_ts(&row.get::<_, String>("updated_at")?)?,
    })
}

/// SQLite-based group cache store.
pub struct SqliteGroupCacheStore {
    pool: Arc<ConnectionPool>,
}

impl SqliteGroupCacheStore {
    #[must_use]
    pub const fn new(pool: Arc<ConnectionPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl GroupCacheStore for SqliteGroupCacheStore {
    async fn get(&self, group_id: &str, session: &str) -> Result<Option<Group>, BridgeError> {
        let pool = Arc::clone(&self.pool);
        let group_id = group_id.to_string();
        let session = session.to_string();

        task::spawn_blocking(move || {
            let conn = pool.get().map_err(internal)?;
            conn.query_row(
                "SELECT group_id, session_name, subject, description, participant_count,
                        cached_at, updated_at
                 FROM groups WHERE group_id = ?1 AND session_name = ?2",
                params![group_id, session],
                row_to_group,
            )
            .optional()
            .map_err(internal)
        })
        .await
        .map_err(internal)?
    }

    #[instrument(skip(self, group), fields(group_id = %group.group_id))]
    async fn upsert(&self, group: &Group) -> Result<(), BridgeError> {
        let pool = Arc::clone(&self.pool);
        let group = group.clone();

        task::spawn_blocking(move || {
            let conn = pool.get().map_err(internal)?;
            conn.execute(
                "INSERT INTO groups (
                    group_id, session_name, subject, description, participant_count,
                    cached_at, updated_at
                ) VALUES (?1,?2,?3,?4,?5,?6,?7)
                ON CONFLICT(group_id, session_name) DO UPDATE SET
                    subject = excluded.subject,
                    description = excluded.description,
                    participant_count = excluded.participant_count,
                    updated_at = excluded.updated_at",
                params![
                    group.group_id,
                    group.session_name.as_str(),
                    group.subject,
                    group.description,
                    i64::from(group.participant_count),
                    group.cached_at.to_rfc3339(),
                    group.updated_at.to_rfc3339(),
                ],
            )
            .map_err(internal)?;

            debug!("upserted group");
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
                .execute("DELETE FROM groups WHERE updated_at < ?1", [&cutoff])
                .map_err(internal)?;
            Ok(removed as u64)
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

    fn store() -> SqliteGroupCacheStore {
        let config = DatabaseConfig { path: ":memory:".to_string(), max_connections: 1, run_migrations: true };
        SqliteGroupCacheStore::new(Arc::new(create_pool(&config).unwrap()))
    }

    fn sample_group() -> Group {
        let now = Utc::now();
        Group {
            group_id: "123456789012345@g.us".to_string(),
            subject: Some("Family".to_string()),
            description: None,
            participant_count: 4,
            session_name: SessionName::new("personal").unwrap(),
            cached_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn upsert_then_get_round_trips() {
        let store = store();
        store.upsert(&sample_group()).await.unwrap();
        let found = store.get("123456789012345@g.us", "personal").await.unwrap().unwrap();
        assert_eq!(found.subject.as_deref(), Some("Family"));
    }

    #[tokio::test]
    async fn distinct_sessions_are_independent_rows() {
        let store = store();
        store.upsert(&sample_group()).await.unwrap();
        assert!(store.get("123456789012345@g.us", "work").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn cleanup_removes_stale_rows() {
        let store = store();
        let mut group = sample_group();
        group.updated_at = Utc::now() - chrono::Duration::days(40);
        store.upsert(&group).await.unwrap();
        let removed = store.cleanup_older_than(30).await.unwrap();
        assert_eq!(removed, 1);
    }
}
