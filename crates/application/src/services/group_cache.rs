//! Group Cache — group-id → subject lookup, same protocol as the
//! Contact Cache (spec §4.D)

use std::sync::Arc;

use chrono::Utc;
use tracing::{instrument, warn};

use domain::entities::Group;
use domain::value_objects::SessionName;

use crate::error::BridgeError;
use crate::ports::{EngineGroup, GroupCacheStore, WhatsAppEnginePort};
use crate::services::circuit_breaker::CircuitBreaker;
use crate::services::contact_cache::DEFAULT_TTL_HOURS;

fn engine_group_to_domain(
    engine: EngineGroup,
    session: SessionName,
    now: chrono::DateTime<Utc>,
) -> Group {
    Group {
        group_id: engine.group_id,
        subject: engine.subject,
        description: engine.description,
        participant_count: engine.participant_count,
        session_name: session,
        cached_at: now,
        updated_at: now,
    }
}

/// Resolves `@g.us` group ids to subjects, backed by a local cache and
/// protected by a circuit breaker on engine fallback. Any id not
/// ending in `@g.us` is echoed unchanged.
pub struct GroupCache {
    store: Arc<dyn GroupCacheStore>,
    engine: Arc<dyn WhatsAppEnginePort>,
    breaker: CircuitBreaker,
    ttl_hours: i64,
}

impl GroupCache {
    #[must_use]
    pub fn new(store: Arc<dyn GroupCacheStore>, engine: Arc<dyn WhatsAppEnginePort>) -> Self {
        Self {
            store,
            engine,
            breaker: CircuitBreaker::new("group-cache"),
            ttl_hours: DEFAULT_TTL_HOURS,
        }
    }

    #[must_use]
    pub fn with_ttl_hours(mut self, ttl_hours: i64) -> Self {
        self.ttl_hours = ttl_hours;
        self
    }

    /// Current circuit-breaker state, surfaced on the health endpoint.
    #[must_use]
    pub fn breaker_state(&self) -> crate::services::circuit_breaker::CircuitState {
        self.breaker.state()
    }

    fn is_fresh(&self, group: &Group) -> bool {
        let age = Utc::now().signed_duration_since(group.cached_at);
        age < chrono::Duration::hours(self.ttl_hours)
    }

    #[instrument(skip(self), fields(session = %session))]
    pub async fn display_name(&self, group_id: &str, session: &str) -> String {
        if !group_id.ends_with("@g.us") {
            return group_id.to_string();
        }

        let cached = self.store.get(group_id, session).await.ok().flatten();
        if let Some(group) = &cached {
            if self.is_fresh(group) {
                return group.display_name().to_string();
            }
        }

        let engine = Arc::clone(&self.engine);
        let session_owned = session.to_string();
        let group_id_owned = group_id.to_string();
        let result = self
            .breaker
            .call(|| async move { engine.get_group(&session_owned, &group_id_owned).await })
            .await;

        match result {
            Err(e) if e.is_circuit_open() => {
                warn!(group_id = %group_id, "group cache degraded: circuit breaker open");
                cached.map_or_else(|| group_id.to_string(), |g| g.display_name().to_string())
            },
            Ok(engine_group) => {
                let Ok(session_name) = SessionName::new(session) else {
                    return group_id.to_string();
                };
                let group = engine_group_to_domain(engine_group, session_name, Utc::now());
                if let Err(error) = self.store.upsert(&group).await {
                    warn!(%error, "failed to persist refreshed group");
                }
                group.display_name().to_string()
            },
            Err(_) => {
                if let Some(group) = cached {
                    warn!(group_id = %group_id, "group cache degraded: engine call failed, using stale row");
                    group.display_name().to_string()
                } else {
                    group_id.to_string()
                }
            },
        }
    }

    pub async fn cleanup(&self, days: u32) -> Result<u64, BridgeError> {
        self.store.cleanup_older_than(days).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::{MockGroupCacheStore, MockWhatsAppEnginePort};

    #[tokio::test]
    async fn non_group_ids_pass_through_unchanged() {
        let store = MockGroupCacheStore::new();
        let engine = MockWhatsAppEnginePort::new();
        let cache = GroupCache::new(Arc::new(store), Arc::new(engine));
        assert_eq!(
            cache.display_name("1234567890@c.us", "personal").await,
            "1234567890@c.us"
        );
    }

    #[tokio::test]
    async fn cache_miss_falls_through_to_engine() {
        let mut store = MockGroupCacheStore::new();
        store.expect_get().returning(|_, _| Ok(None));
        store.expect_upsert().returning(|_| Ok(()));
        let mut engine = MockWhatsAppEnginePort::new();
        engine.expect_get_group().returning(|_, _| {
            Ok(EngineGroup {
                group_id: "123@g.us".to_string(),
                subject: Some("Family".to_string()),
                description: None,
                participant_count: 4,
            })
        });
        let cache = GroupCache::new(Arc::new(store), Arc::new(engine));
        assert_eq!(cache.display_name("123@g.us", "personal").await, "Family");
    }

    #[tokio::test]
    async fn engine_failure_without_cache_returns_raw_id() {
        let mut store = MockGroupCacheStore::new();
        store.expect_get().returning(|_, _| Ok(None));
        let mut engine = MockWhatsAppEnginePort::new();
        engine
            .expect_get_group()
            .returning(|_, _| Err(BridgeError::Retryable("down".to_string())));
        let cache = GroupCache::new(Arc::new(store), Arc::new(engine));
        assert_eq!(cache.display_name("123@g.us", "personal").await, "123@g.us");
    }
}
