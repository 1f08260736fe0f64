//! Contact Cache — phone → display-name lookup with TTL and
//! circuit-breaker-protected engine fallback (spec §4.C)

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{instrument, warn};

use domain::entities::Contact;

use crate::error::BridgeError;
use crate::ports::{ContactCacheStore, EngineContact, WhatsAppEnginePort};
use crate::services::circuit_breaker::CircuitBreaker;

/// Default freshness window for cached contact rows.
pub const DEFAULT_TTL_HOURS: i64 = 24;

fn engine_contact_to_domain(engine: EngineContact, now: chrono::DateTime<Utc>) -> Contact {
    Contact {
        contact_id: engine.contact_id,
        phone_number: engine.phone_number,
        name: engine.name,
        push_name: engine.push_name,
        short_name: engine.short_name,
        is_group: engine.is_group,
        is_blocked: engine.is_blocked,
        is_my_contact: engine.is_my_contact,
        cached_at: now,
        updated_at: now,
    }
}

/// Resolves WhatsApp phone-like identifiers to display names, backed
/// by a local cache and protected by a circuit breaker on engine
/// fallback.
pub struct ContactCache {
    store: Arc<dyn ContactCacheStore>,
    engine: Arc<dyn WhatsAppEnginePort>,
    breaker: CircuitBreaker,
    ttl_hours: i64,
}

impl ContactCache {
    #[must_use]
    pub fn new(store: Arc<dyn ContactCacheStore>, engine: Arc<dyn WhatsAppEnginePort>) -> Self {
        Self {
            store,
            engine,
            breaker: CircuitBreaker::new("contact-cache"),
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

    fn is_fresh(&self, contact: &Contact) -> bool {
        let age = Utc::now().signed_duration_since(contact.cached_at);
        age < chrono::Duration::hours(self.ttl_hours)
    }

    /// Resolve a display name for `phone` within `session`.
    #[instrument(skip(self), fields(session = %session))]
    pub async fn display_name(&self, phone: &str, session: &str) -> String {
        if phone.ends_with("@g.us") {
            return phone.to_string();
        }
        if let Some(numeric) = phone.strip_suffix("@lid") {
            return numeric.to_string();
        }

        let cached = self.store.get(phone).await.ok().flatten();
        if let Some(contact) = &cached {
            if self.is_fresh(contact) {
                return contact.display_name().to_string();
            }
        }

        let engine = Arc::clone(&self.engine);
        let session = session.to_string();
        let phone_owned = phone.to_string();
        let result = self
            .breaker
            .call(|| async move { engine.get_contact(&session, &phone_owned).await })
            .await;

        match result {
            Err(e) if e.is_circuit_open() => {
                warn!(phone = %phone, "contact cache degraded: circuit breaker open");
                cached.map_or_else(|| phone.to_string(), |c| c.display_name().to_string())
            },
            Ok(engine_contact) => {
                let contact = engine_contact_to_domain(engine_contact, Utc::now());
                if let Err(error) = self.store.upsert(&contact).await {
                    warn!(%error, "failed to persist refreshed contact");
                }
                contact.display_name().to_string()
            },
            Err(_) => {
                if let Some(contact) = cached {
                    warn!(phone = %phone, "contact cache degraded: engine call failed, using stale row");
                    contact.display_name().to_string()
                } else {
                    phone.to_string()
                }
            },
        }
    }

    /// Page through the engine's contact list, upserting every row;
    /// per-contact failures are logged and skipped.
    #[instrument(skip(self), fields(session = %session))]
    pub async fn sync_all(&self, session: &str, batch_size: u32, inter_batch_delay: Duration) {
        let mut offset = 0;
        loop {
            let batch = match self.engine.get_all_contacts(session, batch_size, offset).await {
                Ok(batch) => batch,
                Err(error) => {
                    warn!(%error, "contact sync batch failed");
                    return;
                },
            };

            let batch_len = batch.len();
            for engine_contact in batch {
                let contact = engine_contact_to_domain(engine_contact, Utc::now());
                if let Err(error) = self.store.upsert(&contact).await {
                    warn!(%error, contact_id = %contact.contact_id, "skipping contact save failure");
                }
            }

            if batch_len < batch_size as usize {
                break;
            }
            offset += batch_size;
            tokio::time::sleep(inter_batch_delay).await;
        }
    }

    /// Delegate cleanup to the backing store.
    pub async fn cleanup(&self, days: u32) -> Result<u64, BridgeError> {
        self.store.cleanup_older_than(days).await
    }
}
