//! Contact cache storage port
//!
//! Pure persistence for cached `Contact` rows; caching policy and
//! circuit-breaker fallback live in `services::ContactCache`.

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use domain::entities::Contact;

use crate::error::BridgeError;

#[cfg_attr(test, automock)]
#[async_trait]
pub trait ContactCacheStore: Send + Sync {
    async fn get(&self, contact_id: &str) -> Result<Option<Contact>, BridgeError>;
    async fn upsert(&self, contact: &Contact) -> Result<(), BridgeError>;
    async fn cleanup_older_than(&self, days: u32) -> Result<u64, BridgeError>;
}
