//! Group cache storage port
//!
//! Pure persistence for cached `Group` rows; caching policy and
//! circuit-breaker fallback live in `services::GroupCache`.

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use domain::entities::Group;

use crate::error::BridgeError;

#[cfg_attr(test, automock)]
#[async_trait]
pub trait GroupCacheStore: Send + Sync {
    async fn get(&self, group_id: &str, session: &str) -> Result<Option<Group>, BridgeError>;
    async fn upsert(&self, group: &Group) -> Result<(), BridgeError>;
    async fn cleanup_older_than(&self, days: u32) -> Result<u64, BridgeError>;
}
