//! Pending Signal message queue port
//!
//! Backs the durable-across-restart retry queue described in spec §3:
//! a row exists iff a Signal message has been accepted from the daemon
//! but not yet acknowledged as forwarded to WhatsApp.

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use domain::entities::PendingSignalMessage;

use crate::error::BridgeError;

#[cfg_attr(test, automock)]
#[async_trait]
pub trait PendingSignalMessageStore: Send + Sync {
    /// Insert a row keyed by `id` (the sender/destination/timestamp key
    /// a poll worker derives for the inbound message), called before
    /// the forward attempt.
    async fn insert(&self, id: &str, pending: &PendingSignalMessage) -> Result<(), BridgeError>;

    /// Remove the row for `id`, called after a successful forward.
    async fn delete(&self, id: &str) -> Result<(), BridgeError>;

    /// Bump `retry_count` and record `error` after a failed forward
    /// attempt.
    async fn record_failure(&self, id: &str, error: &str) -> Result<(), BridgeError>;

    /// Every row whose `retry_count` is still below `max_retries`,
    /// for recovery on startup.
    async fn list_recoverable(
        &self,
        max_retries: u32,
    ) -> Result<Vec<(String, PendingSignalMessage)>, BridgeError>;
}
