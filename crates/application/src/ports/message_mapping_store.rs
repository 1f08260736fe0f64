//! Message mapping store port
//!
//! Implemented by an infrastructure adapter backed by an encrypted
//! on-disk store (see spec §4.B). All lookup methods are linearizable
//! with respect to a preceding `save`.

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use domain::entities::MessageMapping;
use domain::value_objects::DeliveryStatus;

use crate::error::BridgeError;

/// Persistence port for `MessageMapping` rows.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait MessageMappingStore: Send + Sync {
    /// Insert or update a mapping keyed by its natural id (upsert on
    /// retry).
    async fn save(&self, mapping: &MessageMapping) -> Result<(), BridgeError>;

    /// Look up a mapping by its WhatsApp message id.
    async fn by_whatsapp_id(&self, id: &str) -> Result<Option<MessageMapping>, BridgeError>;

    /// Look up a mapping by its Signal message id.
    async fn by_signal_id(&self, id: &str) -> Result<Option<MessageMapping>, BridgeError>;

    /// Look up a mapping by whichever platform id matches.
    async fn by_id(&self, id: &str) -> Result<Option<MessageMapping>, BridgeError>;

    /// Most recent mapping for a session, used by the auto-reply
    /// heuristic.
    async fn latest_by_session(
        &self,
        session: &str,
    ) -> Result<Option<MessageMapping>, BridgeError>;

    /// Whether any mapping exists linking this session to this Signal
    /// sender, used by poller destination disambiguation.
    async fn has_history_between(
        &self,
        session: &str,
        signal_sender: &str,
    ) -> Result<bool, BridgeError>;

    /// Update only the delivery status of an existing mapping.
    async fn update_delivery_status(
        &self,
        id: &str,
        status: DeliveryStatus,
    ) -> Result<(), BridgeError>;

    /// Delete mappings whose `updated_at` is older than `days`.
    ///
    /// Returns the number of rows removed.
    async fn cleanup_older_than(&self, days: u32) -> Result<u64, BridgeError>;
}
