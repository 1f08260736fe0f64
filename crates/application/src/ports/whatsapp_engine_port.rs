//! WhatsApp engine port
//!
//! Defines the session-scoped operations the bridge depends on against
//! the external WhatsApp HTTP engine (spec §6). The engine's transport
//! is a collaborator contract; this port only names the calls we make
//! and the shapes we need back.

use std::time::Duration;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use serde::{Deserialize, Serialize};

use crate::error::BridgeError;

/// Response shared by every WhatsApp send operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WhatsAppSendResult {
    pub status: String,
    pub message_id: String,
    pub timestamp_ms: i64,
}

impl WhatsAppSendResult {
    #[must_use]
    pub fn is_sent(&self) -> bool {
        self.status == "sent"
    }
}

/// A contact as returned by the engine's `GetContact`/`GetAllContacts`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineContact {
    pub contact_id: String,
    pub phone_number: String,
    pub name: Option<String>,
    pub push_name: Option<String>,
    pub short_name: Option<String>,
    pub is_group: bool,
    pub is_blocked: bool,
    pub is_my_contact: bool,
}

/// A group as returned by the engine's `GetGroup`/`GetAllGroups`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineGroup {
    pub group_id: String,
    pub subject: Option<String>,
    pub description: Option<String>,
    pub participant_count: u32,
}

/// The WhatsApp-engine session status string, observed by the session
/// monitor (spec §4.I).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStatus(pub String);

impl SessionStatus {
    #[must_use]
    pub fn is_working(&self) -> bool {
        self.0 == "WORKING"
    }

    #[must_use]
    pub fn is_starting(&self) -> bool {
        self.0 == "STARTING"
    }
}

/// Session-scoped operations against the WhatsApp HTTP engine.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait WhatsAppEnginePort: Send + Sync {
    async fn send_text(
        &self,
        session: &str,
        chat_id: &str,
        text: &str,
    ) -> Result<WhatsAppSendResult, BridgeError>;

    async fn send_image<'a>(
        &self,
        session: &str,
        chat_id: &str,
        bytes: &[u8],
        mime: &str,
        caption: Option<&'a str>,
    ) -> Result<WhatsAppSendResult, BridgeError>;

    async fn send_video<'a>(
        &self,
        session: &str,
        chat_id: &str,
        bytes: &[u8],
        mime: &str,
        caption: Option<&'a str>,
    ) -> Result<WhatsAppSendResult, BridgeError>;

    /// `mime` defaults to `audio/ogg` (the engine's preferred outbound
    /// voice format) when content sniffing and extension lookup both
    /// fail to identify the attachment (spec §4.E).
    async fn send_voice(
        &self,
        session: &str,
        chat_id: &str,
        bytes: &[u8],
        mime: &str,
    ) -> Result<WhatsAppSendResult, BridgeError>;

    async fn send_document<'a>(
        &self,
        session: &str,
        chat_id: &str,
        bytes: &[u8],
        filename: &str,
        mime: &str,
        caption: Option<&'a str>,
    ) -> Result<WhatsAppSendResult, BridgeError>;

    /// Send a reaction; an empty `emoji` removes a previously sent one.
    async fn send_reaction(
        &self,
        session: &str,
        chat_id: &str,
        msg_id: &str,
        emoji: &str,
    ) -> Result<(), BridgeError>;

    async fn delete_message(
        &self,
        session: &str,
        chat_id: &str,
        msg_id: &str,
    ) -> Result<(), BridgeError>;

    async fn send_seen(
        &self,
        session: &str,
        chat_id: &str,
        msg_id: &str,
    ) -> Result<(), BridgeError>;

    async fn get_contact(
        &self,
        session: &str,
        phone: &str,
    ) -> Result<EngineContact, BridgeError>;

    async fn get_all_contacts(
        &self,
        session: &str,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<EngineContact>, BridgeError>;

    async fn get_group(&self, session: &str, group_id: &str) -> Result<EngineGroup, BridgeError>;

    async fn get_all_groups(&self, session: &str) -> Result<Vec<EngineGroup>, BridgeError>;

    /// Fetch the bytes behind a media URL from an inbound webhook
    /// payload.
    async fn download_media(&self, url: &str) -> Result<Vec<u8>, BridgeError>;

    async fn get_session_status(&self, session: &str) -> Result<SessionStatus, BridgeError>;

    async fn restart_session(&self, session: &str) -> Result<(), BridgeError>;

    async fn wait_for_session_ready(
        &self,
        session: &str,
        timeout: Duration,
    ) -> Result<(), BridgeError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn send_result_is_sent_only_for_exact_status() {
        let sent = WhatsAppSendResult {
            status: "sent".to_string(),
            message_id: "m1".to_string(),
            timestamp_ms: 0,
        };
        assert!(sent.is_sent());

        let queued = WhatsAppSendResult {
            status: "queued".to_string(),
            message_id: "m1".to_string(),
            timestamp_ms: 0,
        };
        assert!(!queued.is_sent());
    }

    #[test]
    fn session_status_recognizes_working_and_starting() {
        assert!(SessionStatus("WORKING".to_string()).is_working());
        assert!(SessionStatus("STARTING".to_string()).is_starting());
        assert!(!SessionStatus("FAILED".to_string()).is_working());
    }
}
