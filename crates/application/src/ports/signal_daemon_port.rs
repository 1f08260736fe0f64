//! Signal daemon port
//!
//! Defines the operations the bridge depends on against the polled
//! Signal JSON-RPC/REST daemon (spec §6). The daemon's transport is a
//! collaborator contract; this port only names the calls we make and
//! the shapes we need back.

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use serde::{Deserialize, Serialize};

use crate::error::BridgeError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalSendResult {
    pub message_id: String,
    pub timestamp_ms: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalQuotedMessage {
    pub id: String,
    pub author: String,
    pub text: String,
    pub timestamp: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalAttachment {
    pub id: String,
    pub content_type: Option<String>,
    pub filename: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalReaction {
    pub emoji: String,
    pub target_timestamp: String,
    pub is_remove: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalDeletion {
    pub target_message_id: Option<String>,
    pub target_timestamp: Option<String>,
}

/// A single message delivered by `receive_messages`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalMessage {
    pub sender: String,
    pub destination: String,
    pub timestamp: i64,
    pub text: Option<String>,
    pub quoted: Option<SignalQuotedMessage>,
    pub attachments: Vec<SignalAttachment>,
    pub reaction: Option<SignalReaction>,
    pub deletion: Option<SignalDeletion>,
}

impl SignalMessage {
    #[must_use]
    pub fn is_group_sender(&self) -> bool {
        self.sender.starts_with("group.")
    }
}

/// Operations against the polled Signal JSON-RPC/REST daemon.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait SignalDaemonPort: Send + Sync {
    async fn send_message(
        &self,
        recipient: &str,
        body: &str,
        attachments: &[Vec<u8>],
    ) -> Result<SignalSendResult, BridgeError>;

    async fn receive_messages(&self, timeout_sec: u64) -> Result<Vec<SignalMessage>, BridgeError>;

    async fn initialize_device(&self) -> Result<(), BridgeError>;

    async fn download_attachment(&self, id: &str) -> Result<Vec<u8>, BridgeError>;
}
