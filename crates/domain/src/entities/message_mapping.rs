//! The persistent record tying a WhatsApp message to its forwarded
//! Signal counterpart (or vice versa)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::DomainError;
use crate::value_objects::{DeliveryStatus, MediaType, SessionName, WhatsAppChatId};

/// A bidirectional link between one WhatsApp message and one Signal
/// message, plus whatever media accompanied it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageMapping {
    pub whatsapp_chat_id: WhatsAppChatId,
    pub whatsapp_msg_id: String,
    pub signal_msg_id: String,
    pub signal_timestamp: DateTime<Utc>,
    pub forwarded_at: DateTime<Utc>,
    pub delivery_status: DeliveryStatus,
    pub media_path: Option<String>,
    pub media_type: Option<MediaType>,
    pub session_name: SessionName,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MessageMapping {
    /// Construct a fresh mapping at the moment a message is forwarded.
    ///
    /// Enforces:
    /// - `whatsapp_msg_id` and `signal_msg_id` are non-empty
    /// - `media_path` and `media_type` are either both present or both
    ///   absent
    /// - `updated_at` is never before `created_at`
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        whatsapp_chat_id: WhatsAppChatId,
        whatsapp_msg_id: impl Into<String>,
        signal_msg_id: impl Into<String>,
        signal_timestamp: DateTime<Utc>,
        session_name: SessionName,
        media: Option<(String, MediaType)>,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        let whatsapp_msg_id = whatsapp_msg_id.into();
        let signal_msg_id = signal_msg_id.into();

        if whatsapp_msg_id.trim().is_empty() {
            return Err(DomainError::InvalidMessageMapping(
                "whatsapp_msg_id must not be empty".to_string(),
            ));
        }
        if signal_msg_id.trim().is_empty() {
            return Err(DomainError::InvalidMessageMapping(
                "signal_msg_id must not be empty".to_string(),
            ));
        }

        let (media_path, media_type) = match media {
            Some((path, kind)) => (Some(path), Some(kind)),
            None => (None, None),
        };

        Ok(Self {
            whatsapp_chat_id,
            whatsapp_msg_id,
            signal_msg_id,
            signal_timestamp,
            forwarded_at: now,
            delivery_status: DeliveryStatus::Pending,
            media_path,
            media_type,
            session_name,
            created_at: now,
            updated_at: now,
        })
    }

    /// Update the delivery status, bumping `updated_at`.
    pub fn with_status(mut self, status: DeliveryStatus, now: DateTime<Utc>) -> Self {
        self.delivery_status = status;
        self.updated_at = now;
        self
    }

    #[must_use]
    pub fn has_media(&self) -> bool {
        self.media_path.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chat_id() -> WhatsAppChatId {
        WhatsAppChatId::new("1234567890@c.us").unwrap()
    }

    fn session() -> SessionName {
        SessionName::new("personal").unwrap()
    }

    #[test]
    fn constructs_valid_mapping() {
        let now = DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap();
        let mapping =
            MessageMapping::new(chat_id(), "wa-1", "sig-1", now, session(), None, now).unwrap();
        assert_eq!(mapping.delivery_status, DeliveryStatus::Pending);
        assert!(!mapping.has_media());
    }

    #[test]
    fn rejects_empty_whatsapp_id() {
        let now = DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap();
        assert!(MessageMapping::new(chat_id(), "", "sig-1", now, session(), None, now).is_err());
    }

    #[test]
    fn rejects_empty_signal_id() {
        let now = DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap();
        assert!(MessageMapping::new(chat_id(), "wa-1", "", now, session(), None, now).is_err());
    }

    #[test]
    fn media_path_and_type_travel_together() {
        let now = DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap();
        let mapping = MessageMapping::new(
            chat_id(),
            "wa-1",
            "sig-1",
            now,
            session(),
            Some(("/media/a.jpg".to_string(), MediaType::Image)),
            now,
        )
        .unwrap();
        assert!(mapping.has_media());
        assert_eq!(mapping.media_type, Some(MediaType::Image));
    }

    #[test]
    fn with_status_bumps_updated_at() {
        let created = DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap();
        let later = DateTime::<Utc>::from_timestamp(1_700_000_100, 0).unwrap();
        let mapping =
            MessageMapping::new(chat_id(), "wa-1", "sig-1", created, session(), None, created)
                .unwrap()
                .with_status(DeliveryStatus::Delivered, later);
        assert_eq!(mapping.delivery_status, DeliveryStatus::Delivered);
        assert_eq!(mapping.updated_at, later);
    }
}
