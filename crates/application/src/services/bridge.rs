//! Bridge — translates inbound events from either platform into
//! outbound sends and persists the resulting mapping (spec §4.F)

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{instrument, warn};

use domain::entities::MessageMapping;
use domain::value_objects::{DeliveryStatus, WhatsAppChatId, MIN_PHONE_DIGITS};

use crate::error::BridgeError;
use crate::ports::{MessageMappingStore, SignalMessage, SignalDaemonPort, WhatsAppEnginePort};
use crate::services::channel_router::ChannelRouter;
use crate::services::contact_cache::ContactCache;
use crate::services::group_cache::GroupCache;
use crate::services::media_handler::MediaHandler;

/// Raw bytes plus a file extension for media that has already been
/// downloaded from the originating platform.
#[derive(Debug, Clone)]
pub struct MediaInput {
    pub bytes: Vec<u8>,
    pub extension: String,
}

/// The platform a generic `send` targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    WhatsApp,
    Signal,
}

/// A generic outbound message, dispatched by `Bridge::send`.
#[derive(Debug, Clone)]
pub struct OutboundMessage {
    pub platform: Platform,
    pub session_or_destination: String,
    pub chat_or_recipient: String,
    pub body: String,
}

/// The terminal outcome of processing one inbound Signal message
/// (spec §4.F state machine).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ForwardOutcome {
    DroppedGroup,
    ForwardedReaction,
    ForwardedDeletion,
    ForwardedReply,
    ForwardedAutoreply,
    DroppedEmpty,
    DroppedNoMapping,
    DroppedNewThread,
}

/// Outcome of resolving which WhatsApp chat a non-reaction/deletion
/// Signal message belongs to.
enum ChatResolution {
    Found(String),
    NoMapping,
    NoThread,
}

/// Counts of rows removed by a single retention sweep (spec §4.J "log
/// outcome").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CleanupOutcome {
    pub mappings_removed: u64,
    pub media_removed: u64,
}

pub struct Bridge {
    router: Arc<ChannelRouter>,
    contacts: Arc<ContactCache>,
    groups: Arc<GroupCache>,
    media: Arc<MediaHandler>,
    mappings: Arc<dyn MessageMappingStore>,
    whatsapp: Arc<dyn WhatsAppEnginePort>,
    signal: Arc<dyn SignalDaemonPort>,
}

impl Bridge {
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        router: Arc<ChannelRouter>,
        contacts: Arc<ContactCache>,
        groups: Arc<GroupCache>,
        media: Arc<MediaHandler>,
        mappings: Arc<dyn MessageMappingStore>,
        whatsapp: Arc<dyn WhatsAppEnginePort>,
        signal: Arc<dyn SignalDaemonPort>,
    ) -> Self {
        Self {
            router,
            contacts,
            groups,
            media,
            mappings,
            whatsapp,
            signal,
        }
    }

    /// Generic send dispatched by platform; used by notification
    /// helpers that do not need the full forward pipeline.
    pub async fn send(&self, message: &OutboundMessage) -> Result<(), BridgeError> {
        match message.platform {
            Platform::WhatsApp => {
                let result = self
                    .whatsapp
                    .send_text(
                        &message.session_or_destination,
                        &message.chat_or_recipient,
                        &message.body,
                    )
                    .await?;
                if !result.is_sent() {
                    return Err(BridgeError::Engine(format!(
                        "whatsapp engine returned status {}",
                        result.status
                    )));
                }
                Ok(())
            },
            Platform::Signal => {
                self.signal
                    .send_message(&message.chat_or_recipient, &message.body, &[])
                    .await?;
                Ok(())
            },
        }
    }

    /// Forward an inbound WhatsApp message to its paired Signal
    /// destination.
    #[instrument(skip(self, content, media), fields(session = %session, chat = %chat))]
    pub async fn forward_whatsapp(
        &self,
        session: &str,
        chat: &str,
        msg_id: &str,
        sender: &str,
        content: &str,
        media: Option<MediaInput>,
    ) -> Result<(), BridgeError> {
        let sender_number = sender.strip_suffix("@c.us").unwrap_or(sender);
        let display_name = self.contacts.display_name(sender_number, session).await;
        let body = if chat.ends_with("@g.us") {
            let group_name = self.groups.display_name(chat, session).await;
            format!("[{group_name}] {display_name}: {content}")
        } else {
            format!("{display_name}: {content}")
        };

        let attachments = match media {
            Some(input) => {
                let (_local_path, _media_type, _mime) =
                    self.media.process_media(&input.bytes, &input.extension).await?;
                vec![input.bytes]
            },
            None => Vec::new(),
        };

        let destination = self.router.destination_of(session)?;

        let result = self
            .signal
            .send_message(&destination, &body, &attachments)
            .await?;

        let now = Utc::now();
        let chat_id = WhatsAppChatId::new(chat)?;
        let mapping = MessageMapping::new(
            chat_id,
            msg_id,
            result.message_id,
            DateTime::<Utc>::from_timestamp_millis(result.timestamp_ms).unwrap_or(now),
            domain::value_objects::SessionName::new(session)?,
            None,
            now,
        )?
        .with_status(DeliveryStatus::Sent, now);

        self.mappings.save(&mapping).await?;
        Ok(())
    }

    /// Forward an inbound Signal message to the resolved WhatsApp chat.
    #[instrument(skip(self, msg), fields(destination = %destination))]
    pub async fn forward_signal(
        &self,
        msg: &SignalMessage,
        destination: &str,
    ) -> Result<ForwardOutcome, BridgeError> {
        if msg.is_group_sender() {
            warn!(sender = %msg.sender, "dropping group-originated signal message");
            return Ok(ForwardOutcome::DroppedGroup);
        }

        let session = self.router.session_of(destination)?;

        if let Some(reaction) = &msg.reaction {
            return self.forward_reaction(&session, reaction, destination).await;
        }

        if let Some(deletion) = &msg.deletion {
            return self.forward_deletion(&session, deletion).await;
        }

        let chat_id = match self.resolve_chat_for_reply(msg, &session).await? {
            ChatResolution::Found(chat_id) => chat_id,
            ChatResolution::NoMapping => return Ok(ForwardOutcome::DroppedNoMapping),
            ChatResolution::NoThread => {
                if msg.text.is_none() && msg.attachments.is_empty() {
                    return Ok(ForwardOutcome::DroppedEmpty);
                }
                return Ok(ForwardOutcome::DroppedNewThread);
            },
        };

        if msg.text.is_none() && msg.attachments.is_empty() {
            return Ok(ForwardOutcome::DroppedEmpty);
        }

        let outcome = if msg.quoted.is_some() {
            ForwardOutcome::ForwardedReply
        } else {
            ForwardOutcome::ForwardedAutoreply
        };

        if let Some(attachment) = msg.attachments.first() {
            self.forward_attachment(&session, &chat_id, attachment, msg.text.as_deref())
                .await?;
        } else if let Some(text) = &msg.text {
            let result = self.whatsapp.send_text(&session, &chat_id, text).await?;
            if !result.is_sent() {
                return Err(BridgeError::Engine(format!(
                    "whatsapp engine returned status {}",
                    result.status
                )));
            }
            self.persist_signal_mapping(&chat_id, &result.message_id, msg, &session)
                .await?;
        }

        Ok(outcome)
    }

    async fn forward_reaction(
        &self,
        session: &str,
        reaction: &crate::ports::SignalReaction,
        destination: &str,
    ) -> Result<ForwardOutcome, BridgeError> {
        let mapping = self
            .mappings
            .by_signal_id(&reaction.target_timestamp)
            .await?
            .ok_or_else(|| {
                BridgeError::NotFound(format!(
                    "no mapping for reaction target {}",
                    reaction.target_timestamp
                ))
            })?;

        let emoji = if reaction.is_remove { "" } else { &reaction.emoji };
        self.whatsapp
            .send_reaction(
                session,
                mapping.whatsapp_chat_id.as_str(),
                &mapping.whatsapp_msg_id,
                emoji,
            )
            .await?;
        let _ = destination;
        Ok(ForwardOutcome::ForwardedReaction)
    }

    async fn forward_deletion(
        &self,
        session: &str,
        deletion: &crate::ports::SignalDeletion,
    ) -> Result<ForwardOutcome, BridgeError> {
        let mapping = if let Some(id) = &deletion.target_message_id {
            self.mappings.by_signal_id(id).await?
        } else {
            None
        };
        let mapping = match mapping {
            Some(m) => Some(m),
            None => match &deletion.target_timestamp {
                Some(ts) => self.mappings.by_signal_id(ts).await?,
                None => None,
            },
        };
        let mapping = mapping.ok_or_else(|| {
            BridgeError::NotFound("no mapping for deletion target".to_string())
        })?;

        self.whatsapp
            .delete_message(session, mapping.whatsapp_chat_id.as_str(), &mapping.whatsapp_msg_id)
            .await?;
        Ok(ForwardOutcome::ForwardedDeletion)
    }

    /// Resolve the WhatsApp chat id a non-reaction/deletion Signal
    /// message should be forwarded to, per spec §4.F steps 5-7.
    ///
    /// A quoted message whose id and fallback-extracted chat both fail
    /// to resolve is `NoMapping` (step 5); a non-quoted message with no
    /// prior mapping for the session is `NoThread` (step 7) — these are
    /// distinct terminal outcomes and must not be conflated.
    async fn resolve_chat_for_reply(
        &self,
        msg: &SignalMessage,
        session: &str,
    ) -> Result<ChatResolution, BridgeError> {
        if let Some(quoted) = &msg.quoted {
            if let Some(mapping) = self.mappings.by_id(&quoted.id).await? {
                return Ok(ChatResolution::Found(mapping.whatsapp_chat_id.as_str().to_string()));
            }
            if let Some(chat) = extract_fallback_chat(&quoted.text) {
                return Ok(ChatResolution::Found(chat));
            }
            return Ok(ChatResolution::NoMapping);
        }

        if msg.text.is_none() && msg.attachments.is_empty() {
            return Ok(ChatResolution::NoThread);
        }

        match self.mappings.latest_by_session(session).await? {
            Some(mapping) => Ok(ChatResolution::Found(mapping.whatsapp_chat_id.as_str().to_string())),
            None => Ok(ChatResolution::NoThread),
        }
    }

    async fn forward_attachment(
        &self,
        session: &str,
        chat_id: &str,
        attachment: &crate::ports::SignalAttachment,
        caption: Option<&str>,
    ) -> Result<(), BridgeError> {
        let bytes = self.signal.download_attachment(&attachment.id).await?;
        let extension = attachment
            .filename
            .as_deref()
            .and_then(|name| name.rsplit('.').next())
            .unwrap_or("bin");
        let (_local_path, media_type, mime) = self.media.process_media(&bytes, extension).await?;

        let result = match media_type {
            domain::value_objects::MediaType::Image => {
                self.whatsapp.send_image(session, chat_id, &bytes, &mime, caption).await?
            },
            domain::value_objects::MediaType::Video => {
                self.whatsapp.send_video(session, chat_id, &bytes, &mime, caption).await?
            },
            domain::value_objects::MediaType::Voice => {
                self.whatsapp.send_voice(session, chat_id, &bytes, &mime).await?
            },
            domain::value_objects::MediaType::Document => {
                let filename = attachment.filename.clone().unwrap_or_else(|| "file.bin".to_string());
                self.whatsapp
                    .send_document(session, chat_id, &bytes, &filename, &mime, caption)
                    .await?
            },
        };

        if !result.is_sent() {
            return Err(BridgeError::Engine(format!(
                "whatsapp engine returned status {}",
                result.status
            )));
        }

        let chat_id_parsed = WhatsAppChatId::new(chat_id)?;
        let now = Utc::now();
        let mapping = MessageMapping::new(
            chat_id_parsed,
            result.message_id,
            String::new(),
            now,
            domain::value_objects::SessionName::new(session)?,
            None,
            now,
        );
        // An outbound-from-signal mapping may not yet have a signal id
        // worth persisting distinctly; errors constructing it are
        // logged, not fatal to the forward that already succeeded.
        if let Ok(mapping) = mapping {
            if let Err(error) = self.mappings.save(&mapping).await {
                warn!(%error, "failed to persist media forward mapping");
            }
        }
        Ok(())
    }

    async fn persist_signal_mapping(
        &self,
        chat_id: &str,
        whatsapp_msg_id: &str,
        msg: &SignalMessage,
        session: &str,
    ) -> Result<(), BridgeError> {
        let chat_id_parsed = WhatsAppChatId::new(chat_id)?;
        let now = Utc::now();
        let signal_id = msg.timestamp.to_string();
        let mapping = MessageMapping::new(
            chat_id_parsed,
            whatsapp_msg_id,
            signal_id,
            DateTime::<Utc>::from_timestamp_millis(msg.timestamp).unwrap_or(now),
            domain::value_objects::SessionName::new(session)?,
            None,
            now,
        )?
        .with_status(DeliveryStatus::Sent, now);
        self.mappings.save(&mapping).await
    }

    /// Retention sweep: delete old mappings and old media files,
    /// reporting how many rows/files were removed so the scheduler can
    /// log the outcome (spec §4.J).
    pub async fn cleanup_old(&self, days: u32) -> Result<CleanupOutcome, BridgeError> {
        let mappings_removed = self.mappings.cleanup_older_than(days).await?;
        let media_removed = self.media.cleanup_old(u64::from(days) * 86_400).await?;
        Ok(CleanupOutcome { mappings_removed, media_removed })
    }
}

/// Extract a WhatsApp chat id from a quoted body of the shape
/// `"<anything> <digits>: rest"`, accepting digit-only tails of at
/// least `MIN_PHONE_DIGITS` characters (spec §4.F step 5).
fn extract_fallback_chat(quoted_text: &str) -> Option<String> {
    let (prefix, _) = quoted_text.split_once(": ")?;
    let digits: String = prefix.chars().rev().take_while(char::is_ascii_digit).collect();
    let digits: String = digits.chars().rev().collect();
    if digits.len() < MIN_PHONE_DIGITS {
        return None;
    }
    Some(format!("{digits}@c.us"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::entities::Channel;

    use crate::ports::{
        MockContactCacheStore, MockGroupCacheStore, MockMediaStore, MockMessageMappingStore,
        MockSignalDaemonPort, MockWhatsAppEnginePort, SignalQuotedMessage,
    };
    use crate::services::channel_router::ChannelRouter;
    use crate::services::contact_cache::ContactCache;
    use crate::services::group_cache::GroupCache;
    use crate::services::media_handler::{MediaConfig, MediaHandler};

    fn test_bridge(mappings: MockMessageMappingStore) -> Bridge {
        let router = Arc::new(
            ChannelRouter::new(vec![Channel::new("personal", "+1111111111").unwrap()]).unwrap(),
        );
        let contacts = Arc::new(ContactCache::new(
            Arc::new(MockContactCacheStore::new()),
            Arc::new(MockWhatsAppEnginePort::new()),
        ));
        let groups = Arc::new(GroupCache::new(
            Arc::new(MockGroupCacheStore::new()),
            Arc::new(MockWhatsAppEnginePort::new()),
        ));
        let media = Arc::new(MediaHandler::new(Arc::new(MockMediaStore::new()), MediaConfig::default()));
        Bridge::new(
            router,
            contacts,
            groups,
            media,
            Arc::new(mappings),
            Arc::new(MockWhatsAppEnginePort::new()),
            Arc::new(MockSignalDaemonPort::new()),
        )
    }

    fn quoted_message(quote_id: &str, quoted_text: &str) -> SignalMessage {
        SignalMessage {
            sender: "+9999999999".to_string(),
            destination: String::new(),
            timestamp: 42,
            text: Some("reply text".to_string()),
            quoted: Some(SignalQuotedMessage {
                id: quote_id.to_string(),
                author: String::new(),
                text: quoted_text.to_string(),
                timestamp: 0,
            }),
            attachments: Vec::new(),
            reaction: None,
            deletion: None,
        }
    }

    fn unquoted_message_with_text() -> SignalMessage {
        SignalMessage {
            sender: "+9999999999".to_string(),
            destination: String::new(),
            timestamp: 42,
            text: Some("new thread text".to_string()),
            quoted: None,
            attachments: Vec::new(),
            reaction: None,
            deletion: None,
        }
    }

    #[tokio::test]
    async fn quoted_message_with_unresolvable_mapping_is_dropped_no_mapping() {
        let mut mappings = MockMessageMappingStore::new();
        mappings.expect_by_id().returning(|_| Ok(None));
        let bridge = test_bridge(mappings);

        // quoted text has no "<digits>: " prefix, so fallback extraction
        // also fails — both lookup paths in step 5 are exhausted.
        let msg = quoted_message("missing-quote-id", "no prefix here");
        let outcome = bridge.forward_signal(&msg, "+1111111111").await.unwrap();
        assert_eq!(outcome, ForwardOutcome::DroppedNoMapping);
    }

    #[tokio::test]
    async fn unquoted_message_with_no_history_is_dropped_new_thread() {
        let mut mappings = MockMessageMappingStore::new();
        mappings.expect_latest_by_session().returning(|_| Ok(None));
        let bridge = test_bridge(mappings);

        let msg = unquoted_message_with_text();
        let outcome = bridge.forward_signal(&msg, "+1111111111").await.unwrap();
        assert_eq!(outcome, ForwardOutcome::DroppedNewThread);
    }

    #[test]
    fn extracts_chat_from_fallback_prefix() {
        assert_eq!(
            extract_fallback_chat("📱 4412345678: hello"),
            Some("4412345678@c.us".to_string())
        );
    }

    #[test]
    fn rejects_fallback_prefix_too_short() {
        assert_eq!(extract_fallback_chat("📱 123: hello"), None);
    }

    #[test]
    fn rejects_prefix_without_digits() {
        assert_eq!(extract_fallback_chat("no digits here: hello"), None);
    }

    #[test]
    fn rejects_text_without_separator() {
        assert_eq!(extract_fallback_chat("just some text"), None);
    }
}
