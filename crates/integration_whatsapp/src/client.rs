//! WhatsApp engine HTTP client
//!
//! Talks to a self-hosted, session-scoped WhatsApp engine (the
//! WAHA-style REST surface named in spec §6): every call takes a
//! `session` and addresses a chat by its `@c.us`/`@g.us`/`@lid` id.

use std::time::Duration;

use application::error::BridgeError;
use application::ports::{
    EngineContact, EngineGroup, SessionStatus, WhatsAppEnginePort, WhatsAppSendResult,
};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument};

/// Errors raised by the WhatsApp engine client, before classification
/// into the application layer's `BridgeError`.
#[derive(Debug, Error)]
pub enum WhatsAppError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("engine rejected the request: {status} {body}")]
    Engine { status: u16, body: String },

    #[error("engine response was malformed: {0}")]
    MalformedResponse(String),
}

impl From<WhatsAppError> for BridgeError {
    fn from(err: WhatsAppError) -> Self {
        let message = err.to_string();
        if BridgeError::classify_message(&message) {
            Self::Retryable(message)
        } else {
            Self::Engine(message)
        }
    }
}

/// WhatsApp engine client configuration.
#[derive(Debug, Clone)]
pub struct WhatsAppClientConfig {
    pub base_url: String,
    pub timeout: Duration,
}

/// HTTP client for the session-scoped WhatsApp engine.
#[derive(Debug, Clone)]
pub struct WhatsAppClient {
    client: Client,
    base_url: String,
}

impl WhatsAppClient {
    /// # Errors
    /// Returns an error if the underlying HTTP client fails to build.
    pub fn new(config: WhatsAppClientConfig) -> Result<Self, WhatsAppError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, base_url: config.base_url.trim_end_matches('/').to_string() })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn send_json<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        body: &impl Serialize,
    ) -> Result<T, WhatsAppError> {
        let response = self.client.post(self.url(path)).json(body).send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(WhatsAppError::Engine { status: status.as_u16(), body: text });
        }

        serde_json::from_str(&text).map_err(|e| WhatsAppError::MalformedResponse(e.to_string()))
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(&self, path: &str) -> Result<T, WhatsAppError> {
        let response = self.client.get(self.url(path)).send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(WhatsAppError::Engine { status: status.as_u16(), body: text });
        }

        serde_json::from_str(&text).map_err(|e| WhatsAppError::MalformedResponse(e.to_string()))
    }

    async fn post_empty(&self, path: &str, body: &impl Serialize) -> Result<(), WhatsAppError> {
        let response = self.client.post(self.url(path)).json(body).send().await?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let text = response.text().await.unwrap_or_default();
            Err(WhatsAppError::Engine { status: status.as_u16(), body: text })
        }
    }

    async fn send_media_multipart(
        &self,
        path: &str,
        session: &str,
        chat_id: &str,
        bytes: &[u8],
        filename: &str,
        mime: &str,
        caption: Option<&str>,
    ) -> Result<WhatsAppSendResult, WhatsAppError> {
        let part = Part::bytes(bytes.to_vec()).file_name(filename.to_string());
        let part = part.mime_str(mime).unwrap_or_else(|_| {
            Part::bytes(bytes.to_vec()).file_name(filename.to_string())
        });

        let mut form = Form::new()
            .text("session", session.to_string())
            .text("chatId", chat_id.to_string())
            .part("file", part);

        if let Some(caption) = caption {
            form = form.text("caption", caption.to_string());
        }

        let response = self.client.post(self.url(path)).multipart(form).send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(WhatsAppError::Engine { status: status.as_u16(), body: text });
        }

        serde_json::from_str(&text).map_err(|e| WhatsAppError::MalformedResponse(e.to_string()))
    }
}

#[derive(Serialize)]
struct TextBody<'a> {
    session: &'a str,
    chat_id: &'a str,
    text: &'a str,
}

#[derive(Serialize)]
struct ReactionBody<'a> {
    session: &'a str,
    chat_id: &'a str,
    message_id: &'a str,
    reaction: &'a str,
}

#[derive(Serialize)]
struct MessageIdBody<'a> {
    session: &'a str,
    chat_id: &'a str,
    message_id: &'a str,
}

#[async_trait]
impl WhatsAppEnginePort for WhatsAppClient {
    #[instrument(skip(self, text), fields(session = %session, chat_id = %chat_id))]
    async fn send_text(&self, session: &str, chat_id: &str, text: &str) -> Result<WhatsAppSendResult, BridgeError> {
        let result: WhatsAppSendResult =
            self.send_json("/api/sendText", &TextBody { session, chat_id, text }).await?;
        debug!(message_id = %result.message_id, "sent text message");
        Ok(result)
    }

    async fn send_image<'a>(
        &self,
        session: &str,
        chat_id: &str,
        bytes: &[u8],
        mime: &str,
        caption: Option<&'a str>,
    ) -> Result<WhatsAppSendResult, BridgeError> {
        Ok(self.send_media_multipart("/api/sendImage", session, chat_id, bytes, "image", mime, caption).await?)
    }

    async fn send_video<'a>(
        &self,
        session: &str,
        chat_id: &str,
        bytes: &[u8],
        mime: &str,
        caption: Option<&'a str>,
    ) -> Result<WhatsAppSendResult, BridgeError> {
        Ok(self.send_media_multipart("/api/sendVideo", session, chat_id, bytes, "video", mime, caption).await?)
    }

    async fn send_voice(
        &self,
        session: &str,
        chat_id: &str,
        bytes: &[u8],
        mime: &str,
    ) -> Result<WhatsAppSendResult, BridgeError> {
        Ok(self.send_media_multipart("/api/sendVoice", session, chat_id, bytes, "voice", mime, None).await?)
    }

    async fn send_document<'a>(
        &self,
        session: &str,
        chat_id: &str,
        bytes: &[u8],
        filename: &str,
        mime: &str,
        caption: Option<&'a str>,
    ) -> Result<WhatsAppSendResult, BridgeError> {
        Ok(self
            .send_media_multipart("/api/sendDocument", session, chat_id, bytes, filename, mime, caption)
            .await?)
    }

    async fn send_reaction(&self, session: &str, chat_id: &str, msg_id: &str, emoji: &str) -> Result<(), BridgeError> {
        Ok(self
            .post_empty(
                "/api/reaction",
                &ReactionBody { session, chat_id, message_id: msg_id, reaction: emoji },
            )
            .await?)
    }

    async fn delete_message(&self, session: &str, chat_id: &str, msg_id: &str) -> Result<(), BridgeError> {
        Ok(self
            .post_empty("/api/deleteMessage", &MessageIdBody { session, chat_id, message_id: msg_id })
            .await?)
    }

    async fn send_seen(&self, session: &str, chat_id: &str, msg_id: &str) -> Result<(), BridgeError> {
        Ok(self
            .post_empty("/api/sendSeen", &MessageIdBody { session, chat_id, message_id: msg_id })
            .await?)
    }

    async fn get_contact(&self, session: &str, phone: &str) -> Result<EngineContact, BridgeError> {
        Ok(self
            .get_json(&format!("/api/{session}/contacts?contactId={phone}"))
            .await?)
    }

    async fn get_all_contacts(&self, session: &str, limit: u32, offset: u32) -> Result<Vec<EngineContact>, BridgeError> {
        Ok(self
            .get_json(&format!("/api/{session}/contacts/all?limit={limit}&offset={offset}"))
            .await?)
    }

    async fn get_group(&self, session: &str, group_id: &str) -> Result<EngineGroup, BridgeError> {
        Ok(self.get_json(&format!("/api/{session}/groups/{group_id}")).await?)
    }

    async fn get_all_groups(&self, session: &str) -> Result<Vec<EngineGroup>, BridgeError> {
        Ok(self.get_json(&format!("/api/{session}/groups")).await?)
    }

    async fn download_media(&self, url: &str) -> Result<Vec<u8>, BridgeError> {
        let response = self.client.get(url).send().await.map_err(WhatsAppError::Request)?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(WhatsAppError::Engine { status: status.as_u16(), body }.into());
        }
        Ok(response.bytes().await.map_err(WhatsAppError::Request)?.to_vec())
    }

    async fn get_session_status(&self, session: &str) -> Result<SessionStatus, BridgeError> {
        #[derive(Deserialize)]
        struct StatusResponse {
            status: String,
        }
        let response: StatusResponse = self.get_json(&format!("/api/sessions/{session}")).await?;
        Ok(SessionStatus(response.status))
    }

    async fn restart_session(&self, session: &str) -> Result<(), BridgeError> {
        #[derive(Serialize)]
        struct Empty {}
        Ok(self.post_empty(&format!("/api/sessions/{session}/restart"), &Empty {}).await?)
    }

    #[instrument(skip(self), fields(session = %session))]
    async fn wait_for_session_ready(&self, session: &str, timeout: Duration) -> Result<(), BridgeError> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let status = self.get_session_status(session).await?;
            if status.is_working() {
                return Ok(());
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(BridgeError::Retryable(format!(
                    "session {session} did not become ready within {timeout:?}"
                )));
            }
            tokio::time::sleep(Duration::from_secs(2)).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_auth_rejection_is_not_retryable() {
        let err = WhatsAppError::Engine { status: 401, body: "unauthorized".to_string() };
        assert!(!BridgeError::from(err).is_retryable());
    }

    #[test]
    fn engine_timeout_message_is_retryable() {
        let err = WhatsAppError::Engine { status: 503, body: "upstream request timeout".to_string() };
        assert!(BridgeError::from(err).is_retryable());
    }

    #[test]
    fn malformed_response_is_not_retryable() {
        let err = WhatsAppError::MalformedResponse("malformed json".to_string());
        assert!(!BridgeError::from(err).is_retryable());
    }
}
