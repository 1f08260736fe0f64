//! Signal daemon JSON-RPC/REST client
//!
//! Talks to a polled signal-cli-rest-api-style daemon (spec §6):
//! `POST /v2/send` to deliver, `GET /v1/receive/{number}` to long-poll,
//! `GET /v1/attachments/{id}` to fetch media, and an account check used
//! as the one-time `initialize_device` call at poller startup.

use std::time::Duration;

use application::error::BridgeError;
use application::ports::{
    SignalAttachment, SignalDaemonPort, SignalDeletion, SignalMessage, SignalQuotedMessage,
    SignalReaction, SignalSendResult,
};
use async_trait::async_trait;
use base64::Engine as _;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::error::SignalError;

/// Signal daemon client configuration.
#[derive(Debug, Clone)]
pub struct SignalClientConfig {
    pub rpc_url: String,
    pub intermediary_phone_number: String,
    pub timeout: Duration,
}

/// HTTP client for the polled Signal JSON-RPC/REST daemon.
#[derive(Debug, Clone)]
pub struct SignalClient {
    client: Client,
    rpc_url: String,
    intermediary_phone_number: String,
}

impl SignalClient {
    /// # Errors
    /// Returns an error if the underlying HTTP client fails to build.
    pub fn new(config: SignalClientConfig) -> Result<Self, SignalError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            rpc_url: config.rpc_url.trim_end_matches('/').to_string(),
            intermediary_phone_number: config.intermediary_phone_number,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.rpc_url)
    }

    async fn get_bytes(&self, path: &str) -> Result<Vec<u8>, SignalError> {
        let response = self.client.get(self.url(path)).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SignalError::Daemon { status: status.as_u16(), body });
        }
        Ok(response.bytes().await?.to_vec())
    }
}

#[derive(Serialize)]
struct SendRequest<'a> {
    message: &'a str,
    number: &'a str,
    recipients: Vec<&'a str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    base64_attachments: Vec<String>,
}

#[derive(Deserialize)]
struct SendResponse {
    timestamp: i64,
}

#[derive(Deserialize)]
struct ReceiveEnvelopeWrapper {
    envelope: DaemonEnvelope,
}

#[derive(Deserialize)]
struct DaemonEnvelope {
    #[serde(default, rename = "sourceNumber")]
    source_number: Option<String>,
    #[serde(default)]
    source: Option<String>,
    timestamp: i64,
    #[serde(default, rename = "dataMessage")]
    data_message: Option<DaemonDataMessage>,
}

#[derive(Deserialize)]
struct DaemonDataMessage {
    #[serde(default)]
    message: Option<String>,
    timestamp: i64,
    #[serde(default)]
    quote: Option<DaemonQuote>,
    #[serde(default)]
    attachments: Vec<DaemonAttachment>,
    #[serde(default)]
    reaction: Option<DaemonReaction>,
    #[serde(default, rename = "remoteDelete")]
    remote_delete: Option<DaemonRemoteDelete>,
}

#[derive(Deserialize)]
struct DaemonQuote {
    id: i64,
    author: String,
    text: Option<String>,
}

#[derive(Deserialize)]
struct DaemonAttachment {
    id: String,
    #[serde(default, rename = "contentType")]
    content_type: Option<String>,
    #[serde(default)]
    filename: Option<String>,
}

#[derive(Deserialize)]
struct DaemonReaction {
    emoji: String,
    #[serde(rename = "targetSentTimestamp")]
    target_sent_timestamp: i64,
    #[serde(rename = "isRemove")]
    is_remove: bool,
}

#[derive(Deserialize)]
struct DaemonRemoteDelete {
    timestamp: i64,
}

fn into_port_message(destination: &str, wrapper: ReceiveEnvelopeWrapper) -> Option<SignalMessage> {
    let envelope = wrapper.envelope;
    let sender = envelope
        .source_number
        .or(envelope.source)
        .unwrap_or_default();
    let data = envelope.data_message?;

    let quoted = data.quote.map(|q| SignalQuotedMessage {
        id: q.id.to_string(),
        author: q.author,
        text: q.text.unwrap_or_default(),
        timestamp: q.id,
    });

    let attachments = data
        .attachments
        .into_iter()
        .map(|a| SignalAttachment {
            id: a.id,
            content_type: a.content_type,
            filename: a.filename,
        })
        .collect();

    let reaction = data.reaction.map(|r| SignalReaction {
        emoji: r.emoji,
        target_timestamp: r.target_sent_timestamp.to_string(),
        is_remove: r.is_remove,
    });

    let deletion = data.remote_delete.map(|d| SignalDeletion {
        target_message_id: None,
        target_timestamp: Some(d.timestamp.to_string()),
    });

    Some(SignalMessage {
        sender,
        destination: destination.to_string(),
        timestamp: data.timestamp.max(envelope.timestamp),
        text: data.message,
        quoted,
        attachments,
        reaction,
        deletion,
    })
}

#[async_trait]
impl SignalDaemonPort for SignalClient {
    #[instrument(skip(self, body, attachments), fields(recipient = %recipient))]
    async fn send_message(
        &self,
        recipient: &str,
        body: &str,
        attachments: &[Vec<u8>],
    ) -> Result<SignalSendResult, BridgeError> {
        let base64_attachments = attachments
            .iter()
            .map(|bytes| base64::engine::general_purpose::STANDARD.encode(bytes))
            .collect();

        let request = SendRequest {
            message: body,
            number: &self.intermediary_phone_number,
            recipients: vec![recipient],
            base64_attachments,
        };

        let response = self.client.post(self.url("/v2/send")).json(&request).send().await;
        let response = response.map_err(SignalError::from)?;
        let status = response.status();
        let text = response.text().await.map_err(SignalError::from)?;

        if !status.is_success() {
            return Err(SignalError::Daemon { status: status.as_u16(), body: text }.into());
        }

        let parsed: SendResponse =
            serde_json::from_str(&text).map_err(|e| SignalError::MalformedResponse(e.to_string()))?;

        debug!(timestamp = parsed.timestamp, "sent signal message");
        Ok(SignalSendResult {
            message_id: parsed.timestamp.to_string(),
            timestamp_ms: parsed.timestamp,
        })
    }

    #[instrument(skip(self))]
    async fn receive_messages(&self, timeout_sec: u64) -> Result<Vec<SignalMessage>, BridgeError> {
        let path = format!(
            "/v1/receive/{}?timeout={timeout_sec}",
            self.intermediary_phone_number
        );
        let response = self.client.get(self.url(&path)).send().await.map_err(SignalError::from)?;
        let status = response.status();
        let text = response.text().await.map_err(SignalError::from)?;

        if !status.is_success() {
            return Err(SignalError::Daemon { status: status.as_u16(), body: text }.into());
        }

        let wrappers: Vec<ReceiveEnvelopeWrapper> = serde_json::from_str(&text)
            .map_err(|e| SignalError::MalformedResponse(e.to_string()))?;

        Ok(wrappers
            .into_iter()
            .filter_map(|wrapper| into_port_message(&self.intermediary_phone_number, wrapper))
            .collect())
    }

    #[instrument(skip(self))]
    async fn initialize_device(&self) -> Result<(), BridgeError> {
        let path = format!("/v1/accounts/{}", self.intermediary_phone_number);
        let response = self.client.get(self.url(&path)).send().await.map_err(SignalError::from)?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(SignalError::Daemon { status: status.as_u16(), body }.into())
        }
    }

    #[instrument(skip(self))]
    async fn download_attachment(&self, id: &str) -> Result<Vec<u8>, BridgeError> {
        Ok(self.get_bytes(&format!("/v1/attachments/{id}")).await?)
    }
}
