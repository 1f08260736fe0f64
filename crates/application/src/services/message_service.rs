//! Message Service — in-flight dedup, per-chat serialisation, and
//! polling orchestration on top of the Bridge (spec §4.G)

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use domain::entities::PendingSignalMessage;
use domain::value_objects::PhoneNumber;
use parking_lot::Mutex as SyncMutex;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{instrument, warn};

use crate::error::BridgeError;
use crate::ports::{MessageMappingStore, PendingSignalMessageStore, SignalDaemonPort, SignalMessage};
use crate::services::bridge::{Bridge, ForwardOutcome, MediaInput};
use crate::services::channel_router::ChannelRouter;

/// Recovery gives up on a pending row once it has failed this many
/// times, leaving it for an operator to inspect rather than retrying
/// forever (spec §3: "retry_count bounds recovery attempts").
pub const MAX_PENDING_RETRIES: u32 = 5;

/// The natural key a polled Signal message is tracked under in the
/// durable pending queue: sender and destination disambiguate which
/// channel the message belongs to, and Signal's own timestamp is
/// unique per sender.
fn pending_key(msg: &SignalMessage, destination: &str) -> String {
    format!("{}:{}:{}", msg.sender, destination, msg.timestamp)
}

/// Opportunistic reset threshold for the per-chat lock map: unheld
/// mutexes are reclaimable, so clearing the map when it grows beyond
/// this size is safe (spec §4.G, §9).
pub const DEFAULT_MAX_CHAT_LOCKS: usize = 10_000;

struct ChatLocks {
    locks: SyncMutex<std::collections::HashMap<String, Arc<AsyncMutex<()>>>>,
    max_entries: usize,
}

impl ChatLocks {
    fn new(max_entries: usize) -> Self {
        Self {
            locks: SyncMutex::new(std::collections::HashMap::new()),
            max_entries,
        }
    }

    fn get(&self, key: &str) -> Arc<AsyncMutex<()>> {
        let mut locks = self.locks.lock();
        if locks.len() > self.max_entries {
            locks.clear();
        }
        locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }
}

/// Process-local concurrent set preventing duplicate concurrent
/// processing of the same source message id.
struct InFlightDedup {
    inner: SyncMutex<HashSet<String>>,
}

impl InFlightDedup {
    fn new() -> Self {
        Self {
            inner: SyncMutex::new(HashSet::new()),
        }
    }

    /// Returns `true` if this id was newly claimed, `false` if it was
    /// already in flight.
    fn load_or_store(&self, id: &str) -> bool {
        self.inner.lock().insert(id.to_string())
    }

    fn remove(&self, id: &str) {
        self.inner.lock().remove(id);
    }
}

/// Orchestrates dedup, per-chat ordering, and polling fan-out around
/// the Bridge.
pub struct MessageService {
    bridge: Arc<Bridge>,
    mappings: Arc<dyn MessageMappingStore>,
    signal: Arc<dyn SignalDaemonPort>,
    router: Arc<ChannelRouter>,
    pending: Arc<dyn PendingSignalMessageStore>,
    chat_locks: ChatLocks,
    in_flight: InFlightDedup,
}

impl MessageService {
    #[must_use]
    pub fn new(
        bridge: Arc<Bridge>,
        mappings: Arc<dyn MessageMappingStore>,
        signal: Arc<dyn SignalDaemonPort>,
        router: Arc<ChannelRouter>,
        pending: Arc<dyn PendingSignalMessageStore>,
    ) -> Self {
        Self {
            bridge,
            mappings,
            signal,
            router,
            pending,
            chat_locks: ChatLocks::new(DEFAULT_MAX_CHAT_LOCKS),
            in_flight: InFlightDedup::new(),
        }
    }

    /// Handle one inbound WhatsApp message, applying in-flight and
    /// persistent dedup, then forwarding under the chat's lock.
    #[instrument(skip(self, content, media), fields(session = %session, msg_id = %msg_id))]
    pub async fn handle_whatsapp_message_with_session(
        &self,
        session: &str,
        chat: &str,
        msg_id: &str,
        sender: &str,
        content: &str,
        media: Option<MediaInput>,
    ) -> Result<(), BridgeError> {
        if !self.in_flight.load_or_store(msg_id) {
            return Ok(());
        }
        let result = self.handle_whatsapp_inner(session, chat, msg_id, sender, content, media).await;
        self.in_flight.remove(msg_id);
        result
    }

    async fn handle_whatsapp_inner(
        &self,
        session: &str,
        chat: &str,
        msg_id: &str,
        sender: &str,
        content: &str,
        media: Option<MediaInput>,
    ) -> Result<(), BridgeError> {
        if self.mappings.by_whatsapp_id(msg_id).await?.is_some() {
            return Ok(());
        }

        let lock = self.chat_locks.get(chat);
        let _guard = lock.lock().await;
        self.bridge
            .forward_whatsapp(session, chat, msg_id, sender, content, media)
            .await
    }

    /// Poll the Signal daemon once and forward every message through
    /// the chat-ordered bridge pipeline.
    #[instrument(skip(self))]
    pub async fn poll_signal_messages(&self, timeout_sec: u64) -> Result<usize, BridgeError> {
        let messages = self.signal.receive_messages(timeout_sec).await?;
        let mut forwarded = 0usize;

        for msg in messages {
            let Some(destination) = self.disambiguate_destination(&msg).await else {
                warn!(sender = %msg.sender, "dropping signal message: no matching channel");
                continue;
            };

            let chat_key = format!("{}:{}", msg.sender, destination);
            let lock = self.chat_locks.get(&chat_key);
            let _guard = lock.lock().await;

            let outcome = self.forward_with_durable_tracking(&msg, &destination).await;
            match outcome {
                Ok(ForwardOutcome::DroppedGroup | ForwardOutcome::DroppedEmpty
                    | ForwardOutcome::DroppedNoMapping | ForwardOutcome::DroppedNewThread) => {},
                Ok(_) => forwarded += 1,
                Err(error) => warn!(%error, "failed to forward signal message"),
            }
        }

        Ok(forwarded)
    }

    /// Track a polled message in the durable pending queue across the
    /// forward attempt, per spec §3: inserted before the attempt,
    /// deleted after success, retry-counted on failure. Queue
    /// bookkeeping is best-effort: a store failure is logged but never
    /// blocks the forward it is tracking.
    async fn forward_with_durable_tracking(
        &self,
        msg: &SignalMessage,
        destination: &str,
    ) -> Result<ForwardOutcome, BridgeError> {
        let key = pending_key(msg, destination);

        if let Ok(phone) = PhoneNumber::new(destination) {
            if let Ok(raw_payload) = serde_json::to_value(msg) {
                let pending = PendingSignalMessage::new(phone, raw_payload, Utc::now());
                if let Err(error) = self.pending.insert(&key, &pending).await {
                    warn!(%error, "failed to record pending signal message");
                }
            }
        }

        let result = self.bridge.forward_signal(msg, destination).await;

        match &result {
            Ok(_) => {
                if let Err(error) = self.pending.delete(&key).await {
                    warn!(%error, "failed to clear pending signal message");
                }
            },
            Err(error) => {
                if let Err(store_error) = self.pending.record_failure(&key, &error.to_string()).await {
                    warn!(%store_error, "failed to record pending signal message failure");
                }
            },
        }

        result
    }

    /// Re-attempt every pending row still under the retry bound,
    /// called once at startup to recover messages accepted before a
    /// crash or restart.
    #[instrument(skip(self))]
    pub async fn recover_pending(&self) -> Result<usize, BridgeError> {
        let rows = self.pending.list_recoverable(MAX_PENDING_RETRIES).await?;
        let mut recovered = 0usize;

        for (key, pending) in rows {
            let Ok(msg) = serde_json::from_value::<SignalMessage>(pending.raw_payload.clone()) else {
                warn!(%key, "dropping unreadable pending signal message");
                continue;
            };
            let destination = pending.destination.as_str();

            match self.bridge.forward_signal(&msg, destination).await {
                Ok(_) => {
                    if let Err(error) = self.pending.delete(&key).await {
                        warn!(%error, "failed to clear recovered pending signal message");
                    }
                    recovered += 1;
                },
                Err(error) => {
                    warn!(%error, %key, "pending signal message recovery attempt failed");
                    if let Err(store_error) = self.pending.record_failure(&key, &error.to_string()).await {
                        warn!(%store_error, "failed to record recovery failure");
                    }
                },
            }
        }

        Ok(recovered)
    }

    /// Resolve which configured destination a Signal message belongs
    /// to when the daemon does not scope it per §4.G's disambiguation
    /// rules.
    async fn disambiguate_destination(&self, msg: &crate::ports::SignalMessage) -> Option<String> {
        if self.router.count() == 1 {
            return self.router.all_destinations().into_iter().next();
        }
        if self.router.is_valid_destination(&msg.sender) {
            return Some(msg.sender.clone());
        }
        if !msg.destination.is_empty() && self.router.is_valid_destination(&msg.destination) {
            return Some(msg.destination.clone());
        }
        for session in self.router.all_sessions() {
            if self
                .mappings
                .has_history_between(&session, &msg.sender)
                .await
                .unwrap_or(false)
            {
                return self.router.destination_of(&session).ok();
            }
        }
        None
    }

    /// Send a plain notification to a session's paired Signal
    /// destination.
    pub async fn send_signal_notification(&self, session: &str, text: &str) -> Result<(), BridgeError> {
        let destination = self.router.destination_of(session)?;
        self.signal.send_message(&destination, text, &[]).await?;
        Ok(())
    }
}
