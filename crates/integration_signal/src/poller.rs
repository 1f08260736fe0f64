//! Signal Poller — long-poll loop over the Signal daemon with
//! validated config and classified retry/backoff (spec §4.H)
//!
//! Lifecycle follows the teacher's background-task pattern (spec §9):
//! a `running` flag guards `start`, and `stop` closes a watch channel
//! at most once. `start` re-creates the channel on every call so the
//! poller can be restarted after a clean stop.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use application::error::BridgeError;
use application::services::MessageService;
use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{info, instrument, warn};

/// Abstraction over "poll once, forward everything found" so the
/// retry/backoff logic can be unit-tested without constructing a full
/// `MessageService`.
#[async_trait]
pub trait Poll: Send + Sync {
    async fn poll(&self, timeout_sec: u64) -> Result<usize, BridgeError>;
}

#[async_trait]
impl Poll for MessageService {
    async fn poll(&self, timeout_sec: u64) -> Result<usize, BridgeError> {
        self.poll_signal_messages(timeout_sec).await
    }
}

/// Tunables validated once at `start` (spec §4.H step 1).
#[derive(Debug, Clone, Copy)]
pub struct PollerConfig {
    pub poll_interval_sec: u64,
    pub poll_timeout_sec: u64,
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            poll_interval_sec: 5,
            poll_timeout_sec: 5,
            max_attempts: 5,
            initial_backoff_ms: 500,
            max_backoff_ms: 30_000,
        }
    }
}

impl PollerConfig {
    fn validate(&self) -> Result<(), BridgeError> {
        if self.poll_interval_sec == 0 {
            return Err(BridgeError::Configuration("poll_interval_sec must be > 0".to_string()));
        }
        if self.max_attempts == 0 {
            return Err(BridgeError::Configuration("max_attempts must be >= 1".to_string()));
        }
        if self.max_backoff_ms < self.initial_backoff_ms {
            return Err(BridgeError::Configuration(
                "max_backoff_ms must be >= initial_backoff_ms".to_string(),
            ));
        }
        Ok(())
    }

    fn backoff_for(&self, attempt: u32) -> Duration {
        let millis = self.initial_backoff_ms.saturating_mul(1u64 << attempt.min(32));
        Duration::from_millis(millis.min(self.max_backoff_ms))
    }
}

/// Call `message_service.poll` with exponential backoff, retrying only
/// retryable errors, honoring cancellation via `stop_rx` during sleeps.
async fn poll_with_retry(
    poller: &dyn Poll,
    config: &PollerConfig,
    stop_rx: &mut watch::Receiver<bool>,
) -> Result<usize, BridgeError> {
    let mut attempt = 0u32;
    loop {
        match poller.poll(config.poll_timeout_sec).await {
            Ok(count) => return Ok(count),
            Err(error) if attempt + 1 < config.max_attempts && error.is_retryable() => {
                let delay = config.backoff_for(attempt);
                warn!(%error, attempt, delay_ms = delay.as_millis() as u64, "retrying signal poll");
                tokio::select! {
                    () = tokio::time::sleep(delay) => {},
                    _ = stop_rx.changed() => return Err(BridgeError::Fatal("poller stopped during backoff".to_string())),
                }
                attempt += 1;
            },
            Err(error) => return Err(error),
        }
    }
}

/// Owns the tick loop described in spec §4.H: validate config once,
/// initialize the device, then tick `poll_with_retry` on an interval
/// until stopped.
pub struct SignalPoller {
    poller: Arc<dyn Poll>,
    device_init: Arc<dyn DeviceInit>,
    config: PollerConfig,
    running: AtomicBool,
    stop_tx: Mutex<Option<watch::Sender<bool>>>,
}

/// The one-shot device-initialization call a concrete Signal client
/// makes before the poller's first tick (spec §4.H step 2).
#[async_trait]
pub trait DeviceInit: Send + Sync {
    async fn initialize_device(&self) -> Result<(), BridgeError>;
}

/// Adapts any `SignalDaemonPort` into a `DeviceInit` so the poller
/// never needs to depend on the full port surface.
pub struct SignalDaemonDeviceInit(pub Arc<dyn application::ports::SignalDaemonPort>);

#[async_trait]
impl DeviceInit for SignalDaemonDeviceInit {
    async fn initialize_device(&self) -> Result<(), BridgeError> {
        self.0.initialize_device().await
    }
}

impl SignalPoller {
    #[must_use]
    pub fn new(
        poller: Arc<dyn Poll>,
        device_init: Arc<dyn DeviceInit>,
        config: PollerConfig,
    ) -> Self {
        Self {
            poller,
            device_init,
            config,
            running: AtomicBool::new(false),
            stop_tx: Mutex::new(None),
        }
    }

    /// Start the poll loop. Returns an error if already running or if
    /// config validation / device initialization fails.
    #[instrument(skip(self))]
    pub async fn start(&self) -> Result<(), BridgeError> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(BridgeError::Configuration("signal poller is already running".to_string()));
        }

        if let Err(error) = self.config.validate() {
            self.running.store(false, Ordering::SeqCst);
            return Err(error);
        }

        if let Err(error) = self.device_init.initialize_device().await {
            self.running.store(false, Ordering::SeqCst);
            return Err(BridgeError::Fatal(format!("failed to initialize signal device: {error}")));
        }

        let (tx, mut rx) = watch::channel(false);
        *self.stop_tx.lock() = Some(tx);

        let poller = Arc::clone(&self.poller);
        let config = self.config;
        let mut tick_rx = rx.clone();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(config.poll_interval_sec));
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        match poll_with_retry(poller.as_ref(), &config, &mut rx).await {
                            Ok(count) if count > 0 => info!(count, "forwarded signal messages"),
                            Ok(_) => {},
                            Err(error) => warn!(%error, "signal poll failed after retries"),
                        }
                    },
                    _ = tick_rx.changed() => {
                        if *tick_rx.borrow() {
                            info!("signal poller stopping");
                            return;
                        }
                    },
                }
            }
        });

        info!(interval_sec = config.poll_interval_sec, "signal poller started");
        Ok(())
    }

    /// Stop the poll loop. Safe to call multiple times or when never
    /// started.
    pub fn stop(&self) {
        if let Some(tx) = self.stop_tx.lock().take() {
            let _ = tx.send(true);
        }
        self.running.store(false, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}
