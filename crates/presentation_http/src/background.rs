//! Tick loops for the Session Monitor and Retention Scheduler (spec
//! §4.I, §4.J). Both application-layer types own only their
//! decision/sweep logic and defer the interval ticker here; the
//! start/stop lifecycle follows the same `AtomicBool` + `watch`
//! pattern as `integration_signal::SignalPoller`.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use application::services::{ChannelRouter, RetentionScheduler, SessionMonitor};
use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{info, warn};

/// Initial delay before the first session check, so the engine has a
/// moment to come up after process start (spec §4.I).
const SESSION_MONITOR_STARTUP_DELAY: Duration = Duration::from_secs(10);

/// Ticks `SessionMonitor::check_session` for every configured session
/// on an interval.
pub struct SessionMonitorTask {
    monitor: Arc<SessionMonitor>,
    router: Arc<ChannelRouter>,
    interval: Duration,
    running: AtomicBool,
    stop_tx: Mutex<Option<watch::Sender<bool>>>,
}

impl SessionMonitorTask {
    #[must_use]
    pub fn new(monitor: Arc<SessionMonitor>, router: Arc<ChannelRouter>, interval: Duration) -> Self {
        Self {
            monitor,
            router,
            interval,
            running: AtomicBool::new(false),
            stop_tx: Mutex::new(None),
        }
    }

    pub fn start(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            return;
        }

        let (tx, mut rx) = watch::channel(false);
        *self.stop_tx.lock() = Some(tx);

        let monitor = Arc::clone(&self.monitor);
        let router = Arc::clone(&self.router);
        let interval_dur = self.interval;
        let mut tick_rx = rx.clone();

        tokio::spawn(async move {
            tokio::select! {
                () = tokio::time::sleep(SESSION_MONITOR_STARTUP_DELAY) => {},
                _ = rx.changed() => return,
            }

            let mut interval = tokio::time::interval(interval_dur);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        for session in router.all_sessions() {
                            if let Err(error) = monitor.check_session(&session).await {
                                warn!(%error, %session, "session check failed");
                            }
                        }
                    },
                    _ = tick_rx.changed() => {
                        if *tick_rx.borrow() {
                            info!("session monitor task stopping");
                            return;
                        }
                    },
                }
            }
        });

        info!(interval_sec = self.interval.as_secs(), "session monitor task started");
    }

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

/// Ticks `RetentionScheduler::run_once` on an interval.
pub struct SchedulerTask {
    scheduler: Arc<RetentionScheduler>,
    interval: Duration,
    running: AtomicBool,
    stop_tx: Mutex<Option<watch::Sender<bool>>>,
}

impl SchedulerTask {
    #[must_use]
    pub fn new(scheduler: Arc<RetentionScheduler>, interval: Duration) -> Self {
        Self {
            scheduler,
            interval,
            running: AtomicBool::new(false),
            stop_tx: Mutex::new(None),
        }
    }

    pub fn start(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            return;
        }

        let (tx, mut rx) = watch::channel(false);
        *self.stop_tx.lock() = Some(tx);

        let scheduler = Arc::clone(&self.scheduler);
        let interval_dur = self.interval;
        let mut tick_rx = rx.clone();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(interval_dur);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        if let Err(error) = scheduler.run_once().await {
                            warn!(%error, "retention sweep failed");
                        }
                    },
                    _ = tick_rx.changed() => {
                        if *tick_rx.borrow() {
                            info!("scheduler task stopping");
                            return;
                        }
                    },
                }
            }
        });

        info!(interval_sec = self.interval.as_secs(), "scheduler task started");
    }

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

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use application::error::BridgeError;
    use application::ports::{
        ContainerRestartPort, EngineContact, EngineGroup, SessionStatus, WhatsAppEnginePort,
        WhatsAppSendResult,
    };
    use application::services::{ContactCache, GroupCache, MediaHandler, SessionMonitorConfig};
    use async_trait::async_trait;
    use domain::entities::Channel;

    use super::*;

    /// Never called by the lifecycle tests below; present only to
    /// satisfy the trait.
    struct UnreachableEngine;

    #[async_trait]
    impl WhatsAppEnginePort for UnreachableEngine {
        async fn send_text(&self, _: &str, _: &str, _: &str) -> Result<WhatsAppSendResult, BridgeError> {
            unreachable!()
        }
        async fn send_image<'a>(&self, _: &str, _: &str, _: &[u8], _: &str, _: Option<&'a str>) -> Result<WhatsAppSendResult, BridgeError> {
            unreachable!()
        }
        async fn send_video<'a>(&self, _: &str, _: &str, _: &[u8], _: &str, _: Option<&'a str>) -> Result<WhatsAppSendResult, BridgeError> {
            unreachable!()
        }
        async fn send_voice(&self, _: &str, _: &str, _: &[u8], _: &str) -> Result<WhatsAppSendResult, BridgeError> {
            unreachable!()
        }
        async fn send_document<'a>(&self, _: &str, _: &str, _: &[u8], _: &str, _: &str, _: Option<&'a str>) -> Result<WhatsAppSendResult, BridgeError> {
            unreachable!()
        }
        async fn send_reaction(&self, _: &str, _: &str, _: &str, _: &str) -> Result<(), BridgeError> {
            unreachable!()
        }
        async fn delete_message(&self, _: &str, _: &str, _: &str) -> Result<(), BridgeError> {
            unreachable!()
        }
        async fn send_seen(&self, _: &str, _: &str, _: &str) -> Result<(), BridgeError> {
            unreachable!()
        }
        async fn get_contact(&self, _: &str, _: &str) -> Result<EngineContact, BridgeError> {
            unreachable!()
        }
        async fn get_all_contacts(&self, _: &str, _: u32, _: u32) -> Result<Vec<EngineContact>, BridgeError> {
            unreachable!()
        }
        async fn get_group(&self, _: &str, _: &str) -> Result<EngineGroup, BridgeError> {
            unreachable!()
        }
        async fn get_all_groups(&self, _: &str) -> Result<Vec<EngineGroup>, BridgeError> {
            unreachable!()
        }
        async fn download_media(&self, _: &str) -> Result<Vec<u8>, BridgeError> {
            unreachable!()
        }
        async fn get_session_status(&self, _: &str) -> Result<SessionStatus, BridgeError> {
            Ok(SessionStatus("WORKING".to_string()))
        }
        async fn restart_session(&self, _: &str) -> Result<(), BridgeError> {
            unreachable!()
        }
        async fn wait_for_session_ready(&self, _: &str, _: Duration) -> Result<(), BridgeError> {
            unreachable!()
        }
    }

    struct UnreachableRestarter;

    #[async_trait]
    impl ContainerRestartPort for UnreachableRestarter {
        async fn restart(&self, _: &str) -> Result<(), BridgeError> {
            unreachable!()
        }
    }

    fn test_router() -> Arc<ChannelRouter> {
        Arc::new(ChannelRouter::new(vec![Channel::new("personal", "+1111111111").unwrap()]).unwrap())
    }

    fn test_monitor() -> Arc<SessionMonitor> {
        Arc::new(SessionMonitor::new(
            Arc::new(UnreachableEngine),
            Arc::new(UnreachableRestarter),
            SessionMonitorConfig::default(),
        ))
    }

    #[tokio::test]
    async fn session_monitor_task_start_is_idempotent() {
        let task = SessionMonitorTask::new(test_monitor(), test_router(), Duration::from_secs(3600));
        task.start();
        assert!(task.is_running());
        task.start();
        assert!(task.is_running());
        task.stop();
    }

    #[tokio::test]
    async fn session_monitor_task_stop_is_safe_to_call_multiple_times() {
        let task = SessionMonitorTask::new(test_monitor(), test_router(), Duration::from_secs(3600));
        task.start();
        task.stop();
        task.stop();
        assert!(!task.is_running());
    }

    #[tokio::test]
    async fn session_monitor_task_reports_not_running_before_start() {
        let task = SessionMonitorTask::new(test_monitor(), test_router(), Duration::from_secs(3600));
        assert!(!task.is_running());
    }

    fn test_scheduler() -> Arc<RetentionScheduler> {
        use application::ports::{MediaStore, MessageMappingStore, SignalDaemonPort, SignalMessage};
        use application::ports::{ContactCacheStore, GroupCacheStore};
        use application::services::Bridge;
        use domain::entities::{Contact, Group, MessageMapping};
        use domain::value_objects::DeliveryStatus;

        struct UnreachableMappings;
        #[async_trait]
        impl MessageMappingStore for UnreachableMappings {
            async fn save(&self, _: &MessageMapping) -> Result<(), BridgeError> { unreachable!() }
            async fn by_whatsapp_id(&self, _: &str) -> Result<Option<MessageMapping>, BridgeError> { unreachable!() }
            async fn by_signal_id(&self, _: &str) -> Result<Option<MessageMapping>, BridgeError> { unreachable!() }
            async fn by_id(&self, _: &str) -> Result<Option<MessageMapping>, BridgeError> { unreachable!() }
            async fn latest_by_session(&self, _: &str) -> Result<Option<MessageMapping>, BridgeError> { unreachable!() }
            async fn has_history_between(&self, _: &str, _: &str) -> Result<bool, BridgeError> { unreachable!() }
            async fn update_delivery_status(&self, _: &str, _: DeliveryStatus) -> Result<(), BridgeError> { unreachable!() }
            async fn cleanup_older_than(&self, _: u32) -> Result<u64, BridgeError> { Ok(0) }
        }

        struct UnreachableSignal;
        #[async_trait]
        impl SignalDaemonPort for UnreachableSignal {
            async fn send_message(&self, _: &str, _: &str, _: &[Vec<u8>]) -> Result<application::ports::SignalSendResult, BridgeError> { unreachable!() }
            async fn receive_messages(&self, _: u64) -> Result<Vec<SignalMessage>, BridgeError> { unreachable!() }
            async fn initialize_device(&self) -> Result<(), BridgeError> { unreachable!() }
            async fn download_attachment(&self, _: &str) -> Result<Vec<u8>, BridgeError> { unreachable!() }
        }

        struct UnreachableContactStore;
        #[async_trait]
        impl ContactCacheStore for UnreachableContactStore {
            async fn get(&self, _: &str) -> Result<Option<Contact>, BridgeError> { unreachable!() }
            async fn upsert(&self, _: &Contact) -> Result<(), BridgeError> { unreachable!() }
            async fn cleanup_older_than(&self, _: u32) -> Result<u64, BridgeError> { Ok(0) }
        }

        struct UnreachableGroupStore;
        #[async_trait]
        impl GroupCacheStore for UnreachableGroupStore {
            async fn get(&self, _: &str, _: &str) -> Result<Option<Group>, BridgeError> { unreachable!() }
            async fn upsert(&self, _: &Group) -> Result<(), BridgeError> { unreachable!() }
            async fn cleanup_older_than(&self, _: u32) -> Result<u64, BridgeError> { Ok(0) }
        }

        struct UnreachableMediaStore;
        #[async_trait]
        impl MediaStore for UnreachableMediaStore {
            async fn store(&self, _: &[u8], _: &str) -> Result<String, BridgeError> { unreachable!() }
            async fn read(&self, _: &str) -> Result<Vec<u8>, BridgeError> { unreachable!() }
            async fn cleanup_old(&self, _: u64) -> Result<u64, BridgeError> { Ok(0) }
        }

        let router = test_router();
        let engine: Arc<dyn WhatsAppEnginePort> = Arc::new(UnreachableEngine);
        let contacts = Arc::new(ContactCache::new(Arc::new(UnreachableContactStore), Arc::clone(&engine)));
        let groups = Arc::new(GroupCache::new(Arc::new(UnreachableGroupStore), Arc::clone(&engine)));
        let media = Arc::new(MediaHandler::new(Arc::new(UnreachableMediaStore), application::services::MediaConfig::default()));
        let mappings: Arc<dyn MessageMappingStore> = Arc::new(UnreachableMappings);
        let signal: Arc<dyn SignalDaemonPort> = Arc::new(UnreachableSignal);

        let bridge = Arc::new(Bridge::new(router, contacts, groups, media, mappings, engine, signal));
        Arc::new(RetentionScheduler::new(
            bridge,
            application::services::RetentionConfig { mapping_retention_days: 0 },
        ))
    }

    #[tokio::test]
    async fn scheduler_task_start_is_idempotent() {
        let task = SchedulerTask::new(test_scheduler(), Duration::from_secs(3600));
        task.start();
        assert!(task.is_running());
        task.start();
        assert!(task.is_running());
        task.stop();
    }

    #[tokio::test]
    async fn scheduler_task_stop_is_safe_to_call_multiple_times() {
        let task = SchedulerTask::new(test_scheduler(), Duration::from_secs(3600));
        task.start();
        task.stop();
        task.stop();
        assert!(!task.is_running());
    }
}
