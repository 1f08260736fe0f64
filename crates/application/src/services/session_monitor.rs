//! Session Monitor — per-session WhatsApp engine state machine with
//! restart and container-restart escalation (spec §4.I)

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{instrument, warn};

use crate::error::BridgeError;
use crate::ports::{ContainerRestartPort, WhatsAppEnginePort};

/// Tunables for the session monitor's restart/escalation behaviour.
#[derive(Debug, Clone)]
pub struct SessionMonitorConfig {
    pub check_interval: Duration,
    pub startup_timeout: Duration,
    pub wait_timeout: Duration,
    pub max_consecutive_failures: u32,
    pub cooldown: Duration,
    pub container_name: String,
}

impl Default for SessionMonitorConfig {
    fn default() -> Self {
        Self {
            check_interval: Duration::from_secs(30),
            startup_timeout: Duration::from_secs(60),
            wait_timeout: Duration::from_secs(30),
            max_consecutive_failures: 3,
            cooldown: Duration::from_secs(300),
            container_name: "whatsapp-engine".to_string(),
        }
    }
}

struct SessionState {
    last_status: String,
    since: Instant,
    consecutive_failures: u32,
    last_container_restart: Option<Instant>,
}

impl SessionState {
    fn fresh(status: String) -> Self {
        Self {
            last_status: status,
            since: Instant::now(),
            consecutive_failures: 0,
            last_container_restart: None,
        }
    }
}

/// Drives restart/escalation decisions for every configured session on
/// each `check_interval` tick. The tick loop itself lives at the
/// presentation layer; this type owns only the decision logic and its
/// tracking state.
pub struct SessionMonitor {
    engine: Arc<dyn WhatsAppEnginePort>,
    restarter: Arc<dyn ContainerRestartPort>,
    config: SessionMonitorConfig,
    states: Mutex<HashMap<String, SessionState>>,
}

impl SessionMonitor {
    #[must_use]
    pub fn new(
        engine: Arc<dyn WhatsAppEnginePort>,
        restarter: Arc<dyn ContainerRestartPort>,
        config: SessionMonitorConfig,
    ) -> Self {
        Self {
            engine,
            restarter,
            config,
            states: Mutex::new(HashMap::new()),
        }
    }

    /// The last observed engine status for `session`, if it has been
    /// checked at least once. Surfaced on the health endpoint.
    #[must_use]
    pub fn last_known_status(&self, session: &str) -> Option<String> {
        self.states.lock().get(session).map(|s| s.last_status.clone())
    }

    /// Perform one check tick for `session`, applying the state
    /// machine and restart escalation described in spec §4.I.
    #[instrument(skip(self), fields(session = %session))]
    pub async fn check_session(&self, session: &str) -> Result<(), BridgeError> {
        let status = self.engine.get_session_status(session).await?.0;

        let needs_restart = {
            let mut states = self.states.lock();
            let state = states
                .entry(session.to_string())
                .or_insert_with(|| SessionState::fresh(status.clone()));

            if state.last_status != status {
                state.last_status = status.clone();
                state.since = Instant::now();
            }

            match status.as_str() {
                "WORKING" => {
                    state.consecutive_failures = 0;
                    false
                },
                "STARTING" => state.since.elapsed() > self.config.startup_timeout,
                _ => true,
            }
        };

        if !needs_restart {
            return Ok(());
        }

        self.attempt_restart(session).await
    }

    async fn attempt_restart(&self, session: &str) -> Result<(), BridgeError> {
        let restart_result = self.engine.restart_session(session).await;
        let outcome = match restart_result {
            Ok(()) => self.engine.wait_for_session_ready(session, self.config.wait_timeout).await,
            Err(error) => Err(error),
        };

        match outcome {
            Ok(()) => {
                let mut states = self.states.lock();
                if let Some(state) = states.get_mut(session) {
                    state.last_status = "WORKING".to_string();
                    state.since = Instant::now();
                    state.consecutive_failures = 0;
                }
                Ok(())
            },
            Err(error) => {
                warn!(%error, session = %session, "session restart failed");
                self.escalate_if_needed(session);
                Ok(())
            },
        }
    }

    fn escalate_if_needed(&self, session: &str) {
        let should_escalate = {
            let mut states = self.states.lock();
            let Some(state) = states.get_mut(session) else {
                return;
            };
            state.consecutive_failures += 1;

            let cooldown_elapsed = state
                .last_container_restart
                .is_none_or(|t| t.elapsed() > self.config.cooldown);

            if state.consecutive_failures >= self.config.max_consecutive_failures && cooldown_elapsed
            {
                state.last_container_restart = Some(Instant::now());
                state.consecutive_failures = 0;
                true
            } else {
                false
            }
        };

        if should_escalate {
            let restarter = Arc::clone(&self.restarter);
            let container_name = self.config.container_name.clone();
            tokio::spawn(async move {
                if let Err(error) = restarter.restart(&container_name).await {
                    warn!(%error, "container restart escalation failed");
                }
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::{MockContainerRestartPort, MockWhatsAppEnginePort, SessionStatus};

    #[tokio::test]
    async fn working_status_requires_no_action() {
        let mut engine = MockWhatsAppEnginePort::new();
        engine
            .expect_get_session_status()
            .returning(|_| Ok(SessionStatus("WORKING".to_string())));
        let restarter = MockContainerRestartPort::new();
        let monitor = SessionMonitor::new(
            Arc::new(engine),
            Arc::new(restarter),
            SessionMonitorConfig::default(),
        );
        monitor.check_session("personal").await.unwrap();
    }

    #[tokio::test]
    async fn starting_within_timeout_requires_no_action() {
        let mut engine = MockWhatsAppEnginePort::new();
        engine
            .expect_get_session_status()
            .returning(|_| Ok(SessionStatus("STARTING".to_string())));
        let restarter = MockContainerRestartPort::new();
        let monitor = SessionMonitor::new(
            Arc::new(engine),
            Arc::new(restarter),
            SessionMonitorConfig::default(),
        );
        monitor.check_session("personal").await.unwrap();
        monitor.check_session("personal").await.unwrap();
    }

    #[tokio::test]
    async fn failed_status_triggers_restart_attempt() {
        let mut engine = MockWhatsAppEnginePort::new();
        engine
            .expect_get_session_status()
            .returning(|_| Ok(SessionStatus("FAILED".to_string())));
        engine.expect_restart_session().returning(|_| Ok(()));
        engine
            .expect_wait_for_session_ready()
            .returning(|_, _| Ok(()));
        let restarter = MockContainerRestartPort::new();
        let monitor = SessionMonitor::new(
            Arc::new(engine),
            Arc::new(restarter),
            SessionMonitorConfig::default(),
        );
        monitor.check_session("personal").await.unwrap();
    }

    #[tokio::test]
    async fn sustained_restart_failures_escalate_to_container_restart() {
        let mut engine = MockWhatsAppEnginePort::new();
        engine
            .expect_get_session_status()
            .returning(|_| Ok(SessionStatus("FAILED".to_string())));
        engine
            .expect_restart_session()
            .returning(|_| Err(BridgeError::Retryable("down".to_string())));
        let mut restarter = MockContainerRestartPort::new();
        restarter.expect_restart().returning(|_| Ok(()));

        let config = SessionMonitorConfig {
            max_consecutive_failures: 2,
            ..SessionMonitorConfig::default()
        };
        let monitor = SessionMonitor::new(Arc::new(engine), Arc::new(restarter), config);

        monitor.check_session("personal").await.unwrap();
        monitor.check_session("personal").await.unwrap();
        tokio::task::yield_now().await;
    }
}
