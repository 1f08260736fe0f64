//! Container restart escalation adapters (spec §4.I, §6)
//!
//! `webhook` POSTs a fixed-shape restart request to an operator-owned
//! endpoint; `docker` is reserved for a future local-socket strategy
//! and currently behaves as a no-op; `off` never restarts anything.

use std::time::Duration;

use application::error::BridgeError;
use application::ports::ContainerRestartPort;
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::Serialize;
use tracing::{instrument, warn};

use crate::config::ContainerRestartMethod;

const USER_AGENT: &str = "whatsignal-container-restarter";

#[derive(Debug, Serialize)]
struct RestartRequest<'a> {
    action: &'static str,
    container_name: &'a str,
    timestamp: String,
}

/// Posts a restart request to a webhook endpoint the operator controls.
pub struct WebhookContainerRestartAdapter {
    client: Client,
    webhook_url: String,
}

impl WebhookContainerRestartAdapter {
    #[must_use]
    pub fn new(webhook_url: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self { client, webhook_url: webhook_url.into() }
    }
}

#[async_trait]
impl ContainerRestartPort for WebhookContainerRestartAdapter {
    #[instrument(skip(self), fields(container_name = %container_name))]
    async fn restart(&self, container_name: &str) -> Result<(), BridgeError> {
        let body = RestartRequest {
            action: "restart",
            container_name,
            timestamp: Utc::now().to_rfc3339(),
        };

        let response = self
            .client
            .post(&self.webhook_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| BridgeError::Retryable(e.to_string()))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(BridgeError::Engine(format!(
                "container restart webhook returned {}",
                response.status()
            )))
        }
    }
}

/// The `docker` and `off` strategies: reserved/inert, always succeeds
/// without side effects.
pub struct NoOpContainerRestartAdapter;

#[async_trait]
impl ContainerRestartPort for NoOpContainerRestartAdapter {
    async fn restart(&self, container_name: &str) -> Result<(), BridgeError> {
        warn!(container_name = %container_name, "container restart requested but no restart strategy is configured");
        Ok(())
    }
}

/// Build the configured restart adapter.
#[must_use]
pub fn build_container_restart_adapter(
    method: ContainerRestartMethod,
    webhook_url: Option<&str>,
) -> Box<dyn ContainerRestartPort> {
    match (method, webhook_url) {
        (ContainerRestartMethod::Webhook, Some(url)) => Box::new(WebhookContainerRestartAdapter::new(url)),
        _ => Box::new(NoOpContainerRestartAdapter),
    }
}
