//! WhatsApp and Signal engine configuration.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use super::default_true;

/// WhatsApp engine configuration
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WhatsAppConfig {
    /// Base URL of the WhatsApp HTTP engine
    #[serde(default = "default_whatsapp_base_url")]
    pub api_base_url: String,

    /// Shared secret used to verify inbound webhook requests (sensitive)
    #[serde(default, skip_serializing)]
    pub webhook_secret: Option<SecretString>,

    /// Session health-check interval
    #[serde(default = "default_poll_interval_sec")]
    pub poll_interval_sec: u64,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Number of retries for transient engine failures
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,

    /// Contact cache TTL in hours
    #[serde(default = "default_contact_cache_hours")]
    pub contact_cache_hours: i64,
}

fn default_whatsapp_base_url() -> String {
    "http://localhost:3000".to_string()
}

const fn default_poll_interval_sec() -> u64 {
    30
}

const fn default_timeout_secs() -> u64 {
    30
}

const fn default_retry_count() -> u32 {
    3
}

const fn default_contact_cache_hours() -> i64 {
    24
}

impl std::fmt::Debug for WhatsAppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WhatsAppConfig")
            .field("api_base_url", &self.api_base_url)
            .field(
                "webhook_secret",
                &self.webhook_secret.as_ref().map(|_| "[REDACTED]"),
            )
            .field("poll_interval_sec", &self.poll_interval_sec)
            .field("timeout_secs", &self.timeout_secs)
            .field("retry_count", &self.retry_count)
            .field("contact_cache_hours", &self.contact_cache_hours)
            .finish()
    }
}

impl Default for WhatsAppConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_whatsapp_base_url(),
            webhook_secret: None,
            poll_interval_sec: default_poll_interval_sec(),
            timeout_secs: default_timeout_secs(),
            retry_count: default_retry_count(),
            contact_cache_hours: default_contact_cache_hours(),
        }
    }
}

impl WhatsAppConfig {
    #[must_use]
    pub fn webhook_secret_str(&self) -> Option<&str> {
        self.webhook_secret.as_ref().map(ExposeSecret::expose_secret)
    }
}

/// Signal daemon configuration
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalConfig {
    /// Base URL of the signal-cli JSON-RPC/REST daemon
    #[serde(default = "default_signal_rpc_url")]
    pub rpc_url: String,

    /// The intermediary phone number registered with the daemon
    #[serde(default)]
    pub intermediary_phone_number: String,

    /// Polling interval between receive calls
    #[serde(default = "default_poll_interval_sec")]
    pub poll_interval_sec: u64,

    /// Per-poll long-poll timeout
    #[serde(default = "default_poll_timeout_sec")]
    pub poll_timeout_sec: u64,

    /// Whether the poller is enabled at all
    #[serde(default = "default_true")]
    pub polling_enabled: bool,

    /// Number of concurrent poll workers
    #[serde(default = "default_poll_workers")]
    pub poll_workers: u32,
}

fn default_signal_rpc_url() -> String {
    "http://localhost:8080".to_string()
}

const fn default_poll_timeout_sec() -> u64 {
    5
}

const fn default_poll_workers() -> u32 {
    1
}

impl std::fmt::Debug for SignalConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignalConfig")
            .field("rpc_url", &self.rpc_url)
            .field("intermediary_phone_number", &self.intermediary_phone_number)
            .field("poll_interval_sec", &self.poll_interval_sec)
            .field("poll_timeout_sec", &self.poll_timeout_sec)
            .field("polling_enabled", &self.polling_enabled)
            .field("poll_workers", &self.poll_workers)
            .finish()
    }
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            rpc_url: default_signal_rpc_url(),
            intermediary_phone_number: String::new(),
            poll_interval_sec: default_poll_interval_sec(),
            poll_timeout_sec: default_poll_timeout_sec(),
            polling_enabled: true,
            poll_workers: default_poll_workers(),
        }
    }
}
