//! Application configuration
//!
//! Split into focused sub-modules by domain:
//! - `server`: HTTP server settings
//! - `database`: SQLite database settings
//! - `messenger`: WhatsApp engine and Signal daemon settings
//! - `channels`: configured session ↔ destination pairs
//! - `resilience`: retry, media limits, container-restart, retention

mod channels;
mod database;
mod messenger;
mod resilience;
mod server;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use tracing::info;

pub use channels::{ChannelConfig, into_domain_channels};
pub use database::DatabaseConfig;
pub use messenger::{SignalConfig, WhatsAppConfig};
pub use resilience::{
    ContainerRestartAppConfig, ContainerRestartMethod, MediaAppConfig, RetentionConfig,
    RetryAppConfig,
};
pub use server::ServerConfig;

/// Shared default for boolean `true` fields across config structs
pub(crate) const fn default_true() -> bool {
    true
}

/// Top-level application configuration, assembled from a config file
/// (if present) and environment variable overrides.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub whatsapp: WhatsAppConfig,

    #[serde(default)]
    pub signal: SignalConfig,

    #[serde(default)]
    pub channels: Vec<ChannelConfig>,

    #[serde(default)]
    pub retry: RetryAppConfig,

    #[serde(default)]
    pub media: MediaAppConfig,

    #[serde(default, rename = "containerRestart")]
    pub container_restart: ContainerRestartAppConfig,

    #[serde(default)]
    pub retention: RetentionConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            whatsapp: WhatsAppConfig::default(),
            signal: SignalConfig::default(),
            channels: Vec::new(),
            retry: RetryAppConfig::default(),
            media: MediaAppConfig::default(),
            container_restart: ContainerRestartAppConfig::default(),
            retention: RetentionConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from an optional `config.toml` in the
    /// working directory, overridden by `WHATSIG_`-prefixed environment
    /// variables (e.g. `WHATSIG_SERVER_PORT`).
    pub fn load() -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?
            .add_source(config::File::with_name("config").required(false))
            .add_source(
                config::Environment::with_prefix("WHATSIG")
                    .separator("__")
                    .try_parsing(true),
            );

        let config = builder.build()?;
        config.try_deserialize()
    }
}

/// The three encryption secrets that gate the encrypted-column store,
/// loaded directly from the environment rather than a config file so
/// they never land in a `config.toml` on disk (spec §6).
pub struct EncryptionSecrets {
    pub secret: SecretString,
    pub salt: SecretString,
    pub lookup_salt: SecretString,
}

impl std::fmt::Debug for EncryptionSecrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptionSecrets")
            .field("secret", &"[REDACTED]")
            .field("salt", &"[REDACTED]")
            .field("lookup_salt", &"[REDACTED]")
            .finish()
    }
}

impl EncryptionSecrets {
    /// Read `WHATSIGNAL_ENCRYPTION_SECRET`, `WHATSIGNAL_ENCRYPTION_SALT`,
    /// and `WHATSIGNAL_ENCRYPTION_LOOKUP_SALT` from the process
    /// environment.
    pub fn from_env() -> Result<Self, application::BridgeError> {
        let secret = read_required_env("WHATSIGNAL_ENCRYPTION_SECRET")?;
        let salt = read_required_env("WHATSIGNAL_ENCRYPTION_SALT")?;
        let lookup_salt = read_required_env("WHATSIGNAL_ENCRYPTION_LOOKUP_SALT")?;
        info!("loaded encryption secrets from environment");
        Ok(Self {
            secret: SecretString::from(secret),
            salt: SecretString::from(salt),
            lookup_salt: SecretString::from(lookup_salt),
        })
    }
}

fn read_required_env(key: &str) -> Result<String, application::BridgeError> {
    std::env::var(key)
        .map_err(|_| application::BridgeError::Configuration(format!("missing required environment variable {key}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_no_channels() {
        assert!(AppConfig::default().channels.is_empty());
    }

    #[test]
    fn missing_secret_env_var_errors() {
        let result = read_required_env("WHATSIG_BRIDGE_DEFINITELY_UNSET_VAR");
        assert!(result.is_err());
    }
}
