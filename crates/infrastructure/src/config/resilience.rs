//! Retry, media, and container-restart configuration.

use serde::{Deserialize, Serialize};

use super::default_true;

/// Exponential backoff parameters for the Signal poller (spec §4.H).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryAppConfig {
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub max_attempts: u32,
}

impl Default for RetryAppConfig {
    fn default() -> Self {
        Self {
            initial_backoff_ms: 500,
            max_backoff_ms: 30_000,
            max_attempts: 5,
        }
    }
}

/// Per-type media size ceilings (MB) and extension allow-lists.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaSizeLimitsConfig {
    pub image: u64,
    pub video: u64,
    pub voice: u64,
    pub document: u64,
}

impl Default for MediaSizeLimitsConfig {
    fn default() -> Self {
        Self {
            image: 5,
            video: 100,
            voice: 16,
            document: 100,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaAllowedTypesConfig {
    pub image: Vec<String>,
    pub video: Vec<String>,
    pub voice: Vec<String>,
}

impl Default for MediaAllowedTypesConfig {
    fn default() -> Self {
        Self {
            image: vec!["jpg", "jpeg", "png", "gif", "webp"].into_iter().map(str::to_string).collect(),
            video: vec!["mp4", "mov", "avi", "webm"].into_iter().map(str::to_string).collect(),
            voice: vec!["ogg", "opus", "m4a", "mp3"].into_iter().map(str::to_string).collect(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaAppConfig {
    #[serde(default)]
    pub max_size_mb: MediaSizeLimitsConfig,
    #[serde(default)]
    pub allowed_types: MediaAllowedTypesConfig,
}

impl MediaAppConfig {
    /// Convert to the application layer's `MediaConfig`.
    #[must_use]
    pub fn to_media_config(&self) -> application::MediaConfig {
        application::MediaConfig {
            max_image_bytes: self.max_size_mb.image * 1024 * 1024,
            max_video_bytes: self.max_size_mb.video * 1024 * 1024,
            max_voice_bytes: self.max_size_mb.voice * 1024 * 1024,
            max_document_bytes: self.max_size_mb.document * 1024 * 1024,
            image_extensions: self.allowed_types.image.clone(),
            video_extensions: self.allowed_types.video.clone(),
            voice_extensions: self.allowed_types.voice.clone(),
        }
    }
}

/// Restart strategy for the container-restart escalation port (spec §4.I).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerRestartMethod {
    Webhook,
    Docker,
    Off,
}

impl Default for ContainerRestartMethod {
    fn default() -> Self {
        Self::Off
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerRestartAppConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub method: ContainerRestartMethod,
    #[serde(default = "default_container_name")]
    pub container_name: String,
    #[serde(default)]
    pub webhook_url: Option<String>,
    #[serde(default = "default_max_consecutive_failures")]
    pub max_consecutive_failures: u32,
    #[serde(default = "default_cooldown_minutes")]
    pub cooldown_minutes: u64,
}

fn default_container_name() -> String {
    "whatsapp-engine".to_string()
}

const fn default_max_consecutive_failures() -> u32 {
    3
}

const fn default_cooldown_minutes() -> u64 {
    5
}

impl Default for ContainerRestartAppConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            method: ContainerRestartMethod::Off,
            container_name: default_container_name(),
            webhook_url: None,
            max_consecutive_failures: default_max_consecutive_failures(),
            cooldown_minutes: default_cooldown_minutes(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RetentionConfig {
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
}

const fn default_retention_days() -> u32 {
    30
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            retention_days: default_retention_days(),
        }
    }
}
