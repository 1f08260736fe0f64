//! Retention Scheduler — periodic cleanup of old message mappings and
//! media files (spec §4.J)

use std::sync::Arc;

use tracing::{info, instrument};

use crate::error::BridgeError;
use crate::services::bridge::Bridge;

/// Tunables for the retention sweep.
#[derive(Debug, Clone, Copy)]
pub struct RetentionConfig {
    pub mapping_retention_days: u32,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            mapping_retention_days: 30,
        }
    }
}

/// Runs one retention sweep per invocation; the interval ticker that
/// calls `run_once` lives at the presentation layer.
pub struct RetentionScheduler {
    bridge: Arc<Bridge>,
    config: RetentionConfig,
}

impl RetentionScheduler {
    #[must_use]
    pub fn new(bridge: Arc<Bridge>, config: RetentionConfig) -> Self {
        Self { bridge, config }
    }

    #[instrument(skip(self))]
    pub async fn run_once(&self) -> Result<(), BridgeError> {
        info!(
            retention_days = self.config.mapping_retention_days,
            "running retention sweep"
        );
        let outcome = self.bridge.cleanup_old(self.config.mapping_retention_days).await?;
        info!(
            mappings_removed = outcome.mappings_removed,
            media_removed = outcome.media_removed,
            "retention sweep complete"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_retention_is_thirty_days() {
        assert_eq!(RetentionConfig::default().mapping_retention_days, 30);
    }
}
