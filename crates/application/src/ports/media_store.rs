//! Media storage port
//!
//! Implemented by an infrastructure adapter that writes content-addressed
//! files under a retention-tracked directory (spec §4.E).

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use crate::error::BridgeError;

#[cfg_attr(test, automock)]
#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Store raw bytes under a content-addressed filename with the
    /// given extension, returning the local path.
    async fn store(&self, bytes: &[u8], extension: &str) -> Result<String, BridgeError>;

    /// Read back bytes previously stored at `local_path`, used for
    /// outbound re-attachment.
    async fn read(&self, local_path: &str) -> Result<Vec<u8>, BridgeError>;

    /// Remove files whose modification time predates `cutoff_secs`
    /// seconds ago. Returns the number of files removed.
    async fn cleanup_old(&self, max_age_seconds: u64) -> Result<u64, BridgeError>;
}
