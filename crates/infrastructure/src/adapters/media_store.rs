//! Filesystem-backed `MediaStore`
//!
//! Files are written under a content-addressed name (`blake3(bytes)`)
//! so repeated downloads of the same attachment are idempotent (spec
//! §4.E).

use std::path::{Path, PathBuf};

use application::error::BridgeError;
use application::ports::MediaStore;
use async_trait::async_trait;
use tokio::fs;
use tracing::{debug, instrument, warn};

fn internal(e: impl std::fmt::Display) -> BridgeError {
    BridgeError::Fatal(e.to_string())
}

/// Stores media under `base_dir/<blake3-hex>.<extension>`.
pub struct FilesystemMediaStore {
    base_dir: PathBuf,
}

impl FilesystemMediaStore {
    #[must_use]
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self { base_dir: base_dir.into() }
    }

    fn fingerprint_path(&self, bytes: &[u8], extension: &str) -> PathBuf {
        let digest = blake3::hash(bytes).to_hex();
        self.base_dir.join(format!("{digest}.{extension}"))
    }
}

#[async_trait]
impl MediaStore for FilesystemMediaStore {
    #[instrument(skip(self, bytes), fields(size = bytes.len(), extension = %extension))]
    async fn store(&self, bytes: &[u8], extension: &str) -> Result<String, BridgeError> {
        fs::create_dir_all(&self.base_dir).await.map_err(internal)?;
        let path = self.fingerprint_path(bytes, extension);

        if fs::try_exists(&path).await.unwrap_or(false) {
            debug!(path = %path.display(), "media already present, skipping write");
            return Ok(path.to_string_lossy().into_owned());
        }

        fs::write(&path, bytes).await.map_err(internal)?;
        Ok(path.to_string_lossy().into_owned())
    }

    async fn read(&self, local_path: &str) -> Result<Vec<u8>, BridgeError> {
        fs::read(local_path)
            .await
            .map_err(|e| BridgeError::NotFound(format!("media file {local_path}: {e}")))
    }

    #[instrument(skip(self))]
    async fn cleanup_old(&self, max_age_seconds: u64) -> Result<u64, BridgeError> {
        let mut removed = 0u64;
        let mut entries = match fs::read_dir(&self.base_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(internal(e)),
        };

        while let Some(entry) = entries.next_entry().await.map_err(internal)? {
            let path = entry.path();
            let metadata = match entry.metadata().await {
                Ok(m) => m,
                Err(error) => {
                    warn!(%error, path = %path.display(), "failed to stat media file during cleanup");
                    continue;
                },
            };

            let age = metadata.modified().ok().and_then(|m| m.elapsed().ok()).map(|d| d.as_secs());
            if age.is_some_and(|age| age > max_age_seconds) {
                if let Err(error) = remove_file(&path).await {
                    warn!(%error, path = %path.display(), "failed to remove stale media file");
                    continue;
                }
                removed += 1;
            }
        }

        Ok(removed)
    }
}

async fn remove_file(path: &Path) -> std::io::Result<()> {
    fs::remove_file(path).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn store_then_read_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilesystemMediaStore::new(dir.path());
        let path = store.store(b"hello media", "jpg").await.unwrap();
        assert_eq!(store.read(&path).await.unwrap(), b"hello media");
    }

    #[tokio::test]
    async fn storing_identical_bytes_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilesystemMediaStore::new(dir.path());
        let first = store.store(b"same bytes", "png").await.unwrap();
        let second = store.store(b"same bytes", "png").await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn reading_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilesystemMediaStore::new(dir.path());
        assert!(matches!(store.read("/no/such/file").await, Err(BridgeError::NotFound(_))));
    }

    #[tokio::test]
    async fn cleanup_on_missing_directory_is_a_noop() {
        let store = FilesystemMediaStore::new("/definitely/does/not/exist");
        assert_eq!(store.cleanup_old(3600).await.unwrap(), 0);
    }
}
