//! Media Handler — validate, classify, and store attachments locally
//! with content-addressed, retention-tracked filenames (spec §4.E)

use std::sync::Arc;

use domain::value_objects::MediaType;

use crate::error::BridgeError;
use crate::ports::MediaStore;

/// Bytes sniffed from the start of a payload when detecting its MIME
/// type; matches the outbound engine's own sniff window.
const MIME_SNIFF_LEN: usize = 512;

/// The WhatsApp engine's preferred outbound voice-note format; used
/// when content sniffing and extension lookup both fail to identify a
/// voice attachment's type.
const DEFAULT_VOICE_MIME: &str = "audio/ogg";

/// Detect the MIME type of a media payload: a magic-byte sniff over the
/// first `MIME_SNIFF_LEN` bytes, falling back to the file extension,
/// falling back in turn to the engine's default voice format for voice
/// attachments or a generic octet-stream otherwise.
#[must_use]
pub fn detect_mime(bytes: &[u8], extension: &str, media_type: MediaType) -> String {
    let window = &bytes[..bytes.len().min(MIME_SNIFF_LEN)];
    if let Some(kind) = infer::get(window) {
        return kind.mime_type().to_string();
    }
    if let Some(mime) = mime_from_extension(extension) {
        return mime.to_string();
    }
    if media_type == MediaType::Voice {
        return DEFAULT_VOICE_MIME.to_string();
    }
    "application/octet-stream".to_string()
}

fn mime_from_extension(extension: &str) -> Option<&'static str> {
    let extension = extension.trim_start_matches('.').to_ascii_lowercase();
    Some(match extension.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "mp4" => "video/mp4",
        "mov" => "video/quicktime",
        "avi" => "video/x-msvideo",
        "webm" => "video/webm",
        "ogg" | "opus" => "audio/ogg",
        "m4a" => "audio/mp4",
        "mp3" => "audio/mpeg",
        "pdf" => "application/pdf",
        _ => return None,
    })
}

/// Per-type size ceilings and extension allow-lists.
#[derive(Debug, Clone)]
pub struct MediaConfig {
    pub max_image_bytes: u64,
    pub max_video_bytes: u64,
    pub max_voice_bytes: u64,
    pub max_document_bytes: u64,
    pub image_extensions: Vec<String>,
    pub video_extensions: Vec<String>,
    pub voice_extensions: Vec<String>,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            max_image_bytes: 5 * 1024 * 1024,
            max_video_bytes: 100 * 1024 * 1024,
            max_voice_bytes: 16 * 1024 * 1024,
            max_document_bytes: 100 * 1024 * 1024,
            image_extensions: vec!["jpg", "jpeg", "png", "gif", "webp"]
                .into_iter()
                .map(str::to_string)
                .collect(),
            video_extensions: vec!["mp4", "mov", "avi", "webm"]
                .into_iter()
                .map(str::to_string)
                .collect(),
            voice_extensions: vec!["ogg", "opus", "m4a", "mp3"]
                .into_iter()
                .map(str::to_string)
                .collect(),
        }
    }
}

impl MediaConfig {
    /// Classify an extension (without the leading dot, case-insensitive)
    /// against the configured allow-lists. Anything unrecognised is a
    /// document.
    #[must_use]
    pub fn classify(&self, extension: &str) -> MediaType {
        let extension = extension.trim_start_matches('.').to_ascii_lowercase();
        if self.image_extensions.iter().any(|e| *e == extension) {
            MediaType::Image
        } else if self.video_extensions.iter().any(|e| *e == extension) {
            MediaType::Video
        } else if self.voice_extensions.iter().any(|e| *e == extension) {
            MediaType::Voice
        } else {
            MediaType::Document
        }
    }

    #[must_use]
    pub fn max_bytes_for(&self, media_type: MediaType) -> u64 {
        match media_type {
            MediaType::Image => self.max_image_bytes,
            MediaType::Video => self.max_video_bytes,
            MediaType::Voice => self.max_voice_bytes,
            MediaType::Document => self.max_document_bytes,
        }
    }
}

/// Validates, classifies, and persists inbound/outbound media.
pub struct MediaHandler {
    store: Arc<dyn MediaStore>,
    config: MediaConfig,
}

impl MediaHandler {
    #[must_use]
    pub fn new(store: Arc<dyn MediaStore>, config: MediaConfig) -> Self {
        Self { store, config }
    }

    /// Validate size, classify by extension, and persist content
    /// under a content-addressed filename. Returns the stored path,
    /// the classified media type, and the detected outbound MIME type.
    pub async fn process_media(
        &self,
        bytes: &[u8],
        extension: &str,
    ) -> Result<(String, MediaType, String), BridgeError> {
        let media_type = self.config.classify(extension);
        let max_bytes = self.config.max_bytes_for(media_type);
        if bytes.len() as u64 > max_bytes {
            return Err(BridgeError::Validation(format!(
                "{media_type} payload of {} bytes exceeds the {max_bytes}-byte ceiling",
                bytes.len()
            )));
        }
        if bytes.is_empty() {
            return Err(BridgeError::Validation("media payload is empty".to_string()));
        }

        let mime = detect_mime(bytes, extension, media_type);
        let local_path = self.store.store(bytes, extension).await?;
        Ok((local_path, media_type, mime))
    }

    /// Delete files older than `max_age_seconds`.
    pub async fn cleanup_old(&self, max_age_seconds: u64) -> Result<u64, BridgeError> {
        self.store.cleanup_old(max_age_seconds).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::MockMediaStore;

    #[test]
    fn classifies_known_extensions() {
        let config = MediaConfig::default();
        assert_eq!(config.classify("jpg"), MediaType::Image);
        assert_eq!(config.classify(".PNG"), MediaType::Image);
        assert_eq!(config.classify("mp4"), MediaType::Video);
        assert_eq!(config.classify("ogg"), MediaType::Voice);
        assert_eq!(config.classify("pdf"), MediaType::Document);
        assert_eq!(config.classify("unknown"), MediaType::Document);
    }

    #[tokio::test]
    async fn rejects_oversized_payloads() {
        let mut config = MediaConfig::default();
        config.max_image_bytes = 4;
        let store = MockMediaStore::new();
        let handler = MediaHandler::new(Arc::new(store), config);
        let result = handler.process_media(&[0u8; 10], "jpg").await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn rejects_empty_payloads() {
        let store = MockMediaStore::new();
        let handler = MediaHandler::new(Arc::new(store), MediaConfig::default());
        let result = handler.process_media(&[], "jpg").await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn stores_valid_payloads_and_returns_classification() {
        let mut store = MockMediaStore::new();
        store
            .expect_store()
            .returning(|_, _| Ok("/media/abc123.jpg".to_string()));
        let handler = MediaHandler::new(Arc::new(store), MediaConfig::default());
        let (path, media_type, mime) = handler.process_media(&[1, 2, 3], "jpg").await.unwrap();
        assert_eq!(path, "/media/abc123.jpg");
        assert_eq!(media_type, MediaType::Image);
        assert_eq!(mime, "image/jpeg");
    }

    #[tokio::test]
    async fn cleanup_delegates_to_store() {
        let mut store = MockMediaStore::new();
        store.expect_cleanup_old().returning(|_| Ok(3));
        let handler = MediaHandler::new(Arc::new(store), MediaConfig::default());
        assert_eq!(handler.cleanup_old(86400).await.unwrap(), 3);
    }

    #[test]
    fn detect_mime_sniffs_magic_bytes_over_extension() {
        // PNG signature; extension deliberately wrong to prove the
        // content sniff wins over the extension fallback.
        let png_bytes = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
        assert_eq!(detect_mime(&png_bytes, "jpg", MediaType::Image), "image/png");
    }

    #[test]
    fn detect_mime_falls_back_to_extension_when_unsniffable() {
        assert_eq!(detect_mime(b"not a real image", "png", MediaType::Image), "image/png");
    }

    #[test]
    fn detect_mime_defaults_voice_to_ogg_when_unknown() {
        assert_eq!(detect_mime(b"\x00\x01\x02", "bin", MediaType::Voice), "audio/ogg");
    }

    #[test]
    fn detect_mime_defaults_document_to_octet_stream_when_unknown() {
        assert_eq!(detect_mime(b"\x00\x01\x02", "bin", MediaType::Document), "application/octet-stream");
    }
}
