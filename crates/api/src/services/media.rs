//! Uploaded media files on disk.
//!
//! Files are stored flat in the media directory under a generated name that
//! keeps the original extension, and served from `/media/`.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::Utc;
use thiserror::Error;
use tracing::{info, warn};

use nexx_core::MediaId;

use crate::models::MediaFile;

/// Largest accepted upload.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// URL prefix the media directory is served under.
pub const MEDIA_URL_PREFIX: &str = "/media";

/// Errors storing or removing media.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("file is too large ({size} bytes, limit {limit})")]
    TooLarge { size: usize, limit: usize },

    #[error("no file in upload")]
    MissingFile,

    #[error("invalid file name")]
    InvalidFilename,

    #[error("media storage error: {0}")]
    Io(#[from] std::io::Error),
}

/// Media directory handle.
#[derive(Debug, Clone)]
pub struct MediaStorage {
    dir: PathBuf,
}

impl MediaStorage {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write an upload to disk and describe it.
    ///
    /// # Errors
    ///
    /// Returns `MediaError::TooLarge` over [`MAX_UPLOAD_BYTES`],
    /// `MediaError::InvalidFilename` for a name without a file component and
    /// `MediaError::Io` if the file cannot be written.
    pub async fn save(
        &self,
        original_filename: &str,
        content_type: Option<&str>,
        data: &[u8],
    ) -> Result<MediaFile, MediaError> {
        if data.len() > MAX_UPLOAD_BYTES {
            return Err(MediaError::TooLarge {
                size: data.len(),
                limit: MAX_UPLOAD_BYTES,
            });
        }

        let original = Path::new(original_filename)
            .file_name()
            .and_then(|name| name.to_str())
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .ok_or(MediaError::InvalidFilename)?;

        let id = MediaId::generate();
        let extension = safe_extension(original);
        let filename = extension
            .as_deref()
            .map_or_else(|| id.to_string(), |ext| format!("{id}.{ext}"));

        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::write(self.dir.join(&filename), data).await?;

        let content_type = content_type
            .filter(|ct| !ct.is_empty() && *ct != "application/octet-stream")
            .map_or_else(
                || guess_content_type(extension.as_deref()).to_owned(),
                str::to_owned,
            );

        info!(filename = %filename, size = data.len(), "Media file stored");

        Ok(MediaFile {
            id,
            original_filename: original.to_owned(),
            url: format!("{MEDIA_URL_PREFIX}/{filename}"),
            filename,
            content_type,
            size: data.len() as u64,
            uploaded_at: Utc::now(),
        })
    }

    /// Delete a stored file. A file already gone is not an error.
    ///
    /// # Errors
    ///
    /// Returns `MediaError::Io` if the file exists but cannot be removed.
    pub async fn remove(&self, file: &MediaFile) -> Result<(), MediaError> {
        // Never follow a stored name outside the media directory.
        let Some(name) = Path::new(&file.filename).file_name() else {
            return Err(MediaError::InvalidFilename);
        };

        match tokio::fs::remove_file(self.dir.join(name)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!(filename = %file.filename, "Media file already missing");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Lowercase alphanumeric extension of `name`, if it has a sane one.
fn safe_extension(name: &str) -> Option<String> {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty() && ext.len() <= 10 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(str::to_ascii_lowercase)
}

fn guess_content_type(extension: Option<&str>) -> &'static str {
    match extension {
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("svg") => "image/svg+xml",
        Some("pdf") => "application/pdf",
        Some("txt") => "text/plain",
        Some("csv") => "text/csv",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_save_and_remove() {
        let dir = tempfile::tempdir().unwrap();
        let storage = MediaStorage::new(dir.path().join("media"));

        let file = storage
            .save("../../etc/Каталог JCB.PDF", None, b"%PDF-1.4")
            .await
            .unwrap();

        assert_eq!(file.original_filename, "Каталог JCB.PDF");
        assert!(file.filename.ends_with(".pdf"));
        assert_eq!(file.url, format!("/media/{}", file.filename));
        assert_eq!(file.content_type, "application/pdf");
        assert_eq!(file.size, 8);

        let path = storage.dir().join(&file.filename);
        assert_eq!(tokio::fs::read(&path).await.unwrap(), b"%PDF-1.4");

        storage.remove(&file).await.unwrap();
        assert!(!path.exists());
        // Second removal is a no-op.
        storage.remove(&file).await.unwrap();
    }

    #[tokio::test]
    async fn test_rejects_oversized_and_nameless() {
        let dir = tempfile::tempdir().unwrap();
        let storage = MediaStorage::new(dir.path());

        let big = vec![0_u8; MAX_UPLOAD_BYTES + 1];
        assert!(matches!(
            storage.save("big.bin", None, &big).await,
            Err(MediaError::TooLarge { .. })
        ));
        assert!(matches!(
            storage.save("", None, b"x").await,
            Err(MediaError::InvalidFilename)
        ));
    }

    #[test]
    fn test_safe_extension() {
        assert_eq!(safe_extension("photo.JPG").as_deref(), Some("jpg"));
        assert_eq!(safe_extension("archive.tar.gz").as_deref(), Some("gz"));
        assert_eq!(safe_extension("noext"), None);
        assert_eq!(safe_extension("bad.ex t"), None);
    }
}
