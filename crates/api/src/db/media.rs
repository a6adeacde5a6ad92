//! Media metadata repository.

use nexx_core::MediaId;

use super::{Database, RepositoryError};
use crate::models::MediaFile;

/// Repository for uploaded media metadata. File bytes live in the media
/// directory and are managed by the media service.
pub struct MediaRepository<'a> {
    db: &'a Database,
}

impl<'a> MediaRepository<'a> {
    /// Create a new media repository.
    #[must_use]
    pub const fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// All media, newest first.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the document cannot be read.
    pub async fn list(&self) -> Result<Vec<MediaFile>, RepositoryError> {
        let mut files = self.db.media().load().await?;
        files.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at));
        Ok(files)
    }

    /// Record an uploaded file.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the document cannot be read or written.
    pub async fn create(&self, file: MediaFile) -> Result<MediaFile, RepositoryError> {
        self.db
            .media()
            .update(move |files| {
                files.push(file.clone());
                Ok(file)
            })
            .await
    }

    /// Remove a record and return it.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no such record exists.
    pub async fn delete(&self, id: MediaId) -> Result<MediaFile, RepositoryError> {
        self.db
            .media()
            .update(|files| {
                let pos = files
                    .iter()
                    .position(|f| f.id == id)
                    .ok_or(RepositoryError::NotFound)?;
                Ok(files.remove(pos))
            })
            .await
    }
}
