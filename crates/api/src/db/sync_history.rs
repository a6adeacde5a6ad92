//! 1C sync history.

use super::{Database, RepositoryError};
use crate::models::SyncRun;

/// Number of runs kept in the history.
pub const HISTORY_LIMIT: usize = 100;

/// Repository for 1C sync runs.
pub struct SyncHistoryRepository<'a> {
    db: &'a Database,
}

impl<'a> SyncHistoryRepository<'a> {
    /// Create a new sync history repository.
    #[must_use]
    pub const fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Append a run, dropping the oldest beyond [`HISTORY_LIMIT`].
    ///
    /// # Errors
    ///
    /// Returns a storage error if the document cannot be read or written.
    pub async fn record(&self, run: SyncRun) -> Result<SyncRun, RepositoryError> {
        self.db
            .sync_history()
            .update(move |runs| {
                runs.push(run.clone());
                runs.sort_by(|a, b| a.started_at.cmp(&b.started_at));
                let excess = runs.len().saturating_sub(HISTORY_LIMIT);
                runs.drain(..excess);
                Ok(run)
            })
            .await
    }

    /// Most recent runs first, at most `limit`.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the document cannot be read.
    pub async fn recent(&self, limit: usize) -> Result<Vec<SyncRun>, RepositoryError> {
        let mut runs = self.db.sync_history().load().await?;
        runs.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        runs.truncate(limit);
        Ok(runs)
    }

    /// The latest run that exported orders and finished without errors.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the document cannot be read.
    pub async fn last_successful_orders(&self) -> Result<Option<SyncRun>, RepositoryError> {
        Ok(self
            .db
            .sync_history()
            .load()
            .await?
            .into_iter()
            .filter(|r| r.orders_exported && r.succeeded())
            .max_by_key(|r| r.started_at))
    }
}
