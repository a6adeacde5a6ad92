//! 1C accounting synchronization.
//!
//! The exchange itself is simulated: a run counts what would be exchanged
//! with the configured 1C server and records the outcome in the sync history.

use chrono::Utc;
use tracing::info;

use nexx_core::SyncRunId;

use crate::db::{
    Database, OrderRepository, ProductRepository, RepositoryError, SyncHistoryRepository,
};
use crate::models::{OneCSettings, SyncResults, SyncRun, SyncType};

/// Runs 1C synchronizations against the store.
pub struct OneCSync<'a> {
    db: &'a Database,
}

impl<'a> OneCSync<'a> {
    #[must_use]
    pub const fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Run one synchronization and record it.
    ///
    /// Parts disabled in `settings` are skipped even when `sync_type` asks
    /// for them. Orders are sent incrementally: only those created since the
    /// last successful run, unless `force` is set.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read or the history written.
    pub async fn run(
        &self,
        settings: &OneCSettings,
        sync_type: SyncType,
        force: bool,
    ) -> Result<SyncRun, RepositoryError> {
        let started_at = Utc::now();
        let mut results = SyncResults::default();
        let history = SyncHistoryRepository::new(self.db);

        if sync_type.includes_products() || sync_type.includes_prices() {
            let products = ProductRepository::new(self.db).all().await?.len();
            if sync_type.includes_products() && settings.sync_products {
                results.products_synced = products;
            }
            if sync_type.includes_prices() && settings.sync_prices {
                results.prices_updated = products;
            }
        }

        let orders_exported = sync_type.includes_orders() && settings.sync_orders;
        if orders_exported {
            let since = if force {
                None
            } else {
                history
                    .last_successful_orders()
                    .await?
                    .map(|run| run.started_at)
            };
            results.orders_sent = OrderRepository::new(self.db)
                .all()
                .await?
                .iter()
                .filter(|order| since.is_none_or(|since| order.created_at > since))
                .count();
        }

        let run = history
            .record(SyncRun {
                id: SyncRunId::generate(),
                sync_type,
                force,
                orders_exported,
                started_at,
                finished_at: Utc::now(),
                results,
            })
            .await?;

        info!(
            sync_id = %run.id,
            server = %settings.server_url,
            products = run.results.products_synced,
            prices = run.results.prices_updated,
            orders = run.results.orders_sent,
            "1C sync finished"
        );
        Ok(run)
    }
}
