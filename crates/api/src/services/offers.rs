//! Supplier offer aggregation.
//!
//! Collects quotes for a product from every active supplier, applies each
//! supplier's markup and sorts the result cheapest first. Results are cached
//! per product for one minute.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use reqwest::Client;
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use nexx_core::{ProductId, apply_markup};

use crate::db::{Database, RepositoryError, SettingsRepository, SupplierRepository};
use crate::models::{Product, Supplier, SupplierOffer};
use crate::services::abcp::AbcpClient;

/// Articles requested from ABCP per supplier.
const ABCP_SEARCH_LIMIT: usize = 10;

/// Aggregates and caches supplier offers.
#[derive(Clone)]
pub struct OfferService {
    client: Client,
    cache: Cache<ProductId, Arc<Vec<SupplierOffer>>>,
}

impl std::fmt::Debug for OfferService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OfferService")
            .field("cached", &self.cache.entry_count())
            .finish_non_exhaustive()
    }
}

impl OfferService {
    #[must_use]
    pub fn new(client: Client) -> Self {
        let cache = Cache::builder()
            .max_capacity(10_000)
            .time_to_live(Duration::from_secs(60))
            .build();

        Self { client, cache }
    }

    /// Offers for `product`, cheapest first.
    ///
    /// # Errors
    ///
    /// Returns an error only if the supplier or settings documents cannot be
    /// read; failing suppliers are skipped.
    pub async fn offers_for(
        &self,
        db: &Database,
        product: &Product,
    ) -> Result<Arc<Vec<SupplierOffer>>, RepositoryError> {
        if let Some(cached) = self.cache.get(&product.id).await {
            debug!(product_id = %product.id, "Cache hit for offers");
            return Ok(cached);
        }

        let offers = Arc::new(self.collect(db, product).await?);
        self.cache.insert(product.id, Arc::clone(&offers)).await;
        Ok(offers)
    }

    /// Drop every cached result, e.g. after suppliers change.
    pub async fn invalidate_all(&self) {
        self.cache.invalidate_all();
        self.cache.run_pending_tasks().await;
    }

    async fn collect(
        &self,
        db: &Database,
        product: &Product,
    ) -> Result<Vec<SupplierOffer>, RepositoryError> {
        let suppliers = SupplierRepository::new(db).active().await?;

        let abcp = if suppliers.iter().any(Supplier::is_abcp) {
            let settings = SettingsRepository::new(db).abcp().await?;
            AbcpClient::from_settings(self.client.clone(), settings.as_ref()).ok()
        } else {
            None
        };

        let mut offers = Vec::new();
        for supplier in &suppliers {
            match (&abcp, supplier.is_abcp()) {
                (Some(client), true) => {
                    match client
                        .search(&product.part_number, Some(&product.brand), ABCP_SEARCH_LIMIT)
                        .await
                    {
                        Ok(articles) => offers.extend(articles.into_iter().map(|article| {
                            article.into_offer(
                                supplier.id.to_string(),
                                supplier.name.clone(),
                                supplier.markup_percentage,
                            )
                        })),
                        Err(e) => {
                            warn!(supplier = %supplier.name, error = %e, "Supplier quote failed");
                        }
                    }
                }
                _ => offers.push(mock_quote(supplier, product)),
            }
        }

        if offers.is_empty() {
            info!(product_id = %product.id, "No supplier quotes, using built-in offers");
            return Ok(fallback_offers(product));
        }

        sort_offers(&mut offers);
        Ok(offers)
    }
}

/// Cheapest first; equal prices by faster delivery.
fn sort_offers(offers: &mut [SupplierOffer]) {
    offers.sort_by(|a, b| {
        a.client_price
            .cmp(&b.client_price)
            .then(a.delivery_time_days.cmp(&b.delivery_time_days))
    });
}

/// A stable quote for a supplier without a live integration.
///
/// Wholesale price is 70-85% of retail, derived from the supplier id so the
/// same supplier always quotes the same.
fn mock_quote(supplier: &Supplier, product: &Product) -> SupplierOffer {
    let seed = supplier.id.as_uuid().as_u128();
    let discount = u8::try_from(seed % 16).unwrap_or(0);
    let wholesale = (product.price * (Decimal::new(70, 2) + Decimal::new(i64::from(discount), 2)))
        .round_dp(2);

    SupplierOffer {
        supplier_id: supplier.id.to_string(),
        supplier_name: supplier.name.clone(),
        brand: product.brand.clone(),
        part_number: product.part_number.clone(),
        description: product.description.clone().unwrap_or_default(),
        client_price: apply_markup(wholesale, supplier.markup_percentage),
        wholesale_price: wholesale,
        stock_quantity: u32::try_from(seed % 10).unwrap_or(0) + 1,
        delivery_time_days: supplier.delivery_days,
        supplier_rating: Some(4.0 + f32::from(u8::try_from(seed % 10).unwrap_or(0)) / 10.0),
        item_key: Some(format!("{}_{}", supplier.api_type.to_lowercase(), product.part_number)),
    }
}

/// The two offers shown when no supplier quoted.
fn fallback_offers(product: &Product) -> Vec<SupplierOffer> {
    let offer = |id: &str, name: &str, wholesale: Decimal, client: Decimal, stock, days, rating| {
        SupplierOffer {
            supplier_id: id.to_owned(),
            supplier_name: name.to_owned(),
            brand: product.brand.clone(),
            part_number: product.part_number.clone(),
            description: product.description.clone().unwrap_or_default(),
            wholesale_price: (product.price * wholesale).round_dp(2),
            client_price: (product.price * client).round_dp(2),
            stock_quantity: stock,
            delivery_time_days: days,
            supplier_rating: Some(rating),
            item_key: Some(format!("mock_key_{}", id.trim_start_matches("mock_supplier_"))),
        }
    };

    vec![
        offer(
            "mock_supplier_1",
            "Запчасти Плюс",
            Decimal::new(80, 2),
            Decimal::ONE,
            5,
            2,
            4.7,
        ),
        offer(
            "mock_supplier_2",
            "АвтоДеталь",
            Decimal::new(85, 2),
            Decimal::new(110, 2),
            3,
            3,
            4.5,
        ),
    ]
}
