//! Catalog product types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use nexx_core::{ProductId, Slug};

/// A catalog product as stored and returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub part_number: String,
    pub brand: String,
    pub category: String,
    /// Retail price in roubles.
    pub price: Decimal,
    #[serde(default)]
    pub image_url: Option<String>,
    pub slug: Slug,
    #[serde(default)]
    pub stock_quantity: u32,
    /// Derived from `stock_quantity`; refreshed on every write.
    #[serde(default)]
    pub in_stock: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Product {
    /// Recompute `in_stock` from the stock quantity.
    pub const fn refresh_stock_flag(&mut self) {
        self.in_stock = self.stock_quantity > 0;
    }

    /// Whether the product matches a case-insensitive search term.
    ///
    /// `needle` must already be lowercase.
    #[must_use]
    pub fn matches_search(&self, needle: &str) -> bool {
        self.name.to_lowercase().contains(needle)
            || self.part_number.to_lowercase().contains(needle)
            || self
                .description
                .as_deref()
                .is_some_and(|d| d.to_lowercase().contains(needle))
    }
}

/// Request body for creating a product.
#[derive(Debug, Clone, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub description: Option<String>,
    pub part_number: String,
    pub brand: String,
    pub category: String,
    pub price: Decimal,
    pub image_url: Option<String>,
    /// Explicit slug; generated from the name when absent.
    pub slug: Option<Slug>,
    #[serde(default)]
    pub stock_quantity: u32,
}

/// Partial product update; absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub part_number: Option<String>,
    pub brand: Option<String>,
    pub category: Option<String>,
    pub price: Option<Decimal>,
    pub image_url: Option<String>,
    pub slug: Option<Slug>,
    pub stock_quantity: Option<u32>,
}

/// Catalog listing sort order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductSort {
    PriceAsc,
    PriceDesc,
    Name,
    Newest,
}

/// Catalog listing filters (query string).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductFilter {
    pub brand: Option<String>,
    pub category: Option<String>,
    pub search: Option<String>,
    pub in_stock: Option<bool>,
    pub sort: Option<ProductSort>,
}

/// A facet value with the number of products carrying it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FacetCount {
    pub value: String,
    pub count: usize,
}

/// Brand and category facets for catalog navigation.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CatalogFacets {
    pub brands: Vec<FacetCount>,
    pub categories: Vec<FacetCount>,
}
