//! Supplier integrations and aggregated offers.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use nexx_core::SupplierId;

use super::MASK;

/// A supplier whose quotes feed offer aggregation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Supplier {
    pub id: SupplierId,
    pub name: String,
    /// `abcp`, `exist`, `emex`, or any other platform name.
    pub api_type: String,
    #[serde(default)]
    pub api_credentials: BTreeMap<String, String>,
    #[serde(default = "default_markup")]
    pub markup_percentage: Decimal,
    #[serde(default = "default_delivery_days")]
    pub delivery_days: u32,
    #[serde(default)]
    pub min_order_amount: Decimal,
    #[serde(default = "default_true")]
    pub active: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Supplier {
    /// Whether quotes come from the ABCP platform.
    #[must_use]
    pub fn is_abcp(&self) -> bool {
        self.api_type.eq_ignore_ascii_case("abcp")
    }

    /// Copy with every credential value replaced by the mask.
    #[must_use]
    pub fn masked(&self) -> Self {
        let mut out = self.clone();
        for value in out.api_credentials.values_mut() {
            MASK.clone_into(value);
        }
        out
    }
}

fn default_markup() -> Decimal {
    Decimal::TEN
}

const fn default_delivery_days() -> u32 {
    3
}

const fn default_true() -> bool {
    true
}

/// Request body for creating or replacing a supplier.
#[derive(Debug, Clone, Deserialize)]
pub struct SupplierInput {
    pub name: String,
    pub api_type: String,
    #[serde(default)]
    pub api_credentials: BTreeMap<String, String>,
    #[serde(default = "default_markup")]
    pub markup_percentage: Decimal,
    #[serde(default = "default_delivery_days")]
    pub delivery_days: u32,
    #[serde(default)]
    pub min_order_amount: Decimal,
    #[serde(default = "default_true")]
    pub active: bool,
}

/// One price quote for a product, after markup.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SupplierOffer {
    pub supplier_id: String,
    pub supplier_name: String,
    pub brand: String,
    pub part_number: String,
    pub description: String,
    pub wholesale_price: Decimal,
    pub client_price: Decimal,
    pub stock_quantity: u32,
    pub delivery_time_days: u32,
    pub supplier_rating: Option<f32>,
    pub item_key: Option<String>,
}
