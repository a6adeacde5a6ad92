//! Order types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use nexx_core::{OrderId, OrderStatus, ProductId, UserId};

/// A placed order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    /// Human-facing sequential number, `NEXX-000001`.
    pub order_number: String,
    pub user_id: UserId,
    pub items: Vec<OrderItem>,
    pub total_amount: Decimal,
    pub user_name: String,
    pub user_email: String,
    pub user_phone: String,
    pub delivery_address: String,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Snapshot of a cart line at checkout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: ProductId,
    pub product_name: String,
    pub price: Decimal,
    pub quantity: u32,
    pub line_total: Decimal,
}

/// Checkout contact details.
#[derive(Debug, Clone, Deserialize)]
pub struct NewOrder {
    pub user_name: String,
    pub user_email: String,
    pub user_phone: String,
    pub delivery_address: String,
    pub notes: Option<String>,
}

/// Format the order number for the `n`-th order.
#[must_use]
pub fn order_number(n: usize) -> String {
    format!("NEXX-{n:06}")
}

/// Parse the sequence part of an order number.
#[must_use]
pub fn order_sequence(number: &str) -> Option<usize> {
    number.strip_prefix("NEXX-")?.parse().ok()
}
