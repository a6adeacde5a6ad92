//! Shopping cart types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use nexx_core::{CartItemId, ProductId, UserId};

/// One cart line. Name and price are captured when the line is created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartItem {
    pub id: CartItemId,
    pub product_id: ProductId,
    pub product_name: String,
    pub product_price: Decimal,
    pub quantity: u32,
    pub added_at: DateTime<Utc>,
}

impl CartItem {
    /// Price times quantity.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.product_price * Decimal::from(self.quantity)
    }
}

/// A user's cart with computed totals.
#[derive(Debug, Clone, Serialize)]
pub struct Cart {
    pub user_id: UserId,
    pub items: Vec<CartItem>,
    pub total_quantity: u32,
    pub subtotal: Decimal,
}

impl Cart {
    /// Build a cart view from its lines.
    #[must_use]
    pub fn new(user_id: UserId, items: Vec<CartItem>) -> Self {
        let total_quantity = items.iter().map(|i| i.quantity).sum();
        let subtotal = items.iter().map(CartItem::line_total).sum();
        Self {
            user_id,
            items,
            total_quantity,
            subtotal,
        }
    }
}
