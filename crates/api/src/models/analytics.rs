//! Dashboard analytics.

use rust_decimal::Decimal;
use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Dashboard {
    pub orders: OrderStats,
    pub revenue: RevenueStats,
    pub products: ProductStats,
    pub users: UserStats,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OrderStats {
    pub total: usize,
    pub today: usize,
    pub pending: usize,
    pub completed: usize,
}

/// Revenue of non-cancelled orders.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RevenueStats {
    pub total: Decimal,
    pub today: Decimal,
    pub this_month: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProductStats {
    pub total: usize,
    /// Between one and five units left.
    pub low_stock: usize,
    pub out_of_stock: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UserStats {
    pub total: usize,
    pub new_today: usize,
    pub active: usize,
}
