//! Admin dashboard figures.
//!
//! Days and months are calendar periods in UTC.

use chrono::{DateTime, Datelike, Utc};

use nexx_core::OrderStatus;

use crate::db::{Database, OrderRepository, ProductRepository, RepositoryError, UserRepository};
use crate::models::analytics::{OrderStats, ProductStats, RevenueStats, UserStats};
use crate::models::{Dashboard, Order, Product, User};

/// Stock levels counted as low.
const LOW_STOCK: std::ops::RangeInclusive<u32> = 1..=5;

/// Load everything and compute the dashboard.
///
/// # Errors
///
/// Returns a storage error if a collection cannot be read.
pub async fn dashboard(db: &Database) -> Result<Dashboard, RepositoryError> {
    let orders = OrderRepository::new(db).all().await?;
    let products = ProductRepository::new(db).all().await?;
    let users = UserRepository::new(db).all().await?;
    Ok(compute(&orders, &products, &users, Utc::now()))
}

/// Dashboard figures as of `now`.
#[must_use]
pub fn compute(orders: &[Order], products: &[Product], users: &[User], now: DateTime<Utc>) -> Dashboard {
    let today = now.date_naive();
    let is_today = |at: DateTime<Utc>| at.date_naive() == today;
    let is_this_month = |at: DateTime<Utc>| at.year() == now.year() && at.month() == now.month();

    let mut order_stats = OrderStats {
        total: orders.len(),
        ..OrderStats::default()
    };
    let mut revenue = RevenueStats::default();

    for order in orders {
        if is_today(order.created_at) {
            order_stats.today += 1;
        }
        match order.status {
            OrderStatus::Pending => order_stats.pending += 1,
            OrderStatus::Completed => order_stats.completed += 1,
            _ => {}
        }

        if order.status == OrderStatus::Cancelled {
            continue;
        }
        revenue.total += order.total_amount;
        if is_today(order.created_at) {
            revenue.today += order.total_amount;
        }
        if is_this_month(order.created_at) {
            revenue.this_month += order.total_amount;
        }
    }

    let product_stats = ProductStats {
        total: products.len(),
        low_stock: products
            .iter()
            .filter(|p| LOW_STOCK.contains(&p.stock_quantity))
            .count(),
        out_of_stock: products.iter().filter(|p| p.stock_quantity == 0).count(),
    };

    let user_stats = UserStats {
        total: users.len(),
        new_today: users.iter().filter(|u| is_today(u.created_at)).count(),
        active: users.iter().filter(|u| u.active).count(),
    };

    Dashboard {
        orders: order_stats,
        revenue: RevenueStats {
            total: revenue.total.round_dp(2),
            today: revenue.today.round_dp(2),
            this_month: revenue.this_month.round_dp(2),
        },
        products: product_stats,
        users: user_stats,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{Duration, TimeZone};
    use nexx_core::{OrderId, ProductId, Slug, UserId, UserRole, UserType};
    use rust_decimal::Decimal;

    use super::*;
    use crate::models::UserDetails;

    fn order(total: i64, status: OrderStatus, created_at: DateTime<Utc>) -> Order {
        Order {
            id: OrderId::generate(),
            order_number: "NEXX-000001".to_owned(),
            user_id: UserId::generate(),
            items: Vec::new(),
            total_amount: Decimal::new(total, 0),
            user_name: String::new(),
            user_email: String::new(),
            user_phone: String::new(),
            delivery_address: String::new(),
            notes: None,
            status,
            created_at,
            updated_at: None,
        }
    }

    fn product(stock: u32) -> Product {
        Product {
            id: ProductId::generate(),
            name: "x".to_owned(),
            description: None,
            part_number: "1".to_owned(),
            brand: "JCB".to_owned(),
            category: "c".to_owned(),
            price: Decimal::ONE,
            image_url: None,
            slug: Slug::from_title("x"),
            stock_quantity: stock,
            in_stock: stock > 0,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    fn user(active: bool, created_at: DateTime<Utc>) -> User {
        User {
            id: UserId::generate(),
            username: "u".to_owned(),
            email: None,
            password_hash: None,
            phone: None,
            name: "u".to_owned(),
            user_type: UserType::Retail,
            role: UserRole::User,
            details: UserDetails::default(),
            address: None,
            active,
            created_at,
            updated_at: None,
        }
    }

    #[test]
    fn test_dashboard_figures() {
        let now = Utc.with_ymd_and_hms(2026, 3, 15, 12, 0, 0).unwrap();
        let earlier_this_month = now - Duration::days(5);
        let last_month = now - Duration::days(40);

        let orders = [
            order(1000, OrderStatus::Pending, now),
            order(2000, OrderStatus::Completed, earlier_this_month),
            order(4000, OrderStatus::Cancelled, now),
            order(8000, OrderStatus::Shipped, last_month),
        ];
        let products = [product(0), product(1), product(5), product(6)];
        let users = [user(true, now), user(false, last_month), user(true, last_month)];

        let dashboard = compute(&orders, &products, &users, now);

        assert_eq!(
            dashboard.orders,
            OrderStats {
                total: 4,
                today: 2,
                pending: 1,
                completed: 1,
            }
        );
        assert_eq!(dashboard.revenue.total, Decimal::new(11_000, 0));
        assert_eq!(dashboard.revenue.today, Decimal::new(1000, 0));
        assert_eq!(dashboard.revenue.this_month, Decimal::new(3000, 0));
        assert_eq!(
            dashboard.products,
            ProductStats {
                total: 4,
                low_stock: 2,
                out_of_stock: 1,
            }
        );
        assert_eq!(
            dashboard.users,
            UserStats {
                total: 3,
                new_today: 1,
                active: 2,
            }
        );
    }

    #[test]
    fn test_empty_store() {
        assert_eq!(compute(&[], &[], &[], Utc::now()), Dashboard::default());
    }
}
