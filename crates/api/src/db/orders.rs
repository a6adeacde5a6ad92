//! Order repository.
//!
//! Checkout locks products, carts and orders (always in that order) so stock
//! checks, stock decrements, order creation and cart clearing happen as one
//! step within the process.

use chrono::Utc;
use thiserror::Error;

use nexx_core::{OrderId, OrderStatus, UserId};

use super::{Database, RepositoryError};
use crate::models::order::{order_number, order_sequence};
use crate::models::{NewOrder, Order, OrderItem};

/// Errors specific to order operations.
#[derive(Debug, Error)]
pub enum OrderError {
    /// Checkout with nothing in the cart.
    #[error("cart is empty")]
    EmptyCart,

    /// A cart line references a product that no longer exists.
    #[error("product '{0}' is no longer available")]
    ProductUnavailable(String),

    /// Not enough stock for a cart line.
    #[error("insufficient stock for '{product}': {available} available, {requested} requested")]
    InsufficientStock {
        product: String,
        available: u32,
        requested: u32,
    },

    /// Status change not allowed from the current status.
    #[error("cannot change order status from {} to {}", .from.as_str(), .to.as_str())]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    /// Storage failure or missing order.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Repository for orders.
pub struct OrderRepository<'a> {
    db: &'a Database,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Turn a user's cart into an order.
    ///
    /// Every line is checked against current stock, stock is decremented, the
    /// order gets the next sequential number and the cart is emptied.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::EmptyCart`, `OrderError::ProductUnavailable` or
    /// `OrderError::InsufficientStock` when the cart cannot be ordered; nothing
    /// is written in that case.
    pub async fn place(&self, user_id: UserId, contact: NewOrder) -> Result<Order, OrderError> {
        let mut products = self.db.products().lock().await?;
        let mut carts = self.db.carts().lock().await?;
        let mut orders = self.db.orders().lock().await?;

        let lines = carts.get(&user_id).cloned().unwrap_or_default();
        if lines.is_empty() {
            return Err(OrderError::EmptyCart);
        }

        // Validate everything before touching stock.
        for line in &lines {
            let product = products
                .iter()
                .find(|p| p.id == line.product_id)
                .ok_or_else(|| OrderError::ProductUnavailable(line.product_name.clone()))?;
            if product.stock_quantity < line.quantity {
                return Err(OrderError::InsufficientStock {
                    product: product.name.clone(),
                    available: product.stock_quantity,
                    requested: line.quantity,
                });
            }
        }

        let now = Utc::now();
        let mut items = Vec::with_capacity(lines.len());
        for line in lines {
            if let Some(product) = products.iter_mut().find(|p| p.id == line.product_id) {
                product.stock_quantity -= line.quantity;
                product.refresh_stock_flag();
                product.updated_at = Some(now);
            }
            items.push(OrderItem {
                line_total: line.line_total(),
                product_id: line.product_id,
                product_name: line.product_name,
                price: line.product_price,
                quantity: line.quantity,
            });
        }

        let next = orders
            .iter()
            .filter_map(|o| order_sequence(&o.order_number))
            .max()
            .unwrap_or(0)
            + 1;

        let order = Order {
            id: OrderId::generate(),
            order_number: order_number(next),
            user_id,
            total_amount: items.iter().map(|i| i.line_total).sum(),
            items,
            user_name: contact.user_name,
            user_email: contact.user_email,
            user_phone: contact.user_phone,
            delivery_address: contact.delivery_address,
            notes: contact.notes,
            status: OrderStatus::Pending,
            created_at: now,
            updated_at: None,
        };
        orders.push(order.clone());
        carts.remove(&user_id);

        // Order first: a failed write must not leave stock decremented
        // without an order.
        orders.persist().await?;
        if let Err(e) = products.save().await {
            orders.retain(|o| o.id != order.id);
            orders.save().await?;
            return Err(e.into());
        }
        carts.save().await?;

        tracing::info!(
            order_number = %order.order_number,
            total = %order.total_amount,
            "Order placed"
        );
        Ok(order)
    }

    /// All orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the document cannot be read.
    pub async fn all(&self) -> Result<Vec<Order>, RepositoryError> {
        let mut orders = self.db.orders().load().await?;
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }

    /// A user's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the document cannot be read.
    pub async fn for_user(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        let mut orders = self.all().await?;
        orders.retain(|o| o.user_id == user_id);
        Ok(orders)
    }

    /// Get an order by ID.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the document cannot be read.
    pub async fn get(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        Ok(self
            .db
            .orders()
            .load()
            .await?
            .into_iter()
            .find(|o| o.id == id))
    }

    /// Move an order to a new status along an allowed transition.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::InvalidTransition` if the move is not allowed and
    /// `RepositoryError::NotFound` (wrapped) if the order does not exist.
    pub async fn set_status(&self, id: OrderId, status: OrderStatus) -> Result<Order, OrderError> {
        let mut orders = self.db.orders().lock().await?;
        let order = orders
            .iter_mut()
            .find(|o| o.id == id)
            .ok_or(RepositoryError::NotFound)?;

        if !order.status.can_transition_to(status) {
            return Err(OrderError::InvalidTransition {
                from: order.status,
                to: status,
            });
        }
        order.status = status;
        order.updated_at = Some(Utc::now());
        let order = order.clone();

        orders.save().await?;
        Ok(order)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;
    use crate::db::{CartRepository, ProductRepository};
    use crate::models::{NewProduct, Product};

    fn contact() -> NewOrder {
        NewOrder {
            user_name: "Иван".to_owned(),
            user_email: "ivan@example.ru".to_owned(),
            user_phone: "+79001234567".to_owned(),
            delivery_address: "Москва, ул. Ленина, 1".to_owned(),
            notes: None,
        }
    }

    async fn setup(stock: u32) -> (tempfile::TempDir, Database, Product) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(dir.path()).await.unwrap();
        let product = ProductRepository::new(&db)
            .create(NewProduct {
                name: "Коленвал JCB 320/03336".to_owned(),
                description: None,
                part_number: "320/03336".to_owned(),
                brand: "JCB".to_owned(),
                category: "Двигатель".to_owned(),
                price: Decimal::new(95_000, 0),
                image_url: None,
                slug: None,
                stock_quantity: stock,
            })
            .await
            .unwrap();
        (dir, db, product)
    }

    #[tokio::test]
    async fn test_place_order_decrements_stock_and_clears_cart() {
        let (_dir, db, product) = setup(3).await;
        let user = UserId::generate();
        CartRepository::new(&db).add(user, &product, 2).await.unwrap();

        let order = OrderRepository::new(&db).place(user, contact()).await.unwrap();
        assert_eq!(order.order_number, "NEXX-000001");
        assert_eq!(order.total_amount, Decimal::new(190_000, 0));
        assert_eq!(order.status, OrderStatus::Pending);

        let product = ProductRepository::new(&db)
            .get(product.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(product.stock_quantity, 1);
        assert!(CartRepository::new(&db).items(user).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_stock_write_leaves_no_order() {
        let (dir, db, product) = setup(3).await;
        let user = UserId::generate();
        CartRepository::new(&db).add(user, &product, 2).await.unwrap();

        // A directory in place of the temporary file makes the products write fail.
        let blocker = dir.path().join("products.json.tmp");
        std::fs::create_dir(&blocker).unwrap();
        let err = OrderRepository::new(&db).place(user, contact()).await;
        assert!(matches!(err, Err(OrderError::Repository(_))));

        assert!(OrderRepository::new(&db).all().await.unwrap().is_empty());
        let stored = ProductRepository::new(&db).get(product.id).await.unwrap().unwrap();
        assert_eq!(stored.stock_quantity, 3);
        assert_eq!(CartRepository::new(&db).items(user).await.unwrap().len(), 1);

        std::fs::remove_dir(&blocker).unwrap();
        let order = OrderRepository::new(&db).place(user, contact()).await.unwrap();
        assert_eq!(order.order_number, "NEXX-000001");
    }

    #[tokio::test]
    async fn test_order_numbers_are_sequential() {
        let (_dir, db, product) = setup(10).await;
        let user = UserId::generate();
        let orders = OrderRepository::new(&db);

        for expected in ["NEXX-000001", "NEXX-000002"] {
            CartRepository::new(&db).add(user, &product, 1).await.unwrap();
            let order = orders.place(user, contact()).await.unwrap();
            assert_eq!(order.order_number, expected);
        }
        assert_eq!(orders.for_user(user).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_empty_cart_is_rejected() {
        let (_dir, db, _) = setup(3).await;
        let err = OrderRepository::new(&db)
            .place(UserId::generate(), contact())
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::EmptyCart));
    }

    #[tokio::test]
    async fn test_insufficient_stock_changes_nothing() {
        let (_dir, db, product) = setup(1).await;
        let user = UserId::generate();
        CartRepository::new(&db).add(user, &product, 2).await.unwrap();

        let err = OrderRepository::new(&db)
            .place(user, contact())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            OrderError::InsufficientStock {
                available: 1,
                requested: 2,
                ..
            }
        ));
        assert_eq!(CartRepository::new(&db).items(user).await.unwrap().len(), 1);
        assert!(OrderRepository::new(&db).all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_status_transitions() {
        let (_dir, db, product) = setup(3).await;
        let user = UserId::generate();
        CartRepository::new(&db).add(user, &product, 1).await.unwrap();
        let repo = OrderRepository::new(&db);
        let order = repo.place(user, contact()).await.unwrap();

        let paid = repo.set_status(order.id, OrderStatus::Paid).await.unwrap();
        assert_eq!(paid.status, OrderStatus::Paid);

        let err = repo
            .set_status(order.id, OrderStatus::Pending)
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::InvalidTransition { .. }));

        let err = repo
            .set_status(OrderId::generate(), OrderStatus::Paid)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            OrderError::Repository(RepositoryError::NotFound)
        ));
    }
}
