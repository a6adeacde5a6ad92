//! Cart repository.

use chrono::Utc;

use nexx_core::{CartItemId, UserId};

use super::{Database, RepositoryError};
use crate::models::{CartItem, Product};

/// Repository for per-user carts.
pub struct CartRepository<'a> {
    db: &'a Database,
}

impl<'a> CartRepository<'a> {
    /// Create a new cart repository.
    #[must_use]
    pub const fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Lines in a user's cart; empty when the user has none.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the document cannot be read.
    pub async fn items(&self, user_id: UserId) -> Result<Vec<CartItem>, RepositoryError> {
        Ok(self
            .db
            .carts()
            .load()
            .await?
            .remove(&user_id)
            .unwrap_or_default())
    }

    /// Add `quantity` units of a product.
    ///
    /// An existing line for the same product is incremented instead of
    /// adding a second line.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the document cannot be read or written.
    pub async fn add(
        &self,
        user_id: UserId,
        product: &Product,
        quantity: u32,
    ) -> Result<CartItem, RepositoryError> {
        self.db
            .carts()
            .update(|carts| {
                let items = carts.entry(user_id).or_default();
                if let Some(line) = items.iter_mut().find(|i| i.product_id == product.id) {
                    line.quantity = line.quantity.saturating_add(quantity);
                    return Ok(line.clone());
                }

                let line = CartItem {
                    id: CartItemId::generate(),
                    product_id: product.id,
                    product_name: product.name.clone(),
                    product_price: product.price,
                    quantity,
                    added_at: Utc::now(),
                };
                items.push(line.clone());
                Ok(line)
            })
            .await
    }

    /// Set a line's quantity; zero or less removes the line.
    ///
    /// Returns the updated line, or `None` when it was removed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the line does not exist.
    pub async fn set_quantity(
        &self,
        user_id: UserId,
        item_id: CartItemId,
        quantity: i64,
    ) -> Result<Option<CartItem>, RepositoryError> {
        self.db
            .carts()
            .update(|carts| {
                let items = carts.get_mut(&user_id).ok_or(RepositoryError::NotFound)?;
                let pos = items
                    .iter()
                    .position(|i| i.id == item_id)
                    .ok_or(RepositoryError::NotFound)?;

                if quantity <= 0 {
                    items.remove(pos);
                    return Ok(None);
                }

                let line = items.get_mut(pos).ok_or(RepositoryError::NotFound)?;
                line.quantity = u32::try_from(quantity).unwrap_or(u32::MAX);
                Ok(Some(line.clone()))
            })
            .await
    }

    /// Remove a line.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the line does not exist.
    pub async fn remove(&self, user_id: UserId, item_id: CartItemId) -> Result<(), RepositoryError> {
        self.db
            .carts()
            .update(|carts| {
                let items = carts.get_mut(&user_id).ok_or(RepositoryError::NotFound)?;
                let before = items.len();
                items.retain(|i| i.id != item_id);
                if items.len() == before {
                    return Err(RepositoryError::NotFound);
                }
                Ok(())
            })
            .await
    }

    /// Empty a user's cart.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the document cannot be read or written.
    pub async fn clear(&self, user_id: UserId) -> Result<(), RepositoryError> {
        self.db
            .carts()
            .update(|carts| {
                carts.remove(&user_id);
                Ok(())
            })
            .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use nexx_core::{ProductId, Slug};

    use super::*;

    fn product() -> Product {
        Product {
            id: ProductId::generate(),
            name: "Фильтр гидравлический".to_owned(),
            description: None,
            part_number: "32/925994".to_owned(),
            brand: "JCB".to_owned(),
            category: "Гидравлика".to_owned(),
            price: Decimal::new(8500, 0),
            image_url: None,
            slug: Slug::from_title("Фильтр гидравлический"),
            stock_quantity: 15,
            in_stock: true,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    async fn open() -> (tempfile::TempDir, Database) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(dir.path()).await.unwrap();
        (dir, db)
    }

    #[tokio::test]
    async fn test_add_same_product_increments_line() {
        let (_dir, db) = open().await;
        let repo = CartRepository::new(&db);
        let user = UserId::generate();
        let product = product();

        let first = repo.add(user, &product, 1).await.unwrap();
        let second = repo.add(user, &product, 2).await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(second.quantity, 3);
        assert_eq!(repo.items(user).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_set_quantity_zero_removes_line() {
        let (_dir, db) = open().await;
        let repo = CartRepository::new(&db);
        let user = UserId::generate();
        let line = repo.add(user, &product(), 2).await.unwrap();

        let updated = repo.set_quantity(user, line.id, 5).await.unwrap();
        assert_eq!(updated.unwrap().quantity, 5);

        assert!(repo.set_quantity(user, line.id, 0).await.unwrap().is_none());
        assert!(repo.items(user).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_set_quantity_negative_removes_line() {
        let (_dir, db) = open().await;
        let repo = CartRepository::new(&db);
        let user = UserId::generate();
        let line = repo.add(user, &product(), 2).await.unwrap();

        assert!(repo.set_quantity(user, line.id, -3).await.unwrap().is_none());
        assert!(repo.items(user).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_line_is_not_found() {
        let (_dir, db) = open().await;
        let repo = CartRepository::new(&db);
        let user = UserId::generate();
        repo.add(user, &product(), 1).await.unwrap();

        assert!(matches!(
            repo.remove(user, CartItemId::generate()).await,
            Err(RepositoryError::NotFound)
        ));
        assert!(matches!(
            repo.set_quantity(UserId::generate(), CartItemId::generate(), 1)
                .await,
            Err(RepositoryError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_clear_only_affects_owner() {
        let (_dir, db) = open().await;
        let repo = CartRepository::new(&db);
        let (alice, bob) = (UserId::generate(), UserId::generate());
        repo.add(alice, &product(), 1).await.unwrap();
        repo.add(bob, &product(), 1).await.unwrap();

        repo.clear(alice).await.unwrap();
        assert!(repo.items(alice).await.unwrap().is_empty());
        assert_eq!(repo.items(bob).await.unwrap().len(), 1);
    }
}
