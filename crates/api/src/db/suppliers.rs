//! Supplier repository.

use chrono::Utc;

use nexx_core::SupplierId;

use super::{Database, RepositoryError};
use crate::models::settings::keep_secret;
use crate::models::{Supplier, SupplierInput};

/// Repository for supplier integrations.
pub struct SupplierRepository<'a> {
    db: &'a Database,
}

impl<'a> SupplierRepository<'a> {
    /// Create a new supplier repository.
    #[must_use]
    pub const fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// All suppliers.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the document cannot be read.
    pub async fn all(&self) -> Result<Vec<Supplier>, RepositoryError> {
        self.db.suppliers().load().await
    }

    /// Active suppliers only.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the document cannot be read.
    pub async fn active(&self) -> Result<Vec<Supplier>, RepositoryError> {
        let mut suppliers = self.all().await?;
        suppliers.retain(|s| s.active);
        Ok(suppliers)
    }

    /// Get a supplier by ID.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the document cannot be read.
    pub async fn get(&self, id: SupplierId) -> Result<Option<Supplier>, RepositoryError> {
        Ok(self.all().await?.into_iter().find(|s| s.id == id))
    }

    /// Add a supplier.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` when a credential is the mask, or a
    /// storage error if the document cannot be read or written.
    pub async fn create(&self, mut input: SupplierInput) -> Result<Supplier, RepositoryError> {
        for value in input.api_credentials.values_mut() {
            keep_secret(value, None)?;
        }
        self.db
            .suppliers()
            .update(move |suppliers| {
                let supplier = Supplier {
                    id: SupplierId::generate(),
                    name: input.name,
                    api_type: input.api_type,
                    api_credentials: input.api_credentials,
                    markup_percentage: input.markup_percentage,
                    delivery_days: input.delivery_days,
                    min_order_amount: input.min_order_amount,
                    active: input.active,
                    created_at: Utc::now(),
                    updated_at: None,
                };
                suppliers.push(supplier.clone());
                Ok(supplier)
            })
            .await
    }

    /// Replace a supplier's settings.
    ///
    /// Credential values equal to the mask keep their stored value.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the supplier does not exist.
    pub async fn replace(
        &self,
        id: SupplierId,
        mut input: SupplierInput,
    ) -> Result<Supplier, RepositoryError> {
        self.db
            .suppliers()
            .update(move |suppliers| {
                let supplier = suppliers
                    .iter_mut()
                    .find(|s| s.id == id)
                    .ok_or(RepositoryError::NotFound)?;

                for (key, value) in &mut input.api_credentials {
                    keep_secret(
                        value,
                        supplier.api_credentials.get(key).map(String::as_str),
                    )?;
                }

                supplier.name = input.name;
                supplier.api_type = input.api_type;
                supplier.api_credentials = input.api_credentials;
                supplier.markup_percentage = input.markup_percentage;
                supplier.delivery_days = input.delivery_days;
                supplier.min_order_amount = input.min_order_amount;
                supplier.active = input.active;
                supplier.updated_at = Some(Utc::now());
                Ok(supplier.clone())
            })
            .await
    }

    /// Delete a supplier.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the supplier does not exist.
    pub async fn delete(&self, id: SupplierId) -> Result<(), RepositoryError> {
        self.db
            .suppliers()
            .update(|suppliers| {
                let before = suppliers.len();
                suppliers.retain(|s| s.id != id);
                if suppliers.len() == before {
                    return Err(RepositoryError::NotFound);
                }
                Ok(())
            })
            .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeMap;

    use rust_decimal::Decimal;

    use super::*;
    use crate::models::MASK;

    fn input(name: &str, active: bool) -> SupplierInput {
        SupplierInput {
            name: name.to_owned(),
            api_type: "abcp".to_owned(),
            api_credentials: BTreeMap::from([("password".to_owned(), "secret".to_owned())]),
            markup_percentage: Decimal::new(12, 0),
            delivery_days: 2,
            min_order_amount: Decimal::ZERO,
            active,
        }
    }

    #[tokio::test]
    async fn test_active_filters_inactive() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(dir.path()).await.unwrap();
        let repo = SupplierRepository::new(&db);
        repo.create(input("Автодок", true)).await.unwrap();
        repo.create(input("Отключённый", false)).await.unwrap();

        let active = repo.active().await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].name, "Автодок");
    }

    #[tokio::test]
    async fn test_replace_keeps_masked_credentials() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(dir.path()).await.unwrap();
        let repo = SupplierRepository::new(&db);
        let supplier = repo.create(input("Автодок", true)).await.unwrap();

        let mut change = input("Автодок Москва", true);
        change
            .api_credentials
            .insert("password".to_owned(), MASK.to_owned());
        let updated = repo.replace(supplier.id, change).await.unwrap();

        assert_eq!(updated.name, "Автодок Москва");
        assert_eq!(updated.api_credentials["password"], "secret");
    }

    #[tokio::test]
    async fn test_delete_missing() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(dir.path()).await.unwrap();
        assert!(matches!(
            SupplierRepository::new(&db)
                .delete(SupplierId::generate())
                .await,
            Err(RepositoryError::NotFound)
        ));
    }
}
