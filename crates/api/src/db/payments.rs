//! Payment settings and payment records.

use chrono::Utc;

use nexx_core::PaymentStatus;

use super::{Database, RepositoryError};
use crate::models::settings::keep_secret;
use crate::models::{Payment, PaymentProvider, PaymentSetting};

/// Repository for payment provider settings and payments.
pub struct PaymentRepository<'a> {
    db: &'a Database,
}

impl<'a> PaymentRepository<'a> {
    /// Create a new payment repository.
    #[must_use]
    pub const fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// All provider settings.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the document cannot be read.
    pub async fn settings(&self) -> Result<Vec<PaymentSetting>, RepositoryError> {
        self.db.payment_settings().load().await
    }

    /// Settings for one provider.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the document cannot be read.
    pub async fn setting(
        &self,
        provider: PaymentProvider,
    ) -> Result<Option<PaymentSetting>, RepositoryError> {
        Ok(self
            .settings()
            .await?
            .into_iter()
            .find(|s| s.provider == provider))
    }

    /// Insert or replace the settings of a provider.
    ///
    /// A secret key equal to the mask keeps the stored key.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` for a masked key with no stored
    /// setting, or a storage error if the document cannot be read or written.
    pub async fn upsert_setting(
        &self,
        mut setting: PaymentSetting,
    ) -> Result<PaymentSetting, RepositoryError> {
        self.db
            .payment_settings()
            .update(move |settings| {
                setting.updated_at = Some(Utc::now());
                let existing = settings.iter_mut().find(|s| s.provider == setting.provider);
                keep_secret(
                    &mut setting.secret_key,
                    existing.as_ref().map(|s| s.secret_key.as_str()),
                )?;
                match existing {
                    Some(existing) => *existing = setting.clone(),
                    None => settings.push(setting.clone()),
                }
                Ok(setting)
            })
            .await
    }

    /// Record a new payment.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the document cannot be read or written.
    pub async fn create(&self, payment: Payment) -> Result<Payment, RepositoryError> {
        self.db
            .payments()
            .update(move |payments| {
                payments.push(payment.clone());
                Ok(payment)
            })
            .await
    }

    /// Find a payment by the provider's identifier.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the document cannot be read.
    pub async fn get_by_provider_id(
        &self,
        provider_payment_id: &str,
    ) -> Result<Option<Payment>, RepositoryError> {
        Ok(self
            .db
            .payments()
            .load()
            .await?
            .into_iter()
            .find(|p| p.provider_payment_id == provider_payment_id))
    }

    /// Update the status of a payment identified by the provider's ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no such payment exists.
    pub async fn set_status(
        &self,
        provider_payment_id: &str,
        status: PaymentStatus,
    ) -> Result<Payment, RepositoryError> {
        self.db
            .payments()
            .update(|payments| {
                let payment = payments
                    .iter_mut()
                    .find(|p| p.provider_payment_id == provider_payment_id)
                    .ok_or(RepositoryError::NotFound)?;
                payment.status = status;
                payment.updated_at = Some(Utc::now());
                Ok(payment.clone())
            })
            .await
    }
}
