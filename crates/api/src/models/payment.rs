//! Payment provider settings and payment records.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use nexx_core::{Currency, OrderId, PaymentId, PaymentStatus};

use super::MASK;

/// Supported payment providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentProvider {
    Yoomoney,
    Sberbank,
    Tinkoff,
}

/// Merchant credentials for one provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentSetting {
    pub provider: PaymentProvider,
    pub merchant_id: String,
    pub secret_key: String,
    #[serde(default)]
    pub webhook_url: Option<String>,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl PaymentSetting {
    /// Copy with the secret key replaced by the mask.
    #[must_use]
    pub fn masked(&self) -> Self {
        Self {
            secret_key: MASK.to_owned(),
            ..self.clone()
        }
    }
}

const fn default_true() -> bool {
    true
}

/// A payment attempt for an order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    /// Identifier assigned by the provider (or a local one for mock payments).
    pub provider_payment_id: String,
    pub order_id: OrderId,
    pub amount: Decimal,
    #[serde(default)]
    pub currency: Currency,
    #[serde(default)]
    pub status: PaymentStatus,
    pub provider: PaymentProvider,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub confirmation_url: Option<String>,
    /// True when no real provider was called.
    #[serde(default)]
    pub mock: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Request body for starting a payment.
#[derive(Debug, Clone, Deserialize)]
pub struct NewPayment {
    pub order_id: OrderId,
    pub amount: Decimal,
    #[serde(default)]
    pub currency: Currency,
    pub description: String,
    pub return_url: String,
    #[serde(default = "default_payment_method")]
    pub payment_method: String,
}

fn default_payment_method() -> String {
    "card".to_owned()
}
