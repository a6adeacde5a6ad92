//! YooKassa (YooMoney) payments client.
//!
//! Creates redirect payments through `POST /v3/payments` and verifies
//! webhook notifications signed with HMAC-SHA256 of the raw body.

use hmac::{Hmac, Mac};
use reqwest::Client;
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;
use tracing::{debug, error, instrument};
use uuid::Uuid;

use nexx_core::{Currency, OrderId, PaymentStatus, format_amount};

use crate::models::PaymentSetting;

/// YooKassa API base URL.
const YOOKASSA_API_BASE: &str = "https://api.yookassa.ru/v3";

/// Errors from the payment provider.
#[derive(Debug, Error)]
pub enum PaymentError {
    /// HTTP request failed.
    #[error("payment request failed: {0}")]
    Request(String),

    /// Failed to parse the response.
    #[error("payment response error: {0}")]
    Response(String),

    /// Provider rejected the call.
    #[error("payment API error: {0}")]
    Api(String),

    /// Webhook signature did not match.
    #[error("invalid webhook signature")]
    InvalidSignature,
}

/// What to charge.
#[derive(Debug, Clone)]
pub struct PaymentRequest<'a> {
    pub order_id: OrderId,
    pub amount: Decimal,
    pub currency: Currency,
    pub description: &'a str,
    pub return_url: &'a str,
}

/// A payment as created by the provider.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderPayment {
    pub id: String,
    pub status: PaymentStatus,
    #[serde(default)]
    pub confirmation: Option<Confirmation>,
}

impl ProviderPayment {
    /// Where to send the buyer.
    #[must_use]
    pub fn confirmation_url(&self) -> Option<&str> {
        self.confirmation
            .as_ref()
            .and_then(|c| c.confirmation_url.as_deref())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Confirmation {
    #[serde(default)]
    pub confirmation_url: Option<String>,
}

#[derive(Serialize)]
struct Amount<'a> {
    value: String,
    currency: &'a str,
}

#[derive(Serialize)]
struct ConfirmationRequest<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    return_url: &'a str,
}

#[derive(Serialize)]
struct Metadata {
    order_id: String,
}

#[derive(Serialize)]
struct CreatePaymentBody<'a> {
    amount: Amount<'a>,
    capture: bool,
    confirmation: ConfirmationRequest<'a>,
    description: &'a str,
    metadata: Metadata,
}

impl<'a> From<&PaymentRequest<'a>> for CreatePaymentBody<'a> {
    fn from(request: &PaymentRequest<'a>) -> Self {
        Self {
            amount: Amount {
                value: format_amount(request.amount),
                currency: request.currency.code(),
            },
            capture: true,
            confirmation: ConfirmationRequest {
                kind: "redirect",
                return_url: request.return_url,
            },
            description: request.description,
            metadata: Metadata {
                order_id: request.order_id.to_string(),
            },
        }
    }
}

#[derive(Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    code: Option<String>,
}

/// A webhook notification.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookNotification {
    pub event: String,
    pub object: WebhookObject,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookObject {
    pub id: String,
}

impl WebhookNotification {
    /// Payment status implied by the event, `None` for events we ignore.
    #[must_use]
    pub fn payment_status(&self) -> Option<PaymentStatus> {
        match self.event.as_str() {
            "payment.succeeded" => Some(PaymentStatus::Succeeded),
            "payment.canceled" => Some(PaymentStatus::Canceled),
            "payment.waiting_for_capture" => Some(PaymentStatus::WaitingForCapture),
            _ => None,
        }
    }
}

/// YooKassa client for one shop.
#[derive(Clone)]
pub struct YookassaClient {
    client: Client,
    shop_id: String,
    secret_key: SecretString,
}

impl std::fmt::Debug for YookassaClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("YookassaClient")
            .field("shop_id", &self.shop_id)
            .field("secret_key", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl YookassaClient {
    /// Client using the shop id and secret key of a stored setting.
    #[must_use]
    pub fn from_setting(client: Client, setting: &PaymentSetting) -> Self {
        Self {
            client,
            shop_id: setting.merchant_id.clone(),
            secret_key: SecretString::from(setting.secret_key.clone()),
        }
    }

    /// Create a redirect payment captured automatically.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or YooKassa rejects the payment.
    #[instrument(skip(self, request), fields(order_id = %request.order_id, amount = %request.amount))]
    pub async fn create_payment(
        &self,
        request: &PaymentRequest<'_>,
    ) -> Result<ProviderPayment, PaymentError> {
        let response = self
            .client
            .post(format!("{YOOKASSA_API_BASE}/payments"))
            .basic_auth(&self.shop_id, Some(self.secret_key.expose_secret()))
            .header("Idempotence-Key", Uuid::new_v4().to_string())
            .json(&CreatePaymentBody::from(request))
            .send()
            .await
            .map_err(|e| PaymentError::Request(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response
                .json::<ApiErrorBody>()
                .await
                .ok()
                .and_then(|body| body.description.or(body.code))
                .unwrap_or_else(|| status.to_string());
            error!(status = %status, detail = %detail, "YooKassa rejected payment");
            return Err(PaymentError::Api(detail));
        }

        let payment: ProviderPayment = response
            .json()
            .await
            .map_err(|e| PaymentError::Response(e.to_string()))?;

        debug!(payment_id = %payment.id, "YooKassa payment created");
        Ok(payment)
    }
}

/// Check the `X-Signature` of a webhook body against `secret_key`.
///
/// # Errors
///
/// Returns `PaymentError::InvalidSignature` if the signature does not match.
pub fn verify_signature(secret_key: &str, body: &[u8], signature: &str) -> Result<(), PaymentError> {
    let expected = sign(secret_key, body)?;

    if !constant_time_compare(&expected, signature.trim()) {
        return Err(PaymentError::InvalidSignature);
    }

    Ok(())
}

/// Hex HMAC-SHA256 of `body`.
fn sign(secret_key: &str, body: &[u8]) -> Result<String, PaymentError> {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret_key.as_bytes())
        .map_err(|_| PaymentError::InvalidSignature)?;
    mac.update(body);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Constant-time string comparison to prevent timing attacks.
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result: u8 = 0;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }

    result == 0
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare("abc", "abc"));
        assert!(!constant_time_compare("abc", "abd"));
        assert!(!constant_time_compare("abc", "abcd"));
    }

    #[test]
    fn test_signature_round_trip() {
        let body = br#"{"event":"payment.succeeded","object":{"id":"2d1f"}}"#;
        let signature = sign("shop-secret", body).unwrap();

        assert!(verify_signature("shop-secret", body, &signature).is_ok());
        assert!(matches!(
            verify_signature("other-secret", body, &signature),
            Err(PaymentError::InvalidSignature)
        ));
        assert!(matches!(
            verify_signature("shop-secret", b"tampered", &signature),
            Err(PaymentError::InvalidSignature)
        ));
    }

    #[test]
    fn test_create_body_shape() {
        let order_id = OrderId::generate();
        let request = PaymentRequest {
            order_id,
            amount: Decimal::new(8500, 0),
            currency: Currency::RUB,
            description: "Заказ NEXX-000001",
            return_url: "https://nexx.ru/orders",
        };

        let body = serde_json::to_value(CreatePaymentBody::from(&request)).unwrap();
        assert_eq!(body["amount"]["value"], "8500.00");
        assert_eq!(body["amount"]["currency"], "RUB");
        assert_eq!(body["capture"], true);
        assert_eq!(body["confirmation"]["type"], "redirect");
        assert_eq!(body["metadata"]["order_id"], order_id.to_string());
    }

    #[test]
    fn test_provider_payment_parses() {
        let payment: ProviderPayment = serde_json::from_str(
            r#"{
                "id": "2d1f6b7c-000f-5000-9000-1b68e7b15f3f",
                "status": "pending",
                "paid": false,
                "confirmation": {"type": "redirect", "confirmation_url": "https://yoomoney.ru/checkout/x"}
            }"#,
        )
        .unwrap();
        assert_eq!(payment.status, PaymentStatus::Pending);
        assert_eq!(payment.confirmation_url(), Some("https://yoomoney.ru/checkout/x"));
    }

    #[test]
    fn test_webhook_events() {
        let parse = |event: &str| -> WebhookNotification {
            serde_json::from_value(serde_json::json!({"event": event, "object": {"id": "p1"}}))
                .unwrap()
        };
        assert_eq!(
            parse("payment.succeeded").payment_status(),
            Some(PaymentStatus::Succeeded)
        );
        assert_eq!(
            parse("payment.canceled").payment_status(),
            Some(PaymentStatus::Canceled)
        );
        assert_eq!(
            parse("payment.waiting_for_capture").payment_status(),
            Some(PaymentStatus::WaitingForCapture)
        );
        assert_eq!(parse("refund.succeeded").payment_status(), None);
    }
}
