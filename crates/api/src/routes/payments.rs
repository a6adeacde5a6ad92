//! Payment route handlers.
//!
//! Real YooKassa payments are only created when live payments are enabled
//! and an active `yoomoney` setting exists; otherwise payments are mocked
//! with a local confirmation URL.

use axum::{
    Router,
    body::Bytes,
    extract::State,
    http::HeaderMap,
    routing::{get, post},
};
use chrono::Utc;
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::{Value, json};
use tracing::instrument;

use nexx_core::{OrderStatus, PaymentId, PaymentStatus};

use crate::db::orders::OrderError;
use crate::db::{OrderRepository, PaymentRepository, RepositoryError};
use crate::error::{AppError, Result};
use crate::extract::{Json, Path};
use crate::middleware::{RequireAuth, RequireStaff};
use crate::models::{NewPayment, Payment, PaymentProvider, PaymentSetting};
use crate::routes::ApiResponse;
use crate::services::yookassa::{
    PaymentRequest, WebhookNotification, YookassaClient, verify_signature,
};
use crate::state::AppState;

/// Header carrying the webhook HMAC.
const SIGNATURE_HEADER: &str = "x-signature";

/// Build the payments router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/payments/settings", get(settings).post(save_settings))
        .route("/api/payments/create", post(create))
        .route("/api/payments/{payment_id}", get(status))
        .route("/api/webhooks/yoomoney", post(yoomoney_webhook))
}

/// Result of starting a payment.
#[derive(Debug, Serialize)]
pub struct CreatePaymentResponse {
    pub success: bool,
    pub payment_id: String,
    pub confirmation_url: Option<String>,
    pub status: PaymentStatus,
    pub mock: bool,
}

#[instrument(skip(_staff, state))]
pub async fn settings(
    RequireStaff(_staff): RequireStaff,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<PaymentSetting>>>> {
    let settings = PaymentRepository::new(state.db()).settings().await?;
    Ok(ApiResponse::ok(
        settings.iter().map(PaymentSetting::masked).collect(),
    ))
}

/// Insert or replace one provider's credentials.
#[instrument(skip(_staff, state, setting), fields(provider = ?setting.provider))]
pub async fn save_settings(
    RequireStaff(_staff): RequireStaff,
    State(state): State<AppState>,
    Json(setting): Json<PaymentSetting>,
) -> Result<Json<ApiResponse<PaymentSetting>>> {
    if setting.merchant_id.trim().is_empty() || setting.secret_key.is_empty() {
        return Err(AppError::BadRequest(
            "merchant_id and secret_key are required".to_owned(),
        ));
    }

    let saved = PaymentRepository::new(state.db())
        .upsert_setting(setting)
        .await?;
    Ok(ApiResponse::ok(saved.masked()))
}

/// Start a payment for an order.
#[instrument(skip(auth, state, body), fields(order_id = %body.order_id, amount = %body.amount))]
pub async fn create(
    auth: RequireAuth,
    State(state): State<AppState>,
    Json(body): Json<NewPayment>,
) -> Result<Json<CreatePaymentResponse>> {
    if body.amount <= Decimal::ZERO {
        return Err(AppError::BadRequest("Amount must be positive".to_owned()));
    }

    let order = OrderRepository::new(state.db())
        .get(body.order_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Order not found".to_owned()))?;
    auth.ensure_access(order.user_id)?;

    let payments = PaymentRepository::new(state.db());
    let live_setting = if state.config().payments_live {
        payments
            .setting(PaymentProvider::Yoomoney)
            .await?
            .filter(|s| s.active)
    } else {
        None
    };

    let (provider_payment_id, status, confirmation_url, mock) = match live_setting {
        Some(setting) => {
            let provider = YookassaClient::from_setting(state.http().clone(), &setting)
                .create_payment(&PaymentRequest {
                    order_id: order.id,
                    amount: body.amount,
                    currency: body.currency,
                    description: &body.description,
                    return_url: &body.return_url,
                })
                .await?;
            let url = provider.confirmation_url().map(str::to_owned);
            (provider.id, provider.status, url, false)
        }
        None => {
            let id = format!("mock_{}", PaymentId::generate());
            let url = format!("{}/api/payments/{id}", state.config().base_url);
            (id, PaymentStatus::Pending, Some(url), true)
        }
    };

    let payment = payments
        .create(Payment {
            id: PaymentId::generate(),
            provider_payment_id,
            order_id: order.id,
            amount: body.amount,
            currency: body.currency,
            status,
            provider: PaymentProvider::Yoomoney,
            description: body.description,
            confirmation_url,
            mock,
            created_at: Utc::now(),
            updated_at: None,
        })
        .await?;

    tracing::info!(
        payment_id = %payment.provider_payment_id,
        order_number = %order.order_number,
        method = %body.payment_method,
        currency = payment.currency.code(),
        mock,
        "Payment created"
    );

    Ok(Json(CreatePaymentResponse {
        success: true,
        payment_id: payment.provider_payment_id,
        confirmation_url: payment.confirmation_url,
        status: payment.status,
        mock: payment.mock,
    }))
}

/// A payment by its provider id, for the order's owner or staff.
#[instrument(skip(auth, state))]
pub async fn status(
    auth: RequireAuth,
    State(state): State<AppState>,
    Path(payment_id): Path<String>,
) -> Result<Json<Payment>> {
    let not_found = || AppError::NotFound("Payment not found".to_owned());
    let payment = PaymentRepository::new(state.db())
        .get_by_provider_id(&payment_id)
        .await?
        .ok_or_else(not_found)?;

    match OrderRepository::new(state.db()).get(payment.order_id).await? {
        Some(order) => auth.ensure_access(order.user_id)?,
        None if auth.0.role.is_staff() => {}
        None => return Err(not_found()),
    }
    Ok(Json(payment))
}

/// YooKassa notification.
///
/// The signature is checked when a `yoomoney` setting exists and the request
/// carries one. Unknown events and unknown payments are acknowledged.
#[instrument(skip(state, headers, body))]
pub async fn yoomoney_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>> {
    let payments = PaymentRepository::new(state.db());

    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());
    if let (Some(setting), Some(signature)) =
        (payments.setting(PaymentProvider::Yoomoney).await?, signature)
    {
        verify_signature(&setting.secret_key, &body, signature)?;
    }

    let notification: WebhookNotification = serde_json::from_slice(&body)
        .map_err(|e| AppError::BadRequest(format!("Invalid notification: {e}")))?;

    let Some(status) = notification.payment_status() else {
        tracing::debug!(event = %notification.event, "Ignoring webhook event");
        return Ok(Json(json!({ "status": "ok" })));
    };

    let payment = match payments.set_status(&notification.object.id, status).await {
        Ok(payment) => payment,
        Err(RepositoryError::NotFound) => {
            tracing::warn!(payment_id = %notification.object.id, "Webhook for unknown payment");
            return Ok(Json(json!({ "status": "ok" })));
        }
        Err(e) => return Err(e.into()),
    };

    if status == PaymentStatus::Succeeded {
        match OrderRepository::new(state.db())
            .set_status(payment.order_id, OrderStatus::Paid)
            .await
        {
            Ok(order) => {
                tracing::info!(order_number = %order.order_number, "Order paid");
            }
            Err(OrderError::InvalidTransition { from, .. }) => {
                tracing::warn!(order_id = %payment.order_id, from = from.as_str(), "Paid order not in a payable state");
            }
            Err(e) => return Err(e.into()),
        }
    }

    Ok(Json(json!({ "status": "ok" })))
}

