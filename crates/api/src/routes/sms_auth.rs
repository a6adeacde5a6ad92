//! Phone login with SMS one-time codes.

use axum::{Router, extract::State, routing::post};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use nexx_core::Phone;

use crate::db::{SettingsRepository, UserRepository};
use crate::error::{AppError, Result};
use crate::extract::Json;
use crate::routes::auth::{AuthResponse, start_session};
use crate::services::auth::AuthError;
use crate::services::sms::code_message;
use crate::state::AppState;

/// Build the SMS login router (rate limited when enabled).
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/auth/sms/send", post(send_code))
        .route("/api/auth/sms/verify", post(verify_code))
}

#[derive(Debug, Deserialize)]
pub struct SendCodeRequest {
    pub phone: String,
}

#[derive(Deserialize)]
pub struct VerifyCodeRequest {
    pub phone: String,
    pub code: String,
}

/// Outcome of a send attempt, gateway failures included.
#[derive(Debug, Serialize)]
pub struct SendCodeResponse {
    pub success: bool,
    pub phone: Phone,
    pub provider: String,
    pub message_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

fn parse_phone(raw: &str) -> Result<Phone> {
    Phone::parse(raw).map_err(|e| AppError::BadRequest(format!("Invalid phone number: {e}")))
}

/// Generate a code and text it to the phone.
///
/// The code is only remembered when the gateway accepted the message.
#[instrument(skip(state))]
pub async fn send_code(
    State(state): State<AppState>,
    Json(body): Json<SendCodeRequest>,
) -> Result<Json<SendCodeResponse>> {
    let phone = parse_phone(&body.phone)?;
    let settings = SettingsRepository::new(state.db()).sms().await?;

    let code = state.otp().generate_code();
    let delivery = state
        .sms()
        .send(settings.as_ref(), &phone, &code_message(&code))
        .await;

    if delivery.success {
        state
            .otp()
            .store(&phone, code, delivery.message_id.clone())
            .await;
    } else {
        tracing::warn!(phone = %phone, error = ?delivery.error, "SMS code not delivered");
    }

    Ok(Json(SendCodeResponse {
        success: delivery.success,
        phone,
        provider: delivery.provider,
        message_id: delivery.message_id,
        error: delivery.error,
    }))
}

/// Check a code and log the phone's account in, creating it if needed.
#[instrument(skip(state, session, body), fields(phone = %body.phone))]
pub async fn verify_code(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<VerifyCodeRequest>,
) -> Result<Json<AuthResponse>> {
    let phone = parse_phone(&body.phone)?;
    state.otp().verify(&phone, body.code.trim()).await?;

    let (user, created) = UserRepository::new(state.db())
        .find_or_create_by_phone(&phone)
        .await?;
    if !user.active {
        return Err(AuthError::AccountDisabled.into());
    }

    start_session(&session, &user).await?;
    tracing::info!(user_id = %user.id, created, "Phone login");

    Ok(Json(AuthResponse {
        success: true,
        user: user.into(),
        message: "Phone verified",
        is_new_user: Some(created),
    }))
}
