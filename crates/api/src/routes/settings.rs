//! Site, SEO and SMS settings.

use axum::{Router, extract::State, routing::get};
use tracing::instrument;

use crate::db::SettingsRepository;
use crate::error::{AppError, Result};
use crate::extract::Json;
use crate::middleware::RequireStaff;
use crate::models::{SeoSettings, SiteSettings, SmsSettings};
use crate::routes::ApiResponse;
use crate::state::AppState;

/// Build the settings router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/settings/site", get(site).post(save_site))
        .route("/api/admin/seo/settings", get(seo).post(save_seo))
        .route("/api/admin/sms/settings", get(sms).post(save_sms))
}

/// Company details; public so the storefront can render them.
#[instrument(skip(state))]
pub async fn site(State(state): State<AppState>) -> Result<Json<ApiResponse<SiteSettings>>> {
    Ok(ApiResponse::ok(SettingsRepository::new(state.db()).site().await?))
}

#[instrument(skip(_staff, state, site))]
pub async fn save_site(
    RequireStaff(_staff): RequireStaff,
    State(state): State<AppState>,
    Json(site): Json<SiteSettings>,
) -> Result<Json<ApiResponse<SiteSettings>>> {
    if site.company_name.trim().is_empty() {
        return Err(AppError::BadRequest("Company name is required".to_owned()));
    }
    Ok(ApiResponse::ok(
        SettingsRepository::new(state.db()).set_site(site).await?,
    ))
}

#[instrument(skip(_staff, state))]
pub async fn seo(
    RequireStaff(_staff): RequireStaff,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<SeoSettings>>> {
    Ok(ApiResponse::ok(SettingsRepository::new(state.db()).seo().await?))
}

#[instrument(skip(_staff, state, seo))]
pub async fn save_seo(
    RequireStaff(_staff): RequireStaff,
    State(state): State<AppState>,
    Json(seo): Json<SeoSettings>,
) -> Result<Json<ApiResponse<SeoSettings>>> {
    Ok(ApiResponse::ok(
        SettingsRepository::new(state.db()).set_seo(seo).await?,
    ))
}

/// SMS gateway settings with secrets masked; `null` when unset.
#[instrument(skip(_staff, state))]
pub async fn sms(
    RequireStaff(_staff): RequireStaff,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Option<SmsSettings>>>> {
    let sms = SettingsRepository::new(state.db()).sms().await?;
    Ok(ApiResponse::ok(sms.as_ref().map(SmsSettings::masked)))
}

#[instrument(skip(_staff, state, sms), fields(provider = %sms.provider))]
pub async fn save_sms(
    RequireStaff(_staff): RequireStaff,
    State(state): State<AppState>,
    Json(sms): Json<SmsSettings>,
) -> Result<Json<ApiResponse<SmsSettings>>> {
    if sms.provider.trim().is_empty() {
        return Err(AppError::BadRequest("SMS provider is required".to_owned()));
    }
    let saved = SettingsRepository::new(state.db()).set_sms(sms).await?;
    tracing::info!(provider = %saved.provider, "SMS settings saved");
    Ok(ApiResponse::ok(saved.masked()))
}
