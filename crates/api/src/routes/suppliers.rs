//! Supplier and ABCP route handlers (staff only).

use axum::{
    Router,
    extract::State,
    routing::get,
};
use serde::Deserialize;
use serde_json::Value;
use tracing::instrument;

use nexx_core::SupplierId;

use crate::db::{RepositoryError, SettingsRepository, SupplierRepository};
use crate::error::{AppError, Result};
use crate::extract::{Json, Path, Query};
use crate::middleware::RequireStaff;
use crate::models::{AbcpSettings, Supplier, SupplierInput, SupplierOffer};
use crate::routes::{ApiResponse, done};
use crate::services::abcp::{AbcpClient, ConnectionCheck};
use crate::state::AppState;

/// Articles returned by a manual ABCP search.
const SEARCH_LIMIT: usize = 20;

/// Build the suppliers router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/suppliers", get(list).post(create))
        .route(
            "/api/suppliers/abcp/settings",
            get(abcp_settings).post(save_abcp_settings),
        )
        .route("/api/suppliers/abcp/test", get(abcp_test))
        .route("/api/suppliers/abcp/search", get(abcp_search))
        .route(
            "/api/suppliers/{id}",
            get(show).put(replace).delete(delete),
        )
}

/// ABCP search query.
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub number: String,
    pub brand: Option<String>,
}

fn not_found(err: RepositoryError) -> AppError {
    match err {
        RepositoryError::NotFound => AppError::NotFound("Supplier not found".to_owned()),
        other => other.into(),
    }
}

fn validate(input: &SupplierInput) -> Result<()> {
    if input.name.trim().is_empty() || input.api_type.trim().is_empty() {
        return Err(AppError::BadRequest(
            "Supplier name and api_type are required".to_owned(),
        ));
    }
    if input.markup_percentage.is_sign_negative() {
        return Err(AppError::BadRequest("Markup cannot be negative".to_owned()));
    }
    Ok(())
}

#[instrument(skip(_staff, state))]
pub async fn list(
    RequireStaff(_staff): RequireStaff,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<Supplier>>>> {
    let suppliers = SupplierRepository::new(state.db()).all().await?;
    Ok(ApiResponse::ok(suppliers.iter().map(Supplier::masked).collect()))
}

#[instrument(skip(_staff, state, input), fields(name = %input.name))]
pub async fn create(
    RequireStaff(_staff): RequireStaff,
    State(state): State<AppState>,
    Json(input): Json<SupplierInput>,
) -> Result<Json<ApiResponse<Supplier>>> {
    validate(&input)?;
    let supplier = SupplierRepository::new(state.db()).create(input).await?;
    state.offers().invalidate_all().await;
    Ok(ApiResponse::ok(supplier.masked()))
}

#[instrument(skip(_staff, state))]
pub async fn show(
    RequireStaff(_staff): RequireStaff,
    State(state): State<AppState>,
    Path(id): Path<SupplierId>,
) -> Result<Json<ApiResponse<Supplier>>> {
    let supplier = SupplierRepository::new(state.db())
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Supplier not found".to_owned()))?;
    Ok(ApiResponse::ok(supplier.masked()))
}

/// Replace a supplier; masked credential values keep the stored ones.
#[instrument(skip(_staff, state, input))]
pub async fn replace(
    RequireStaff(_staff): RequireStaff,
    State(state): State<AppState>,
    Path(id): Path<SupplierId>,
    Json(input): Json<SupplierInput>,
) -> Result<Json<ApiResponse<Supplier>>> {
    validate(&input)?;
    let supplier = SupplierRepository::new(state.db())
        .replace(id, input)
        .await
        .map_err(not_found)?;
    state.offers().invalidate_all().await;
    Ok(ApiResponse::ok(supplier.masked()))
}

#[instrument(skip(_staff, state))]
pub async fn delete(
    RequireStaff(_staff): RequireStaff,
    State(state): State<AppState>,
    Path(id): Path<SupplierId>,
) -> Result<Json<Value>> {
    SupplierRepository::new(state.db())
        .delete(id)
        .await
        .map_err(not_found)?;
    state.offers().invalidate_all().await;
    Ok(done("Supplier deleted"))
}

// =============================================================================
// ABCP
// =============================================================================

#[instrument(skip(_staff, state))]
pub async fn abcp_settings(
    RequireStaff(_staff): RequireStaff,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Option<AbcpSettings>>>> {
    let settings = SettingsRepository::new(state.db()).abcp().await?;
    Ok(ApiResponse::ok(settings.as_ref().map(AbcpSettings::masked)))
}

/// Store the ABCP account.
#[instrument(skip(_staff, state, settings), fields(username = %settings.username))]
pub async fn save_abcp_settings(
    RequireStaff(_staff): RequireStaff,
    State(state): State<AppState>,
    Json(settings): Json<AbcpSettings>,
) -> Result<Json<ApiResponse<AbcpSettings>>> {
    if settings.username.trim().is_empty() || settings.host.trim().is_empty() {
        return Err(AppError::BadRequest(
            "ABCP username and host are required".to_owned(),
        ));
    }

    let saved = SettingsRepository::new(state.db()).set_abcp(settings).await?;
    state.offers().invalidate_all().await;
    tracing::info!(host = %saved.host, active = saved.active, "ABCP settings saved");
    Ok(ApiResponse::ok(saved.masked()))
}

async fn abcp_client(state: &AppState) -> Result<AbcpClient> {
    let settings = SettingsRepository::new(state.db()).abcp().await?;
    Ok(AbcpClient::from_settings(
        state.http().clone(),
        settings.as_ref(),
    )?)
}

/// Check the stored credentials against ABCP.
#[instrument(skip(_staff, state))]
pub async fn abcp_test(
    RequireStaff(_staff): RequireStaff,
    State(state): State<AppState>,
) -> Result<Json<ConnectionCheck>> {
    let client = abcp_client(&state).await?;
    Ok(Json(client.test_connection().await))
}

/// Search ABCP by part number, with the configured markup applied.
#[instrument(skip(_staff, state))]
pub async fn abcp_search(
    RequireStaff(_staff): RequireStaff,
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<ApiResponse<Vec<SupplierOffer>>>> {
    let number = query.number.trim();
    if number.is_empty() {
        return Err(AppError::BadRequest("Part number is required".to_owned()));
    }

    let client = abcp_client(&state).await?;
    let markup = state.config().abcp_markup_percent;
    let offers = client
        .search(number, query.brand.as_deref(), SEARCH_LIMIT)
        .await?
        .into_iter()
        .map(|article| article.into_offer("abcp".to_owned(), "ABCP".to_owned(), markup))
        .collect();

    Ok(ApiResponse::ok(offers))
}
