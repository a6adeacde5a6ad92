//! 1C accounting integration routes (staff only).

use axum::{
    Router,
    extract::State,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use nexx_core::SyncRunId;

use crate::db::{SettingsRepository, SyncHistoryRepository};
use crate::error::{AppError, Result};
use crate::extract::Json;
use crate::middleware::RequireStaff;
use crate::models::{OneCSettings, SyncResults, SyncRun, SyncType};
use crate::routes::ApiResponse;
use crate::services::onec::OneCSync;
use crate::state::AppState;

/// Sync runs returned by the history endpoint.
const HISTORY_LIMIT: usize = 50;

/// Build the 1C router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/admin/1c/settings", get(settings).post(save_settings))
        .route("/api/admin/1c/sync", post(sync))
        .route("/api/admin/1c/sync/history", get(history))
}

/// Sync request.
#[derive(Debug, Deserialize)]
pub struct SyncRequest {
    #[serde(default = "default_sync_type")]
    pub sync_type: SyncType,
    #[serde(default)]
    pub force: bool,
}

const fn default_sync_type() -> SyncType {
    SyncType::All
}

/// Sync outcome.
#[derive(Debug, Serialize)]
pub struct SyncResponse {
    pub success: bool,
    pub sync_id: SyncRunId,
    pub results: SyncResults,
}

#[instrument(skip(_staff, state))]
pub async fn settings(
    RequireStaff(_staff): RequireStaff,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Option<OneCSettings>>>> {
    let onec = SettingsRepository::new(state.db()).onec().await?;
    Ok(ApiResponse::ok(onec.as_ref().map(OneCSettings::masked)))
}

#[instrument(skip(_staff, state, onec), fields(server = %onec.server_url))]
pub async fn save_settings(
    RequireStaff(_staff): RequireStaff,
    State(state): State<AppState>,
    Json(onec): Json<OneCSettings>,
) -> Result<Json<ApiResponse<OneCSettings>>> {
    if url::Url::parse(&onec.server_url).is_err() {
        return Err(AppError::BadRequest("Invalid 1C server URL".to_owned()));
    }
    let saved = SettingsRepository::new(state.db()).set_onec(onec).await?;
    Ok(ApiResponse::ok(saved.masked()))
}

/// Run a synchronization now.
#[instrument(skip(staff, state), fields(by = %staff.username))]
pub async fn sync(
    RequireStaff(staff): RequireStaff,
    State(state): State<AppState>,
    Json(body): Json<SyncRequest>,
) -> Result<Json<SyncResponse>> {
    let onec = SettingsRepository::new(state.db())
        .onec()
        .await?
        .filter(|s| s.active)
        .ok_or_else(|| AppError::BadRequest("1C integration is not configured".to_owned()))?;

    let run = OneCSync::new(state.db())
        .run(&onec, body.sync_type, body.force)
        .await?;

    Ok(Json(SyncResponse {
        success: run.succeeded(),
        sync_id: run.id,
        results: run.results,
    }))
}

/// Recent runs, newest first.
#[instrument(skip(_staff, state))]
pub async fn history(
    RequireStaff(_staff): RequireStaff,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<SyncRun>>>> {
    let runs = SyncHistoryRepository::new(state.db())
        .recent(HISTORY_LIMIT)
        .await?;
    Ok(ApiResponse::ok(runs))
}
