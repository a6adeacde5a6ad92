//! Staff dashboard.

use axum::{Router, extract::State, routing::get};
use tracing::instrument;

use crate::error::Result;
use crate::extract::Json;
use crate::middleware::RequireStaff;
use crate::models::Dashboard;
use crate::routes::ApiResponse;
use crate::services::analytics;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/analytics/dashboard", get(dashboard))
}

#[instrument(skip(_staff, state))]
pub async fn dashboard(
    RequireStaff(_staff): RequireStaff,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Dashboard>>> {
    Ok(ApiResponse::ok(analytics::dashboard(state.db()).await?))
}
