//! Content pages: public reads, staff writes.

use axum::{
    Router,
    extract::State,
    routing::{get, post, put},
};
use serde::Deserialize;
use serde_json::Value;
use tracing::instrument;

use nexx_core::PageId;

use crate::db::{PageRepository, RepositoryError};
use crate::error::{AppError, Result};
use crate::extract::{Json, Path, Query};
use crate::middleware::RequireStaff;
use crate::models::{NewPage, Page, PageUpdate, RenderedPage};
use crate::routes::done;
use crate::services::content::render_page;
use crate::state::AppState;

/// Build the pages router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/pages", get(list))
        .route("/api/pages/{slug}", get(show))
        .route("/api/admin/pages", post(create))
        .route("/api/admin/pages/{id}", put(update).delete(delete))
}

#[derive(Debug, Deserialize)]
pub struct PageListQuery {
    pub active: Option<bool>,
}

fn not_found(err: RepositoryError) -> AppError {
    match err {
        RepositoryError::NotFound => AppError::NotFound("Page not found".to_owned()),
        other => other.into(),
    }
}

#[instrument(skip(state))]
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<PageListQuery>,
) -> Result<Json<Vec<Page>>> {
    Ok(Json(PageRepository::new(state.db()).list(query.active).await?))
}

/// A page with its markdown rendered.
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<RenderedPage>> {
    let page = PageRepository::new(state.db())
        .get_by_slug(&slug)
        .await?
        .ok_or_else(|| AppError::NotFound("Page not found".to_owned()))?;
    Ok(Json(render_page(page)))
}

#[instrument(skip(_staff, state, input), fields(slug = %input.slug))]
pub async fn create(
    RequireStaff(_staff): RequireStaff,
    State(state): State<AppState>,
    Json(input): Json<NewPage>,
) -> Result<Json<Page>> {
    if input.title.trim().is_empty() {
        return Err(AppError::BadRequest("Title is required".to_owned()));
    }
    Ok(Json(PageRepository::new(state.db()).create(input).await?))
}

#[instrument(skip(_staff, state, changes))]
pub async fn update(
    RequireStaff(_staff): RequireStaff,
    State(state): State<AppState>,
    Path(id): Path<PageId>,
    Json(changes): Json<PageUpdate>,
) -> Result<Json<Page>> {
    let page = PageRepository::new(state.db())
        .update(id, changes)
        .await
        .map_err(not_found)?;
    Ok(Json(page))
}

#[instrument(skip(_staff, state))]
pub async fn delete(
    RequireStaff(_staff): RequireStaff,
    State(state): State<AppState>,
    Path(id): Path<PageId>,
) -> Result<Json<Value>> {
    PageRepository::new(state.db())
        .delete(id)
        .await
        .map_err(not_found)?;
    Ok(done("Page deleted"))
}
