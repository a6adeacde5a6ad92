//! Media library routes (staff only).

use axum::{
    Router,
    extract::{DefaultBodyLimit, Multipart, State},
    routing::{delete, get, post},
};
use serde_json::Value;
use tracing::instrument;

use nexx_core::MediaId;

use crate::db::{MediaRepository, RepositoryError};
use crate::error::{AppError, Result};
use crate::extract::{Json, Path};
use crate::middleware::RequireStaff;
use crate::models::MediaFile;
use crate::routes::{ApiResponse, done};
use crate::services::media::{MAX_UPLOAD_BYTES, MediaError};
use crate::state::AppState;

/// Multipart overhead allowed on top of the file itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Build the media router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/admin/media", get(list))
        .route(
            "/api/admin/media/upload",
            post(upload).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES + MULTIPART_OVERHEAD)),
        )
        .route("/api/admin/media/{id}", delete(remove))
}

#[instrument(skip(_staff, state))]
pub async fn list(
    RequireStaff(_staff): RequireStaff,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<MediaFile>>>> {
    Ok(ApiResponse::ok(MediaRepository::new(state.db()).list().await?))
}

/// Store the multipart field `file`.
#[instrument(skip(staff, state, multipart), fields(by = %staff.username))]
pub async fn upload(
    RequireStaff(staff): RequireStaff,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ApiResponse<MediaFile>>> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_owned();
        let content_type = field.content_type().map(str::to_owned);
        let data = field.bytes().await?;

        let file = state
            .media()
            .save(&filename, content_type.as_deref(), &data)
            .await?;
        let file = MediaRepository::new(state.db()).create(file).await?;
        return Ok(ApiResponse::ok(file));
    }

    Err(MediaError::MissingFile.into())
}

/// Delete the record and the file on disk.
#[instrument(skip(_staff, state))]
pub async fn remove(
    RequireStaff(_staff): RequireStaff,
    State(state): State<AppState>,
    Path(id): Path<MediaId>,
) -> Result<Json<Value>> {
    let file = MediaRepository::new(state.db())
        .delete(id)
        .await
        .map_err(|e| match e {
            RepositoryError::NotFound => AppError::NotFound("Media file not found".to_owned()),
            other => other.into(),
        })?;
    state.media().remove(&file).await?;
    Ok(done("Media file deleted"))
}
