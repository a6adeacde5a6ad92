//! robots.txt and sitemap.xml.

use axum::{
    Router,
    extract::State,
    http::header,
    response::IntoResponse,
    routing::get,
};
use chrono::Utc;
use tracing::instrument;

use crate::db::{PageRepository, ProductRepository, SettingsRepository};
use crate::error::{AppError, Result};
use crate::services::seo::{render_sitemap, robots_txt, sitemap_urls};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/robots.txt", get(robots))
        .route("/sitemap.xml", get(sitemap))
}

#[instrument(skip(state))]
pub async fn robots(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let seo = SettingsRepository::new(state.db()).seo().await?;
    Ok((
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        robots_txt(&seo, &state.config().base_url),
    ))
}

/// Sitemap of the storefront; 404 when disabled.
#[instrument(skip(state))]
pub async fn sitemap(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let seo = SettingsRepository::new(state.db()).seo().await?;
    if !seo.sitemap_enabled {
        return Err(AppError::NotFound("Sitemap is disabled".to_owned()));
    }

    let products = ProductRepository::new(state.db()).all().await?;
    let pages = PageRepository::new(state.db()).list(Some(true)).await?;
    let urls = sitemap_urls(&state.config().base_url, &products, &pages, Utc::now());

    let xml = render_sitemap(&urls).map_err(|e| {
        tracing::error!("Sitemap render error: {e}");
        AppError::Internal(e.to_string())
    })?;

    Ok(([(header::CONTENT_TYPE, "application/xml; charset=utf-8")], xml))
}
