//! Catalog route handlers.

use axum::{Router, extract::State, routing::get};
use serde_json::Value;
use tracing::instrument;

use nexx_core::ProductId;

use crate::db::{ProductRepository, RepositoryError};
use crate::error::{AppError, Result};
use crate::extract::{Json, Path, Query};
use crate::middleware::RequireStaff;
use crate::models::{CatalogFacets, NewProduct, Product, ProductFilter, ProductUpdate, SupplierOffer};
use crate::routes::{ApiResponse, done};
use crate::state::AppState;

/// Build the catalog router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/products", get(list).post(create))
        .route(
            "/api/products/{id}",
            get(show).put(update).delete(delete),
        )
        .route("/api/products/slug/{slug}", get(show_by_slug))
        .route("/api/products/{id}/offers", get(offers))
        .route("/api/catalog/facets", get(facets))
}

fn not_found() -> AppError {
    AppError::NotFound("Product not found".to_owned())
}

/// Catalog listing.
#[instrument(skip(state))]
pub async fn list(
    State(state): State<AppState>,
    Query(filter): Query<ProductFilter>,
) -> Result<Json<Vec<Product>>> {
    let products = ProductRepository::new(state.db()).list(&filter).await?;
    Ok(Json(products))
}

/// Create a product.
#[instrument(skip(staff, state, input), fields(name = %input.name))]
pub async fn create(
    RequireStaff(staff): RequireStaff,
    State(state): State<AppState>,
    Json(input): Json<NewProduct>,
) -> Result<Json<Product>> {
    if input.name.trim().is_empty() || input.part_number.trim().is_empty() {
        return Err(AppError::BadRequest(
            "Name and part number are required".to_owned(),
        ));
    }
    if input.price.is_sign_negative() {
        return Err(AppError::BadRequest("Price cannot be negative".to_owned()));
    }

    let product = ProductRepository::new(state.db()).create(input).await?;
    tracing::info!(product_id = %product.id, by = %staff.username, "Product created");
    Ok(Json(product))
}

#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<Json<Product>> {
    ProductRepository::new(state.db())
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(not_found)
}

#[instrument(skip(state))]
pub async fn show_by_slug(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<Product>> {
    ProductRepository::new(state.db())
        .get_by_slug(&slug)
        .await?
        .map(Json)
        .ok_or_else(not_found)
}

/// Partial product update.
#[instrument(skip(_staff, state, changes))]
pub async fn update(
    RequireStaff(_staff): RequireStaff,
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
    Json(changes): Json<ProductUpdate>,
) -> Result<Json<Product>> {
    if changes.price.is_some_and(|p| p.is_sign_negative()) {
        return Err(AppError::BadRequest("Price cannot be negative".to_owned()));
    }

    let product = ProductRepository::new(state.db())
        .update(id, changes)
        .await
        .map_err(|e| match e {
            RepositoryError::NotFound => not_found(),
            other => other.into(),
        })?;
    // Offers embed catalog price, brand and part number.
    state.offers().invalidate_all().await;
    Ok(Json(product))
}

#[instrument(skip(_staff, state))]
pub async fn delete(
    RequireStaff(_staff): RequireStaff,
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<Json<Value>> {
    ProductRepository::new(state.db())
        .delete(id)
        .await
        .map_err(|e| match e {
            RepositoryError::NotFound => not_found(),
            other => other.into(),
        })?;
    state.offers().invalidate_all().await;
    Ok(done("Product deleted"))
}

/// Brand and category counts for catalog navigation.
#[instrument(skip(state))]
pub async fn facets(State(state): State<AppState>) -> Result<Json<CatalogFacets>> {
    Ok(Json(ProductRepository::new(state.db()).facets().await?))
}

/// Supplier offers for a product, cheapest first.
#[instrument(skip(state))]
pub async fn offers(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<Json<ApiResponse<Vec<SupplierOffer>>>> {
    let product = ProductRepository::new(state.db())
        .get(id)
        .await?
        .ok_or_else(not_found)?;

    let offers = state.offers().offers_for(state.db(), &product).await?;
    Ok(ApiResponse::ok(offers.to_vec()))
}
