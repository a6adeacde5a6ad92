//! Cart route handlers.
//!
//! Every route acts on the cart of the user in the path; the session user
//! must own it or be staff. Mutations answer with the updated cart.

use axum::{
    Router,
    extract::State,
    routing::{get, post, put},
};
use serde::Deserialize;
use tracing::instrument;

use nexx_core::{CartItemId, ProductId, UserId};

use crate::db::{CartRepository, ProductRepository, RepositoryError};
use crate::error::{AppError, Result};
use crate::extract::{Json, Path};
use crate::middleware::RequireAuth;
use crate::models::Cart;
use crate::state::AppState;

/// Build the cart router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/cart/{user_id}", get(show).delete(clear))
        .route("/api/cart/{user_id}/items", post(add))
        .route(
            "/api/cart/{user_id}/items/{item_id}",
            put(update).delete(remove),
        )
}

/// Add to cart request.
#[derive(Debug, Deserialize)]
pub struct AddToCartRequest {
    pub product_id: ProductId,
    #[serde(default = "default_quantity")]
    pub quantity: i64,
}

const fn default_quantity() -> i64 {
    1
}

/// Change quantity request.
#[derive(Debug, Deserialize)]
pub struct UpdateCartRequest {
    pub quantity: i64,
}

fn item_not_found(err: RepositoryError) -> AppError {
    match err {
        RepositoryError::NotFound => AppError::NotFound("Cart item not found".to_owned()),
        other => other.into(),
    }
}

async fn load_cart(state: &AppState, user_id: UserId) -> Result<Cart> {
    let items = CartRepository::new(state.db()).items(user_id).await?;
    Ok(Cart::new(user_id, items))
}

#[instrument(skip(auth, state))]
pub async fn show(
    auth: RequireAuth,
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
) -> Result<Json<Cart>> {
    auth.ensure_access(user_id)?;
    Ok(Json(load_cart(&state, user_id).await?))
}

/// Add a product; an existing line for it is incremented.
#[instrument(skip(auth, state))]
pub async fn add(
    auth: RequireAuth,
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
    Json(body): Json<AddToCartRequest>,
) -> Result<Json<Cart>> {
    auth.ensure_access(user_id)?;

    let quantity = u32::try_from(body.quantity)
        .ok()
        .filter(|q| *q > 0)
        .ok_or_else(|| AppError::BadRequest("Quantity must be positive".to_owned()))?;

    let product = ProductRepository::new(state.db())
        .get(body.product_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Product not found".to_owned()))?;

    CartRepository::new(state.db())
        .add(user_id, &product, quantity)
        .await?;
    Ok(Json(load_cart(&state, user_id).await?))
}

/// Change a line's quantity; zero or less removes it.
#[instrument(skip(auth, state))]
pub async fn update(
    auth: RequireAuth,
    State(state): State<AppState>,
    Path((user_id, item_id)): Path<(UserId, CartItemId)>,
    Json(body): Json<UpdateCartRequest>,
) -> Result<Json<Cart>> {
    auth.ensure_access(user_id)?;
    CartRepository::new(state.db())
        .set_quantity(user_id, item_id, body.quantity)
        .await
        .map_err(item_not_found)?;
    Ok(Json(load_cart(&state, user_id).await?))
}

#[instrument(skip(auth, state))]
pub async fn remove(
    auth: RequireAuth,
    State(state): State<AppState>,
    Path((user_id, item_id)): Path<(UserId, CartItemId)>,
) -> Result<Json<Cart>> {
    auth.ensure_access(user_id)?;
    CartRepository::new(state.db())
        .remove(user_id, item_id)
        .await
        .map_err(item_not_found)?;
    Ok(Json(load_cart(&state, user_id).await?))
}

#[instrument(skip(auth, state))]
pub async fn clear(
    auth: RequireAuth,
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
) -> Result<Json<Cart>> {
    auth.ensure_access(user_id)?;
    CartRepository::new(state.db()).clear(user_id).await?;
    Ok(Json(Cart::new(user_id, Vec::new())))
}
