//! Order route handlers.

use axum::{
    Router,
    extract::State,
    routing::{get, put},
};
use serde::Deserialize;
use tracing::instrument;

use nexx_core::{OrderId, OrderStatus, UserId};

use crate::db::{OrderRepository, RepositoryError};
use crate::db::orders::OrderError;
use crate::error::{AppError, Result, add_breadcrumb};
use crate::extract::{Json, Path};
use crate::middleware::{RequireAuth, RequireStaff};
use crate::models::{NewOrder, Order};
use crate::state::AppState;

/// Build the orders router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/orders", get(list_all))
        .route("/api/orders/{user_id}", get(list_for_user).post(place))
        .route("/api/admin/orders/{order_id}", get(show))
        .route("/api/admin/orders/{order_id}/status", put(set_status))
}

/// Status change request.
#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: OrderStatus,
}

fn not_found() -> AppError {
    AppError::NotFound("Order not found".to_owned())
}

/// Checkout: turn the user's cart into an order.
#[instrument(skip(auth, state, contact))]
pub async fn place(
    auth: RequireAuth,
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
    Json(contact): Json<NewOrder>,
) -> Result<Json<Order>> {
    auth.ensure_access(user_id)?;

    if contact.user_name.trim().is_empty()
        || contact.user_phone.trim().is_empty()
        || contact.delivery_address.trim().is_empty()
    {
        return Err(AppError::BadRequest(
            "Name, phone and delivery address are required".to_owned(),
        ));
    }

    let order = OrderRepository::new(state.db())
        .place(user_id, contact)
        .await?;

    add_breadcrumb(
        "order",
        "Order placed",
        Some(&[("order_number", order.order_number.as_str())]),
    );
    Ok(Json(order))
}

/// A user's orders, newest first.
#[instrument(skip(auth, state))]
pub async fn list_for_user(
    auth: RequireAuth,
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
) -> Result<Json<Vec<Order>>> {
    auth.ensure_access(user_id)?;
    Ok(Json(OrderRepository::new(state.db()).for_user(user_id).await?))
}

/// Every order, newest first.
#[instrument(skip(_staff, state))]
pub async fn list_all(
    RequireStaff(_staff): RequireStaff,
    State(state): State<AppState>,
) -> Result<Json<Vec<Order>>> {
    Ok(Json(OrderRepository::new(state.db()).all().await?))
}

#[instrument(skip(_staff, state))]
pub async fn show(
    RequireStaff(_staff): RequireStaff,
    State(state): State<AppState>,
    Path(order_id): Path<OrderId>,
) -> Result<Json<Order>> {
    OrderRepository::new(state.db())
        .get(order_id)
        .await?
        .map(Json)
        .ok_or_else(not_found)
}

/// Move an order along its status workflow.
#[instrument(skip(staff, state), fields(by = %staff.username))]
pub async fn set_status(
    RequireStaff(staff): RequireStaff,
    State(state): State<AppState>,
    Path(order_id): Path<OrderId>,
    Json(body): Json<StatusRequest>,
) -> Result<Json<Order>> {
    let order = OrderRepository::new(state.db())
        .set_status(order_id, body.status)
        .await
        .map_err(|e| match e {
            OrderError::Repository(RepositoryError::NotFound) => not_found(),
            other => other.into(),
        })?;
    tracing::info!(order_number = %order.order_number, status = order.status.as_str(), "Order status changed");
    Ok(Json(order))
}
