//! Account management for staff.
//!
//! Managers can read; only admins can create, change or delete accounts.

use axum::{Router, extract::State, routing::get};
use serde::Deserialize;
use serde_json::Value;
use tracing::instrument;

use nexx_core::{Email, Phone, UserId, UserRole, UserType};

use crate::db::{RepositoryError, UserRepository};
use crate::error::{AppError, Result};
use crate::extract::{Json, Path, Query};
use crate::middleware::{RequireAdmin, RequireStaff};
use crate::models::{UserChanges, UserDetails, UserFilter, UserProfile};
use crate::routes::{ApiResponse, done};
use crate::services::auth::{AuthError, AuthService, Registration, hash_new_password};
use crate::state::AppState;

/// Build the account management router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/admin/users", get(list).post(create))
        .route(
            "/api/admin/users/{id}",
            get(show).put(update).delete(delete),
        )
}

/// New account request.
#[derive(Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub email: Option<Email>,
    pub password: Option<String>,
    pub phone: Option<Phone>,
    pub name: String,
    #[serde(default)]
    pub user_type: UserType,
    #[serde(default)]
    pub role: UserRole,
    #[serde(flatten)]
    pub details: UserDetails,
    pub address: Option<String>,
    #[serde(default = "default_true")]
    pub active: bool,
}

const fn default_true() -> bool {
    true
}

/// Partial account update; absent fields are kept.
#[derive(Deserialize)]
pub struct UpdateUserRequest {
    pub username: Option<String>,
    pub email: Option<Email>,
    pub password: Option<String>,
    pub phone: Option<Phone>,
    pub name: Option<String>,
    pub user_type: Option<UserType>,
    pub role: Option<UserRole>,
    #[serde(flatten)]
    pub details: UserDetails,
    pub address: Option<String>,
    pub active: Option<bool>,
}

fn not_found(err: RepositoryError) -> AppError {
    match err {
        RepositoryError::NotFound => AppError::NotFound("User not found".to_owned()),
        other => other.into(),
    }
}

#[instrument(skip(_staff, state))]
pub async fn list(
    RequireStaff(_staff): RequireStaff,
    State(state): State<AppState>,
    Query(filter): Query<UserFilter>,
) -> Result<Json<ApiResponse<Vec<UserProfile>>>> {
    let users = UserRepository::new(state.db()).list(&filter).await?;
    Ok(ApiResponse::ok(users.into_iter().map(UserProfile::from).collect()))
}

#[instrument(skip(_staff, state))]
pub async fn show(
    RequireStaff(_staff): RequireStaff,
    State(state): State<AppState>,
    Path(id): Path<UserId>,
) -> Result<Json<ApiResponse<UserProfile>>> {
    let user = UserRepository::new(state.db())
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_owned()))?;
    Ok(ApiResponse::ok(user.into()))
}

/// Create an account with any role.
#[instrument(skip(admin, state, body), fields(by = %admin.username, username = %body.username))]
pub async fn create(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Json(body): Json<CreateUserRequest>,
) -> Result<Json<ApiResponse<UserProfile>>> {
    if body.name.trim().is_empty() {
        return Err(AppError::BadRequest("Name is required".to_owned()));
    }

    let user = AuthService::new(state.db())
        .register(Registration {
            username: body.username,
            email: body.email,
            password: body.password.filter(|p| !p.is_empty()),
            phone: body.phone,
            name: body.name.trim().to_owned(),
            user_type: body.user_type,
            role: body.role,
            details: body.details,
            address: body.address,
            active: body.active,
        })
        .await?;

    Ok(ApiResponse::ok(user.into()))
}

/// Change an account; uniqueness is checked again.
#[instrument(skip(admin, state, body), fields(by = %admin.username))]
pub async fn update(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<UserId>,
    Json(body): Json<UpdateUserRequest>,
) -> Result<Json<ApiResponse<UserProfile>>> {
    if id == admin.id && (body.active == Some(false) || body.role.is_some_and(|r| r != UserRole::Admin)) {
        return Err(AppError::BadRequest(
            "You cannot demote or deactivate your own account".to_owned(),
        ));
    }

    let password_hash = body
        .password
        .as_deref()
        .filter(|p| !p.is_empty())
        .map(hash_new_password)
        .transpose()?;

    let changes = UserChanges {
        username: body.username.map(|u| u.trim().to_owned()).filter(|u| !u.is_empty()),
        email: body.email,
        phone: body.phone,
        name: body.name.map(|n| n.trim().to_owned()).filter(|n| !n.is_empty()),
        user_type: body.user_type,
        role: body.role,
        details: body.details,
        address: body.address,
        active: body.active,
        password_hash,
    };

    let user = UserRepository::new(state.db())
        .update(id, changes)
        .await
        .map_err(|e| match e {
            RepositoryError::Conflict(msg) => AuthError::UserAlreadyExists(msg).into(),
            other => not_found(other),
        })?;

    tracing::info!(user_id = %user.id, "User updated");
    Ok(ApiResponse::ok(user.into()))
}

#[instrument(skip(admin, state), fields(by = %admin.username))]
pub async fn delete(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<UserId>,
) -> Result<Json<Value>> {
    if id == admin.id {
        return Err(AppError::BadRequest(
            "You cannot delete your own account".to_owned(),
        ));
    }

    UserRepository::new(state.db())
        .delete(id)
        .await
        .map_err(not_found)?;
    Ok(done("User deleted"))
}
