//! Password authentication route handlers.

use axum::{Router, extract::State, routing::{get, post}};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tower_sessions::Session;
use tracing::instrument;

use nexx_core::{Email, Phone, UserRole, UserType};

use crate::db::UserRepository;
use crate::error::{AppError, Result, clear_sentry_user, set_sentry_user};
use crate::extract::Json;
use crate::middleware::{RequireAuth, clear_current_user, set_current_user};
use crate::models::{CurrentUser, User, UserDetails, UserProfile};
use crate::routes::done;
use crate::services::auth::{AuthService, Registration};
use crate::state::AppState;

/// Login and registration (rate limited when enabled).
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
}

/// Routes acting on an existing session.
pub fn session_router() -> Router<AppState> {
    Router::new()
        .route("/api/auth/logout", post(logout))
        .route("/api/auth/me", get(me))
}

/// Registration request.
#[derive(Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: Option<Email>,
    pub password: String,
    pub phone: Option<Phone>,
    pub name: String,
    #[serde(default)]
    pub user_type: UserType,
    #[serde(flatten)]
    pub details: UserDetails,
    pub address: Option<String>,
}

/// Login request; `username` may also be the email.
#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Response for a successful login, registration or phone verification.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub success: bool,
    pub user: UserProfile,
    pub message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_new_user: Option<bool>,
}

/// Put `user` in the session and tag Sentry events with it.
pub(crate) async fn start_session(session: &Session, user: &User) -> Result<()> {
    set_current_user(session, &CurrentUser::from(user)).await?;
    set_sentry_user(&user.id, &user.username);
    Ok(())
}

/// Open a customer account and log it in.
#[instrument(skip(state, session, body), fields(username = %body.username))]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<RegisterRequest>,
) -> Result<Json<AuthResponse>> {
    if body.name.trim().is_empty() {
        return Err(AppError::BadRequest("Name is required".to_owned()));
    }

    let user = AuthService::new(state.db())
        .register(Registration {
            username: body.username,
            email: body.email,
            password: Some(body.password),
            phone: body.phone,
            name: body.name.trim().to_owned(),
            user_type: body.user_type,
            role: UserRole::User,
            details: body.details,
            address: body.address,
            active: true,
        })
        .await?;

    start_session(&session, &user).await?;

    Ok(Json(AuthResponse {
        success: true,
        user: user.into(),
        message: "Registration successful",
        is_new_user: None,
    }))
}

/// Log in with username or email and password.
#[instrument(skip(state, session, body), fields(login = %body.username))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<LoginRequest>,
) -> Result<Json<AuthResponse>> {
    let user = AuthService::new(state.db())
        .login(&body.username, &body.password)
        .await
        .inspect_err(|e| tracing::warn!(error = %e, "Login failed"))?;

    start_session(&session, &user).await?;
    tracing::info!(user_id = %user.id, "User logged in");

    Ok(Json(AuthResponse {
        success: true,
        user: user.into(),
        message: "Login successful",
        is_new_user: None,
    }))
}

#[instrument(skip(session))]
pub async fn logout(session: Session) -> Result<Json<Value>> {
    clear_current_user(&session).await?;
    clear_sentry_user();
    Ok(done("Logged out"))
}

/// The logged-in account, read fresh from the store.
#[instrument(skip(current, state))]
pub async fn me(
    RequireAuth(current): RequireAuth,
    State(state): State<AppState>,
) -> Result<Json<UserProfile>> {
    let user = UserRepository::new(state.db())
        .get(current.id)
        .await?
        .filter(|u| u.active)
        .ok_or_else(|| AppError::Unauthorized("Authentication required".to_owned()))?;
    Ok(Json(user.into()))
}
