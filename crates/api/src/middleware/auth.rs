//! Authentication extractors.
//!
//! The logged-in user's id lives in the session under
//! [`session_keys::CURRENT_USER`]. Every request re-reads the account from
//! the store, so role changes and deactivation apply to open sessions.
//! Rejections are [`AppError`]s so they use the usual JSON error body.

use axum::{extract::FromRequestParts, http::request::Parts};
use tower_sessions::Session;

use nexx_core::{UserId, UserRole};

use crate::db::UserRepository;
use crate::error::AppError;
use crate::models::{CurrentUser, session_keys};
use crate::state::AppState;

/// Resolve the session's user against the store.
///
/// Anonymous sessions, deleted accounts and disabled accounts yield `None`.
async fn current_user(parts: &Parts, state: &AppState) -> Result<Option<CurrentUser>, AppError> {
    let Some(session) = parts.extensions.get::<Session>() else {
        return Ok(None);
    };
    let Some(stored) = session
        .get::<CurrentUser>(session_keys::CURRENT_USER)
        .await
        .ok()
        .flatten()
    else {
        return Ok(None);
    };

    let user = UserRepository::new(state.db()).get(stored.id).await?;
    Ok(user.filter(|u| u.active).map(|u| CurrentUser::from(&u)))
}

fn unauthorized() -> AppError {
    AppError::Unauthorized("Authentication required".to_owned())
}

/// Extractor that requires a logged-in, active user.
///
/// ```rust,ignore
/// async fn me(RequireAuth(user): RequireAuth) -> String {
///     user.name
/// }
/// ```
pub struct RequireAuth(pub CurrentUser);

impl RequireAuth {
    /// Reject unless the user owns `owner`'s data or is staff.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Forbidden` for someone else's data.
    pub fn ensure_access(&self, owner: UserId) -> Result<(), AppError> {
        if self.0.can_access(owner) {
            Ok(())
        } else {
            Err(AppError::Forbidden("Access denied".to_owned()))
        }
    }
}

impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        current_user(parts, state)
            .await?
            .map(Self)
            .ok_or_else(unauthorized)
    }
}

/// Extractor that requires a manager or admin.
pub struct RequireStaff(pub CurrentUser);

impl FromRequestParts<AppState> for RequireStaff {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = current_user(parts, state).await?.ok_or_else(unauthorized)?;

        if !user.role.is_staff() {
            return Err(AppError::Forbidden("Staff access required".to_owned()));
        }

        Ok(Self(user))
    }
}

/// Extractor that requires the admin role.
pub struct RequireAdmin(pub CurrentUser);

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = current_user(parts, state).await?.ok_or_else(unauthorized)?;

        if user.role != UserRole::Admin {
            return Err(AppError::Forbidden("Admin access required".to_owned()));
        }

        Ok(Self(user))
    }
}

/// Helper to set the current user in the session.
///
/// The session id is cycled first so a pre-login id cannot be reused.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_user(
    session: &Session,
    user: &CurrentUser,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.insert(session_keys::CURRENT_USER, user).await
}

/// Helper to clear the current user from the session (logout).
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_current_user(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.flush().await
}
