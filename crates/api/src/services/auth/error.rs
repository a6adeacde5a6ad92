//! Authentication error types.

use thiserror::Error;

use crate::db::RepositoryError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid credentials (wrong password or unknown login).
    #[error("invalid credentials")]
    InvalidCredentials,

    /// The account exists but was deactivated by staff.
    #[error("account is disabled")]
    AccountDisabled,

    /// Blank username.
    #[error("username cannot be empty")]
    InvalidUsername,

    /// Username, email or phone already taken.
    #[error("{0}")]
    UserAlreadyExists(String),

    /// Password too weak or invalid.
    #[error("{0}")]
    WeakPassword(String),

    /// Repository/storage error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,
}
