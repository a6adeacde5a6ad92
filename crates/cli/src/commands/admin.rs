//! Staff account commands.
//!
//! # Usage
//!
//! ```bash
//! nexx-cli admin create -u manager -e manager@nexx.ru -n "Менеджер" -p 'S3cret!pass' -r manager
//! ```

use std::path::Path;

use thiserror::Error;

use nexx_api::db::{Database, RepositoryError};
use nexx_api::models::UserDetails;
use nexx_api::services::auth::{AuthError, AuthService, Registration};
use nexx_core::{Email, UserId, UserRole, UserType};

/// Errors that can occur during account operations.
#[derive(Debug, Error)]
pub enum AdminError {
    /// Data directory could not be opened.
    #[error("Data directory error: {0}")]
    Database(#[from] RepositoryError),

    /// Invalid email.
    #[error("Invalid email: {0}")]
    InvalidEmail(String),

    /// Registration was refused (duplicate login, weak password).
    #[error(transparent)]
    Auth(#[from] AuthError),
}

/// Account to create.
pub struct NewStaff {
    pub username: String,
    pub email: String,
    pub name: String,
    pub password: String,
    pub role: UserRole,
}

/// Create a password account with a staff role.
///
/// # Returns
///
/// The ID of the created account.
///
/// # Errors
///
/// Returns `AdminError::InvalidEmail` for a malformed address and
/// `AdminError::Auth` if the username or email is taken or the password is
/// too weak.
pub async fn create_user(data_dir: &Path, staff: NewStaff) -> Result<UserId, AdminError> {
    let email = Email::parse(&staff.email).map_err(|_| AdminError::InvalidEmail(staff.email))?;

    let db = Database::open(data_dir).await?;
    tracing::info!("Creating {:?} account: {}", staff.role, staff.username);

    let user = AuthService::new(&db)
        .register(Registration {
            username: staff.username,
            email: Some(email),
            password: Some(staff.password),
            phone: None,
            name: staff.name,
            user_type: UserType::Retail,
            role: staff.role,
            details: UserDetails::default(),
            address: None,
            active: true,
        })
        .await?;

    tracing::info!(
        "Account created successfully! ID: {}, Username: {}",
        user.id,
        user.username
    );

    Ok(user.id)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    use nexx_api::db::UserRepository;

    fn staff(username: &str, email: &str) -> NewStaff {
        NewStaff {
            username: username.to_owned(),
            email: email.to_owned(),
            name: "Менеджер".to_owned(),
            password: "Zapchasti-2024!".to_owned(),
            role: UserRole::Manager,
        }
    }

    #[tokio::test]
    async fn test_create_user_persists_role() {
        let dir = tempfile::tempdir().unwrap();

        let id = create_user(dir.path(), staff("manager", "manager@nexx.ru"))
            .await
            .unwrap();

        let db = Database::open(dir.path()).await.unwrap();
        let user = UserRepository::new(&db).get(id).await.unwrap().unwrap();
        assert_eq!(user.role, UserRole::Manager);
        assert!(user.password_hash.is_some());
    }

    #[tokio::test]
    async fn test_create_user_rejects_bad_email_and_duplicates() {
        let dir = tempfile::tempdir().unwrap();

        assert!(matches!(
            create_user(dir.path(), staff("manager", "not-an-email")).await,
            Err(AdminError::InvalidEmail(_))
        ));

        create_user(dir.path(), staff("manager", "manager@nexx.ru"))
            .await
            .unwrap();
        assert!(matches!(
            create_user(dir.path(), staff("manager", "other@nexx.ru")).await,
            Err(AdminError::Auth(AuthError::UserAlreadyExists(_)))
        ));
    }
}
