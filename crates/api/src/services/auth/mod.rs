//! Authentication service.
//!
//! Username/email + password accounts. Phone logins go through the OTP
//! service and end up in [`UserRepository::find_or_create_by_phone`].

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

use nexx_core::{Email, Phone, UserRole, UserType};

use crate::db::{Database, RepositoryError, UserRepository};
use crate::models::{NewUser, User, UserDetails};

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Everything needed to open an account.
#[derive(Debug, Clone)]
pub struct Registration {
    pub username: String,
    pub email: Option<Email>,
    pub password: Option<String>,
    pub phone: Option<Phone>,
    pub name: String,
    pub user_type: UserType,
    pub role: UserRole,
    pub details: UserDetails,
    pub address: Option<String>,
    pub active: bool,
}

/// Authentication service.
pub struct AuthService<'a> {
    users: UserRepository<'a>,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(db: &'a Database) -> Self {
        Self {
            users: UserRepository::new(db),
        }
    }

    /// Open an account, hashing the password when one is given.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::WeakPassword` if the password doesn't meet requirements.
    /// Returns `AuthError::UserAlreadyExists` if the username, email or phone is taken.
    pub async fn register(&self, registration: Registration) -> Result<User, AuthError> {
        let username = registration.username.trim().to_owned();
        if username.is_empty() {
            return Err(AuthError::InvalidUsername);
        }

        let password_hash = registration
            .password
            .as_deref()
            .map(hash_new_password)
            .transpose()?;

        let user = self
            .users
            .create(NewUser {
                username,
                email: registration.email,
                password_hash,
                phone: registration.phone,
                name: registration.name,
                user_type: registration.user_type,
                role: registration.role,
                details: registration.details,
                address: registration.address,
                active: registration.active,
            })
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(msg) => AuthError::UserAlreadyExists(msg),
                other => AuthError::Repository(other),
            })?;

        tracing::info!(user_id = %user.id, username = %user.username, "User registered");
        Ok(user)
    }

    /// Login with username (or email) and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the login/password is wrong
    /// or the account has no password, and `AuthError::AccountDisabled` if the
    /// account was deactivated.
    pub async fn login(&self, login: &str, password: &str) -> Result<User, AuthError> {
        let user = self
            .users
            .get_by_login(login.trim())
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        let hash = user
            .password_hash
            .as_deref()
            .ok_or(AuthError::InvalidCredentials)?;
        verify_password(password, hash)?;

        if !user.active {
            return Err(AuthError::AccountDisabled);
        }

        Ok(user)
    }
}

/// Validate and hash a new password.
///
/// # Errors
///
/// Returns `AuthError::WeakPassword` if the password is too short and
/// `AuthError::PasswordHash` if hashing fails.
pub fn hash_new_password(password: &str) -> Result<String, AuthError> {
    validate_password(password)?;
    hash_password(password)
}

/// Validate password meets requirements.
fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Hash a password using Argon2id.
fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn registration(username: &str, password: Option<&str>) -> Registration {
        Registration {
            username: username.to_owned(),
            email: Some(Email::parse(&format!("{username}@example.ru")).unwrap()),
            password: password.map(str::to_owned),
            phone: None,
            name: "Пётр".to_owned(),
            user_type: UserType::Retail,
            role: UserRole::User,
            details: UserDetails::default(),
            address: None,
            active: true,
        }
    }

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_new_password("correct horse").unwrap();
        assert!(verify_password("correct horse", &hash).is_ok());
        assert!(matches!(
            verify_password("wrong horse", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_short_password_rejected() {
        assert!(matches!(
            hash_new_password("short"),
            Err(AuthError::WeakPassword(_))
        ));
        // Counted in characters, not bytes.
        assert!(hash_new_password("пароль12").is_ok());
    }

    #[tokio::test]
    async fn test_register_then_login_by_username_and_email() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(dir.path()).await.unwrap();
        let auth = AuthService::new(&db);

        auth.register(registration("petr", Some("secret-pass")))
            .await
            .unwrap();

        assert!(auth.login("petr", "secret-pass").await.is_ok());
        assert!(auth.login("PETR@example.ru", "secret-pass").await.is_ok());
        assert!(matches!(
            auth.login("petr", "nope-nope").await,
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_duplicate_username() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(dir.path()).await.unwrap();
        let auth = AuthService::new(&db);

        auth.register(registration("petr", Some("secret-pass")))
            .await
            .unwrap();
        let mut again = registration("petr", Some("secret-pass"));
        again.email = None;
        assert!(matches!(
            auth.register(again).await,
            Err(AuthError::UserAlreadyExists(_))
        ));
    }

    #[tokio::test]
    async fn test_passwordless_and_disabled_accounts_cannot_login() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(dir.path()).await.unwrap();
        let auth = AuthService::new(&db);

        auth.register(registration("nopass", None)).await.unwrap();
        assert!(matches!(
            auth.login("nopass", "anything-at-all").await,
            Err(AuthError::InvalidCredentials)
        ));

        let mut disabled = registration("disabled", Some("secret-pass"));
        disabled.active = false;
        auth.register(disabled).await.unwrap();
        assert!(matches!(
            auth.login("disabled", "secret-pass").await,
            Err(AuthError::AccountDisabled)
        ));
    }
}
