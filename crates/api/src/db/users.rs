//! User repository.
//!
//! Usernames are unique case-insensitively; emails and phones are unique
//! among the accounts that have one.

use chrono::Utc;

use nexx_core::{Email, Phone, UserId, UserRole, UserType};

use super::{Database, RepositoryError};
use crate::models::{NewUser, User, UserChanges, UserDetails, UserFilter};

/// Repository for user accounts.
pub struct UserRepository<'a> {
    db: &'a Database,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// All accounts.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the document cannot be read.
    pub async fn all(&self) -> Result<Vec<User>, RepositoryError> {
        self.db.users().load().await
    }

    /// Accounts matching the admin listing filters, newest first.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the document cannot be read.
    pub async fn list(&self, filter: &UserFilter) -> Result<Vec<User>, RepositoryError> {
        let needle = filter
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase);

        let mut users: Vec<User> = self
            .all()
            .await?
            .into_iter()
            .filter(|u| filter.role.is_none_or(|r| u.role == r))
            .filter(|u| filter.user_type.is_none_or(|t| u.user_type == t))
            .filter(|u| filter.active.is_none_or(|a| u.active == a))
            .filter(|u| needle.as_deref().is_none_or(|n| u.matches_search(n)))
            .collect();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(users)
    }

    /// Get an account by ID.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the document cannot be read.
    pub async fn get(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        Ok(self.all().await?.into_iter().find(|u| u.id == id))
    }

    /// Find an account by username or email, as typed on the login form.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the document cannot be read.
    pub async fn get_by_login(&self, login: &str) -> Result<Option<User>, RepositoryError> {
        let login = login.trim();
        let email = Email::parse(login).ok();
        Ok(self.all().await?.into_iter().find(|u| {
            u.username.eq_ignore_ascii_case(login)
                || email.is_some() && u.email.as_ref() == email.as_ref()
        }))
    }

    /// Create an account.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the username, email or phone is
    /// already used by another account.
    pub async fn create(&self, new: NewUser) -> Result<User, RepositoryError> {
        self.db
            .users()
            .update(move |users| {
                ensure_unique(
                    users,
                    None,
                    Some(&new.username),
                    new.email.as_ref(),
                    new.phone.as_ref(),
                )?;

                let user = User {
                    id: UserId::generate(),
                    username: new.username,
                    email: new.email,
                    password_hash: new.password_hash,
                    phone: new.phone,
                    name: new.name,
                    user_type: new.user_type,
                    role: new.role,
                    details: new.details,
                    address: new.address,
                    active: new.active,
                    created_at: Utc::now(),
                    updated_at: None,
                };
                users.push(user.clone());
                Ok(user)
            })
            .await
    }

    /// Find the account owning `phone`, creating a retail account if none does.
    ///
    /// Returns the account and whether it was created.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the document cannot be read or written.
    pub async fn find_or_create_by_phone(
        &self,
        phone: &Phone,
    ) -> Result<(User, bool), RepositoryError> {
        self.db
            .users()
            .update(|users| {
                if let Some(existing) = users.iter().find(|u| u.phone.as_ref() == Some(phone)) {
                    return Ok((existing.clone(), false));
                }

                let base = format!("user{}", phone.digits());
                let mut username = base.clone();
                let mut n = 2;
                while users.iter().any(|u| u.username.eq_ignore_ascii_case(&username)) {
                    username = format!("{base}-{n}");
                    n += 1;
                }

                let user = User {
                    id: UserId::generate(),
                    username,
                    email: None,
                    password_hash: None,
                    phone: Some(phone.clone()),
                    name: phone.to_string(),
                    user_type: UserType::Retail,
                    role: UserRole::User,
                    details: UserDetails::default(),
                    address: None,
                    active: true,
                    created_at: Utc::now(),
                    updated_at: None,
                };
                users.push(user.clone());
                Ok((user, true))
            })
            .await
    }

    /// Apply a partial update.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the account does not exist and
    /// `RepositoryError::Conflict` if a changed username, email or phone is
    /// used by another account.
    pub async fn update(&self, id: UserId, changes: UserChanges) -> Result<User, RepositoryError> {
        self.db
            .users()
            .update(move |users| {
                ensure_unique(
                    users,
                    Some(id),
                    changes.username.as_ref(),
                    changes.email.as_ref(),
                    changes.phone.as_ref(),
                )?;

                let user = users
                    .iter_mut()
                    .find(|u| u.id == id)
                    .ok_or(RepositoryError::NotFound)?;

                if let Some(username) = changes.username {
                    user.username = username;
                }
                if let Some(email) = changes.email {
                    user.email = Some(email);
                }
                if let Some(phone) = changes.phone {
                    user.phone = Some(phone);
                }
                if let Some(name) = changes.name {
                    user.name = name;
                }
                if let Some(user_type) = changes.user_type {
                    user.user_type = user_type;
                }
                if let Some(role) = changes.role {
                    user.role = role;
                }
                if let Some(address) = changes.address {
                    user.address = Some(address);
                }
                if let Some(active) = changes.active {
                    user.active = active;
                }
                if let Some(hash) = changes.password_hash {
                    user.password_hash = Some(hash);
                }
                user.details.merge(changes.details);
                user.updated_at = Some(Utc::now());

                Ok(user.clone())
            })
            .await
    }

    /// Delete an account.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the account does not exist.
    pub async fn delete(&self, id: UserId) -> Result<(), RepositoryError> {
        self.db
            .users()
            .update(|users| {
                let before = users.len();
                users.retain(|u| u.id != id);
                if users.len() == before {
                    return Err(RepositoryError::NotFound);
                }
                Ok(())
            })
            .await
    }
}

fn ensure_unique(
    users: &[User],
    except: Option<UserId>,
    username: Option<&String>,
    email: Option<&Email>,
    phone: Option<&Phone>,
) -> Result<(), RepositoryError> {
    let others = || users.iter().filter(move |u| Some(u.id) != except);

    if let Some(username) = username
        && others().any(|u| u.username.eq_ignore_ascii_case(username))
    {
        return Err(RepositoryError::Conflict(
            "user with this username already exists".to_owned(),
        ));
    }
    if let Some(email) = email
        && others().any(|u| u.email.as_ref() == Some(email))
    {
        return Err(RepositoryError::Conflict(
            "user with this email already exists".to_owned(),
        ));
    }
    if let Some(phone) = phone
        && others().any(|u| u.phone.as_ref() == Some(phone))
    {
        return Err(RepositoryError::Conflict(
            "user with this phone already exists".to_owned(),
        ));
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn new_user(username: &str, email: &str) -> NewUser {
        NewUser {
            username: username.to_owned(),
            email: Some(Email::parse(email).unwrap()),
            password_hash: None,
            phone: None,
            name: username.to_owned(),
            user_type: UserType::Retail,
            role: UserRole::User,
            details: UserDetails::default(),
            address: None,
            active: true,
        }
    }

    async fn open() -> (tempfile::TempDir, Database) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(dir.path()).await.unwrap();
        (dir, db)
    }

    #[tokio::test]
    async fn test_duplicate_username_and_email_conflict() {
        let (_dir, db) = open().await;
        let repo = UserRepository::new(&db);
        repo.create(new_user("petrov", "petrov@nexx.ru")).await.unwrap();

        let err = repo
            .create(new_user("PETROV", "other@nexx.ru"))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(m) if m.contains("username")));

        let err = repo
            .create(new_user("sidorov", "Petrov@NEXX.ru"))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(m) if m.contains("email")));
    }

    #[tokio::test]
    async fn test_login_by_username_or_email() {
        let (_dir, db) = open().await;
        let repo = UserRepository::new(&db);
        let user = repo.create(new_user("petrov", "petrov@nexx.ru")).await.unwrap();

        assert_eq!(repo.get_by_login("Petrov").await.unwrap().unwrap().id, user.id);
        assert_eq!(
            repo.get_by_login("petrov@nexx.ru").await.unwrap().unwrap().id,
            user.id
        );
        assert!(repo.get_by_login("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_rechecks_uniqueness() {
        let (_dir, db) = open().await;
        let repo = UserRepository::new(&db);
        repo.create(new_user("petrov", "petrov@nexx.ru")).await.unwrap();
        let other = repo.create(new_user("sidorov", "sidorov@nexx.ru")).await.unwrap();

        let err = repo
            .update(
                other.id,
                UserChanges {
                    username: Some("petrov".to_owned()),
                    ..UserChanges::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));

        // Keeping one's own username is fine.
        let updated = repo
            .update(
                other.id,
                UserChanges {
                    username: Some("sidorov".to_owned()),
                    role: Some(UserRole::Manager),
                    ..UserChanges::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.role, UserRole::Manager);
    }

    #[tokio::test]
    async fn test_find_or_create_by_phone_is_idempotent() {
        let (_dir, db) = open().await;
        let repo = UserRepository::new(&db);
        let phone = Phone::parse("89001234567").unwrap();

        let (first, created) = repo.find_or_create_by_phone(&phone).await.unwrap();
        assert!(created);
        assert_eq!(first.username, "user79001234567");
        assert!(first.email.is_none());

        let (second, created) = repo.find_or_create_by_phone(&phone).await.unwrap();
        assert!(!created);
        assert_eq!(first.id, second.id);
    }

    #[tokio::test]
    async fn test_list_filters() {
        let (_dir, db) = open().await;
        let repo = UserRepository::new(&db);
        repo.create(new_user("petrov", "petrov@nexx.ru")).await.unwrap();
        let mut manager = new_user("manager", "manager@nexx.ru");
        manager.role = UserRole::Manager;
        manager.active = false;
        repo.create(manager).await.unwrap();

        let staff = repo
            .list(&UserFilter {
                role: Some(UserRole::Manager),
                ..UserFilter::default()
            })
            .await
            .unwrap();
        assert_eq!(staff.len(), 1);

        let active = repo
            .list(&UserFilter {
                active: Some(true),
                ..UserFilter::default()
            })
            .await
            .unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].username, "petrov");
    }
}
