//! User account types.
//!
//! [`User`] is the stored record and carries the password hash; handlers only
//! ever return [`UserProfile`], which does not.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use nexx_core::{Email, Phone, UserId, UserRole, UserType};

/// A stored user account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    #[serde(default)]
    pub email: Option<Email>,
    /// Argon2 PHC string; `None` for accounts created through SMS login.
    #[serde(default)]
    pub password_hash: Option<String>,
    #[serde(default)]
    pub phone: Option<Phone>,
    pub name: String,
    #[serde(default)]
    pub user_type: UserType,
    #[serde(default)]
    pub role: UserRole,
    #[serde(flatten)]
    pub details: UserDetails,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default = "default_active")]
    pub active: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

const fn default_active() -> bool {
    true
}

/// Legal-entity and individual details.
///
/// Which half is filled depends on [`UserType`]; neither is enforced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDetails {
    // Legal entity
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kpp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ogrn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub legal_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postal_address: Option<String>,

    // Individual
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub middle_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passport_series: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passport_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<NaiveDate>,
}

impl UserDetails {
    /// Overwrite every field that is set in `other`.
    pub fn merge(&mut self, other: Self) {
        fn set<T>(slot: &mut Option<T>, value: Option<T>) {
            if value.is_some() {
                *slot = value;
            }
        }

        set(&mut self.company_name, other.company_name);
        set(&mut self.inn, other.inn);
        set(&mut self.kpp, other.kpp);
        set(&mut self.ogrn, other.ogrn);
        set(&mut self.legal_address, other.legal_address);
        set(&mut self.postal_address, other.postal_address);
        set(&mut self.first_name, other.first_name);
        set(&mut self.last_name, other.last_name);
        set(&mut self.middle_name, other.middle_name);
        set(&mut self.passport_series, other.passport_series);
        set(&mut self.passport_number, other.passport_number);
        set(&mut self.birth_date, other.birth_date);
    }
}

impl User {
    /// Whether the account matches a lowercase search term.
    #[must_use]
    pub fn matches_search(&self, needle: &str) -> bool {
        let hit = |s: Option<&str>| s.is_some_and(|s| s.to_lowercase().contains(needle));

        hit(Some(self.username.as_str()))
            || hit(self.email.as_ref().map(Email::as_str))
            || hit(Some(self.name.as_str()))
            || self.phone.as_ref().is_some_and(|p| {
                let digits: String = needle.chars().filter(char::is_ascii_digit).collect();
                !digits.is_empty() && p.digits().contains(&digits)
            })
            || hit(self.details.company_name.as_deref())
    }
}

/// User as returned by the API (no password hash).
#[derive(Debug, Clone, Serialize)]
pub struct UserProfile {
    pub id: UserId,
    pub username: String,
    pub email: Option<Email>,
    pub phone: Option<Phone>,
    pub name: String,
    pub user_type: UserType,
    pub role: UserRole,
    #[serde(flatten)]
    pub details: UserDetails,
    pub address: Option<String>,
    pub active: bool,
    pub has_password: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        Self {
            has_password: user.password_hash.is_some(),
            id: user.id,
            username: user.username,
            email: user.email,
            phone: user.phone,
            name: user.name,
            user_type: user.user_type,
            role: user.role,
            details: user.details,
            address: user.address,
            active: user.active,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// Fields for a new account, already validated.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: Option<Email>,
    pub password_hash: Option<String>,
    pub phone: Option<Phone>,
    pub name: String,
    pub user_type: UserType,
    pub role: UserRole,
    pub details: UserDetails,
    pub address: Option<String>,
    pub active: bool,
}

/// Validated partial update of an account.
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub username: Option<String>,
    pub email: Option<Email>,
    pub phone: Option<Phone>,
    pub name: Option<String>,
    pub user_type: Option<UserType>,
    pub role: Option<UserRole>,
    pub details: UserDetails,
    pub address: Option<String>,
    pub active: Option<bool>,
    pub password_hash: Option<String>,
}

/// Admin user listing filters.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserFilter {
    pub role: Option<UserRole>,
    pub user_type: Option<UserType>,
    pub active: Option<bool>,
    pub search: Option<String>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sample() -> User {
        User {
            id: UserId::generate(),
            username: "ivanov".to_owned(),
            email: Some(Email::parse("ivanov@example.ru").unwrap()),
            password_hash: Some("$argon2id$secret".to_owned()),
            phone: Some(Phone::parse("+79001234567").unwrap()),
            name: "Иван Иванов".to_owned(),
            user_type: UserType::Legal,
            role: UserRole::User,
            details: UserDetails {
                company_name: Some("ООО Стройтех".to_owned()),
                inn: Some("7701234567".to_owned()),
                ..UserDetails::default()
            },
            address: None,
            active: true,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    #[test]
    fn test_profile_hides_password_hash() {
        let json = serde_json::to_value(UserProfile::from(sample())).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["has_password"], true);
        assert_eq!(json["company_name"], "ООО Стройтех");
        assert_eq!(json["phone"], "+79001234567");
    }

    #[test]
    fn test_stored_user_round_trips_flattened_details() {
        let user = sample();
        let json = serde_json::to_string(&user).unwrap();
        let back: User = serde_json::from_str(&json).unwrap();
        assert_eq!(back.details, user.details);
        assert_eq!(back.password_hash, user.password_hash);
    }

    #[test]
    fn test_search_matches_company_and_phone() {
        let user = sample();
        assert!(user.matches_search("стройтех"));
        assert!(user.matches_search("900123"));
        assert!(user.matches_search("example.ru"));
        assert!(!user.matches_search("petrov"));
    }

    #[test]
    fn test_details_merge_keeps_unset_fields() {
        let mut details = sample().details;
        details.merge(UserDetails {
            kpp: Some("770101001".to_owned()),
            ..UserDetails::default()
        });
        assert_eq!(details.inn.as_deref(), Some("7701234567"));
        assert_eq!(details.kpp.as_deref(), Some("770101001"));
    }
}
