//! User Entity
//!
//! An account: profile, login email, password hash, role and status.

use admission::{PrincipalRecord, Role};
use chrono::{DateTime, Utc};
use kernel::id::UserId;
use platform::password::HashedPassword;

use crate::domain::value_object::{DisplayName, Email};

#[derive(Debug, Clone)]
pub struct User {
    pub id: UserId,
    pub name: DisplayName,
    /// Login identifier, unique
    pub email: Email,
    pub password_hash: HashedPassword,
    pub role: Role,
    /// Inactive accounts cannot log in or refresh
    pub is_active: bool,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// New active account with the `user` role
    pub fn new(name: DisplayName, email: Email, password_hash: HashedPassword) -> Self {
        let now = Utc::now();
        Self {
            id: UserId::new(),
            name,
            email,
            password_hash,
            role: Role::User,
            is_active: true,
            last_login_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn rename(&mut self, name: DisplayName) {
        self.name = name;
        self.updated_at = Utc::now();
    }

    pub fn change_email(&mut self, email: Email) {
        self.email = email;
        self.updated_at = Utc::now();
    }

    pub fn set_password(&mut self, password_hash: HashedPassword) {
        self.password_hash = password_hash;
        self.updated_at = Utc::now();
    }

    pub fn can_login(&self) -> bool {
        self.is_active
    }

    /// The view the admission layer authenticates against
    pub fn to_principal_record(&self) -> PrincipalRecord {
        PrincipalRecord {
            id: self.id,
            email: self.email.as_str().to_string(),
            role: self.role,
            is_active: self.is_active,
            password_hash: self.password_hash.as_phc_string().to_string(),
        }
    }
}
