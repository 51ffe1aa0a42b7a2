//! User domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use forensight_core::{Email, UserId};

/// A registered gateway user (domain type).
///
/// The password hash is deliberately not part of this type; it only leaves
/// the Credential Store through [`crate::db::UserStore::find_credentials`].
#[derive(Debug, Clone)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// User's email address (unique, normalized).
    pub email: Email,
    /// When the user signed up.
    pub created_at: DateTime<Utc>,
}

/// The minimal identity returned to clients after signin.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PublicUser {
    pub id: UserId,
    pub email: Email,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
        }
    }
}
