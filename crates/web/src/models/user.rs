//! User domain types.

use chrono::{DateTime, Utc};

use teamspirit_core::{Email, PersonalId, UserId};

/// A member account (domain type).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    /// Login identifier, unique across members.
    pub email: Email,
    pub first_name: String,
    pub last_name: String,
    /// The one-to-one personal profile.
    pub personal_id: PersonalId,
    /// Inactive accounts cannot log in.
    pub is_active: bool,
    pub is_staff: bool,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Display name, e.g. `Lucie MARTIN`.
    #[must_use]
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Data for creating a member.
///
/// Creating a member also creates an empty address, a personal profile and a
/// role set to member.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: Email,
    pub first_name: String,
    pub last_name: String,
    pub password_hash: String,
    pub is_staff: bool,
    pub is_admin: bool,
}
