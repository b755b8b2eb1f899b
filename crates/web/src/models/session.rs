//! Session-related types.
//!
//! Types stored in the session for authentication state.

use serde::{Deserialize, Serialize};

use teamspirit_core::{Email, PersonalId, UserId};

use super::user::User;

/// Session-stored member identity.
///
/// Minimal data stored in the session to identify the logged-in member and
/// check ownership without a database round-trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    /// User's database ID.
    pub id: UserId,
    /// User's email address.
    pub email: Email,
    /// The member's personal profile.
    pub personal_id: PersonalId,
    pub first_name: String,
    pub last_name: String,
}

impl CurrentUser {
    /// Display name, e.g. `Lucie MARTIN`.
    #[must_use]
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

impl From<&User> for CurrentUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            personal_id: user.personal_id,
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
        }
    }
}

/// Session keys for authentication data.
pub mod keys {
    /// Key for storing the current logged-in member.
    pub const CURRENT_USER: &str = "current_user";
}
