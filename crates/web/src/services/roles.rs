//! Role assignment.
//!
//! A person holds exactly one [`Position`]. Moving to any position is
//! allowed from any other, including itself.

use tracing::instrument;

use teamspirit_core::{PersonalId, Position};

use crate::db::{Repositories, RepositoryError, RoleRepository};

pub struct RoleService<'a> {
    roles: &'a dyn RoleRepository,
}

impl<'a> RoleService<'a> {
    #[must_use]
    pub fn new(repos: &'a Repositories) -> Self {
        Self {
            roles: repos.roles.as_ref(),
        }
    }

    /// Make `position` the person's only role.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the person has no role row.
    #[instrument(skip(self), fields(personal_id = %personal_id, position = %position))]
    pub async fn assign_role(
        &self,
        personal_id: PersonalId,
        position: Position,
    ) -> Result<(), RepositoryError> {
        self.roles.assign(personal_id, position).await?;
        tracing::info!("role assigned");
        Ok(())
    }

    /// The person's current role.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the person has no role row.
    pub async fn current_role(&self, personal_id: PersonalId) -> Result<Position, RepositoryError> {
        self.roles
            .get(personal_id)
            .await?
            .ok_or(RepositoryError::NotFound)
    }
}
