//! Role repository.
//!
//! The five role flags are always written together in one `UPDATE`; the
//! `role_exactly_one_flag` check constraint rejects anything else.

use async_trait::async_trait;
use sqlx::PgPool;

use teamspirit_core::{PersonalId, Position, RoleFlags};

use super::{RepositoryError, RoleRepository};

#[derive(sqlx::FromRow)]
struct RoleRow {
    is_member: bool,
    is_secretary: bool,
    is_treasurer: bool,
    is_president: bool,
    is_inactive: bool,
}

impl From<RoleRow> for RoleFlags {
    fn from(row: RoleRow) -> Self {
        Self {
            is_member: row.is_member,
            is_secretary: row.is_secretary,
            is_treasurer: row.is_treasurer,
            is_president: row.is_president,
            is_inactive: row.is_inactive,
        }
    }
}

/// `PostgreSQL` role repository.
pub struct PgRoleRepository {
    pool: PgPool,
}

impl PgRoleRepository {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RoleRepository for PgRoleRepository {
    async fn get(&self, personal_id: PersonalId) -> Result<Option<Position>, RepositoryError> {
        let row = sqlx::query_as::<_, RoleRow>(
            r"
            SELECT is_member, is_secretary, is_treasurer, is_president, is_inactive
            FROM teamspirit.role
            WHERE personal_id = $1
            ",
        )
        .bind(personal_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| {
            Position::try_from(RoleFlags::from(r)).map_err(|e| {
                RepositoryError::DataCorruption(format!("invalid role flags in database: {e}"))
            })
        })
        .transpose()
    }

    async fn assign(
        &self,
        personal_id: PersonalId,
        position: Position,
    ) -> Result<(), RepositoryError> {
        let flags = RoleFlags::from(position);
        let result = sqlx::query(
            r"
            UPDATE teamspirit.role
            SET is_member = $2, is_secretary = $3, is_treasurer = $4,
                is_president = $5, is_inactive = $6
            WHERE personal_id = $1
            ",
        )
        .bind(personal_id)
        .bind(flags.is_member)
        .bind(flags.is_secretary)
        .bind(flags.is_treasurer)
        .bind(flags.is_president)
        .bind(flags.is_inactive)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
