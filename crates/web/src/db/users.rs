//! User repository for database operations.
//!
//! Creating a user writes four rows (address, personal, role, user) in a
//! single transaction so a member never exists without a profile and a role.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use teamspirit_core::{Email, PersonalId, UserId, ValidatedPersonalInfo};

use super::{RepositoryError, UserRepository, map_unique_violation};
use crate::models::{NewUser, User};

const USER_COLUMNS: &str = "id, email, first_name, last_name, personal_id, is_active, \
                            is_staff, is_admin, created_at";

#[derive(sqlx::FromRow)]
struct UserRow {
    id: i32,
    email: String,
    first_name: String,
    last_name: String,
    personal_id: i32,
    is_active: bool,
    is_staff: bool,
    is_admin: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        Ok(Self {
            id: UserId::new(row.id),
            email,
            first_name: row.first_name,
            last_name: row.last_name,
            personal_id: PersonalId::new(row.personal_id),
            is_active: row.is_active,
            is_staff: row.is_staff,
            is_admin: row.is_admin,
            created_at: row.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct UserWithHashRow {
    #[sqlx(flatten)]
    user: UserRow,
    password_hash: String,
}

/// `PostgreSQL` user repository.
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM teamspirit.user WHERE id = $1");
        sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(User::try_from)
            .transpose()
    }

    async fn get_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM teamspirit.user WHERE email = $1");
        sqlx::query_as::<_, UserRow>(&sql)
            .bind(email.as_str())
            .fetch_optional(&self.pool)
            .await?
            .map(User::try_from)
            .transpose()
    }

    async fn get_with_password_hash(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let sql = format!(
            "SELECT {USER_COLUMNS}, password_hash FROM teamspirit.user WHERE email = $1"
        );
        let row = sqlx::query_as::<_, UserWithHashRow>(&sql)
            .bind(email.as_str())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(r) => Ok(Some((User::try_from(r.user)?, r.password_hash))),
            None => Ok(None),
        }
    }

    async fn create(&self, new_user: &NewUser) -> Result<User, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let address_id: i32 =
            sqlx::query_scalar("INSERT INTO teamspirit.address DEFAULT VALUES RETURNING id")
                .fetch_one(&mut *tx)
                .await?;

        let personal_id: i32 = sqlx::query_scalar(
            "INSERT INTO teamspirit.personal (address_id) VALUES ($1) RETURNING id",
        )
        .bind(address_id)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("INSERT INTO teamspirit.role (personal_id) VALUES ($1)")
            .bind(personal_id)
            .execute(&mut *tx)
            .await?;

        let sql = format!(
            r"
            INSERT INTO teamspirit.user
                (email, first_name, last_name, password_hash, personal_id, is_staff, is_admin)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {USER_COLUMNS}
            "
        );
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(new_user.email.as_str())
            .bind(&new_user.first_name)
            .bind(&new_user.last_name)
            .bind(&new_user.password_hash)
            .bind(personal_id)
            .bind(new_user.is_staff)
            .bind(new_user.is_admin)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| map_unique_violation(e, "email already exists"))?;

        tx.commit().await?;
        User::try_from(row)
    }

    async fn update_account(
        &self,
        id: UserId,
        email: &Email,
        first_name: &str,
        last_name: &str,
    ) -> Result<User, RepositoryError> {
        let sql = format!(
            r"
            UPDATE teamspirit.user
            SET email = $2, first_name = $3, last_name = $4, updated_at = now()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "
        );
        sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .bind(email.as_str())
            .bind(first_name)
            .bind(last_name)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_unique_violation(e, "email already exists"))?
            .ok_or(RepositoryError::NotFound)
            .and_then(User::try_from)
    }

    async fn update_names(
        &self,
        id: UserId,
        names: &ValidatedPersonalInfo,
    ) -> Result<User, RepositoryError> {
        let sql = format!(
            r"
            UPDATE teamspirit.user
            SET first_name = $2, last_name = $3, updated_at = now()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "
        );
        sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .bind(&names.first_name)
            .bind(&names.last_name)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(RepositoryError::NotFound)
            .and_then(User::try_from)
    }

    async fn set_password_hash(
        &self,
        id: UserId,
        password_hash: &str,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE teamspirit.user SET password_hash = $2, updated_at = now() WHERE id = $1",
        )
        .bind(id)
        .bind(password_hash)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
