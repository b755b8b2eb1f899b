//! Personal profile repository.

use async_trait::async_trait;
use sqlx::PgPool;

use teamspirit_core::{Address, AddressId, DocumentKind, PersonalId, ValidatedContact};

use super::{ProfileRepository, RepositoryError};
use crate::models::Personal;

#[derive(sqlx::FromRow)]
struct PersonalRow {
    id: i32,
    phone_number: String,
    address_id: i32,
    has_private_profile: bool,
    id_file: Option<String>,
    medical_file: Option<String>,
    label_first: String,
    label_second: String,
    postal_code: String,
    city: String,
    country: String,
}

impl From<PersonalRow> for Personal {
    fn from(row: PersonalRow) -> Self {
        Self {
            id: PersonalId::new(row.id),
            phone_number: row.phone_number,
            address_id: AddressId::new(row.address_id),
            address: Address {
                label_first: row.label_first,
                label_second: row.label_second,
                postal_code: row.postal_code,
                city: row.city,
                country: row.country,
            },
            has_private_profile: row.has_private_profile,
            id_file: row.id_file,
            medical_file: row.medical_file,
        }
    }
}

/// `PostgreSQL` profile repository.
pub struct PgProfileRepository {
    pool: PgPool,
}

impl PgProfileRepository {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProfileRepository for PgProfileRepository {
    async fn get(&self, id: PersonalId) -> Result<Option<Personal>, RepositoryError> {
        let row = sqlx::query_as::<_, PersonalRow>(
            r"
            SELECT p.id, p.phone_number, p.address_id, p.has_private_profile,
                   p.id_file, p.medical_file,
                   a.label_first, a.label_second, a.postal_code, a.city, a.country
            FROM teamspirit.personal p
            JOIN teamspirit.address a ON a.id = p.address_id
            WHERE p.id = $1
            ",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Personal::from))
    }

    async fn update_contact(
        &self,
        id: PersonalId,
        contact: &ValidatedContact,
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let address_id: Option<i32> = sqlx::query_scalar(
            r"
            UPDATE teamspirit.personal
            SET phone_number = $2, has_private_profile = $3
            WHERE id = $1
            RETURNING address_id
            ",
        )
        .bind(id)
        .bind(contact.phone_number.as_str())
        .bind(contact.has_private_profile)
        .fetch_optional(&mut *tx)
        .await?;

        let address_id = address_id.ok_or(RepositoryError::NotFound)?;
        let address = &contact.address;
        sqlx::query(
            r"
            UPDATE teamspirit.address
            SET label_first = $2, label_second = $3, postal_code = $4, city = $5, country = $6
            WHERE id = $1
            ",
        )
        .bind(address_id)
        .bind(&address.label_first)
        .bind(&address.label_second)
        .bind(&address.postal_code)
        .bind(&address.city)
        .bind(&address.country)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn set_document(
        &self,
        id: PersonalId,
        kind: DocumentKind,
        key: Option<&str>,
    ) -> Result<Option<String>, RepositoryError> {
        let column = match kind {
            DocumentKind::Medical => "medical_file",
            DocumentKind::Identity => "id_file",
        };
        // Read the old value and write the new one under a row lock.
        let mut tx = self.pool.begin().await?;
        let previous: Option<Option<String>> = sqlx::query_scalar(&format!(
            "SELECT {column} FROM teamspirit.personal WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;
        let previous = previous.ok_or(RepositoryError::NotFound)?;

        sqlx::query(&format!(
            "UPDATE teamspirit.personal SET {column} = $2 WHERE id = $1"
        ))
        .bind(id)
        .bind(key)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(previous)
    }
}
