//! Catalog and product repository.

use async_trait::async_trait;
use sqlx::PgPool;

use teamspirit_core::{CatalogId, Price, ProductId};

use super::{CatalogRepository, RepositoryError};
use crate::models::catalog::{DEFAULT_CATALOG_NAME, DEFAULT_PRODUCT_NAME};
use crate::models::{Catalog, NewProduct, Product};

const PRODUCT_SELECT: &str = r"
    SELECT p.id, p.catalog_id, c.name AS catalog_name, p.name, p.image,
           p.is_available, p.is_free, p.price
    FROM teamspirit.product p
    JOIN teamspirit.catalog c ON c.id = p.catalog_id
";

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: i32,
    catalog_id: i32,
    catalog_name: String,
    name: String,
    image: Option<String>,
    is_available: bool,
    is_free: bool,
    price: Option<i32>,
}

impl TryFrom<ProductRow> for Product {
    type Error = RepositoryError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        let price = row
            .price
            .map(Price::new)
            .transpose()
            .map_err(|e| RepositoryError::DataCorruption(format!("invalid product price: {e}")))?;

        Ok(Self {
            id: ProductId::new(row.id),
            catalog_id: CatalogId::new(row.catalog_id),
            catalog_name: row.catalog_name,
            name: row.name,
            image: row.image,
            is_available: row.is_available,
            is_free: row.is_free,
            price,
        })
    }
}

fn or_default(name: &str, default: &str) -> String {
    let name = name.trim();
    if name.is_empty() {
        default.to_owned()
    } else {
        name.to_owned()
    }
}

/// `PostgreSQL` catalog repository.
pub struct PgCatalogRepository {
    pool: PgPool,
}

impl PgCatalogRepository {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CatalogRepository for PgCatalogRepository {
    async fn list_products(&self) -> Result<Vec<Product>, RepositoryError> {
        let sql = format!("{PRODUCT_SELECT} ORDER BY c.name, p.name, p.id");
        sqlx::query_as::<_, ProductRow>(&sql)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(Product::try_from)
            .collect()
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let sql = format!("{PRODUCT_SELECT} WHERE p.id = $1");
        sqlx::query_as::<_, ProductRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(Product::try_from)
            .transpose()
    }

    async fn create_catalog(&self, name: &str) -> Result<Catalog, RepositoryError> {
        let name = or_default(name, DEFAULT_CATALOG_NAME);
        let id: i32 =
            sqlx::query_scalar("INSERT INTO teamspirit.catalog (name) VALUES ($1) RETURNING id")
                .bind(&name)
                .fetch_one(&self.pool)
                .await?;

        Ok(Catalog {
            id: CatalogId::new(id),
            name,
        })
    }

    async fn create_product(&self, new_product: &NewProduct) -> Result<Product, RepositoryError> {
        let id: i32 = sqlx::query_scalar(
            r"
            INSERT INTO teamspirit.product
                (catalog_id, name, image, is_available, is_free, price)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            ",
        )
        .bind(new_product.catalog_id)
        .bind(or_default(&new_product.name, DEFAULT_PRODUCT_NAME))
        .bind(new_product.image.as_deref())
        .bind(new_product.is_available)
        .bind(new_product.is_free)
        .bind(new_product.price)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_foreign_key_violation() => {
                RepositoryError::NotFound
            }
            other => RepositoryError::Database(other),
        })?;

        self.get_product(ProductId::new(id))
            .await?
            .ok_or(RepositoryError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_names_get_defaults() {
        assert_eq!(or_default("  ", DEFAULT_PRODUCT_NAME), "(produit sans nom)");
        assert_eq!(or_default(" Maillot ", DEFAULT_PRODUCT_NAME), "Maillot");
    }
}
