//! Pre-order cart repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use teamspirit_core::{
    CartId, CartLineId, LineSpec, Price, ProductId, Quantity, Size, UserId,
};

use super::{CartRepository, RepositoryError};
use crate::models::{Cart, CartLine};

const LINE_SELECT: &str = r"
    SELECT l.id, l.cart_id, l.product_id, p.name AS product_name,
           p.price AS unit_price, p.is_free, l.quantity, l.size
    FROM teamspirit.shopping_cart_line l
    JOIN teamspirit.product p ON p.id = l.product_id
";

#[derive(sqlx::FromRow)]
struct CartRow {
    id: i32,
    user_id: i32,
    is_open: bool,
    created_at: DateTime<Utc>,
}

impl From<CartRow> for Cart {
    fn from(row: CartRow) -> Self {
        Self {
            id: CartId::new(row.id),
            user_id: UserId::new(row.user_id),
            is_open: row.is_open,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct LineRow {
    id: i32,
    cart_id: i32,
    product_id: i32,
    product_name: String,
    unit_price: Option<i32>,
    is_free: bool,
    quantity: i16,
    size: String,
}

impl TryFrom<LineRow> for CartLine {
    type Error = RepositoryError;

    fn try_from(row: LineRow) -> Result<Self, Self::Error> {
        let line_id = row.id;
        let corrupt = |what: &str, e: &dyn std::fmt::Display| {
            RepositoryError::DataCorruption(format!("invalid {what} in cart line {line_id}: {e}"))
        };
        let unit_price = row
            .unit_price
            .map(Price::new)
            .transpose()
            .map_err(|e| corrupt("price", &e))?;
        let quantity = Quantity::new(i64::from(row.quantity)).map_err(|e| corrupt("quantity", &e))?;
        let size: Size = row.size.parse().map_err(|e| corrupt("size", &e))?;

        Ok(Self {
            id: CartLineId::new(line_id),
            cart_id: CartId::new(row.cart_id),
            product_id: ProductId::new(row.product_id),
            product_name: row.product_name,
            unit_price,
            is_free: row.is_free,
            quantity,
            size,
        })
    }
}

#[derive(sqlx::FromRow)]
struct LineWithOwnerRow {
    #[sqlx(flatten)]
    line: LineRow,
    owner_id: i32,
}

/// `PostgreSQL` cart repository.
pub struct PgCartRepository {
    pool: PgPool,
}

impl PgCartRepository {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CartRepository for PgCartRepository {
    async fn find_by_user(&self, user_id: UserId) -> Result<Option<Cart>, RepositoryError> {
        let row = sqlx::query_as::<_, CartRow>(
            r"
            SELECT id, user_id, is_open, created_at
            FROM teamspirit.shopping_cart
            WHERE user_id = $1
            ",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Cart::from))
    }

    async fn create(&self, user_id: UserId) -> Result<Cart, RepositoryError> {
        // The unique key on user_id settles concurrent creations.
        let row = sqlx::query_as::<_, CartRow>(
            r"
            INSERT INTO teamspirit.shopping_cart (user_id)
            VALUES ($1)
            ON CONFLICT (user_id) DO NOTHING
            RETURNING id, user_id, is_open, created_at
            ",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Cart::from)
            .ok_or_else(|| RepositoryError::Conflict("user already has a cart".to_owned()))
    }

    async fn add_line(
        &self,
        cart_id: CartId,
        product_id: ProductId,
        spec: LineSpec,
    ) -> Result<CartLine, RepositoryError> {
        let id: i32 = sqlx::query_scalar(
            r"
            INSERT INTO teamspirit.shopping_cart_line (cart_id, product_id, quantity, size)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            ",
        )
        .bind(cart_id)
        .bind(product_id)
        .bind(i16::from(spec.quantity.get()))
        .bind(spec.size.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_foreign_key_violation() => {
                RepositoryError::NotFound
            }
            other => RepositoryError::Database(other),
        })?;

        self.get_line(CartLineId::new(id))
            .await?
            .map(|(line, _)| line)
            .ok_or(RepositoryError::NotFound)
    }

    async fn list_lines(&self, cart_id: CartId) -> Result<Vec<CartLine>, RepositoryError> {
        let sql = format!("{LINE_SELECT} WHERE l.cart_id = $1 ORDER BY l.created_at, l.id");
        sqlx::query_as::<_, LineRow>(&sql)
            .bind(cart_id)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(CartLine::try_from)
            .collect()
    }

    async fn get_line(
        &self,
        line_id: CartLineId,
    ) -> Result<Option<(CartLine, UserId)>, RepositoryError> {
        let row = sqlx::query_as::<_, LineWithOwnerRow>(
            r"
            SELECT l.id, l.cart_id, l.product_id, p.name AS product_name,
                   p.price AS unit_price, p.is_free, l.quantity, l.size,
                   c.user_id AS owner_id
            FROM teamspirit.shopping_cart_line l
            JOIN teamspirit.product p ON p.id = l.product_id
            JOIN teamspirit.shopping_cart c ON c.id = l.cart_id
            WHERE l.id = $1
            ",
        )
        .bind(line_id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(r) => Ok(Some((CartLine::try_from(r.line)?, UserId::new(r.owner_id)))),
            None => Ok(None),
        }
    }

    async fn delete_line_owned_by(
        &self,
        line_id: CartLineId,
        user_id: UserId,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r"
            DELETE FROM teamspirit.shopping_cart_line l
            USING teamspirit.shopping_cart c
            WHERE l.id = $1 AND c.id = l.cart_id AND c.user_id = $2
            ",
        )
        .bind(line_id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
