//! Pre-order service: one cart per member, lines of (product, quantity, size).
//!
//! Request forms are validated into a [`LineSpec`] before anything touches
//! the database; validation never persists anything.

use thiserror::Error;
use tracing::instrument;

use teamspirit_core::{
    AddLineRequest, CartLineId, LineSpec, ProductId, UserId, ValidationErrors, cart_total,
};

use crate::db::{CartRepository, CatalogRepository, Repositories, RepositoryError};
use crate::models::{Cart, CartLine, DropOutcome, Product};

/// Errors from pre-order operations.
#[derive(Debug, Error)]
pub enum PreorderError {
    /// The add-to-cart form is invalid.
    #[error("invalid pre-order line: {0}")]
    Validation(ValidationErrors),

    #[error("product not found")]
    ProductNotFound,

    /// The product exists but cannot be ordered.
    #[error("product is not available")]
    ProductUnavailable,

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// A member's cart with its lines and total, ready to render.
#[derive(Debug, Clone)]
pub struct CartSummary {
    pub cart: Cart,
    pub lines: Vec<CartLine>,
    /// Sum of `price × quantity` over the lines, free products counting 0.
    pub total: i64,
}

/// Pre-order operations.
pub struct PreorderService<'a> {
    carts: &'a dyn CartRepository,
    catalogs: &'a dyn CatalogRepository,
}

impl<'a> PreorderService<'a> {
    #[must_use]
    pub fn new(repos: &'a Repositories) -> Self {
        Self {
            carts: repos.carts.as_ref(),
            catalogs: repos.catalogs.as_ref(),
        }
    }

    /// The member's cart, created on first access.
    ///
    /// Two concurrent first accesses race on the unique owner key; the loser
    /// reads back the winner's cart.
    ///
    /// # Errors
    ///
    /// Returns `PreorderError::Repository` if the database operation fails.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn get_or_create_cart(&self, user_id: UserId) -> Result<Cart, PreorderError> {
        if let Some(cart) = self.carts.find_by_user(user_id).await? {
            return Ok(cart);
        }

        match self.carts.create(user_id).await {
            Ok(cart) => {
                tracing::info!(cart_id = %cart.id, "cart created");
                Ok(cart)
            }
            Err(RepositoryError::Conflict(_)) => {
                tracing::debug!("lost cart creation race, re-reading");
                self.carts
                    .find_by_user(user_id)
                    .await?
                    .ok_or(PreorderError::Repository(RepositoryError::NotFound))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Append a line to `cart`. Identical lines are kept separate.
    ///
    /// # Errors
    ///
    /// Returns `PreorderError::ProductUnavailable` if the product cannot be
    /// ordered.
    #[instrument(skip(self, cart, product), fields(cart_id = %cart.id, product_id = %product.id))]
    pub async fn add_line(
        &self,
        cart: &Cart,
        product: &Product,
        spec: LineSpec,
    ) -> Result<CartLine, PreorderError> {
        if !product.is_available {
            return Err(PreorderError::ProductUnavailable);
        }
        let line = self.carts.add_line(cart.id, product.id, spec).await?;
        tracing::info!(line_id = %line.id, quantity = %spec.quantity, size = %spec.size, "line added");
        Ok(line)
    }

    /// Validate the add-to-cart form, then add the line to the member's cart.
    ///
    /// # Errors
    ///
    /// Returns `PreorderError::Validation` for a bad quantity or size,
    /// `PreorderError::ProductNotFound` for an unknown product and
    /// `PreorderError::ProductUnavailable` for one that cannot be ordered.
    pub async fn add_to_cart(
        &self,
        user_id: UserId,
        product_id: ProductId,
        request: &AddLineRequest,
    ) -> Result<CartLine, PreorderError> {
        let spec = request.validate().map_err(PreorderError::Validation)?;
        let product = self.product(product_id).await?;
        let cart = self.get_or_create_cart(user_id).await?;
        self.add_line(&cart, &product, spec).await
    }

    /// A product that can be shown on the add-to-cart form.
    ///
    /// # Errors
    ///
    /// Returns `PreorderError::ProductNotFound` for an unknown product.
    pub async fn product(&self, product_id: ProductId) -> Result<Product, PreorderError> {
        self.catalogs
            .get_product(product_id)
            .await?
            .ok_or(PreorderError::ProductNotFound)
    }

    /// Delete a line if `user_id` owns its cart.
    ///
    /// Any other request is skipped without error; the outcome says why.
    ///
    /// # Errors
    ///
    /// Returns `PreorderError::Repository` if the database operation fails.
    #[instrument(skip(self), fields(user_id = %user_id, line_id = %line_id))]
    pub async fn drop_line(
        &self,
        user_id: UserId,
        line_id: CartLineId,
    ) -> Result<DropOutcome, PreorderError> {
        if self.carts.delete_line_owned_by(line_id, user_id).await? {
            tracing::info!("line dropped");
            return Ok(DropOutcome::Dropped);
        }

        let outcome = match self.carts.get_line(line_id).await? {
            Some(_) => DropOutcome::NotOwner,
            None => DropOutcome::NotFound,
        };
        tracing::warn!(?outcome, "drop request skipped");
        Ok(outcome)
    }

    /// A line, but only if `user_id` owns its cart.
    ///
    /// # Errors
    ///
    /// Returns `PreorderError::Repository` if the database operation fails.
    pub async fn owned_line(
        &self,
        user_id: UserId,
        line_id: CartLineId,
    ) -> Result<Option<CartLine>, PreorderError> {
        Ok(self
            .carts
            .get_line(line_id)
            .await?
            .filter(|(_, owner)| *owner == user_id)
            .map(|(line, _)| line))
    }

    /// Lines of `cart`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `PreorderError::Repository` if the database operation fails.
    pub async fn list_lines(&self, cart: &Cart) -> Result<Vec<CartLine>, PreorderError> {
        Ok(self.carts.list_lines(cart.id).await?)
    }

    /// Total of `cart`.
    ///
    /// # Errors
    ///
    /// Returns `PreorderError::Repository` if the database operation fails.
    pub async fn cart_total(&self, cart: &Cart) -> Result<i64, PreorderError> {
        let lines = self.list_lines(cart).await?;
        Ok(total_of(&lines))
    }

    /// The member's cart, lines and total.
    ///
    /// # Errors
    ///
    /// Returns `PreorderError::Repository` if the database operation fails.
    pub async fn summary(&self, user_id: UserId) -> Result<CartSummary, PreorderError> {
        let cart = self.get_or_create_cart(user_id).await?;
        let lines = self.list_lines(&cart).await?;
        let total = total_of(&lines);
        Ok(CartSummary { cart, lines, total })
    }
}

fn total_of(lines: &[CartLine]) -> i64 {
    let priced: Vec<_> = lines.iter().map(CartLine::priced).collect();
    cart_total(&priced)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::memory::InMemoryDatabase;
    use crate::models::NewProduct;
    use crate::services::auth::AuthService;
    use teamspirit_core::{Price, Quantity, Size};

    struct Fixture {
        db: InMemoryDatabase,
        repos: Repositories,
        owner: UserId,
        other: UserId,
    }

    async fn fixture() -> Fixture {
        let db = InMemoryDatabase::new();
        let repos = Repositories::in_memory(&db);
        let auth = AuthService::new(&repos);
        let owner = auth
            .create_member("owner@example.com", "Ann", "Owner", "password1", false)
            .await
            .unwrap()
            .id;
        let other = auth
            .create_member("other@example.com", "Bob", "Other", "password1", false)
            .await
            .unwrap()
            .id;
        Fixture {
            db,
            repos,
            owner,
            other,
        }
    }

    async fn product(repos: &Repositories, price: Option<i32>, is_free: bool) -> Product {
        let catalog = repos.catalogs.create_catalog("Saison 2026").await.unwrap();
        repos
            .catalogs
            .create_product(&NewProduct {
                catalog_id: catalog.id,
                name: "Maillot".to_owned(),
                image: None,
                is_available: true,
                is_free,
                price: price.map(|p| Price::new(p).unwrap()),
            })
            .await
            .unwrap()
    }

    fn spec(quantity: i64, size: Size) -> LineSpec {
        LineSpec {
            quantity: Quantity::new(quantity).unwrap(),
            size,
        }
    }

    #[tokio::test]
    async fn test_get_or_create_is_idempotent() {
        let f = fixture().await;
        let service = PreorderService::new(&f.repos);

        let first = service.get_or_create_cart(f.owner).await.unwrap();
        let second = service.get_or_create_cart(f.owner).await.unwrap();
        assert_eq!(first.id, second.id);
        assert!(first.is_open);
        assert_eq!(f.db.cart_count().await, 1);
    }

    #[tokio::test]
    async fn test_concurrent_first_access_creates_one_cart() {
        let f = fixture().await;
        let service = PreorderService::new(&f.repos);

        let (a, b) = tokio::join!(
            service.get_or_create_cart(f.owner),
            service.get_or_create_cart(f.owner)
        );
        assert_eq!(a.unwrap().id, b.unwrap().id);
        assert_eq!(f.db.cart_count().await, 1);
    }

    #[tokio::test]
    async fn test_totals_follow_lines() {
        let f = fixture().await;
        let service = PreorderService::new(&f.repos);
        let cart = service.get_or_create_cart(f.owner).await.unwrap();
        let shirt = product(&f.repos, Some(25), false).await;
        let cap = product(&f.repos, Some(30), false).await;

        service.add_line(&cart, &shirt, spec(2, Size::M)).await.unwrap();
        assert_eq!(service.cart_total(&cart).await.unwrap(), 50);

        service.add_line(&cart, &cap, spec(1, Size::L)).await.unwrap();
        assert_eq!(service.cart_total(&cart).await.unwrap(), 80);
    }

    #[tokio::test]
    async fn test_each_add_increases_total_by_price_times_quantity() {
        let f = fixture().await;
        let service = PreorderService::new(&f.repos);
        let cart = service.get_or_create_cart(f.owner).await.unwrap();
        let shirt = product(&f.repos, Some(17), false).await;

        for size in Size::ALL {
            for q in 1..=5 {
                let before = service.cart_total(&cart).await.unwrap();
                service.add_line(&cart, &shirt, spec(q, size)).await.unwrap();
                let after = service.cart_total(&cart).await.unwrap();
                assert_eq!(after - before, 17 * q);
            }
        }
    }

    #[tokio::test]
    async fn test_free_and_unpriced_products_count_zero() {
        let f = fixture().await;
        let service = PreorderService::new(&f.repos);
        let cart = service.get_or_create_cart(f.owner).await.unwrap();

        let free = product(&f.repos, Some(40), true).await;
        let unpriced = product(&f.repos, None, false).await;
        service.add_line(&cart, &free, spec(3, Size::S)).await.unwrap();
        service.add_line(&cart, &unpriced, spec(2, Size::Xl)).await.unwrap();

        assert_eq!(service.cart_total(&cart).await.unwrap(), 0);
        assert_eq!(service.list_lines(&cart).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_identical_lines_are_not_merged() {
        let f = fixture().await;
        let service = PreorderService::new(&f.repos);
        let cart = service.get_or_create_cart(f.owner).await.unwrap();
        let shirt = product(&f.repos, Some(10), false).await;

        let first = service.add_line(&cart, &shirt, spec(1, Size::M)).await.unwrap();
        let second = service.add_line(&cart, &shirt, spec(1, Size::M)).await.unwrap();
        assert_ne!(first.id, second.id);

        let lines = service.list_lines(&cart).await.unwrap();
        assert_eq!(
            lines.iter().map(|l| l.id).collect::<Vec<_>>(),
            vec![first.id, second.id]
        );
    }

    #[tokio::test]
    async fn test_add_to_cart_validates_before_writing() {
        let f = fixture().await;
        let service = PreorderService::new(&f.repos);
        let shirt = product(&f.repos, Some(25), false).await;

        for (quantity, size) in [("0", "M"), ("6", "M"), ("2", "XXL"), ("abc", "S")] {
            let request = AddLineRequest {
                quantity: quantity.to_owned(),
                size: size.to_owned(),
            };
            let err = service
                .add_to_cart(f.owner, shirt.id, &request)
                .await
                .unwrap_err();
            assert!(matches!(err, PreorderError::Validation(_)), "{quantity} {size}");
        }
        assert_eq!(f.db.line_count().await, 0);
        assert_eq!(f.db.cart_count().await, 0);
    }

    #[tokio::test]
    async fn test_add_to_cart_product_checks() {
        let f = fixture().await;
        let service = PreorderService::new(&f.repos);
        let request = AddLineRequest {
            quantity: "1".to_owned(),
            size: "m".to_owned(),
        };

        assert!(matches!(
            service
                .add_to_cart(f.owner, ProductId::new(9999), &request)
                .await,
            Err(PreorderError::ProductNotFound)
        ));

        let catalog = f.repos.catalogs.create_catalog("").await.unwrap();
        let sold_out = f
            .repos
            .catalogs
            .create_product(&NewProduct {
                catalog_id: catalog.id,
                name: "Veste".to_owned(),
                image: None,
                is_available: false,
                is_free: false,
                price: Some(Price::new(60).unwrap()),
            })
            .await
            .unwrap();
        assert!(matches!(
            service.add_to_cart(f.owner, sold_out.id, &request).await,
            Err(PreorderError::ProductUnavailable)
        ));

        let shirt = product(&f.repos, Some(25), false).await;
        let line = service.add_to_cart(f.owner, shirt.id, &request).await.unwrap();
        assert_eq!(line.size, Size::M);
        assert_eq!(line.amount(), 25);
    }

    #[tokio::test]
    async fn test_non_owner_drop_is_skipped() {
        let f = fixture().await;
        let service = PreorderService::new(&f.repos);
        let cart = service.get_or_create_cart(f.owner).await.unwrap();
        let shirt = product(&f.repos, Some(25), false).await;
        let line = service.add_line(&cart, &shirt, spec(2, Size::M)).await.unwrap();

        assert_eq!(
            service.drop_line(f.other, line.id).await.unwrap(),
            DropOutcome::NotOwner
        );
        assert_eq!(f.db.line_count().await, 1);
        assert!(service.owned_line(f.other, line.id).await.unwrap().is_none());
        assert!(service.owned_line(f.owner, line.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_owner_drops_only_line() {
        let f = fixture().await;
        let service = PreorderService::new(&f.repos);
        let cart = service.get_or_create_cart(f.owner).await.unwrap();
        let shirt = product(&f.repos, Some(25), false).await;
        let line = service.add_line(&cart, &shirt, spec(2, Size::M)).await.unwrap();

        assert_eq!(
            service.drop_line(f.owner, line.id).await.unwrap(),
            DropOutcome::Dropped
        );
        let summary = service.summary(f.owner).await.unwrap();
        assert!(summary.lines.is_empty());
        assert_eq!(summary.total, 0);

        assert_eq!(
            service.drop_line(f.owner, line.id).await.unwrap(),
            DropOutcome::NotFound
        );
    }
}
