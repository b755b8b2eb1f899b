//! Database access for the web application.
//!
//! # Schema: `teamspirit`
//!
//! - `address`, `location` - postal addresses and named venues
//! - `personal`, `role` - member profiles and their single role
//! - `user` - login accounts (email + argon2 hash)
//! - `password_reset_token` - hashed single-use reset tokens
//! - `catalog`, `product` - the merchandise catalog
//! - `shopping_cart`, `shopping_cart_line` - pre-orders
//! - `event`, `training` - the calendar
//!
//! Sessions live in `tower_sessions.session`.
//!
//! # Repositories
//!
//! Each aggregate has a repository trait; handlers and services only see
//! `Arc<dyn Trait>` through [`Repositories`]. The `Pg*` implementations run
//! runtime-checked sqlx queries. With the `test-support` feature,
//! [`memory::InMemoryDatabase`] implements every trait without `PostgreSQL`.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/web/migrations/` and run via:
//! ```bash
//! cargo run -p teamspirit-cli -- migrate
//! ```

pub mod calendar;
pub mod carts;
pub mod catalogs;
pub mod password_resets;
pub mod profiles;
pub mod roles;
pub mod users;

#[cfg(any(test, feature = "test-support"))]
pub mod memory;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use teamspirit_core::{
    Address, CartId, CartLineId, DocumentKind, Email, LineSpec, LocationId,
    PersonalId, Position, ProductId, UserId, ValidatedContact, ValidatedPersonalInfo,
};

use crate::models::{
    Cart, CartLine, Catalog, Event, Location, NewEvent, NewProduct, NewTraining, NewUser,
    Personal, Product, Training, User,
};

pub use calendar::PgCalendarRepository;
pub use carts::PgCartRepository;
pub use catalogs::PgCatalogRepository;
pub use password_resets::PgPasswordResetRepository;
pub use profiles::PgProfileRepository;
pub use roles::PgRoleRepository;
pub use users::PgUserRepository;

/// Errors from repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Map a unique violation to `Conflict(what)`, anything else to `Database`.
pub(crate) fn map_unique_violation(e: sqlx::Error, what: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict(what.to_owned());
    }
    RepositoryError::Database(e)
}

/// Member accounts.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError>;

    async fn get_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError>;

    /// The user and their password hash.
    async fn get_with_password_hash(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError>;

    /// Create a user with an empty address, a personal profile and the
    /// member role, all in one transaction.
    ///
    /// Returns `Conflict` when the email is taken.
    async fn create(&self, new_user: &NewUser) -> Result<User, RepositoryError>;

    /// Change email and names. Returns `Conflict` when the email is taken.
    async fn update_account(
        &self,
        id: UserId,
        email: &Email,
        first_name: &str,
        last_name: &str,
    ) -> Result<User, RepositoryError>;

    async fn update_names(
        &self,
        id: UserId,
        names: &ValidatedPersonalInfo,
    ) -> Result<User, RepositoryError>;

    async fn set_password_hash(&self, id: UserId, password_hash: &str)
    -> Result<(), RepositoryError>;
}

/// Personal profiles and their address.
#[async_trait]
pub trait ProfileRepository: Send + Sync {
    async fn get(&self, id: PersonalId) -> Result<Option<Personal>, RepositoryError>;

    /// Write phone, address and privacy flag in one transaction.
    async fn update_contact(
        &self,
        id: PersonalId,
        contact: &ValidatedContact,
    ) -> Result<(), RepositoryError>;

    /// Replace the document reference of `kind` and return the previous one.
    async fn set_document(
        &self,
        id: PersonalId,
        kind: DocumentKind,
        key: Option<&str>,
    ) -> Result<Option<String>, RepositoryError>;
}

/// Role assignment. Every write sets all five flags at once.
#[async_trait]
pub trait RoleRepository: Send + Sync {
    async fn get(&self, personal_id: PersonalId) -> Result<Option<Position>, RepositoryError>;

    /// Make `position` the only role of `personal_id`.
    ///
    /// Returns `NotFound` if the person has no role row.
    async fn assign(
        &self,
        personal_id: PersonalId,
        position: Position,
    ) -> Result<(), RepositoryError>;
}

/// Catalogs and products.
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    /// All products with their catalog name, by catalog then product name.
    async fn list_products(&self) -> Result<Vec<Product>, RepositoryError>;

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError>;

    async fn create_catalog(&self, name: &str) -> Result<Catalog, RepositoryError>;

    async fn create_product(&self, new_product: &NewProduct) -> Result<Product, RepositoryError>;
}

/// Pre-order carts and their lines.
#[async_trait]
pub trait CartRepository: Send + Sync {
    async fn find_by_user(&self, user_id: UserId) -> Result<Option<Cart>, RepositoryError>;

    /// Create the cart of `user_id`.
    ///
    /// Returns `Conflict` if the user already has one.
    async fn create(&self, user_id: UserId) -> Result<Cart, RepositoryError>;

    /// Append a new line; identical lines are never merged.
    async fn add_line(
        &self,
        cart_id: CartId,
        product_id: ProductId,
        spec: LineSpec,
    ) -> Result<CartLine, RepositoryError>;

    /// Lines of a cart, oldest first.
    async fn list_lines(&self, cart_id: CartId) -> Result<Vec<CartLine>, RepositoryError>;

    /// A line and the user owning its cart.
    async fn get_line(
        &self,
        line_id: CartLineId,
    ) -> Result<Option<(CartLine, UserId)>, RepositoryError>;

    /// Delete `line_id` only if its cart belongs to `user_id`, in a single
    /// statement. Returns whether a row was deleted.
    async fn delete_line_owned_by(
        &self,
        line_id: CartLineId,
        user_id: UserId,
    ) -> Result<bool, RepositoryError>;
}

/// Venues, events and trainings.
#[async_trait]
pub trait CalendarRepository: Send + Sync {
    async fn list_events(&self) -> Result<Vec<Event>, RepositoryError>;

    /// Trainings ordered by date, weekly ones (no date) last.
    async fn list_trainings(&self) -> Result<Vec<Training>, RepositoryError>;

    async fn create_location(
        &self,
        name: &str,
        address: &Address,
    ) -> Result<Location, RepositoryError>;

    async fn create_event(&self, new_event: &NewEvent) -> Result<Event, RepositoryError>;

    async fn create_training(&self, new_training: &NewTraining)
    -> Result<Training, RepositoryError>;

    async fn get_location(&self, id: LocationId) -> Result<Option<Location>, RepositoryError>;
}

/// Password reset tokens. Only SHA-256 hashes are stored.
#[async_trait]
pub trait PasswordResetRepository: Send + Sync {
    async fn create(
        &self,
        user_id: UserId,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError>;

    /// Whether an unused, unexpired token with this hash exists for the user.
    async fn is_valid(
        &self,
        user_id: UserId,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, RepositoryError>;

    /// Mark the token used. Returns `false` if it was unknown, used or expired.
    async fn consume(
        &self,
        user_id: UserId,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, RepositoryError>;
}

/// Every repository the application uses, as trait objects.
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub profiles: Arc<dyn ProfileRepository>,
    pub roles: Arc<dyn RoleRepository>,
    pub catalogs: Arc<dyn CatalogRepository>,
    pub carts: Arc<dyn CartRepository>,
    pub calendar: Arc<dyn CalendarRepository>,
    pub password_resets: Arc<dyn PasswordResetRepository>,
}

impl Repositories {
    /// `PostgreSQL`-backed repositories sharing one pool.
    #[must_use]
    pub fn postgres(pool: &PgPool) -> Self {
        Self {
            users: Arc::new(PgUserRepository::new(pool.clone())),
            profiles: Arc::new(PgProfileRepository::new(pool.clone())),
            roles: Arc::new(PgRoleRepository::new(pool.clone())),
            catalogs: Arc::new(PgCatalogRepository::new(pool.clone())),
            carts: Arc::new(PgCartRepository::new(pool.clone())),
            calendar: Arc::new(PgCalendarRepository::new(pool.clone())),
            password_resets: Arc::new(PgPasswordResetRepository::new(pool.clone())),
        }
    }

    /// Repositories backed by one shared in-memory database.
    #[cfg(any(test, feature = "test-support"))]
    #[must_use]
    pub fn in_memory(db: &memory::InMemoryDatabase) -> Self {
        Self {
            users: Arc::new(db.clone()),
            profiles: Arc::new(db.clone()),
            roles: Arc::new(db.clone()),
            catalogs: Arc::new(db.clone()),
            carts: Arc::new(db.clone()),
            calendar: Arc::new(db.clone()),
            password_resets: Arc::new(db.clone()),
        }
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
