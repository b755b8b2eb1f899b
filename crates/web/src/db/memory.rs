//! In-memory implementation of every repository trait.
//!
//! One mutex guards all tables, so multi-row writes (creating a member,
//! saving a contact form) are atomic just like their `PostgreSQL`
//! transactions. Unique keys and the one-cart-per-user rule are enforced.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use teamspirit_core::{
    Address, AddressId, CartId, CartLineId, CatalogId, DocumentKind, Email, EventId, LineSpec,
    LocationId, PersonalId, Position, ProductId, Quantity, RoleFlags, Size, TrainingId, UserId,
    ValidatedContact, ValidatedPersonalInfo,
};

use super::{
    CalendarRepository, CartRepository, CatalogRepository, PasswordResetRepository,
    ProfileRepository, RepositoryError, RoleRepository, UserRepository,
};
use crate::models::catalog::{DEFAULT_CATALOG_NAME, DEFAULT_PRODUCT_NAME};
use crate::models::{
    Cart, CartLine, Catalog, Event, Location, NewEvent, NewProduct, NewTraining, NewUser,
    Personal, Product, Training, User,
};

struct StoredUser {
    user: User,
    password_hash: String,
}

struct StoredLine {
    id: CartLineId,
    cart_id: CartId,
    product_id: ProductId,
    quantity: Quantity,
    size: Size,
}

struct StoredEvent {
    id: EventId,
    title: String,
    event: NewEvent,
}

struct StoredToken {
    user_id: UserId,
    token_hash: String,
    expires_at: DateTime<Utc>,
    used_at: Option<DateTime<Utc>>,
}

#[derive(Default)]
struct Tables {
    next_id: i32,
    users: BTreeMap<UserId, StoredUser>,
    personals: BTreeMap<PersonalId, Personal>,
    roles: BTreeMap<PersonalId, RoleFlags>,
    catalogs: BTreeMap<CatalogId, String>,
    products: BTreeMap<ProductId, NewProduct>,
    carts: BTreeMap<CartId, Cart>,
    lines: Vec<StoredLine>,
    locations: BTreeMap<LocationId, Location>,
    events: Vec<StoredEvent>,
    trainings: BTreeMap<TrainingId, NewTraining>,
    tokens: Vec<StoredToken>,
}

impl Tables {
    const fn next_id(&mut self) -> i32 {
        self.next_id += 1;
        self.next_id
    }

    fn product(&self, id: ProductId) -> Option<Product> {
        let p = self.products.get(&id)?;
        Some(Product {
            id,
            catalog_id: p.catalog_id,
            catalog_name: self.catalogs.get(&p.catalog_id).cloned().unwrap_or_default(),
            name: p.name.clone(),
            image: p.image.clone(),
            is_available: p.is_available,
            is_free: p.is_free,
            price: p.price,
        })
    }

    fn line(&self, stored: &StoredLine) -> Result<CartLine, RepositoryError> {
        let product = self.product(stored.product_id).ok_or_else(|| {
            RepositoryError::DataCorruption(format!("cart line {} has no product", stored.id))
        })?;
        Ok(CartLine {
            id: stored.id,
            cart_id: stored.cart_id,
            product_id: stored.product_id,
            product_name: product.name,
            unit_price: product.price,
            is_free: product.is_free,
            quantity: stored.quantity,
            size: stored.size,
        })
    }

    fn location(&self, id: LocationId) -> Result<Location, RepositoryError> {
        self.locations.get(&id).cloned().ok_or(RepositoryError::NotFound)
    }

    fn event(&self, stored: &StoredEvent) -> Result<Event, RepositoryError> {
        Ok(Event {
            id: stored.id,
            title: stored.title.clone(),
            date: stored.event.date,
            time: stored.event.time,
            location: self.location(stored.event.location_id)?,
        })
    }

    fn training(&self, id: TrainingId, t: &NewTraining) -> Result<Training, RepositoryError> {
        let trainer_name = self
            .users
            .values()
            .find(|u| u.user.personal_id == t.trainer_id)
            .map(|u| u.user.display_name())
            .ok_or(RepositoryError::NotFound)?;
        Ok(Training {
            id,
            is_weekly: t.is_weekly,
            date: t.date,
            day: t.day,
            time: t.time,
            trainer_id: t.trainer_id,
            trainer_name,
            location: self.location(t.location_id)?,
            content: t.content.clone(),
            note: t.note.clone(),
        })
    }

    fn email_taken(&self, email: &Email, except: Option<UserId>) -> bool {
        self.users
            .values()
            .any(|u| &u.user.email == email && Some(u.user.id) != except)
    }
}

/// Shared in-memory tables; clones see the same data.
#[derive(Clone, Default)]
pub struct InMemoryDatabase {
    tables: Arc<Mutex<Tables>>,
}

impl InMemoryDatabase {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cart lines across all carts.
    pub async fn line_count(&self) -> usize {
        self.tables.lock().await.lines.len()
    }

    /// Number of carts.
    pub async fn cart_count(&self) -> usize {
        self.tables.lock().await.carts.len()
    }
}

#[async_trait]
impl UserRepository for InMemoryDatabase {
    async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let tables = self.tables.lock().await;
        Ok(tables.users.get(&id).map(|u| u.user.clone()))
    }

    async fn get_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .users
            .values()
            .find(|u| &u.user.email == email)
            .map(|u| u.user.clone()))
    }

    async fn get_with_password_hash(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .users
            .values()
            .find(|u| &u.user.email == email)
            .map(|u| (u.user.clone(), u.password_hash.clone())))
    }

    async fn create(&self, new_user: &NewUser) -> Result<User, RepositoryError> {
        let mut tables = self.tables.lock().await;
        if tables.email_taken(&new_user.email, None) {
            return Err(RepositoryError::Conflict("email already exists".to_owned()));
        }

        let address_id = AddressId::new(tables.next_id());
        let personal_id = PersonalId::new(tables.next_id());
        tables.personals.insert(
            personal_id,
            Personal {
                id: personal_id,
                phone_number: String::new(),
                address_id,
                address: Address::default(),
                has_private_profile: false,
                id_file: None,
                medical_file: None,
            },
        );
        tables
            .roles
            .insert(personal_id, RoleFlags::from(Position::Member));

        let user = User {
            id: UserId::new(tables.next_id()),
            email: new_user.email.clone(),
            first_name: new_user.first_name.clone(),
            last_name: new_user.last_name.clone(),
            personal_id,
            is_active: true,
            is_staff: new_user.is_staff,
            is_admin: new_user.is_admin,
            created_at: Utc::now(),
        };
        tables.users.insert(
            user.id,
            StoredUser {
                user: user.clone(),
                password_hash: new_user.password_hash.clone(),
            },
        );
        Ok(user)
    }

    async fn update_account(
        &self,
        id: UserId,
        email: &Email,
        first_name: &str,
        last_name: &str,
    ) -> Result<User, RepositoryError> {
        let mut tables = self.tables.lock().await;
        if tables.email_taken(email, Some(id)) {
            return Err(RepositoryError::Conflict("email already exists".to_owned()));
        }
        let stored = tables.users.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        stored.user.email = email.clone();
        first_name.clone_into(&mut stored.user.first_name);
        last_name.clone_into(&mut stored.user.last_name);
        Ok(stored.user.clone())
    }

    async fn update_names(
        &self,
        id: UserId,
        names: &ValidatedPersonalInfo,
    ) -> Result<User, RepositoryError> {
        let mut tables = self.tables.lock().await;
        let stored = tables.users.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        stored.user.first_name.clone_from(&names.first_name);
        stored.user.last_name.clone_from(&names.last_name);
        Ok(stored.user.clone())
    }

    async fn set_password_hash(
        &self,
        id: UserId,
        password_hash: &str,
    ) -> Result<(), RepositoryError> {
        let mut tables = self.tables.lock().await;
        let stored = tables.users.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        password_hash.clone_into(&mut stored.password_hash);
        Ok(())
    }
}

#[async_trait]
impl ProfileRepository for InMemoryDatabase {
    async fn get(&self, id: PersonalId) -> Result<Option<Personal>, RepositoryError> {
        Ok(self.tables.lock().await.personals.get(&id).cloned())
    }

    async fn update_contact(
        &self,
        id: PersonalId,
        contact: &ValidatedContact,
    ) -> Result<(), RepositoryError> {
        let mut tables = self.tables.lock().await;
        let personal = tables.personals.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        personal.phone_number = contact.phone_number.as_str().to_owned();
        personal.address = contact.address.clone();
        personal.has_private_profile = contact.has_private_profile;
        Ok(())
    }

    async fn set_document(
        &self,
        id: PersonalId,
        kind: DocumentKind,
        key: Option<&str>,
    ) -> Result<Option<String>, RepositoryError> {
        let mut tables = self.tables.lock().await;
        let personal = tables.personals.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        let slot = match kind {
            DocumentKind::Medical => &mut personal.medical_file,
            DocumentKind::Identity => &mut personal.id_file,
        };
        Ok(std::mem::replace(slot, key.map(str::to_owned)))
    }
}

#[async_trait]
impl RoleRepository for InMemoryDatabase {
    async fn get(&self, personal_id: PersonalId) -> Result<Option<Position>, RepositoryError> {
        let tables = self.tables.lock().await;
        tables
            .roles
            .get(&personal_id)
            .map(|flags| {
                Position::try_from(*flags)
                    .map_err(|e| RepositoryError::DataCorruption(e.to_string()))
            })
            .transpose()
    }

    async fn assign(
        &self,
        personal_id: PersonalId,
        position: Position,
    ) -> Result<(), RepositoryError> {
        let mut tables = self.tables.lock().await;
        let flags = tables
            .roles
            .get_mut(&personal_id)
            .ok_or(RepositoryError::NotFound)?;
        *flags = RoleFlags::from(position);
        Ok(())
    }
}

#[async_trait]
impl CatalogRepository for InMemoryDatabase {
    async fn list_products(&self) -> Result<Vec<Product>, RepositoryError> {
        let tables = self.tables.lock().await;
        let mut products: Vec<Product> = tables
            .products
            .keys()
            .filter_map(|id| tables.product(*id))
            .collect();
        products.sort_by(|a, b| {
            (&a.catalog_name, &a.name, a.id).cmp(&(&b.catalog_name, &b.name, b.id))
        });
        Ok(products)
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        Ok(self.tables.lock().await.product(id))
    }

    async fn create_catalog(&self, name: &str) -> Result<Catalog, RepositoryError> {
        let mut tables = self.tables.lock().await;
        let name = if name.trim().is_empty() {
            DEFAULT_CATALOG_NAME.to_owned()
        } else {
            name.trim().to_owned()
        };
        let id = CatalogId::new(tables.next_id());
        tables.catalogs.insert(id, name.clone());
        Ok(Catalog { id, name })
    }

    async fn create_product(&self, new_product: &NewProduct) -> Result<Product, RepositoryError> {
        let mut tables = self.tables.lock().await;
        if !tables.catalogs.contains_key(&new_product.catalog_id) {
            return Err(RepositoryError::NotFound);
        }
        let mut stored = new_product.clone();
        if stored.name.trim().is_empty() {
            DEFAULT_PRODUCT_NAME.clone_into(&mut stored.name);
        }
        let id = ProductId::new(tables.next_id());
        tables.products.insert(id, stored);
        tables.product(id).ok_or(RepositoryError::NotFound)
    }
}

#[async_trait]
impl CartRepository for InMemoryDatabase {
    async fn find_by_user(&self, user_id: UserId) -> Result<Option<Cart>, RepositoryError> {
        let tables = self.tables.lock().await;
        Ok(tables.carts.values().find(|c| c.user_id == user_id).cloned())
    }

    async fn create(&self, user_id: UserId) -> Result<Cart, RepositoryError> {
        let mut tables = self.tables.lock().await;
        if tables.carts.values().any(|c| c.user_id == user_id) {
            return Err(RepositoryError::Conflict("user already has a cart".to_owned()));
        }
        let cart = Cart {
            id: CartId::new(tables.next_id()),
            user_id,
            is_open: true,
            created_at: Utc::now(),
        };
        tables.carts.insert(cart.id, cart.clone());
        Ok(cart)
    }

    async fn add_line(
        &self,
        cart_id: CartId,
        product_id: ProductId,
        spec: LineSpec,
    ) -> Result<CartLine, RepositoryError> {
        let mut tables = self.tables.lock().await;
        if !tables.carts.contains_key(&cart_id) || !tables.products.contains_key(&product_id) {
            return Err(RepositoryError::NotFound);
        }
        let stored = StoredLine {
            id: CartLineId::new(tables.next_id()),
            cart_id,
            product_id,
            quantity: spec.quantity,
            size: spec.size,
        };
        let line = tables.line(&stored)?;
        tables.lines.push(stored);
        Ok(line)
    }

    async fn list_lines(&self, cart_id: CartId) -> Result<Vec<CartLine>, RepositoryError> {
        let tables = self.tables.lock().await;
        tables
            .lines
            .iter()
            .filter(|l| l.cart_id == cart_id)
            .map(|l| tables.line(l))
            .collect()
    }

    async fn get_line(
        &self,
        line_id: CartLineId,
    ) -> Result<Option<(CartLine, UserId)>, RepositoryError> {
        let tables = self.tables.lock().await;
        let Some(stored) = tables.lines.iter().find(|l| l.id == line_id) else {
            return Ok(None);
        };
        let owner = tables
            .carts
            .get(&stored.cart_id)
            .map(|c| c.user_id)
            .ok_or_else(|| {
                RepositoryError::DataCorruption(format!("cart line {line_id} has no cart"))
            })?;
        Ok(Some((tables.line(stored)?, owner)))
    }

    async fn delete_line_owned_by(
        &self,
        line_id: CartLineId,
        user_id: UserId,
    ) -> Result<bool, RepositoryError> {
        let mut tables = self.tables.lock().await;
        let owned = tables.lines.iter().position(|l| {
            l.id == line_id
                && tables
                    .carts
                    .get(&l.cart_id)
                    .is_some_and(|c| c.user_id == user_id)
        });
        Ok(owned.map(|index| tables.lines.remove(index)).is_some())
    }
}

#[async_trait]
impl CalendarRepository for InMemoryDatabase {
    async fn list_events(&self) -> Result<Vec<Event>, RepositoryError> {
        let tables = self.tables.lock().await;
        let mut events = tables
            .events
            .iter()
            .map(|e| tables.event(e))
            .collect::<Result<Vec<_>, _>>()?;
        events.sort_by(|a, b| (a.date, a.time, a.id).cmp(&(b.date, b.time, b.id)));
        Ok(events)
    }

    async fn list_trainings(&self) -> Result<Vec<Training>, RepositoryError> {
        let tables = self.tables.lock().await;
        let mut trainings = tables
            .trainings
            .iter()
            .map(|(id, t)| tables.training(*id, t))
            .collect::<Result<Vec<_>, _>>()?;
        // Dated trainings first, then weekly ones by day.
        trainings.sort_by(|a, b| {
            (a.date.is_none(), a.date, a.day, a.time, a.id)
                .cmp(&(b.date.is_none(), b.date, b.day, b.time, b.id))
        });
        Ok(trainings)
    }

    async fn create_location(
        &self,
        name: &str,
        address: &Address,
    ) -> Result<Location, RepositoryError> {
        let mut tables = self.tables.lock().await;
        if tables.locations.values().any(|l| l.name == name) {
            return Err(RepositoryError::Conflict(
                "location name already exists".to_owned(),
            ));
        }
        let location = Location {
            id: LocationId::new(tables.next_id()),
            name: name.to_owned(),
            address: address.clone(),
        };
        tables.locations.insert(location.id, location.clone());
        Ok(location)
    }

    async fn create_event(&self, new_event: &NewEvent) -> Result<Event, RepositoryError> {
        let mut tables = self.tables.lock().await;
        if tables.events.iter().any(|e| e.title == new_event.title) {
            return Err(RepositoryError::Conflict("title already exists".to_owned()));
        }
        let stored = StoredEvent {
            id: EventId::new(tables.next_id()),
            title: new_event.title.clone(),
            event: new_event.clone(),
        };
        let event = tables.event(&stored)?;
        tables.events.push(stored);
        Ok(event)
    }

    async fn create_training(
        &self,
        new_training: &NewTraining,
    ) -> Result<Training, RepositoryError> {
        let mut tables = self.tables.lock().await;
        let id = TrainingId::new(tables.next_id());
        let training = tables.training(id, new_training)?;
        tables.trainings.insert(id, new_training.clone());
        Ok(training)
    }

    async fn get_location(&self, id: LocationId) -> Result<Option<Location>, RepositoryError> {
        Ok(self.tables.lock().await.locations.get(&id).cloned())
    }
}

#[async_trait]
impl PasswordResetRepository for InMemoryDatabase {
    async fn create(
        &self,
        user_id: UserId,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let mut tables = self.tables.lock().await;
        if tables.tokens.iter().any(|t| t.token_hash == token_hash) {
            return Err(RepositoryError::Conflict("token already exists".to_owned()));
        }
        tables.tokens.push(StoredToken {
            user_id,
            token_hash: token_hash.to_owned(),
            expires_at,
            used_at: None,
        });
        Ok(())
    }

    async fn is_valid(
        &self,
        user_id: UserId,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, RepositoryError> {
        let tables = self.tables.lock().await;
        Ok(tables.tokens.iter().any(|t| {
            t.user_id == user_id
                && t.token_hash == token_hash
                && t.used_at.is_none()
                && t.expires_at > now
        }))
    }

    async fn consume(
        &self,
        user_id: UserId,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, RepositoryError> {
        let mut tables = self.tables.lock().await;
        let Some(token) = tables.tokens.iter_mut().find(|t| {
            t.user_id == user_id
                && t.token_hash == token_hash
                && t.used_at.is_none()
                && t.expires_at > now
        }) else {
            return Ok(false);
        };
        token.used_at = Some(now);
        Ok(true)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            email: Email::parse(email).unwrap(),
            first_name: "Lucie".to_owned(),
            last_name: "MARTIN".to_owned(),
            password_hash: "hash".to_owned(),
            is_staff: false,
            is_admin: false,
        }
    }

    #[tokio::test]
    async fn test_create_user_creates_profile_and_member_role() {
        let db = InMemoryDatabase::new();
        let user = UserRepository::create(&db, &new_user("lucie@example.com"))
            .await
            .unwrap();

        let personal = ProfileRepository::get(&db, user.personal_id)
            .await
            .unwrap()
            .unwrap();
        assert!(personal.address.is_blank());
        assert_eq!(
            RoleRepository::get(&db, user.personal_id).await.unwrap(),
            Some(Position::Member)
        );
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let db = InMemoryDatabase::new();
        UserRepository::create(&db, &new_user("a@example.com"))
            .await
            .unwrap();
        let err = UserRepository::create(&db, &new_user("a@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_second_cart_conflicts() {
        let db = InMemoryDatabase::new();
        let user = UserRepository::create(&db, &new_user("a@example.com"))
            .await
            .unwrap();
        CartRepository::create(&db, user.id).await.unwrap();
        assert!(matches!(
            CartRepository::create(&db, user.id).await,
            Err(RepositoryError::Conflict(_))
        ));
        assert_eq!(db.cart_count().await, 1);
    }

    fn training(trainer: PersonalId, location: LocationId, date: Option<&str>, day: Option<i32>) -> NewTraining {
        NewTraining {
            is_weekly: date.is_none(),
            date: date.map(|d| d.parse().unwrap()),
            day: day.map(|d| teamspirit_core::TrainingDay::new(d).unwrap()),
            time: chrono::NaiveTime::from_hms_opt(19, 0, 0).unwrap(),
            trainer_id: trainer,
            location_id: location,
            content: "Fractionné".to_owned(),
            note: String::new(),
        }
    }

    #[tokio::test]
    async fn test_trainings_dated_first_then_weekly() {
        let db = InMemoryDatabase::new();
        let coach = UserRepository::create(&db, &new_user("coach@example.com"))
            .await
            .unwrap();
        let stadium = CalendarRepository::create_location(&db, "Stade", &Address::default())
            .await
            .unwrap();

        for new in [
            training(coach.personal_id, stadium.id, None, Some(4)),
            training(coach.personal_id, stadium.id, Some("2026-11-20"), None),
            training(coach.personal_id, stadium.id, Some("2026-11-13"), None),
            training(coach.personal_id, stadium.id, None, Some(2)),
        ] {
            CalendarRepository::create_training(&db, &new).await.unwrap();
        }

        let listed = CalendarRepository::list_trainings(&db).await.unwrap();
        let dates: Vec<_> = listed.iter().map(|t| t.date.map(|d| d.to_string())).collect();
        assert_eq!(
            dates,
            vec![
                Some("2026-11-13".to_owned()),
                Some("2026-11-20".to_owned()),
                None,
                None
            ]
        );
        assert_eq!(listed[2].day_label(), "Mardi");
        assert_eq!(listed[0].trainer_name, "Lucie MARTIN");
    }

    #[tokio::test]
    async fn test_event_titles_and_location_names_are_unique() {
        let db = InMemoryDatabase::new();
        let stadium = CalendarRepository::create_location(&db, "Stade", &Address::default())
            .await
            .unwrap();
        assert!(matches!(
            CalendarRepository::create_location(&db, "Stade", &Address::default()).await,
            Err(RepositoryError::Conflict(_))
        ));

        let event = NewEvent {
            title: "Foulées d'automne".to_owned(),
            date: "2026-11-08".parse().unwrap(),
            time: chrono::NaiveTime::from_hms_opt(9, 30, 0).unwrap(),
            location_id: stadium.id,
        };
        let created = CalendarRepository::create_event(&db, &event).await.unwrap();
        assert_eq!(created.location.name, "Stade");
        assert!(matches!(
            CalendarRepository::create_event(&db, &event).await,
            Err(RepositoryError::Conflict(_))
        ));
        assert_eq!(CalendarRepository::list_events(&db).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_token_is_single_use() {
        let db = InMemoryDatabase::new();
        let user = UserId::new(1);
        let now = Utc::now();
        let expires = now + chrono::Duration::hours(1);
        PasswordResetRepository::create(&db, user, "h", expires)
            .await
            .unwrap();

        assert!(PasswordResetRepository::is_valid(&db, user, "h", now).await.unwrap());
        assert!(PasswordResetRepository::consume(&db, user, "h", now).await.unwrap());
        assert!(!PasswordResetRepository::consume(&db, user, "h", now).await.unwrap());
        assert!(
            !PasswordResetRepository::is_valid(&db, user, "h", expires + chrono::Duration::seconds(1))
                .await
                .unwrap()
        );
    }
}
