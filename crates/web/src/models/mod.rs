//! Domain models for the web application.
//!
//! These are validated domain objects, separate from the database row types
//! in [`crate::db`].

pub mod calendar;
pub mod cart;
pub mod catalog;
pub mod profile;
pub mod session;
pub mod user;

pub use calendar::{Event, Location, NewEvent, NewTraining, Training};
pub use cart::{Cart, CartLine, DropOutcome};
pub use catalog::{Catalog, NewProduct, Product};
pub use profile::Personal;
pub use session::{CurrentUser, keys as session_keys};
pub use user::{NewUser, User};
