//! Core types for TeamSpirit.
//!
//! Type-safe wrappers for the association's domain concepts.

pub mod address;
pub mod email;
pub mod id;
pub mod preorder;
pub mod price;
pub mod profile;
pub mod role;
pub mod schedule;
pub mod validation;

pub use address::{Address, AddressInput};
pub use email::{Email, EmailError};
pub use id::*;
pub use preorder::{
    AddLineRequest, LineSpec, PricedLine, Quantity, QuantityError, Size, SizeError, cart_total,
    line_amount,
};
pub use price::{Price, PriceError};
pub use profile::{
    ContactInput, DocumentKind, PersonalInfoInput, PhoneNumber, PhoneNumberError, ValidatedContact,
    ValidatedPersonalInfo, normalize_first_name, normalize_last_name,
};
pub use role::{Position, PositionParseError, RoleFlags, RoleFlagsError};
pub use schedule::{TrainingDay, TrainingDayError};
pub use validation::{FieldError, ValidationErrors};
