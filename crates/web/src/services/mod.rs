//! Business logic services.
//!
//! Services borrow the repository bundle for the length of a request and
//! hold `&dyn` handles to the repositories they need.
//!
//! - `auth` - Login, password change and password reset
//! - `documents` - Storage of uploaded member documents
//! - `email` - Password reset emails
//! - `preorder` - Shopping cart and lines
//! - `profile` - Own profile, contact details, documents, member pages
//! - `roles` - Exclusive role assignment

pub mod auth;
pub mod documents;
pub mod email;
pub mod preorder;
pub mod profile;
pub mod roles;
