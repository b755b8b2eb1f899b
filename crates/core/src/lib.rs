//! Domain types shared by the TeamSpirit web server and CLI.
//!
//! Nothing in this crate performs I/O. The `postgres` feature adds sqlx
//! encode/decode support for the newtypes.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
