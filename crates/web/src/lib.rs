//! TeamSpirit member web application.
//!
//! Library half of the `teamspirit-web` binary, so the router and services
//! can be driven from the CLI and the integration tests.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod filters;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
