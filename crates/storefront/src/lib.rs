//! Marketstall storefront library.
//!
//! Catalog, cart, checkout, accounts and the admin order dashboard over a
//! hosted backend, with card payments through a hosted checkout page.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod backend;
pub mod config;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
