//! Marketstall Core - domain types and the shopping cart store.
//!
//! This crate is shared by every Marketstall component:
//! - `storefront` - Public storefront and admin order dashboard (axum)
//! - `integration-tests` - HTTP tests against a running storefront
//!
//! # Architecture
//!
//! The core crate performs no network I/O. Durable cart state goes through the
//! [`cart::LocalStorage`] trait, which the storefront implements over the
//! browser's session and tests implement in memory.
//!
//! # Modules
//!
//! - [`types`] - Typed IDs, prices, emails, statuses, products, orders, users
//! - [`cart`] - Per-identity cart store with persistence and reconciliation

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod types;

pub use types::*;
