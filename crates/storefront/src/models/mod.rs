//! Session-scoped models for the storefront.
//!
//! Domain records (products, orders, users) live in `marketstall_core`; this
//! module only holds what the storefront keeps in the HTTP session.

pub mod session;

pub use session::{AuthTokens, CompletedCheckout, PendingCheckout, keys as session_keys};
