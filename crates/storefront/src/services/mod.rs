//! Business logic services for the storefront.
//!
//! # Services
//!
//! - `auth` - Auth session bridge over the backend auth API
//! - `cart` - Cart storage bound to the browser session
//! - `catalog` - Cached read-only product catalog
//! - `checkout` - Payment handoff and order placement
//! - `email` - Admin new-order notifications
//! - `orders` - Order gateway shared by checkout and the admin dashboard
//! - `payments` - Hosted payment gateway client

pub mod auth;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod email;
pub mod orders;
pub mod payments;
