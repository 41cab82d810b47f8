//! Core types for Marketstall.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod order;
pub mod price;
pub mod product;
pub mod status;
pub mod user;

pub use email::{Email, EmailError};
pub use id::*;
pub use order::{NewOrder, Order, OrderItem, PaymentMethod, ShippingAddress};
pub use price::{Price, PriceError};
pub use product::{Product, ProductCategory, ProductCondition, PublishStatus};
pub use status::*;
pub use user::CurrentUser;
