//! Catalog product records.
//!
//! Products are owned by the backend; the storefront only reads them. The
//! same record is snapshotted into carts, so it must round-trip through JSON
//! unchanged.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::id::ProductId;
use crate::types::price::Price;

/// Closed set of catalog categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductCategory {
    Clothing,
    Shoes,
    Accessories,
    Electronics,
    Home,
    Books,
    Other,
}

impl ProductCategory {
    /// Wire name used in backend filters and query strings.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Clothing => "clothing",
            Self::Shoes => "shoes",
            Self::Accessories => "accessories",
            Self::Electronics => "electronics",
            Self::Home => "home",
            Self::Books => "books",
            Self::Other => "other",
        }
    }
}

/// Physical condition of a listed item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductCondition {
    New,
    LikeNew,
    Good,
    Fair,
}

/// Whether a product is visible in the storefront.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PublishStatus {
    #[default]
    Draft,
    Published,
    Archived,
}

/// A catalog product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub images: Vec<String>,
    pub price: Price,
    #[serde(default)]
    pub sale_price: Option<Price>,
    pub category: ProductCategory,
    pub condition: ProductCondition,
    #[serde(default)]
    pub stock: i32,
    #[serde(default)]
    pub status: PublishStatus,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Product {
    /// The price a buyer pays: the sale price when present, else the base price.
    #[must_use]
    pub fn effective_price(&self) -> Price {
        self.sale_price.unwrap_or(self.price)
    }

    /// Whether the product is on sale.
    #[must_use]
    pub const fn is_on_sale(&self) -> bool {
        self.sale_price.is_some()
    }
}


#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::fixtures::product;
    use super::*;

    #[test]
    fn test_sale_price_takes_precedence() {
        assert_eq!(
            product(1, "Lamp", 10000, Some(8000)).effective_price(),
            Price::from_cents(8000)
        );
        assert_eq!(
            product(2, "Rug", 5000, None).effective_price(),
            Price::from_cents(5000)
        );
    }

    #[test]
    fn test_deserializes_backend_row() {
        let row = serde_json::json!({
            "id": 7,
            "name": "Denim jacket",
            "price": 45.5,
            "sale_price": null,
            "category": "clothing",
            "condition": "like_new",
            "stock": 1,
            "status": "published",
            "created_at": "2026-03-01T10:00:00Z"
        });

        let product: Product = serde_json::from_value(row).unwrap();
        assert_eq!(product.id, ProductId::new(7));
        assert_eq!(product.category, ProductCategory::Clothing);
        assert_eq!(product.condition, ProductCondition::LikeNew);
        assert!(product.images.is_empty());
        assert!(!product.is_on_sale());
    }
}
