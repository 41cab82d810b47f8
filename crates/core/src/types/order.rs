//! Order records and their item snapshots.
//!
//! An order freezes product name, unit price and quantity at creation time.
//! Later catalog price changes never alter historical orders.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cart::CartItem;
use crate::types::email::Email;
use crate::types::id::{OrderId, ProductId, UserId};
use crate::types::price::Price;
use crate::types::status::OrderStatus;
use crate::types::user::CurrentUser;

/// How the buyer pays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Hosted card checkout through the payment gateway.
    #[default]
    Card,
    /// Pay on delivery; the gateway is skipped entirely.
    CashOnDelivery,
}

impl PaymentMethod {
    /// Whether checkout must go through the hosted payment page.
    #[must_use]
    pub const fn requires_gateway(&self) -> bool {
        matches!(self, Self::Card)
    }
}

/// Postal address an order ships to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingAddress {
    pub full_name: String,
    pub line1: String,
    #[serde(default)]
    pub line2: Option<String>,
    pub city: String,
    pub postal_code: String,
    pub country: String,
    #[serde(default)]
    pub phone: Option<String>,
}

impl ShippingAddress {
    /// Check that every required line is filled in.
    ///
    /// # Errors
    ///
    /// Returns the name of the first blank required field.
    pub fn validate(&self) -> Result<(), &'static str> {
        let required = [
            ("full_name", &self.full_name),
            ("line1", &self.line1),
            ("city", &self.city),
            ("postal_code", &self.postal_code),
            ("country", &self.country),
        ];

        match required.iter().find(|(_, value)| value.trim().is_empty()) {
            Some((field, _)) => Err(field),
            None => Ok(()),
        }
    }
}

/// One frozen line of an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: ProductId,
    pub name: String,
    pub quantity: u32,
    pub unit_price: Price,
}

impl OrderItem {
    /// Line total (`unit_price × quantity`).
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.unit_price * self.quantity
    }
}

impl From<&CartItem> for OrderItem {
    fn from(item: &CartItem) -> Self {
        Self {
            product_id: item.product.id,
            name: item.product.name.clone(),
            quantity: item.quantity,
            unit_price: item.product.effective_price(),
        }
    }
}

/// A persisted order as returned by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub customer_name: String,
    pub customer_email: Email,
    pub total_price: Price,
    pub items: Vec<OrderItem>,
    pub shipping_address: ShippingAddress,
    pub payment_method: PaymentMethod,
    pub status: OrderStatus,
    #[serde(default)]
    pub cancellation_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Total number of units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.items.iter().map(|item| item.quantity).sum()
    }
}

/// Insert payload for a new order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewOrder {
    pub user_id: UserId,
    pub customer_name: String,
    pub customer_email: Email,
    pub total_price: Price,
    pub items: Vec<OrderItem>,
    pub shipping_address: ShippingAddress,
    pub payment_method: PaymentMethod,
    pub status: OrderStatus,
}

impl NewOrder {
    /// Snapshot a cart into an order payload for `customer`.
    ///
    /// Returns `None` when the cart is empty.
    #[must_use]
    pub fn from_cart(
        customer: &CurrentUser,
        items: &[CartItem],
        shipping_address: ShippingAddress,
        payment_method: PaymentMethod,
    ) -> Option<Self> {
        if items.is_empty() {
            return None;
        }

        let items: Vec<OrderItem> = items.iter().map(OrderItem::from).collect();
        let total_price = items.iter().map(OrderItem::line_total).sum();

        Some(Self {
            user_id: customer.id,
            customer_name: customer.name.clone(),
            customer_email: customer.email.clone(),
            total_price,
            items,
            shipping_address,
            payment_method,
            status: OrderStatus::Pending,
        })
    }
}
