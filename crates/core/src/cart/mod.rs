//! Per-identity shopping cart.
//!
//! A [`CartStore`] holds the active cart for one browser and one identity.
//! Every mutation is written through to [`LocalStorage`] under the current
//! [`CartKey`]. Switching identity loads whatever cart was stored under the
//! new key; carts are never merged across keys.
//!
//! ```text
//! anonymous ──sign in──▶ cart_<user_id>        (anonymous cart left in place)
//! user      ──sign out─▶ cart_anonymous_<id>   (same anonymous id as before)
//! ```

mod key;
mod storage;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::id::{ProductId, UserId};
use crate::types::price::Price;
use crate::types::product::Product;

pub use key::{ANONYMOUS_ID_KEY, CartKey};
pub use storage::{LocalStorage, MemoryStorage, StorageError};

/// A product snapshot and how many of it the buyer wants.
///
/// Quantity is always at least 1 while the item is in a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub product: Product,
    pub quantity: u32,
}

impl CartItem {
    /// `effective_price × quantity`.
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.product.effective_price() * self.quantity
    }
}

/// User-facing confirmation of a cart change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartNotice {
    Added { name: String, quantity: u32 },
    Removed,
    Unchanged,
}

impl fmt::Display for CartNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Added { name, .. } => write!(f, "{name} added to cart"),
            Self::Removed => f.write_str("Item removed from cart"),
            Self::Unchanged => f.write_str("Cart unchanged"),
        }
    }
}

/// The active cart for one storage scope.
#[derive(Debug)]
pub struct CartStore<S> {
    storage: S,
    key: CartKey,
    items: Vec<CartItem>,
}

impl<S: LocalStorage> CartStore<S> {
    /// Open the cart for `user` (or the anonymous browser when `None`).
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if storage cannot be read. A corrupt stored
    /// cart is not an error; it is discarded and the cart starts empty.
    pub async fn open(storage: S, user: Option<UserId>) -> Result<Self, StorageError> {
        let key = CartKey::derive(&storage, user).await?;
        let mut store = Self {
            storage,
            key,
            items: Vec::new(),
        };
        store.reload().await?;
        Ok(store)
    }

    /// Re-derive the key for a new identity and adopt the cart stored there.
    ///
    /// Does nothing when the key is unchanged. The previous cart stays in
    /// storage under its own key.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if storage cannot be read.
    pub async fn switch_identity(&mut self, user: Option<UserId>) -> Result<(), StorageError> {
        let key = CartKey::derive(&self.storage, user).await?;
        if key == self.key {
            return Ok(());
        }

        tracing::debug!(from = %self.key, to = %key, "switching cart key");
        self.key = key;
        self.reload().await
    }

    /// Add `quantity` of `product`, merging with an existing line.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the cart cannot be persisted.
    pub async fn add_item(
        &mut self,
        product: Product,
        quantity: u32,
    ) -> Result<CartNotice, StorageError> {
        if quantity == 0 {
            return Ok(CartNotice::Unchanged);
        }

        let name = product.name.clone();
        match self
            .items
            .iter_mut()
            .find(|item| item.product.id == product.id)
        {
            Some(item) => item.quantity = item.quantity.saturating_add(quantity),
            None => self.items.push(CartItem { product, quantity }),
        }

        self.persist().await?;
        Ok(CartNotice::Added { name, quantity })
    }

    /// Remove the line for `product_id`. Absent products are ignored.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the cart cannot be persisted.
    pub async fn remove_item(&mut self, product_id: ProductId) -> Result<CartNotice, StorageError> {
        let before = self.items.len();
        self.items.retain(|item| item.product.id != product_id);
        if self.items.len() == before {
            return Ok(CartNotice::Unchanged);
        }

        self.persist().await?;
        Ok(CartNotice::Removed)
    }

    /// Replace the quantity of an existing line. Zero or less removes it.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the cart cannot be persisted.
    pub async fn set_quantity(
        &mut self,
        product_id: ProductId,
        quantity: i64,
    ) -> Result<CartNotice, StorageError> {
        if quantity <= 0 {
            return self.remove_item(product_id).await;
        }

        let quantity = u32::try_from(quantity).unwrap_or(u32::MAX);
        let Some(item) = self
            .items
            .iter_mut()
            .find(|item| item.product.id == product_id)
        else {
            return Ok(CartNotice::Unchanged);
        };

        if item.quantity == quantity {
            return Ok(CartNotice::Unchanged);
        }
        item.quantity = quantity;
        let notice = CartNotice::Added {
            name: item.product.name.clone(),
            quantity,
        };

        self.persist().await?;
        Ok(notice)
    }

    /// Empty the cart and delete its storage key.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the key cannot be removed.
    pub async fn clear(&mut self) -> Result<(), StorageError> {
        self.items.clear();
        self.persist().await
    }

    /// Sum of quantities across all lines.
    #[must_use]
    pub fn total_count(&self) -> u32 {
        self.items
            .iter()
            .fold(0, |total, item| total.saturating_add(item.quantity))
    }

    /// Sum of line totals at effective prices.
    #[must_use]
    pub fn total_price(&self) -> Price {
        self.items.iter().map(CartItem::line_total).sum()
    }

    #[must_use]
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub const fn key(&self) -> &CartKey {
        &self.key
    }

    async fn reload(&mut self) -> Result<(), StorageError> {
        let Some(raw) = self.storage.get_item(self.key.as_str()).await? else {
            self.items = Vec::new();
            return Ok(());
        };

        match parse_cart(&raw) {
            Ok(items) => self.items = items,
            Err(reason) => {
                tracing::warn!(key = %self.key, %reason, "discarding malformed stored cart");
                self.items = Vec::new();
                self.storage.remove_item(self.key.as_str()).await?;
            }
        }
        Ok(())
    }

    async fn persist(&self) -> Result<(), StorageError> {
        if self.items.is_empty() {
            return self.storage.remove_item(self.key.as_str()).await;
        }

        let payload = serde_json::to_string(&self.items)?;
        self.storage.set_item(self.key.as_str(), payload).await
    }
}

/// Decode a stored cart, rejecting payloads that break cart invariants.
fn parse_cart(raw: &str) -> Result<Vec<CartItem>, String> {
    let items: Vec<CartItem> = serde_json::from_str(raw).map_err(|e| e.to_string())?;

    if items.iter().any(|item| item.quantity == 0) {
        return Err("line with zero quantity".to_owned());
    }

    let mut seen = std::collections::HashSet::new();
    if !items.iter().all(|item| seen.insert(item.product.id)) {
        return Err("duplicate product lines".to_owned());
    }

    Ok(items)
}
