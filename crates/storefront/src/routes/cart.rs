//! Cart route handlers.
//!
//! The cart lives in the browser session, keyed by the signed-in user or the
//! browser's anonymous id. Each handler opens the cart for the current
//! identity, so signing in or out switches carts without merging them.

use axum::{
    Json,
    extract::{Path, State},
};
use marketstall_core::cart::{CartItem, CartNotice, CartStore, LocalStorage};
use marketstall_core::{Price, Product, ProductId};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::OptionalAuth;
use crate::services::cart::{SessionStorage, open_cart};
use crate::state::AppState;

/// Cart contents as returned to the client.
#[derive(Debug, Serialize)]
pub struct CartView {
    pub items: Vec<CartItem>,
    pub total_count: u32,
    pub total_price: Price,
    /// Confirmation for the mutation that produced this view.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<String>,
}

impl CartView {
    fn new<S: LocalStorage>(cart: &CartStore<S>, notice: Option<&CartNotice>) -> Self {
        Self {
            items: cart.items().to_vec(),
            total_count: cart.total_count(),
            total_price: cart.total_price(),
            notice: notice.map(ToString::to_string),
        }
    }
}

/// Add-to-cart request body.
#[derive(Debug, Deserialize)]
pub struct AddItemRequest {
    pub product_id: ProductId,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

const fn default_quantity() -> u32 {
    1
}

/// Quantity update request body.
#[derive(Debug, Deserialize)]
pub struct SetQuantityRequest {
    pub quantity: i64,
}

async fn current_cart(session: Session, auth: OptionalAuth) -> Result<CartStore<SessionStorage>> {
    let OptionalAuth(user) = auth;
    Ok(open_cart(session, user.map(|u| u.id)).await?)
}

/// Show the cart.
#[instrument(skip_all)]
pub async fn show(auth: OptionalAuth, session: Session) -> Result<Json<CartView>> {
    let cart = current_cart(session, auth).await?;
    Ok(Json(CartView::new(&cart, None)))
}

/// Add a catalog product to the cart.
#[instrument(skip(state, auth, session))]
pub async fn add(
    State(state): State<AppState>,
    auth: OptionalAuth,
    session: Session,
    Json(request): Json<AddItemRequest>,
) -> Result<Json<CartView>> {
    let product = state
        .catalog()
        .get(request.product_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("product {}", request.product_id)))?;

    let mut cart = current_cart(session, auth).await?;
    let notice = cart
        .add_item(Product::clone(&product), request.quantity)
        .await?;

    let product_id = request.product_id.to_string();
    add_breadcrumb("cart", "Added item", Some(&[("product_id", product_id.as_str())]));
    Ok(Json(CartView::new(&cart, Some(&notice))))
}

/// Set a line's quantity; zero or less removes it.
#[instrument(skip(auth, session))]
pub async fn update(
    auth: OptionalAuth,
    session: Session,
    Path(product_id): Path<ProductId>,
    Json(request): Json<SetQuantityRequest>,
) -> Result<Json<CartView>> {
    let mut cart = current_cart(session, auth).await?;
    let notice = cart.set_quantity(product_id, request.quantity).await?;
    Ok(Json(CartView::new(&cart, Some(&notice))))
}

/// Remove a line from the cart.
#[instrument(skip(auth, session))]
pub async fn remove(
    auth: OptionalAuth,
    session: Session,
    Path(product_id): Path<ProductId>,
) -> Result<Json<CartView>> {
    let mut cart = current_cart(session, auth).await?;
    let notice = cart.remove_item(product_id).await?;
    Ok(Json(CartView::new(&cart, Some(&notice))))
}

/// Empty the cart.
#[instrument(skip_all)]
pub async fn clear(auth: OptionalAuth, session: Session) -> Result<Json<CartView>> {
    let mut cart = current_cart(session, auth).await?;
    cart.clear().await?;
    Ok(Json(CartView::new(&cart, None)))
}
