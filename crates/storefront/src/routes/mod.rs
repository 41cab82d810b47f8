//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                     - Liveness
//! GET    /health/ready               - Readiness (pings the backend)
//!
//! # Products
//! GET    /products?category=         - Published products, newest first
//! GET    /products/{id}              - Product detail
//!
//! # Cart (anonymous or signed in)
//! GET    /cart                       - Cart contents and totals
//! POST   /cart/items                 - Add a product
//! PATCH  /cart/items/{product_id}    - Set quantity (<= 0 removes)
//! DELETE /cart/items/{product_id}    - Remove a line
//! DELETE /cart                       - Empty the cart
//!
//! # Checkout (requires auth)
//! POST   /checkout                   - 303 to hosted payment, or create a COD order
//! GET    /checkout/success           - Confirm payment and create the order
//!
//! # Auth (rate limited)
//! POST   /auth/login                 - Sign in
//! POST   /auth/register              - Create an account
//! POST   /auth/logout                - Sign out
//! POST   /auth/refresh               - Refresh backend tokens
//! GET    /auth/me                    - Current user
//!
//! # Account (requires auth)
//! GET    /account/orders             - Order history
//! GET    /account/addresses          - Saved addresses
//! POST   /account/addresses          - Save an address
//! DELETE /account/addresses/{id}     - Delete an address
//!
//! # Admin (requires admin role)
//! GET    /admin/orders               - All orders
//! GET    /admin/orders/{id}          - One order
//! PATCH  /admin/orders/{id}/status   - Overwrite status
//! POST   /admin/catalog/invalidate   - Drop cached catalog reads
//! ```

pub mod account;
pub mod admin;
pub mod auth;
pub mod cart;
pub mod checkout;
pub mod products;

use axum::{
    Router,
    routing::{get, patch, post},
};

use crate::state::AppState;

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(auth::login))
        .route("/register", post(auth::register))
        .route("/logout", post(auth::logout))
        .route("/refresh", post(auth::refresh))
        .route("/me", get(auth::me))
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index))
        .route("/{id}", get(products::show))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show).delete(cart::clear))
        .route("/items", post(cart::add))
        .route(
            "/items/{product_id}",
            patch(cart::update).delete(cart::remove),
        )
}

/// Create the checkout routes router.
pub fn checkout_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(checkout::start))
        .route("/success", get(checkout::success))
}

/// Create the account routes router.
pub fn account_routes() -> Router<AppState> {
    use axum::routing::delete;

    Router::new()
        .route("/orders", get(account::orders))
        .route(
            "/addresses",
            get(account::addresses).post(account::create_address),
        )
        .route("/addresses/{id}", delete(account::delete_address))
}

/// Create the admin routes router.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/orders", get(admin::orders))
        .route("/orders/{id}", get(admin::order))
        .route("/orders/{id}/status", patch(admin::update_status))
        .route("/catalog/invalidate", post(admin::invalidate_catalog))
}

/// Create all routes for the storefront except `/auth`, which `main`
/// nests separately behind the rate limiter.
pub fn routes() -> Router<AppState> {
    Router::new()
        .nest("/products", product_routes())
        .nest("/cart", cart_routes())
        .nest("/checkout", checkout_routes())
        .nest("/account", account_routes())
        .nest("/admin", admin_routes())
}
