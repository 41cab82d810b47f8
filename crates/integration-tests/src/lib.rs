//! Integration tests for the Marketstall storefront.
//!
//! # Running Tests
//!
//! ```bash
//! # Start the storefront against a test backend
//! cargo run -p marketstall-storefront
//!
//! # Run integration tests
//! cargo test -p marketstall-integration-tests -- --ignored
//! ```
//!
//! Tests that need seeded data read it from the environment:
//! `TEST_PRODUCT_ID` (a published product) and `TEST_USER_EMAIL` /
//! `TEST_USER_PASSWORD` (a confirmed customer account).

use reqwest::Client;

/// Base URL of the running storefront.
#[must_use]
pub fn storefront_url() -> String {
    std::env::var("STOREFRONT_BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string())
}

/// A client that keeps the session cookie, like one browser.
///
/// # Panics
///
/// Panics if the HTTP client cannot be built.
#[must_use]
pub fn browser() -> Client {
    Client::builder()
        .cookie_store(true)
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .expect("Failed to create HTTP client")
}

/// A published product id from `TEST_PRODUCT_ID`, if set.
#[must_use]
pub fn test_product_id() -> Option<i64> {
    std::env::var("TEST_PRODUCT_ID").ok()?.parse().ok()
}

/// Customer credentials from `TEST_USER_EMAIL` / `TEST_USER_PASSWORD`, if set.
#[must_use]
pub fn test_user() -> Option<(String, String)> {
    Some((
        std::env::var("TEST_USER_EMAIL").ok()?,
        std::env::var("TEST_USER_PASSWORD").ok()?,
    ))
}

/// Sign `client` in as the test customer.
///
/// # Panics
///
/// Panics if the login request fails or is rejected.
pub async fn sign_in(client: &Client, email: &str, password: &str) {
    let resp = client
        .post(format!("{}/auth/login", storefront_url()))
        .json(&serde_json::json!({ "email": email, "password": password }))
        .send()
        .await
        .expect("Failed to send login request");
    assert!(resp.status().is_success(), "login failed: {}", resp.status());
}
