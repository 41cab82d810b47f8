//! Health, auth and access control against a running storefront.

use marketstall_integration_tests::{browser, sign_in, storefront_url, test_user};
use reqwest::StatusCode;
use serde_json::{Value, json};

#[tokio::test]
#[ignore = "Requires running storefront"]
async fn test_health() {
    let resp = browser()
        .get(format!("{}/health", storefront_url()))
        .send()
        .await
        .expect("Failed to reach storefront");
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.text().await.expect("No body"), "ok");
}

#[tokio::test]
#[ignore = "Requires running storefront"]
async fn test_request_id_is_echoed() {
    let resp = browser()
        .get(format!("{}/health", storefront_url()))
        .header("x-request-id", "integration-test-1")
        .send()
        .await
        .expect("Failed to reach storefront");
    assert_eq!(
        resp.headers().get("x-request-id").and_then(|v| v.to_str().ok()),
        Some("integration-test-1")
    );
}

#[tokio::test]
#[ignore = "Requires running storefront"]
async fn test_anonymous_requests_are_rejected() {
    let client = browser();
    let base = storefront_url();

    for path in ["/auth/me", "/account/orders", "/account/addresses", "/admin/orders"] {
        let resp = client
            .get(format!("{base}{path}"))
            .send()
            .await
            .expect("Request failed");
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED, "{path}");
    }

    let resp = client
        .post(format!("{base}/checkout"))
        .json(&json!({ "shipping_address": {} }))
        .send()
        .await
        .expect("Request failed");
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore = "Requires running storefront"]
async fn test_bad_credentials_pass_backend_error_through() {
    let resp = browser()
        .post(format!("{}/auth/login", storefront_url()))
        .json(&json!({ "email": "nobody@example.com", "password": "wrong-password" }))
        .send()
        .await
        .expect("Request failed");

    assert!(resp.status().is_client_error());
    let body: Value = resp.json().await.expect("Error is not JSON");
    assert!(body["error"].as_str().is_some());
}

#[tokio::test]
#[ignore = "Requires running storefront"]
async fn test_short_password_is_rejected_locally() {
    let resp = browser()
        .post(format!("{}/auth/register", storefront_url()))
        .json(&json!({ "email": "new@example.com", "password": "short", "name": "New" }))
        .send()
        .await
        .expect("Request failed");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[ignore = "Requires running storefront and a test account"]
async fn test_customer_session_lifecycle() {
    let Some((email, password)) = test_user() else {
        return;
    };
    let client = browser();
    let base = storefront_url();
    sign_in(&client, &email, &password).await;

    let me: Value = client
        .get(format!("{base}/auth/me"))
        .send()
        .await
        .expect("Request failed")
        .json()
        .await
        .expect("User is not JSON");
    assert_eq!(me["email"].as_str().map(str::to_lowercase), Some(email.to_lowercase()));

    let orders = client
        .get(format!("{base}/account/orders"))
        .send()
        .await
        .expect("Request failed");
    assert_eq!(orders.status(), StatusCode::OK);

    if me["role"] != "admin" {
        let resp = client
            .get(format!("{base}/admin/orders"))
            .send()
            .await
            .expect("Request failed");
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    let resp = client
        .post(format!("{base}/auth/logout"))
        .send()
        .await
        .expect("Request failed");
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = client
        .get(format!("{base}/auth/me"))
        .send()
        .await
        .expect("Request failed");
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore = "Requires running storefront and a test account"]
async fn test_checkout_with_empty_cart_is_rejected() {
    let Some((email, password)) = test_user() else {
        return;
    };
    let client = browser();
    let base = storefront_url();
    sign_in(&client, &email, &password).await;

    client
        .delete(format!("{base}/cart"))
        .send()
        .await
        .expect("Request failed");

    let resp = client
        .post(format!("{base}/checkout"))
        .json(&json!({
            "shipping_address": {
                "full_name": "Test Buyer",
                "line1": "1 Market St",
                "city": "Springfield",
                "postal_code": "12345",
                "country": "US"
            },
            "payment_method": "card"
        }))
        .send()
        .await
        .expect("Request failed");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}
