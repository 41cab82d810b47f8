//! Hosted payment gateway client (Stripe Checkout).
//!
//! Only the two calls checkout needs are wrapped: create a hosted checkout
//! session and read one back to confirm payment.

use std::future::Future;

use marketstall_core::PriceError;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::Deserialize;
use thiserror::Error;

use crate::config::PaymentConfig;

/// Store currency, as the gateway spells it.
pub const CURRENCY: &str = "usd";

/// The gateway shows at most this many images per line item.
const MAX_LINE_ITEM_IMAGES: usize = 8;

/// Errors that can occur when talking to the payment gateway.
#[derive(Debug, Error)]
pub enum PaymentError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Gateway rejected the request.
    #[error("Payment gateway error: {status} - {message}")]
    Gateway { status: u16, message: String },

    /// Failed to parse response or build the client.
    #[error("Parse error: {0}")]
    Parse(String),

    /// A cart price cannot be charged.
    #[error("Invalid price: {0}")]
    Price(#[from] PriceError),

    /// Nothing to pay for.
    #[error("Cart is empty")]
    EmptyCart,

    /// The session exists but has not been paid.
    #[error("Payment not completed (status: {0})")]
    NotPaid(String),

    /// The session charged a different amount than the checkout recorded.
    #[error("Paid amount {paid:?} does not match checkout total {expected}")]
    AmountMismatch { expected: i64, paid: Option<i64> },
}

/// One line on the hosted checkout page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineItem {
    pub name: String,
    pub description: Option<String>,
    pub images: Vec<String>,
    /// Unit price in minor units (cents).
    pub unit_amount: i64,
    pub quantity: u32,
}

/// Request to open a hosted checkout session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutSessionRequest {
    pub customer_email: String,
    pub line_items: Vec<LineItem>,
    pub success_url: String,
    pub cancel_url: String,
    pub payment_method_types: Vec<String>,
    /// Our reference for the buyer, echoed back on the session.
    pub client_reference_id: Option<String>,
}

impl CheckoutSessionRequest {
    /// Amount the gateway will charge, in minor units.
    #[must_use]
    pub fn amount_total(&self) -> i64 {
        self.line_items
            .iter()
            .map(|item| item.unit_amount.saturating_mul(i64::from(item.quantity)))
            .fold(0, i64::saturating_add)
    }

    /// Encode as the gateway's bracketed form fields.
    #[must_use]
    pub fn to_form(&self) -> Vec<(String, String)> {
        let mut form = vec![
            ("mode".to_string(), "payment".to_string()),
            ("customer_email".to_string(), self.customer_email.clone()),
            ("success_url".to_string(), self.success_url.clone()),
            ("cancel_url".to_string(), self.cancel_url.clone()),
        ];

        if let Some(reference) = &self.client_reference_id {
            form.push(("client_reference_id".to_string(), reference.clone()));
        }

        for (i, method) in self.payment_method_types.iter().enumerate() {
            form.push((format!("payment_method_types[{i}]"), method.clone()));
        }

        for (i, item) in self.line_items.iter().enumerate() {
            let price = format!("line_items[{i}][price_data]");
            form.push((format!("{price}[currency]"), CURRENCY.to_string()));
            form.push((format!("{price}[unit_amount]"), item.unit_amount.to_string()));
            form.push((format!("{price}[product_data][name]"), item.name.clone()));
            if let Some(description) = &item.description {
                form.push((
                    format!("{price}[product_data][description]"),
                    description.clone(),
                ));
            }
            for (j, image) in item.images.iter().take(MAX_LINE_ITEM_IMAGES).enumerate() {
                form.push((format!("{price}[product_data][images][{j}]"), image.clone()));
            }
            form.push((format!("line_items[{i}][quantity]"), item.quantity.to_string()));
        }

        form
    }
}

/// A hosted checkout session as reported by the gateway.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    /// Hosted page to redirect the buyer to. Absent once the session closes.
    #[serde(default)]
    pub url: Option<String>,
    /// `paid`, `unpaid` or `no_payment_required`.
    pub payment_status: String,
    #[serde(default)]
    pub client_reference_id: Option<String>,
    #[serde(default)]
    pub amount_total: Option<i64>,
}

impl CheckoutSession {
    #[must_use]
    pub fn is_paid(&self) -> bool {
        self.payment_status == "paid"
    }
}

/// Hosted payment gateway.
pub trait PaymentGateway: Send + Sync {
    fn create_session(
        &self,
        request: &CheckoutSessionRequest,
    ) -> impl Future<Output = Result<CheckoutSession, PaymentError>> + Send;

    fn retrieve_session(
        &self,
        session_id: &str,
    ) -> impl Future<Output = Result<CheckoutSession, PaymentError>> + Send;
}

#[derive(Deserialize)]
struct StripeErrorBody {
    error: StripeErrorDetail,
}

#[derive(Deserialize)]
struct StripeErrorDetail {
    message: Option<String>,
}

/// Stripe Checkout client.
#[derive(Clone)]
pub struct StripeClient {
    client: reqwest::Client,
    api_base: String,
}

impl StripeClient {
    /// Create a new Stripe client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &PaymentConfig) -> Result<Self, PaymentError> {
        let mut headers = HeaderMap::new();

        let auth_value = format!("Bearer {}", config.secret_key.expose_secret());
        let mut auth = HeaderValue::from_str(&auth_value)
            .map_err(|e| PaymentError::Parse(format!("Invalid secret key format: {e}")))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            api_base: config.api_base.clone(),
        })
    }

    async fn parse_session(response: reqwest::Response) -> Result<CheckoutSession, PaymentError> {
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<StripeErrorBody>(&body)
                .ok()
                .and_then(|b| b.error.message)
                .unwrap_or(body);
            return Err(PaymentError::Gateway {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json()
            .await
            .map_err(|e| PaymentError::Parse(e.to_string()))
    }
}

impl PaymentGateway for StripeClient {
    async fn create_session(
        &self,
        request: &CheckoutSessionRequest,
    ) -> Result<CheckoutSession, PaymentError> {
        let url = format!("{}/v1/checkout/sessions", self.api_base);
        let response = self.client.post(&url).form(&request.to_form()).send().await?;
        Self::parse_session(response).await
    }

    async fn retrieve_session(&self, session_id: &str) -> Result<CheckoutSession, PaymentError> {
        if session_id.is_empty()
            || !session_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(PaymentError::Parse(format!("Invalid session id: {session_id}")));
        }

        let url = format!("{}/v1/checkout/sessions/{session_id}", self.api_base);
        let response = self.client.get(&url).send().await?;
        Self::parse_session(response).await
    }
}
