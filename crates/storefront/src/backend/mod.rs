//! HTTP client for the managed backend.
//!
//! The backend exposes a `PostgREST`-style data API under `/rest/v1` and an
//! auth API under `/auth/v1`. Every request carries the project API key in
//! the `apikey` header; data requests authenticate as the service with the
//! same key, auth requests on behalf of a user swap in that user's access
//! token.
//!
//! Table access is split by resource:
//! - [`products`] - read-only catalog rows
//! - [`orders`] - order rows
//! - [`addresses`] - saved shipping addresses
//! - [`auth`] - sign in, sign up, sign out, session refresh

pub mod addresses;
pub mod auth;
pub mod orders;
pub mod products;

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use secrecy::ExposeSecret;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use url::Url;

use crate::config::BackendConfig;

pub use addresses::SavedAddress;
pub use auth::{AuthSession, AuthUser, SignUpOutcome};

/// Errors that can occur when talking to the backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Backend returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Requested row does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Failed to parse response or build a request.
    #[error("Parse error: {0}")]
    Parse(String),
}

impl BackendError {
    /// Status code reported by the backend, if it answered at all.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::NotFound(_) => Some(404),
            Self::Http(_) | Self::Parse(_) => None,
        }
    }
}

/// Error body shapes used by the data and auth APIs.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    msg: Option<String>,
    error_description: Option<String>,
    error: Option<String>,
}

impl ErrorBody {
    fn into_message(self) -> Option<String> {
        self.message
            .or(self.msg)
            .or(self.error_description)
            .or(self.error)
    }
}

/// Backend REST and auth client.
#[derive(Clone)]
pub struct BackendClient {
    client: reqwest::Client,
    base_url: Url,
}

impl BackendClient {
    /// Create a new backend client.
    ///
    /// # Errors
    ///
    /// Returns error if the API key is not a valid header value or the HTTP
    /// client fails to build.
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        let key = config.api_key.expose_secret();
        let mut headers = HeaderMap::new();

        let mut api_key = HeaderValue::from_str(key)
            .map_err(|e| BackendError::Parse(format!("Invalid API key format: {e}")))?;
        api_key.set_sensitive(true);
        headers.insert("apikey", api_key);

        let mut bearer = HeaderValue::from_str(&format!("Bearer {key}"))
            .map_err(|e| BackendError::Parse(format!("Invalid API key format: {e}")))?;
        bearer.set_sensitive(true);
        headers.insert(AUTHORIZATION, bearer);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            base_url: config.url.clone(),
        })
    }

    /// Check that the backend answers.
    ///
    /// # Errors
    ///
    /// Returns error if the health endpoint is unreachable or unhealthy.
    pub async fn ping(&self) -> Result<(), BackendError> {
        let url = self.endpoint("auth/v1/health", &[])?;
        let response = self.client.get(url).send().await?;
        check(response).await.map(drop)
    }

    /// Build `<base>/<path>?<params>`.
    fn endpoint(&self, path: &str, params: &[(&str, String)]) -> Result<Url, BackendError> {
        let mut url = self
            .base_url
            .join(path)
            .map_err(|e| BackendError::Parse(format!("Invalid backend path {path}: {e}")))?;

        if !params.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in params {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    fn table(
        &self,
        method: Method,
        table: &str,
        params: &[(&str, String)],
    ) -> Result<RequestBuilder, BackendError> {
        let url = self.endpoint(&format!("rest/v1/{table}"), params)?;
        Ok(self.client.request(method, url))
    }

    /// `GET /rest/v1/<table>` with exact-match filters and an optional sort.
    async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        filters: &[(&str, String)],
        order: Option<&str>,
    ) -> Result<Vec<T>, BackendError> {
        let mut params = vec![("select", "*".to_string())];
        params.extend(filters.iter().map(|(col, value)| (*col, format!("eq.{value}"))));
        if let Some(order) = order {
            params.push(("order", order.to_string()));
        }

        let response = self.table(Method::GET, table, &params)?.send().await?;
        parse_json(check(response).await?).await
    }

    /// `POST /rest/v1/<table>` returning the inserted row.
    async fn insert<B, T>(&self, table: &str, body: &B) -> Result<T, BackendError>
    where
        B: serde::Serialize + Sync,
        T: DeserializeOwned,
    {
        let response = self
            .table(Method::POST, table, &[])?
            .header("Prefer", "return=representation")
            .json(body)
            .send()
            .await?;

        let rows: Vec<T> = parse_json(check(response).await?).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| BackendError::Parse(format!("insert into {table} returned no row")))
    }

    /// `PATCH /rest/v1/<table>` with exact-match filters, returning changed rows.
    async fn update<B, T>(
        &self,
        table: &str,
        filters: &[(&str, String)],
        body: &B,
    ) -> Result<Vec<T>, BackendError>
    where
        B: serde::Serialize + Sync,
        T: DeserializeOwned,
    {
        let params: Vec<_> = filters
            .iter()
            .map(|(col, value)| (*col, format!("eq.{value}")))
            .collect();

        let response = self
            .table(Method::PATCH, table, &params)?
            .header("Prefer", "return=representation")
            .json(body)
            .send()
            .await?;

        parse_json(check(response).await?).await
    }

    /// `DELETE /rest/v1/<table>` with exact-match filters.
    async fn delete(&self, table: &str, filters: &[(&str, String)]) -> Result<(), BackendError> {
        let params: Vec<_> = filters
            .iter()
            .map(|(col, value)| (*col, format!("eq.{value}")))
            .collect();

        let response = self.table(Method::DELETE, table, &params)?.send().await?;
        check(response).await.map(drop)
    }
}

/// Turn non-2xx responses into `BackendError::Api` with the backend's message.
async fn check(response: Response) -> Result<Response, BackendError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&body)
        .ok()
        .and_then(ErrorBody::into_message)
        .unwrap_or_else(|| {
            if body.is_empty() {
                status
                    .canonical_reason()
                    .unwrap_or("Unknown error")
                    .to_string()
            } else {
                body
            }
        });

    if status == StatusCode::NOT_FOUND {
        return Err(BackendError::NotFound(message));
    }

    Err(BackendError::Api {
        status: status.as_u16(),
        message,
    })
}

async fn parse_json<T: DeserializeOwned>(response: Response) -> Result<T, BackendError> {
    response
        .json()
        .await
        .map_err(|e| BackendError::Parse(e.to_string()))
}
