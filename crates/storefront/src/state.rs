//! Application state shared across handlers.

use std::sync::Arc;

use crate::backend::{BackendClient, BackendError};
use crate::config::StorefrontConfig;
use crate::services::catalog::Catalog;
use crate::services::checkout::CheckoutRedirector;
use crate::services::email::Notifier;
use crate::services::orders::OrderGateway;
use crate::services::payments::{PaymentError, StripeClient};

/// Error building application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("backend client: {0}")]
    Backend(#[from] BackendError),
    #[error("payment client: {0}")]
    Payment(#[from] PaymentError),
    #[error("smtp relay: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    backend: BackendClient,
    catalog: Catalog<BackendClient>,
    orders: OrderGateway<BackendClient, Notifier>,
    checkout: CheckoutRedirector<StripeClient>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if an HTTP client or the SMTP relay cannot be built.
    pub fn new(config: StorefrontConfig) -> Result<Self, StateError> {
        let backend = BackendClient::new(&config.backend)?;
        let notifier = Notifier::from_config(&config)?;
        let stripe = StripeClient::new(&config.payments)?;

        Ok(Self {
            inner: Arc::new(AppStateInner {
                catalog: Catalog::new(backend.clone()),
                orders: OrderGateway::new(backend.clone(), notifier),
                checkout: CheckoutRedirector::new(stripe, &config.base_url),
                backend,
                config,
            }),
        })
    }

    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Raw backend client, for auth and saved addresses.
    #[must_use]
    pub fn backend(&self) -> &BackendClient {
        &self.inner.backend
    }

    #[must_use]
    pub fn catalog(&self) -> &Catalog<BackendClient> {
        &self.inner.catalog
    }

    #[must_use]
    pub fn orders(&self) -> &OrderGateway<BackendClient, Notifier> {
        &self.inner.orders
    }

    #[must_use]
    pub fn checkout(&self) -> &CheckoutRedirector<StripeClient> {
        &self.inner.checkout
    }
}
