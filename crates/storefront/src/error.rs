//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers should return `Result<T, AppError>`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use marketstall_core::cart::StorageError;
use thiserror::Error;

use crate::backend::BackendError;
use crate::services::auth::AuthError;
use crate::services::checkout::CheckoutError;
use crate::services::payments::PaymentError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Backend data or auth API failed.
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// Payment gateway failed.
    #[error("Payment error: {0}")]
    Payment(#[from] PaymentError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Cart storage failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Session store failed.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// User is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// User lacks permission.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Rate limited.
    #[error("Rate limited")]
    RateLimited,

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<CheckoutError> for AppError {
    fn from(err: CheckoutError) -> Self {
        match err {
            CheckoutError::EmptyCart => Self::BadRequest("Cart is empty".to_string()),
            CheckoutError::InvalidAddress(field) => {
                Self::BadRequest(format!("Shipping address is missing {field}"))
            }
            CheckoutError::SessionMismatch => {
                Self::BadRequest("Checkout session does not match".to_string())
            }
            CheckoutError::Payment(e) => Self::Payment(e),
            CheckoutError::Backend(e) => Self::Backend(e),
            CheckoutError::Storage(e) => Self::Storage(e),
        }
    }
}

/// Status for a backend failure: its own 4xx codes pass through, anything
/// else is a bad gateway.
fn backend_status(err: &BackendError) -> StatusCode {
    err.status()
        .filter(|code| (400..500).contains(code))
        .and_then(|code| StatusCode::from_u16(code).ok())
        .unwrap_or(StatusCode::BAD_GATEWAY)
}

/// Message shown for a backend failure.
fn backend_message(err: &BackendError) -> String {
    match err {
        BackendError::Api { status, message } if (400..500).contains(status) => message.clone(),
        BackendError::NotFound(_) => "Not found".to_string(),
        _ => "External service error".to_string(),
    }
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Backend(err) => backend_status(err),
            Self::Payment(err) => match err {
                PaymentError::EmptyCart | PaymentError::Price(_) => StatusCode::BAD_REQUEST,
                PaymentError::NotPaid(_) => StatusCode::PAYMENT_REQUIRED,
                _ => StatusCode::BAD_GATEWAY,
            },
            Self::Auth(err) => match err {
                AuthError::Backend(e) => backend_status(e),
                AuthError::WeakPassword(_) | AuthError::InvalidEmail(_) => StatusCode::BAD_REQUEST,
                AuthError::NotSignedIn => StatusCode::UNAUTHORIZED,
                AuthError::MissingEmail | AuthError::Session(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::Storage(_) | Self::Session(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        }
    }

    // Don't expose internal error details to clients
    fn client_message(&self) -> String {
        match self {
            Self::Backend(err) => backend_message(err),
            Self::Payment(err) => match err {
                PaymentError::Gateway { message, .. } => message.clone(),
                PaymentError::EmptyCart | PaymentError::NotPaid(_) | PaymentError::Price(_) => {
                    err.to_string()
                }
                PaymentError::AmountMismatch { .. } => {
                    "Payment does not match the order; please contact support".to_string()
                }
                _ => "Payment service error".to_string(),
            },
            Self::Auth(err) => match err {
                AuthError::Backend(e) => backend_message(e),
                AuthError::WeakPassword(msg) => msg.clone(),
                AuthError::InvalidEmail(_) => "Invalid email address".to_string(),
                AuthError::NotSignedIn => "Not signed in".to_string(),
                AuthError::MissingEmail | AuthError::Session(_) => {
                    "Authentication error".to_string()
                }
            },
            Self::Storage(_) | Self::Session(_) | Self::Internal(_) => {
                "Internal server error".to_string()
            }
            _ => self.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let body = Json(serde_json::json!({ "error": self.client_message() }));
        (status, body).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for user actions.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("cart", "Added item", Some(&[("product_id", "123")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("product 123".to_string());
        assert_eq!(err.to_string(), "Not found: product 123");

        let err = AppError::BadRequest("invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: invalid input");
    }

    #[test]
    fn test_app_error_status_codes() {
        fn get_status(err: AppError) -> StatusCode {
            err.into_response().status()
        }

        assert_eq!(
            get_status(AppError::NotFound("test".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::Unauthorized("test".to_string())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(AppError::Forbidden("test".to_string())),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            get_status(AppError::RateLimited),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            get_status(AppError::Internal("test".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_backend_client_errors_pass_through() {
        let err = AppError::Auth(AuthError::Backend(BackendError::Api {
            status: 400,
            message: "Invalid login credentials".to_string(),
        }));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.client_message(), "Invalid login credentials");

        let err = AppError::Backend(BackendError::NotFound("order 9".to_string()));
        assert_eq!(err.status(), StatusCode::NOT_FOUND);

        let err = AppError::Backend(BackendError::Api {
            status: 500,
            message: "connection refused to db-7".to_string(),
        });
        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(err.client_message(), "External service error");
    }

    #[test]
    fn test_gateway_message_is_surfaced() {
        let err = AppError::Payment(PaymentError::Gateway {
            status: 400,
            message: "Invalid currency".to_string(),
        });
        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(err.client_message(), "Invalid currency");

        let err = AppError::Payment(PaymentError::NotPaid("unpaid".to_string()));
        assert_eq!(err.status(), StatusCode::PAYMENT_REQUIRED);
    }

    #[test]
    fn test_checkout_errors_map_to_client_errors() {
        assert_eq!(
            AppError::from(CheckoutError::EmptyCart).status(),
            StatusCode::BAD_REQUEST
        );

        let err = AppError::from(CheckoutError::InvalidAddress("city"));
        assert_eq!(err.to_string(), "Bad request: Shipping address is missing city");

        assert_eq!(
            AppError::from(CheckoutError::SessionMismatch).status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_amount_mismatch_is_a_server_error() {
        let err = AppError::from(CheckoutError::Payment(PaymentError::AmountMismatch {
            expected: 1000,
            paid: Some(151_000),
        }));
        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
        assert!(err.client_message().contains("contact support"));
        assert!(!err.client_message().contains("151000"));
    }
}
