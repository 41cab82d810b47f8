//! Authentication error types.

use thiserror::Error;

use crate::backend::BackendError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] marketstall_core::EmailError),

    /// Password too weak or invalid.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// The backend account has no email address.
    #[error("account has no email address")]
    MissingEmail,

    /// No signed-in user in this session.
    #[error("not signed in")]
    NotSignedIn,

    /// Backend auth API error, passed through unchanged.
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// Session store error.
    #[error("session error: {0}")]
    Session(#[from] tower_sessions::session::Error),
}
