//! Auth session bridge.
//!
//! The backend owns accounts and sessions. This module turns backend auth
//! events into the storefront's [`CurrentUser`], kept in the HTTP session,
//! and passes login, registration and logout through to the backend.

mod error;

pub use error::AuthError;

use marketstall_core::{CurrentUser, Email, Role};
use tower_sessions::Session;

use crate::backend::{AuthSession, AuthUser, BackendClient, BackendError, SignUpOutcome};
use crate::error::{clear_sentry_user, set_sentry_user};
use crate::models::{AuthTokens, session_keys};

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// A change in the backend auth state.
#[derive(Debug)]
pub enum AuthEvent {
    SignedIn(AuthSession),
    TokenRefreshed(AuthSession),
    SignedOut,
}

/// Map a backend account to the storefront user, resolving the role once.
///
/// # Errors
///
/// Returns `AuthError::MissingEmail` if the account has no email and
/// `AuthError::InvalidEmail` if it is malformed.
pub fn resolve_user(user: &AuthUser, admin_email: &Email) -> Result<CurrentUser, AuthError> {
    let email = Email::parse(user.email.as_deref().ok_or(AuthError::MissingEmail)?)?;
    let name = user
        .user_metadata
        .display_name()
        .map_or_else(|| email.local_part().to_string(), str::to_string);
    let role = Role::resolve(user.app_metadata.role.as_deref(), &email, admin_email);

    Ok(CurrentUser {
        id: user.id,
        name,
        email,
        role,
    })
}

/// Connects backend auth to one browser session.
pub struct SessionBridge<'a> {
    backend: &'a BackendClient,
    session: &'a Session,
    admin_email: &'a Email,
}

impl<'a> SessionBridge<'a> {
    #[must_use]
    pub const fn new(
        backend: &'a BackendClient,
        session: &'a Session,
        admin_email: &'a Email,
    ) -> Self {
        Self {
            backend,
            session,
            admin_email,
        }
    }

    /// Apply an auth event to the session.
    ///
    /// Returns the user now signed in, or `None` after sign-out.
    ///
    /// # Errors
    ///
    /// Returns `AuthError` if the account cannot be mapped or the session
    /// cannot be written.
    pub async fn on_auth_event(&self, event: AuthEvent) -> Result<Option<CurrentUser>, AuthError> {
        match event {
            AuthEvent::SignedIn(auth) | AuthEvent::TokenRefreshed(auth) => {
                let user = resolve_user(&auth.user, self.admin_email)?;
                self.session.insert(session_keys::CURRENT_USER, &user).await?;
                self.session
                    .insert(session_keys::AUTH_TOKENS, AuthTokens::from(&auth))
                    .await?;

                set_sentry_user(&user.id, Some(user.email.as_str()));
                tracing::info!(user_id = %user.id, role = %user.role, "Session user set");
                Ok(Some(user))
            }
            AuthEvent::SignedOut => {
                self.session
                    .remove::<CurrentUser>(session_keys::CURRENT_USER)
                    .await?;
                self.session
                    .remove::<AuthTokens>(session_keys::AUTH_TOKENS)
                    .await?;
                self.session
                    .remove_value(session_keys::PENDING_CHECKOUT)
                    .await?;

                clear_sentry_user();
                Ok(None)
            }
        }
    }

    /// The user signed in to this session, if any.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Session` if the session cannot be read.
    pub async fn current_user(&self) -> Result<Option<CurrentUser>, AuthError> {
        Ok(self.session.get(session_keys::CURRENT_USER).await?)
    }

    /// Sign in with email and password.
    ///
    /// # Errors
    ///
    /// Returns the backend's error unchanged for rejected credentials.
    pub async fn login(&self, email: &str, password: &str) -> Result<CurrentUser, AuthError> {
        let email = Email::parse(email)?;
        let auth = self
            .backend
            .sign_in_with_password(email.as_str(), password)
            .await?;

        self.session.cycle_id().await?;
        self.on_auth_event(AuthEvent::SignedIn(auth))
            .await?
            .ok_or(AuthError::NotSignedIn)
    }

    /// Create an account. Returns `None` if the backend requires email
    /// confirmation before the first sign-in.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::WeakPassword` for short passwords and the
    /// backend's error unchanged otherwise.
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<Option<CurrentUser>, AuthError> {
        let email = Email::parse(email)?;
        validate_password(password)?;

        match self.backend.sign_up(email.as_str(), password, name.trim()).await? {
            SignUpOutcome::SignedIn(auth) => {
                self.session.cycle_id().await?;
                self.on_auth_event(AuthEvent::SignedIn(auth)).await
            }
            SignUpOutcome::ConfirmationRequired => {
                tracing::info!(email = %email, "Sign-up awaiting email confirmation");
                Ok(None)
            }
        }
    }

    /// Sign out with the backend and clear the session user.
    ///
    /// The browser session itself is kept so its carts and anonymous id
    /// survive. A backend 401 means the token already expired and counts as
    /// signed out.
    ///
    /// # Errors
    ///
    /// Returns the backend's error unchanged for any other failure.
    pub async fn logout(&self) -> Result<(), AuthError> {
        let tokens: Option<AuthTokens> = self.session.get(session_keys::AUTH_TOKENS).await?;

        if let Some(tokens) = tokens {
            match self.backend.sign_out(&tokens.access_token).await {
                Ok(()) => {}
                Err(BackendError::Api { status: 401, .. }) => {
                    tracing::debug!("Backend token already expired at sign-out");
                }
                Err(e) => return Err(e.into()),
            }
        }

        self.on_auth_event(AuthEvent::SignedOut).await.map(drop)
    }

    /// Exchange the stored refresh token for a new session.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::NotSignedIn` without stored tokens and the
    /// backend's error unchanged if the refresh is rejected.
    pub async fn refresh(&self) -> Result<CurrentUser, AuthError> {
        let tokens: AuthTokens = self
            .session
            .get(session_keys::AUTH_TOKENS)
            .await?
            .ok_or(AuthError::NotSignedIn)?;

        let auth = self.backend.refresh_session(&tokens.refresh_token).await?;
        self.on_auth_event(AuthEvent::TokenRefreshed(auth))
            .await?
            .ok_or(AuthError::NotSignedIn)
    }
}

/// Validate password meets requirements.
fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use secrecy::SecretString;
    use tower_sessions::MemoryStore;
    use url::Url;

    use super::*;
    use crate::config::BackendConfig;

    fn backend() -> BackendClient {
        BackendClient::new(&BackendConfig {
            url: Url::parse("http://127.0.0.1:9").unwrap(),
            api_key: SecretString::from("anon-key"),
        })
        .unwrap()
    }

    fn auth_session(email: &str, role: Option<&str>, name: Option<&str>) -> AuthSession {
        serde_json::from_value(serde_json::json!({
            "access_token": "at",
            "refresh_token": "rt",
            "user": {
                "id": "7f1c2a4e-9a53-4b6e-8d7a-0e6f1c9b2d11",
                "email": email,
                "user_metadata": {"name": name},
                "app_metadata": {"role": role}
            }
        }))
        .unwrap()
    }

    fn admin() -> Email {
        Email::parse("admin@marketstall.shop").unwrap()
    }

    #[test]
    fn test_resolve_user_defaults_name_to_local_part() {
        let auth = auth_session("buyer@example.com", None, None);
        let user = resolve_user(&auth.user, &admin()).unwrap();
        assert_eq!(user.name, "buyer");
        assert_eq!(user.role, Role::Customer);
    }

    #[test]
    fn test_resolve_user_admin_by_email_or_claim() {
        let by_email = auth_session("Admin@Marketstall.shop", None, Some("Owner"));
        assert!(resolve_user(&by_email.user, &admin()).unwrap().is_admin());

        let by_claim = auth_session("staff@example.com", Some("admin"), None);
        assert!(resolve_user(&by_claim.user, &admin()).unwrap().is_admin());
    }

    #[test]
    fn test_validate_password() {
        assert!(validate_password("short").is_err());
        assert!(validate_password("long-enough").is_ok());
    }

    #[tokio::test]
    async fn test_auth_events_set_and_clear_session_user() {
        let backend = backend();
        let session = Session::new(None, Arc::new(MemoryStore::default()), None);
        let admin = admin();
        let bridge = SessionBridge::new(&backend, &session, &admin);

        let user = bridge
            .on_auth_event(AuthEvent::SignedIn(auth_session(
                "buyer@example.com",
                None,
                Some("Ada"),
            )))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(user.name, "Ada");
        assert_eq!(bridge.current_user().await.unwrap(), Some(user));

        let refreshed = bridge
            .on_auth_event(AuthEvent::TokenRefreshed(auth_session(
                "buyer@example.com",
                Some("admin"),
                Some("Ada"),
            )))
            .await
            .unwrap()
            .unwrap();
        assert!(refreshed.is_admin());

        assert!(bridge.on_auth_event(AuthEvent::SignedOut).await.unwrap().is_none());
        assert!(bridge.current_user().await.unwrap().is_none());
        let tokens: Option<AuthTokens> = session.get(session_keys::AUTH_TOKENS).await.unwrap();
        assert!(tokens.is_none());
    }

    #[tokio::test]
    async fn test_sign_out_keeps_local_storage_entries() {
        let backend = backend();
        let session = Session::new(None, Arc::new(MemoryStore::default()), None);
        let admin = admin();
        let bridge = SessionBridge::new(&backend, &session, &admin);
        let key = format!("{}cart_anonymous_id", session_keys::LOCAL_STORAGE_PREFIX);
        session.insert(&key, "abc").await.unwrap();

        bridge.on_auth_event(AuthEvent::SignedOut).await.unwrap();
        let kept: Option<String> = session.get(&key).await.unwrap();
        assert_eq!(kept.as_deref(), Some("abc"));
    }
}
