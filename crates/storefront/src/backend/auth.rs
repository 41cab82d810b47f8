//! Auth API: password sign-in, sign-up, sign-out and session refresh.

use marketstall_core::UserId;
use reqwest::header::AUTHORIZATION;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{BackendClient, BackendError, check, parse_json};

/// A backend auth session.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default)]
    pub expires_in: Option<i64>,
    pub user: AuthUser,
}

/// The backend's view of an account.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthUser {
    pub id: UserId,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub user_metadata: UserMetadata,
    #[serde(default)]
    pub app_metadata: AppMetadata,
}

/// Profile fields the user supplied at sign-up.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
}

impl UserMetadata {
    /// The first non-blank of `name` and `full_name`.
    #[must_use]
    pub fn display_name(&self) -> Option<&str> {
        [self.name.as_deref(), self.full_name.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|name| !name.is_empty())
    }
}

/// Claims managed by the backend, not the user.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppMetadata {
    #[serde(default)]
    pub role: Option<String>,
}

/// Result of a sign-up request.
#[derive(Debug)]
pub enum SignUpOutcome {
    /// Account created and signed in.
    SignedIn(AuthSession),
    /// Account created; the backend wants the email confirmed first.
    ConfirmationRequired,
}

#[derive(Serialize)]
struct PasswordCredentials<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct SignUpRequest<'a> {
    email: &'a str,
    password: &'a str,
    data: UserMetadata,
}

#[derive(Serialize)]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

impl BackendClient {
    /// Sign in with email and password.
    ///
    /// # Errors
    ///
    /// Returns the backend's error unchanged (e.g. invalid credentials).
    #[tracing::instrument(skip(self, password))]
    pub async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, BackendError> {
        let url = self.endpoint("auth/v1/token", &[("grant_type", "password".to_string())])?;
        let response = self
            .client
            .post(url)
            .json(&PasswordCredentials { email, password })
            .send()
            .await?;

        parse_json(check(response).await?).await
    }

    /// Create an account.
    ///
    /// # Errors
    ///
    /// Returns the backend's error unchanged (e.g. already registered).
    #[tracing::instrument(skip(self, password))]
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<SignUpOutcome, BackendError> {
        let url = self.endpoint("auth/v1/signup", &[])?;
        let response = self
            .client
            .post(url)
            .json(&SignUpRequest {
                email,
                password,
                data: UserMetadata {
                    name: Some(name.to_string()),
                    full_name: None,
                },
            })
            .send()
            .await?;

        let body: Value = parse_json(check(response).await?).await?;
        if body.get("access_token").is_none() {
            return Ok(SignUpOutcome::ConfirmationRequired);
        }

        serde_json::from_value(body)
            .map(SignUpOutcome::SignedIn)
            .map_err(|e| BackendError::Parse(e.to_string()))
    }

    /// Revoke the session behind `access_token`.
    ///
    /// # Errors
    ///
    /// Returns the backend's error unchanged.
    #[tracing::instrument(skip_all)]
    pub async fn sign_out(&self, access_token: &str) -> Result<(), BackendError> {
        let url = self.endpoint("auth/v1/logout", &[])?;
        let response = self
            .client
            .post(url)
            .header(AUTHORIZATION, format!("Bearer {access_token}"))
            .send()
            .await?;

        check(response).await.map(drop)
    }

    /// Fetch the account behind `access_token`.
    ///
    /// # Errors
    ///
    /// Returns the backend's error unchanged (401 for expired tokens).
    #[tracing::instrument(skip_all)]
    pub async fn get_user(&self, access_token: &str) -> Result<AuthUser, BackendError> {
        let url = self.endpoint("auth/v1/user", &[])?;
        let response = self
            .client
            .get(url)
            .header(AUTHORIZATION, format!("Bearer {access_token}"))
            .send()
            .await?;

        parse_json(check(response).await?).await
    }

    /// Exchange a refresh token for a new session.
    ///
    /// # Errors
    ///
    /// Returns the backend's error unchanged.
    #[tracing::instrument(skip_all)]
    pub async fn refresh_session(&self, refresh_token: &str) -> Result<AuthSession, BackendError> {
        let url = self.endpoint(
            "auth/v1/token",
            &[("grant_type", "refresh_token".to_string())],
        )?;
        let response = self
            .client
            .post(url)
            .json(&RefreshRequest { refresh_token })
            .send()
            .await?;

        parse_json(check(response).await?).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_session_deserializes_with_claims() {
        let body = serde_json::json!({
            "access_token": "at",
            "refresh_token": "rt",
            "expires_in": 3600,
            "token_type": "bearer",
            "user": {
                "id": "7f1c2a4e-9a53-4b6e-8d7a-0e6f1c9b2d11",
                "email": "owner@marketstall.shop",
                "user_metadata": {"full_name": "Shop Owner"},
                "app_metadata": {"provider": "email", "role": "admin"}
            }
        });

        let session: AuthSession = serde_json::from_value(body).unwrap();
        assert_eq!(session.user.user_metadata.display_name(), Some("Shop Owner"));
        assert_eq!(session.user.app_metadata.role.as_deref(), Some("admin"));
    }

    #[test]
    fn test_user_without_metadata() {
        let body = serde_json::json!({
            "id": "7f1c2a4e-9a53-4b6e-8d7a-0e6f1c9b2d11",
            "email": "buyer@example.com"
        });

        let user: AuthUser = serde_json::from_value(body).unwrap();
        assert!(user.user_metadata.display_name().is_none());
        assert!(user.app_metadata.role.is_none());
    }
}
