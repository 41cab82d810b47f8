//! Authentication route handlers.
//!
//! Thin wrappers over [`SessionBridge`]; backend auth errors are returned
//! unchanged.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use marketstall_core::CurrentUser;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::services::auth::SessionBridge;
use crate::state::AppState;

/// Login request body.
#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRequest")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Registration request body.
#[derive(Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub name: String,
}

impl std::fmt::Debug for RegisterRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisterRequest")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .field("name", &self.name)
            .finish()
    }
}

fn bridge<'a>(state: &'a AppState, session: &'a Session) -> SessionBridge<'a> {
    SessionBridge::new(state.backend(), session, &state.config().admin_email)
}

/// Sign in with email and password.
#[instrument(skip(state, session, request), fields(email = %request.email))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Json(request): Json<LoginRequest>,
) -> Result<Json<CurrentUser>> {
    let user = bridge(&state, &session)
        .login(&request.email, &request.password)
        .await?;
    Ok(Json(user))
}

/// Create an account.
///
/// Responds 201 with the user when signed in straight away, or 202 when the
/// backend wants the email confirmed first.
#[instrument(skip(state, session, request), fields(email = %request.email))]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    Json(request): Json<RegisterRequest>,
) -> Result<Response> {
    let user = bridge(&state, &session)
        .register(&request.email, &request.password, &request.name)
        .await?;

    Ok(match user {
        Some(user) => (StatusCode::CREATED, Json(user)).into_response(),
        None => (
            StatusCode::ACCEPTED,
            Json(serde_json::json!({ "status": "confirmation_required" })),
        )
            .into_response(),
    })
}

/// Sign out.
#[instrument(skip_all)]
pub async fn logout(State(state): State<AppState>, session: Session) -> Result<StatusCode> {
    bridge(&state, &session).logout().await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Refresh the backend session.
#[instrument(skip_all)]
pub async fn refresh(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<CurrentUser>> {
    Ok(Json(bridge(&state, &session).refresh().await?))
}

/// The signed-in user.
#[instrument(skip_all)]
pub async fn me(RequireAuth(user): RequireAuth) -> Json<CurrentUser> {
    Json(user)
}
