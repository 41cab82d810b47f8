//! Session middleware configuration.
//!
//! The session is the browser's durable storage: it carries the signed-in
//! user and every cart the browser has used, so it lives in `SQLite` and
//! expires only after a long stretch of inactivity.

use std::time::Duration;

use sqlx::sqlite::SqlitePoolOptions;
use tower_sessions::{ExpiredDeletion, Expiry, SessionManagerLayer};
use tower_sessions_sqlx_store::SqliteStore;

use crate::config::StorefrontConfig;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "marketstall_session";

/// Session expiry time in seconds (30 days).
const SESSION_EXPIRY_SECONDS: i64 = 30 * 24 * 60 * 60;

/// How often expired sessions are swept from the store.
const EXPIRED_SWEEP_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Open the session database and create its table if needed.
///
/// # Errors
///
/// Returns `sqlx::Error` if the database cannot be opened or migrated.
pub async fn create_session_store(database_url: &str) -> Result<SqliteStore, sqlx::Error> {
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url)
        .await?;

    let store = SqliteStore::new(pool);
    store.migrate().await?;
    Ok(store)
}

/// Delete expired sessions in the background for the life of the process.
pub fn spawn_expired_session_sweep(store: &SqliteStore) {
    let store = store.clone();
    tokio::task::spawn(async move {
        if let Err(e) = store
            .continuously_delete_expired(EXPIRED_SWEEP_INTERVAL)
            .await
        {
            tracing::error!(error = %e, "Expired session sweep stopped");
        }
    });
}

/// Create the session layer over the `SQLite` store.
#[must_use]
pub fn create_session_layer(
    store: SqliteStore,
    config: &StorefrontConfig,
) -> SessionManagerLayer<SqliteStore> {
    SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS),
        ))
        .with_secure(config.secure_cookies())
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
}
