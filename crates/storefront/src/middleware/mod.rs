//! HTTP middleware stack for the storefront.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layers (hub per request, HTTP context)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (add unique ID to each request)
//! 4. Session layer (tower-sessions, `SQLite` store)
//! 5. Rate limiting on `/auth` (governor)

pub mod auth;
pub mod rate_limit;
pub mod request_id;
pub mod session;

pub use auth::{OptionalAuth, RequireAdmin, RequireAuth};
pub use rate_limit::auth_rate_limiter;
pub use request_id::{RequestId, request_id_middleware};
pub use session::{create_session_layer, create_session_store, spawn_expired_session_sweep};
