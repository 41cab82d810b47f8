//! Session-related types.
//!
//! Types stored in the session for authentication and checkout state.

use marketstall_core::cart::CartItem;
use marketstall_core::{OrderId, PaymentMethod, ShippingAddress};
use serde::{Deserialize, Serialize};

use crate::backend::AuthSession;

/// Backend tokens for the signed-in user.
///
/// Kept server-side only; used to sign out and refresh with the backend.
#[derive(Clone, Serialize, Deserialize)]
pub struct AuthTokens {
    pub access_token: String,
    pub refresh_token: String,
}

impl std::fmt::Debug for AuthTokens {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthTokens")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .finish()
    }
}

impl From<&AuthSession> for AuthTokens {
    fn from(session: &AuthSession) -> Self {
        Self {
            access_token: session.access_token.clone(),
            refresh_token: session.refresh_token.clone(),
        }
    }
}

/// Checkout details captured before handing off to the payment gateway.
///
/// `items` is the cart as it was charged; the order is built from it, not
/// from whatever the cart holds when the buyer returns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingCheckout {
    pub shipping_address: ShippingAddress,
    pub payment_method: PaymentMethod,
    pub items: Vec<CartItem>,
    /// Gateway session created for this checkout, once known.
    #[serde(default)]
    pub gateway_session_id: Option<String>,
}

/// The gateway session that already produced an order, so a reloaded
/// success page returns that order instead of creating another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletedCheckout {
    pub gateway_session_id: String,
    pub order_id: OrderId,
}

/// Session keys.
pub mod keys {
    /// Key for storing the current signed-in user.
    pub const CURRENT_USER: &str = "current_user";

    /// Key for backend access and refresh tokens.
    pub const AUTH_TOKENS: &str = "auth_tokens";

    /// Key for checkout details awaiting gateway confirmation.
    pub const PENDING_CHECKOUT: &str = "pending_checkout";

    /// Key for the last gateway session that produced an order.
    pub const COMPLETED_CHECKOUT: &str = "completed_checkout";

    /// Prefix for browser-scoped local storage entries (cart payloads and the
    /// anonymous cart id).
    pub const LOCAL_STORAGE_PREFIX: &str = "local_storage:";
}
