//! Checkout route handlers.

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use marketstall_core::{Order, PaymentMethod, ShippingAddress};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::models::{CompletedCheckout, PendingCheckout, session_keys};
use crate::services::cart::open_cart;
use crate::services::checkout::{CheckoutError, place_order};
use crate::state::AppState;

/// Checkout request body.
#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    pub shipping_address: ShippingAddress,
    #[serde(default)]
    pub payment_method: PaymentMethod,
}

/// Gateway redirect query.
#[derive(Debug, Deserialize)]
pub struct SuccessQuery {
    pub session_id: String,
}

/// Start checkout.
///
/// Card payments are redirected (303) to the hosted payment page; cash on
/// delivery creates the order immediately.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn start(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    session: Session,
    Json(request): Json<CheckoutRequest>,
) -> Result<Response> {
    let mut cart = open_cart(session.clone(), Some(user.id)).await?;
    if cart.is_empty() {
        return Err(CheckoutError::EmptyCart.into());
    }
    request
        .shipping_address
        .validate()
        .map_err(CheckoutError::InvalidAddress)?;

    if !request.payment_method.requires_gateway() {
        let order = place_order(
            state.orders(),
            &mut cart,
            &user,
            request.shipping_address,
            request.payment_method,
        )
        .await?;
        return Ok((StatusCode::CREATED, Json(order)).into_response());
    }

    let hosted = state.checkout().begin(cart.items(), &user).await?;
    session
        .insert(
            session_keys::PENDING_CHECKOUT,
            PendingCheckout {
                shipping_address: request.shipping_address,
                payment_method: request.payment_method,
                items: cart.items().to_vec(),
                gateway_session_id: Some(hosted.session_id),
            },
        )
        .await?;

    Ok(Redirect::to(&hosted.url).into_response())
}

/// Return from the hosted payment page.
///
/// Confirms the gateway session paid for the cart snapshot taken in
/// [`start`], then creates the order from that snapshot. Reloading the page
/// returns the order already created.
#[instrument(skip(state, session, user), fields(user_id = %user.id))]
pub async fn success(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    session: Session,
    Query(query): Query<SuccessQuery>,
) -> Result<Json<Order>> {
    let completed: Option<CompletedCheckout> =
        session.get(session_keys::COMPLETED_CHECKOUT).await?;
    if let Some(completed) = completed
        && completed.gateway_session_id == query.session_id
    {
        return Ok(Json(state.orders().get(completed.order_id).await?));
    }

    let pending: PendingCheckout = session
        .get(session_keys::PENDING_CHECKOUT)
        .await?
        .ok_or_else(|| AppError::BadRequest("No checkout in progress".to_string()))?;
    let mut cart = open_cart(session.clone(), Some(user.id)).await?;
    let order = state
        .checkout()
        .complete(state.orders(), &mut cart, &user, pending, &query.session_id)
        .await?;

    session
        .remove_value(session_keys::PENDING_CHECKOUT)
        .await?;
    session
        .insert(
            session_keys::COMPLETED_CHECKOUT,
            CompletedCheckout {
                gateway_session_id: query.session_id,
                order_id: order.id,
            },
        )
        .await?;

    Ok(Json(order))
}
