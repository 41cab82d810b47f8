//! Account route handlers: order history and saved addresses.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use marketstall_core::{AddressId, Order, ShippingAddress};
use tracing::instrument;

use crate::backend::SavedAddress;
use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::state::AppState;

/// The signed-in user's orders, newest first.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn orders(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Vec<Order>>> {
    Ok(Json(state.orders().list_for_user(user.id).await?))
}

/// Saved addresses, newest first.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn addresses(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Vec<SavedAddress>>> {
    Ok(Json(state.backend().list_addresses(user.id).await?))
}

/// Save a new address.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn create_address(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(address): Json<ShippingAddress>,
) -> Result<(StatusCode, Json<SavedAddress>)> {
    address
        .validate()
        .map_err(|field| AppError::BadRequest(format!("Address is missing {field}")))?;

    let saved = state.backend().insert_address(user.id, &address).await?;
    Ok((StatusCode::CREATED, Json(saved)))
}

/// Delete one of the user's addresses.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn delete_address(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<AddressId>,
) -> Result<StatusCode> {
    state.backend().delete_address(user.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
