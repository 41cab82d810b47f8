//! Admin dashboard handlers.
//!
//! Orders are read and edited through the same gateway checkout writes to.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use marketstall_core::{Order, OrderId, OrderStatus};
use serde::Deserialize;
use tracing::instrument;

use crate::error::Result;
use crate::middleware::RequireAdmin;
use crate::state::AppState;

/// Status change request body.
#[derive(Debug, Deserialize)]
pub struct StatusChange {
    pub status: OrderStatus,
    #[serde(default)]
    pub cancellation_reason: Option<String>,
}

/// Every order, newest first.
#[instrument(skip_all, fields(admin_id = %admin.id))]
pub async fn orders(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
) -> Result<Json<Vec<Order>>> {
    Ok(Json(state.orders().list_all().await?))
}

/// One order.
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn order(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<OrderId>,
) -> Result<Json<Order>> {
    Ok(Json(state.orders().get(id).await?))
}

/// Overwrite an order's status.
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn update_status(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<OrderId>,
    Json(change): Json<StatusChange>,
) -> Result<Json<Order>> {
    let order = state
        .orders()
        .update_status(id, change.status, change.cancellation_reason)
        .await?;
    Ok(Json(order))
}

/// Drop cached catalog reads after products are edited in the backend.
#[instrument(skip_all, fields(admin_id = %admin.id))]
pub async fn invalidate_catalog(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
) -> StatusCode {
    state.catalog().invalidate();
    tracing::info!("Catalog cache invalidated");
    StatusCode::NO_CONTENT
}
