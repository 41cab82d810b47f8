//! Product route handlers.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use marketstall_core::{Product, ProductCategory, ProductId};
use serde::Deserialize;
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::state::AppState;

/// Listing filters.
#[derive(Debug, Deserialize)]
pub struct ProductQuery {
    pub category: Option<ProductCategory>,
}

/// List published products, newest first.
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<ProductQuery>,
) -> Result<Json<Vec<Product>>> {
    let products = state.catalog().list(query.category).await?;
    Ok(Json(Vec::clone(&products)))
}

/// Show one published product.
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<Json<Product>> {
    let product = state
        .catalog()
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("product {id}")))?;
    Ok(Json(Product::clone(&product)))
}
