//! Order gateway: the single path for creating and editing orders.
//!
//! Checkout and the admin dashboard both go through [`OrderGateway`], so an
//! order created at checkout is exactly what the dashboard lists and edits.

use std::future::Future;

use marketstall_core::{NewOrder, Order, OrderId, OrderStatus, UserId};
use serde::Serialize;

use crate::backend::BackendError;
use crate::services::email::AdminNotifier;

/// Status overwrite sent to the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusUpdate {
    pub status: OrderStatus,
    /// Only kept for canceled orders; any other status clears it.
    pub cancellation_reason: Option<String>,
}

impl StatusUpdate {
    #[must_use]
    pub fn new(status: OrderStatus, cancellation_reason: Option<String>) -> Self {
        let cancellation_reason = match status {
            OrderStatus::Canceled => cancellation_reason
                .map(|reason| reason.trim().to_string())
                .filter(|reason| !reason.is_empty()),
            _ => None,
        };

        Self {
            status,
            cancellation_reason,
        }
    }
}

/// Storage for order rows.
pub trait OrderBackend: Send + Sync {
    /// Insert an order and return the stored row.
    fn insert_order(
        &self,
        order: &NewOrder,
    ) -> impl Future<Output = Result<Order, BackendError>> + Send;

    /// Orders newest first, optionally only one user's.
    fn list_orders(
        &self,
        user: Option<UserId>,
    ) -> impl Future<Output = Result<Vec<Order>, BackendError>> + Send;

    fn fetch_order(
        &self,
        id: OrderId,
    ) -> impl Future<Output = Result<Option<Order>, BackendError>> + Send;

    /// Overwrite status fields; `None` when no row matched.
    fn update_order_status(
        &self,
        id: OrderId,
        update: &StatusUpdate,
    ) -> impl Future<Output = Result<Option<Order>, BackendError>> + Send;
}

/// Creates, lists and updates orders, notifying the admin of new ones.
pub struct OrderGateway<B, N> {
    backend: B,
    notifier: N,
}

impl<B: OrderBackend, N: AdminNotifier> OrderGateway<B, N> {
    #[must_use]
    pub const fn new(backend: B, notifier: N) -> Self {
        Self { backend, notifier }
    }

    /// Insert an order, then notify the administrator.
    ///
    /// A failed notification is logged and reported but does not fail the
    /// call; the order already exists.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` if the insert fails.
    #[tracing::instrument(skip_all, fields(user_id = %order.user_id, total = %order.total_price))]
    pub async fn create(&self, order: NewOrder) -> Result<Order, BackendError> {
        let created = self.backend.insert_order(&order).await?;
        tracing::info!(order_id = %created.id, "Order created");

        if let Err(e) = self.notifier.notify_new_order(&created).await {
            let event_id = sentry::capture_error(&e);
            tracing::error!(
                order_id = %created.id,
                error = %e,
                sentry_event_id = %event_id,
                "Failed to notify admin of new order"
            );
        }

        Ok(created)
    }

    /// Every order, newest first.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` if the backend cannot be read.
    pub async fn list_all(&self) -> Result<Vec<Order>, BackendError> {
        self.backend.list_orders(None).await
    }

    /// One customer's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` if the backend cannot be read.
    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Order>, BackendError> {
        self.backend.list_orders(Some(user_id)).await
    }

    /// # Errors
    ///
    /// Returns `BackendError::NotFound` if no order has this id.
    pub async fn get(&self, id: OrderId) -> Result<Order, BackendError> {
        self.backend
            .fetch_order(id)
            .await?
            .ok_or_else(|| BackendError::NotFound(format!("order {id}")))
    }

    /// Overwrite an order's status. Any status may follow any other.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::NotFound` if no order has this id.
    #[tracing::instrument(skip(self))]
    pub async fn update_status(
        &self,
        id: OrderId,
        status: OrderStatus,
        cancellation_reason: Option<String>,
    ) -> Result<Order, BackendError> {
        let update = StatusUpdate::new(status, cancellation_reason);
        let order = self
            .backend
            .update_order_status(id, &update)
            .await?
            .ok_or_else(|| BackendError::NotFound(format!("order {id}")))?;

        tracing::info!(order_id = %id, status = %order.status, "Order status updated");
        Ok(order)
    }
}
