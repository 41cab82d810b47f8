//! Order rows in the `orders` table.

use marketstall_core::{NewOrder, Order, OrderId, UserId};

use super::{BackendClient, BackendError};
use crate::services::orders::{OrderBackend, StatusUpdate};

const TABLE: &str = "orders";
const NEWEST_FIRST: &str = "created_at.desc";

impl OrderBackend for BackendClient {
    async fn insert_order(&self, order: &NewOrder) -> Result<Order, BackendError> {
        self.insert(TABLE, order).await
    }

    async fn list_orders(&self, user: Option<UserId>) -> Result<Vec<Order>, BackendError> {
        let filters: Vec<_> = user
            .map(|user_id| ("user_id", user_id.to_string()))
            .into_iter()
            .collect();

        self.select(TABLE, &filters, Some(NEWEST_FIRST)).await
    }

    async fn fetch_order(&self, id: OrderId) -> Result<Option<Order>, BackendError> {
        let rows: Vec<Order> = self.select(TABLE, &[("id", id.to_string())], None).await?;
        Ok(rows.into_iter().next())
    }

    async fn update_order_status(
        &self,
        id: OrderId,
        update: &StatusUpdate,
    ) -> Result<Option<Order>, BackendError> {
        let rows: Vec<Order> = self.update(TABLE, &[("id", id.to_string())], update).await?;
        Ok(rows.into_iter().next())
    }
}
