//! Catalog reads from the `products` table.

use marketstall_core::{Product, ProductCategory, ProductId};

use super::{BackendClient, BackendError};
use crate::services::catalog::ProductBackend;

const TABLE: &str = "products";

impl ProductBackend for BackendClient {
    async fn fetch_products(
        &self,
        category: Option<ProductCategory>,
    ) -> Result<Vec<Product>, BackendError> {
        let mut filters = vec![("status", "published".to_string())];
        if let Some(category) = category {
            filters.push(("category", category.as_str().to_string()));
        }

        self.select(TABLE, &filters, Some("created_at.desc")).await
    }

    async fn fetch_product(&self, id: ProductId) -> Result<Option<Product>, BackendError> {
        let rows: Vec<Product> = self.select(TABLE, &[("id", id.to_string())], None).await?;
        Ok(rows.into_iter().next())
    }
}
