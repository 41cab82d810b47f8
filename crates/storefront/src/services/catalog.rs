//! Read-only catalog view with a short-lived cache.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use marketstall_core::{Product, ProductCategory, ProductId, PublishStatus};
use moka::future::Cache;

use crate::backend::BackendError;

/// How long catalog reads are served from memory.
const CACHE_TTL: Duration = Duration::from_secs(60);

const MAX_CACHED_LISTS: u64 = 64;
const MAX_CACHED_PRODUCTS: u64 = 1_000;

/// Source of product rows.
pub trait ProductBackend: Send + Sync {
    /// Published products, newest first, optionally in one category.
    fn fetch_products(
        &self,
        category: Option<ProductCategory>,
    ) -> impl Future<Output = Result<Vec<Product>, BackendError>> + Send;

    /// A single product by id, regardless of publish status.
    fn fetch_product(
        &self,
        id: ProductId,
    ) -> impl Future<Output = Result<Option<Product>, BackendError>> + Send;
}

/// Cached catalog accessor.
pub struct Catalog<B> {
    backend: B,
    lists: Cache<Option<ProductCategory>, Arc<Vec<Product>>>,
    products: Cache<ProductId, Arc<Product>>,
}

impl<B: ProductBackend> Catalog<B> {
    #[must_use]
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            lists: Cache::builder()
                .max_capacity(MAX_CACHED_LISTS)
                .time_to_live(CACHE_TTL)
                .build(),
            products: Cache::builder()
                .max_capacity(MAX_CACHED_PRODUCTS)
                .time_to_live(CACHE_TTL)
                .build(),
        }
    }

    /// List published products, newest first.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` if the backend cannot be read.
    #[tracing::instrument(skip(self))]
    pub async fn list(
        &self,
        category: Option<ProductCategory>,
    ) -> Result<Arc<Vec<Product>>, BackendError> {
        if let Some(products) = self.lists.get(&category).await {
            return Ok(products);
        }

        let products = Arc::new(self.backend.fetch_products(category).await?);
        tracing::debug!(count = products.len(), "catalog list fetched");
        self.lists.insert(category, Arc::clone(&products)).await;
        Ok(products)
    }

    /// Get one published product.
    ///
    /// Drafts and archived products are reported as absent.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` if the backend cannot be read.
    #[tracing::instrument(skip(self))]
    pub async fn get(&self, id: ProductId) -> Result<Option<Arc<Product>>, BackendError> {
        if let Some(product) = self.products.get(&id).await {
            return Ok(Some(product));
        }

        let Some(product) = self.backend.fetch_product(id).await? else {
            return Ok(None);
        };
        if product.status != PublishStatus::Published {
            return Ok(None);
        }

        let product = Arc::new(product);
        self.products.insert(id, Arc::clone(&product)).await;
        Ok(Some(product))
    }

    /// Drop every cached entry.
    pub fn invalidate(&self) {
        self.lists.invalidate_all();
        self.products.invalidate_all();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use marketstall_core::{Price, ProductCondition};

    use super::*;

    fn product(id: i64, category: ProductCategory, status: PublishStatus) -> Product {
        Product {
            id: ProductId::new(id),
            name: format!("Item {id}"),
            description: String::new(),
            images: Vec::new(),
            price: Price::from_cents(1000),
            sale_price: None,
            category,
            condition: ProductCondition::Good,
            stock: 1,
            status,
            created_at: None,
        }
    }

    #[derive(Default)]
    struct CountingBackend {
        calls: AtomicUsize,
    }

    impl ProductBackend for CountingBackend {
        async fn fetch_products(
            &self,
            category: Option<ProductCategory>,
        ) -> Result<Vec<Product>, BackendError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let all = [
                product(1, ProductCategory::Books, PublishStatus::Published),
                product(2, ProductCategory::Shoes, PublishStatus::Published),
            ];
            Ok(all
                .into_iter()
                .filter(|p| category.is_none_or(|c| p.category == c))
                .collect())
        }

        async fn fetch_product(&self, id: ProductId) -> Result<Option<Product>, BackendError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(match id.get() {
                1 => Some(product(1, ProductCategory::Books, PublishStatus::Published)),
                2 => Some(product(2, ProductCategory::Shoes, PublishStatus::Draft)),
                _ => None,
            })
        }
    }

    #[tokio::test]
    async fn test_list_is_cached_per_category() {
        let catalog = Catalog::new(CountingBackend::default());

        assert_eq!(catalog.list(None).await.unwrap().len(), 2);
        assert_eq!(catalog.list(None).await.unwrap().len(), 2);
        let shoes = catalog.list(Some(ProductCategory::Shoes)).await.unwrap();
        assert_eq!(shoes.len(), 1);
        assert_eq!(shoes[0].id, ProductId::new(2));

        assert_eq!(catalog.backend.calls.load(Ordering::SeqCst), 2);

        catalog.invalidate();
        catalog.list(None).await.unwrap();
        assert_eq!(catalog.backend.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_get_hides_unpublished() {
        let catalog = Catalog::new(CountingBackend::default());

        assert!(catalog.get(ProductId::new(1)).await.unwrap().is_some());
        assert!(catalog.get(ProductId::new(2)).await.unwrap().is_none());
        assert!(catalog.get(ProductId::new(3)).await.unwrap().is_none());

        catalog.get(ProductId::new(1)).await.unwrap();
        assert_eq!(catalog.backend.calls.load(Ordering::SeqCst), 3);
    }
}
