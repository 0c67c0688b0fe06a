//! In-memory product repository.

use async_trait::async_trait;
use catalog_types::{Product, ProductId, ProductRepository, RepositoryError};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Products keyed by id; `find_all` returns them in id order.
pub struct InMemoryProductRepository {
    products: Arc<RwLock<BTreeMap<ProductId, Product>>>,
    /// Highest id handed out or seen so far.
    last_id: AtomicU64,
}

impl InMemoryProductRepository {
    pub fn new() -> Self {
        Self {
            products: Arc::new(RwLock::new(BTreeMap::new())),
            last_id: AtomicU64::new(0),
        }
    }

    /// Seed with products; those without an id get the next free one.
    pub fn with_products(products: impl IntoIterator<Item = Product>) -> Self {
        let mut map = BTreeMap::new();
        let mut pending = Vec::new();
        for p in products {
            match p.id {
                Some(id) => {
                    map.insert(id, p);
                }
                None => pending.push(p),
            }
        }
        let mut last_id = map.keys().next_back().copied().unwrap_or(0);
        for mut p in pending {
            last_id += 1;
            p.id = Some(last_id);
            map.insert(last_id, p);
        }
        Self {
            products: Arc::new(RwLock::new(map)),
            last_id: AtomicU64::new(last_id),
        }
    }

    fn next_id(&self) -> ProductId {
        self.last_id.fetch_add(1, Ordering::SeqCst) + 1
    }
}

impl Default for InMemoryProductRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProductRepository for InMemoryProductRepository {
    async fn find_all(&self) -> Result<Vec<Product>, RepositoryError> {
        Ok(self.products.read().await.values().cloned().collect())
    }

    async fn find_by_id(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        Ok(self.products.read().await.get(&id).cloned())
    }

    async fn save(&self, mut product: Product) -> Result<Product, RepositoryError> {
        let id = match product.id {
            Some(id) => {
                self.last_id.fetch_max(id, Ordering::SeqCst);
                id
            }
            None => self.next_id(),
        };
        product.id = Some(id);
        self.products.write().await.insert(id, product.clone());
        Ok(product)
    }

    async fn delete_by_id(&self, id: ProductId) -> Result<bool, RepositoryError> {
        Ok(self.products.write().await.remove(&id).is_some())
    }

    async fn replace(&self, product: Product) -> Result<Option<Product>, RepositoryError> {
        let Some(id) = product.id else {
            return Ok(None);
        };
        let mut products = self.products.write().await;
        match products.get_mut(&id) {
            Some(slot) => {
                *slot = product.clone();
                Ok(Some(product))
            }
            None => Ok(None),
        }
    }
}
