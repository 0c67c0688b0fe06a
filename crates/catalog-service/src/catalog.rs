//! CatalogService: cached search, CRUD with wholesale invalidation, pagination.

use crate::query::{cache_key, matches, validate};
use catalog_cache::{CacheStats, LruCache};
use catalog_types::{
    CatalogError, Clock, MetricsSink, MetricsSnapshot, PageRequest, Product, ProductId,
    ProductRepository, SearchFilter, SystemClock,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Search cache: filter key -> ids of the matching products, in result order.
pub type SearchCache = LruCache<String, Arc<Vec<ProductId>>>;

/// Ordered slice `[page*size, min(page*size+size, len))`; empty past the end.
pub fn paginate<T: Clone>(items: &[T], page: PageRequest) -> Vec<T> {
    let Some(start) = page.offset() else {
        return Vec::new();
    };
    if start >= items.len() {
        return Vec::new();
    }
    let end = start.saturating_add(page.size()).min(items.len());
    items[start..end].to_vec()
}

/// Catalog over a repository. Only result membership is cached; entities are always
/// read from the repository, so a hit reflects current prices and flags.
pub struct CatalogService<R> {
    repo: R,
    cache: SearchCache,
    metrics: Arc<dyn MetricsSink>,
    clock: Arc<dyn Clock>,
    /// Bumped on every invalidation; lets a search detect that it raced a mutation.
    generation: AtomicU64,
}

impl<R> CatalogService<R>
where
    R: ProductRepository,
{
    pub fn new(repo: R, metrics: Arc<dyn MetricsSink>, cache: SearchCache) -> Self {
        Self {
            repo,
            cache,
            metrics,
            clock: Arc::new(SystemClock),
            generation: AtomicU64::new(0),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    pub async fn get(&self, id: ProductId) -> Result<Option<Product>, CatalogError> {
        Ok(self.repo.find_by_id(id).await?)
    }

    pub async fn list_all(&self) -> Result<Vec<Product>, CatalogError> {
        Ok(self.repo.find_all().await?)
    }

    pub async fn create(&self, product: Product) -> Result<Product, CatalogError> {
        let saved = self.repo.save(product).await?;
        self.after_mutation().await?;
        tracing::debug!(id = ?saved.id, "product created");
        Ok(saved)
    }

    /// Overwrite an existing product. A missing or unknown id is `NotFound`.
    pub async fn update(&self, product: Product) -> Result<Product, CatalogError> {
        let id = product.id.ok_or(CatalogError::NotFound { id: None })?;
        let saved = self
            .repo
            .replace(product)
            .await?
            .ok_or(CatalogError::NotFound { id: Some(id) })?;
        self.after_mutation().await?;
        tracing::debug!(id, "product updated");
        Ok(saved)
    }

    /// Returns whether a product was removed. The cache is flushed either way.
    pub async fn delete(&self, id: ProductId) -> Result<bool, CatalogError> {
        let removed = self.repo.delete_by_id(id).await;
        self.after_mutation().await?;
        let removed = removed?;
        tracing::debug!(id, removed, "product delete");
        Ok(removed)
    }

    /// Filtered search. Served from cached membership when the same filter was seen since
    /// the last mutation; otherwise a full scan of the repository.
    pub async fn search(&self, filter: &SearchFilter) -> Result<Vec<Product>, CatalogError> {
        validate(filter)?;
        let key = cache_key(filter);
        let start = self.clock.now();

        let result = match self.cache.get(&key) {
            Some(ids) => {
                tracing::debug!(key = %key, "search cache hit");
                self.resolve_ids(&ids).await
            }
            None => {
                tracing::debug!(key = %key, "search cache miss");
                self.scan(filter, key).await
            }
        };

        let elapsed = self.clock.now().saturating_duration_since(start);
        self.metrics
            .set_last_query_latency(u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX));
        self.metrics
            .set_cache_stats(self.cache.hits(), self.cache.misses());
        result
    }

    /// Search, then cut one page out of the ordered result.
    pub async fn search_page(
        &self,
        filter: &SearchFilter,
        page: PageRequest,
    ) -> Result<Vec<Product>, CatalogError> {
        let all = self.search(filter).await?;
        Ok(paginate(&all, page))
    }

    pub async fn persist(&self) -> Result<(), CatalogError> {
        Ok(self.repo.flush().await?)
    }

    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Re-read the entity count from a full scan.
    pub async fn refresh_entity_count(&self) -> Result<u64, CatalogError> {
        let count = self.repo.find_all().await?.len() as u64;
        self.metrics.set_entity_count(count);
        Ok(count)
    }

    async fn scan(&self, filter: &SearchFilter, key: String) -> Result<Vec<Product>, CatalogError> {
        let generation = self.generation.load(Ordering::SeqCst);
        let matched: Vec<Product> = self
            .repo
            .find_all()
            .await?
            .into_iter()
            .filter(|p| matches(filter, p))
            .collect();
        let ids: Vec<ProductId> = matched.iter().filter_map(|p| p.id).collect();
        self.cache.put(key, Arc::new(ids));
        // A mutation that landed during the scan may have cleared the cache before our put;
        // drop everything rather than keep membership computed from the old snapshot.
        if self.generation.load(Ordering::SeqCst) != generation {
            self.cache.clear();
        }
        Ok(matched)
    }

    async fn resolve_ids(&self, ids: &[ProductId]) -> Result<Vec<Product>, CatalogError> {
        let mut live: HashMap<ProductId, Product> = self
            .repo
            .find_all()
            .await?
            .into_iter()
            .filter_map(|p| p.id.map(|id| (id, p)))
            .collect();
        Ok(ids.iter().filter_map(|id| live.remove(id)).collect())
    }

    async fn after_mutation(&self) -> Result<(), CatalogError> {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.cache.clear();
        tracing::debug!("search cache invalidated");
        self.refresh_entity_count().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AtomicMetrics, InMemoryProductRepository};
    use async_trait::async_trait;
    use catalog_types::{Category, ManualClock, RepositoryError};
    use std::sync::atomic::AtomicBool;
    use std::time::Duration;
    use tokio::sync::Notify;

    fn seed() -> Vec<Product> {
        vec![
            Product::new("iPhone 14", "Apple", Category::Electronics, 999.0)
                .with_description("Smartphone"),
            Product::new("MacBook Air", "Apple", Category::Electronics, 1299.0)
                .with_description("Laptop"),
            Product::new("Running Shoes", "Nike", Category::Sports, 120.0).with_description("Shoes"),
            Product::new("Coffee", "Lavazza", Category::Food, 8.5).with_description("Beans"),
        ]
    }

    async fn service() -> (CatalogService<InMemoryProductRepository>, Arc<AtomicMetrics>) {
        let metrics = Arc::new(AtomicMetrics::new());
        let svc = CatalogService::new(
            InMemoryProductRepository::new(),
            metrics.clone(),
            SearchCache::new(100).unwrap(),
        );
        for p in seed() {
            svc.create(p).await.unwrap();
        }
        (svc, metrics)
    }

    #[tokio::test]
    async fn brand_search_is_case_insensitive() {
        let (svc, _) = service().await;
        let res = svc
            .search(&SearchFilter::new().brand("apple").only_active(true))
            .await
            .unwrap();
        assert_eq!(res.len(), 2);
    }

    #[tokio::test]
    async fn price_range_is_inclusive() {
        let (svc, _) = service().await;
        let res = svc
            .search(&SearchFilter::new().min_price(100.0).max_price(1000.0).only_active(true))
            .await
            .unwrap();
        let names: Vec<_> = res.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["iPhone 14", "Running Shoes"]);
        let exact = svc
            .search(&SearchFilter::new().min_price(120.0).max_price(120.0))
            .await
            .unwrap();
        assert_eq!(exact.len(), 1);
    }

    #[tokio::test]
    async fn repeated_search_is_a_cache_hit() {
        let (svc, metrics) = service().await;
        svc.search(&SearchFilter::new()).await.unwrap();
        svc.search(&SearchFilter::new()).await.unwrap();
        let stats = svc.cache_stats();
        assert_eq!((stats.hits, stats.misses), (1, 1));
        let snap = metrics.snapshot();
        assert_eq!((snap.cache_hits, snap.cache_misses), (1, 1));
    }

    #[tokio::test]
    async fn delete_invalidates_cached_membership() {
        let (svc, metrics) = service().await;
        let filter = SearchFilter::new().brand("apple");
        let first = svc.search(&filter).await.unwrap();
        assert_eq!(first.len(), 2);

        assert!(svc.delete(first[0].id.unwrap()).await.unwrap());
        let second = svc.search(&filter).await.unwrap();
        assert_eq!(second.len(), 1);
        assert_eq!(svc.cache_stats().misses, 2);
        assert_eq!(metrics.snapshot().entity_count, 3);
    }

    #[tokio::test]
    async fn cache_hit_reflects_current_entity_state() {
        let (svc, _) = service().await;
        let filter = SearchFilter::new().text("coffee");
        let before = svc.search(&filter).await.unwrap();
        assert_eq!(before[0].price, 8.5);

        // Bypass the service so the cache keeps its membership.
        let mut changed = before[0].clone();
        changed.price = 9.25;
        svc.repository().save(changed).await.unwrap();

        let after = svc.search(&filter).await.unwrap();
        assert_eq!(svc.cache_stats().hits, 1);
        assert_eq!(after[0].price, 9.25);
    }

    #[tokio::test]
    async fn vanished_ids_are_dropped_on_hit() {
        let (svc, _) = service().await;
        let filter = SearchFilter::new().category(Category::Electronics);
        let before = svc.search(&filter).await.unwrap();
        svc.repository()
            .delete_by_id(before[1].id.unwrap())
            .await
            .unwrap();
        let after = svc.search(&filter).await.unwrap();
        assert_eq!(after.len(), 1);
        assert_eq!(after[0].id, before[0].id);
    }

    #[tokio::test]
    async fn update_requires_an_existing_product() {
        let (svc, _) = service().await;
        let unsaved = Product::new("Ghost", "None", Category::Other, 1.0);
        assert_eq!(
            svc.update(unsaved.clone()).await.unwrap_err(),
            CatalogError::NotFound { id: None }
        );
        assert_eq!(
            svc.update(unsaved.with_id(99)).await.unwrap_err(),
            CatalogError::NotFound { id: Some(99) }
        );

        let mut shoes = svc.get(3).await.unwrap().unwrap();
        shoes.active = false;
        svc.update(shoes).await.unwrap();
        let active = svc
            .search(&SearchFilter::new().brand("nike").only_active(true))
            .await
            .unwrap();
        assert!(active.is_empty());
    }

    #[tokio::test]
    async fn invalid_filters_do_not_touch_the_cache() {
        let (svc, _) = service().await;
        let err = svc
            .search(&SearchFilter::new().min_price(50.0).max_price(10.0))
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::Validation(_)));
        let stats = svc.cache_stats();
        assert_eq!((stats.hits, stats.misses), (0, 0));
    }

    #[tokio::test]
    async fn pages_are_disjoint_and_end_empty() {
        let (svc, _) = service().await;
        let all = svc.list_all().await.unwrap();
        let page0 = paginate(&all, PageRequest::new(0, 2).unwrap());
        let page1 = paginate(&all, PageRequest::new(1, 2).unwrap());
        let page2 = paginate(&all, PageRequest::new(2, 2).unwrap());
        assert_eq!(page0.len(), 2);
        assert_eq!(page1.len(), 2);
        assert!(page2.is_empty());
        assert!(page0.iter().all(|a| page1.iter().all(|b| a.id != b.id)));

        let tail = svc
            .search_page(&SearchFilter::new(), PageRequest::new(1, 3).unwrap())
            .await
            .unwrap();
        assert_eq!(tail.len(), 1);
    }

    #[test]
    fn huge_pages_do_not_overflow() {
        let items = vec![1, 2, 3];
        let page = PageRequest::new(i64::MAX, i64::MAX).unwrap();
        assert!(paginate(&items, page).is_empty());
    }

    /// Repository whose full scan takes a fixed amount of (manual) time.
    struct SlowRepository {
        inner: InMemoryProductRepository,
        clock: Arc<ManualClock>,
        delay: Duration,
    }

    #[async_trait]
    impl ProductRepository for SlowRepository {
        async fn find_all(&self) -> Result<Vec<Product>, RepositoryError> {
            self.clock.advance(self.delay);
            self.inner.find_all().await
        }

        async fn find_by_id(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
            self.inner.find_by_id(id).await
        }

        async fn save(&self, product: Product) -> Result<Product, RepositoryError> {
            self.inner.save(product).await
        }

        async fn delete_by_id(&self, id: ProductId) -> Result<bool, RepositoryError> {
            self.inner.delete_by_id(id).await
        }
    }

    #[tokio::test]
    async fn latency_is_measured_with_the_injected_clock() {
        let clock = Arc::new(ManualClock::new());
        let metrics = Arc::new(AtomicMetrics::new());
        let svc = CatalogService::new(
            SlowRepository {
                inner: InMemoryProductRepository::with_products(seed()),
                clock: clock.clone(),
                delay: Duration::from_millis(25),
            },
            metrics.clone(),
            SearchCache::new(8).unwrap(),
        )
        .with_clock(clock.clone());

        svc.search(&SearchFilter::new().brand("nike")).await.unwrap();
        assert_eq!(metrics.snapshot().last_query_latency_ms, 25);
        // The hit path resolves ids with one more scan.
        svc.search(&SearchFilter::new().brand("nike")).await.unwrap();
        assert_eq!(metrics.snapshot().last_query_latency_ms, 25);
    }

    /// Repository whose first full scan parks after taking its snapshot until released.
    struct GatedRepository {
        inner: InMemoryProductRepository,
        armed: AtomicBool,
        parked: Notify,
        release: Notify,
    }

    #[async_trait]
    impl ProductRepository for GatedRepository {
        async fn find_all(&self) -> Result<Vec<Product>, RepositoryError> {
            let snapshot = self.inner.find_all().await?;
            if self.armed.swap(false, Ordering::SeqCst) {
                self.parked.notify_one();
                self.release.notified().await;
            }
            Ok(snapshot)
        }

        async fn find_by_id(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
            self.inner.find_by_id(id).await
        }

        async fn save(&self, product: Product) -> Result<Product, RepositoryError> {
            self.inner.save(product).await
        }

        async fn delete_by_id(&self, id: ProductId) -> Result<bool, RepositoryError> {
            self.inner.delete_by_id(id).await
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn scan_racing_a_mutation_is_not_cached_stale() {
        let svc = Arc::new(CatalogService::new(
            GatedRepository {
                inner: InMemoryProductRepository::with_products(seed()),
                armed: AtomicBool::new(true),
                parked: Notify::new(),
                release: Notify::new(),
            },
            Arc::new(AtomicMetrics::new()),
            SearchCache::new(8).unwrap(),
        ));
        let filter = SearchFilter::new().brand("apple");

        let in_flight = tokio::spawn({
            let svc = svc.clone();
            let filter = filter.clone();
            async move { svc.search(&filter).await }
        });
        svc.repository().parked.notified().await;
        svc.create(Product::new("iPad", "Apple", Category::Electronics, 599.0))
            .await
            .unwrap();
        svc.repository().release.notify_one();

        // The racing search may answer from its own snapshot.
        let first = in_flight.await.unwrap().unwrap();
        assert_eq!(first.len(), 2);

        let after = svc.search(&filter).await.unwrap();
        assert_eq!(after.len(), 3);
        let stats = svc.cache_stats();
        assert_eq!((stats.hits, stats.misses), (0, 2));
    }

    struct BrokenRepository;

    #[async_trait]
    impl ProductRepository for BrokenRepository {
        async fn find_all(&self) -> Result<Vec<Product>, RepositoryError> {
            Err(RepositoryError::Other("connection reset".to_string()))
        }

        async fn find_by_id(&self, _id: ProductId) -> Result<Option<Product>, RepositoryError> {
            Err(RepositoryError::Other("connection reset".to_string()))
        }

        async fn save(&self, _product: Product) -> Result<Product, RepositoryError> {
            Err(RepositoryError::Other("connection reset".to_string()))
        }

        async fn delete_by_id(&self, _id: ProductId) -> Result<bool, RepositoryError> {
            Err(RepositoryError::Other("connection reset".to_string()))
        }
    }

    #[tokio::test]
    async fn repository_failures_surface_and_still_record_metrics() {
        let metrics = Arc::new(AtomicMetrics::new());
        let svc = CatalogService::new(BrokenRepository, metrics.clone(), SearchCache::new(4).unwrap());
        let err = svc.search(&SearchFilter::new()).await.unwrap_err();
        assert_eq!(
            err,
            CatalogError::Repository(RepositoryError::Other("connection reset".to_string()))
        );
        assert_eq!(metrics.snapshot().cache_misses, 1);
        assert_eq!(svc.cache_stats().len, 0);
    }
}
