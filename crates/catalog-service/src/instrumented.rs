//! Catalog operations routed through the interceptor.

use crate::catalog::CatalogService;
use catalog_cache::CacheStats;
use catalog_instrument::{Interceptor, OperationRegistry, OperationSpec};
use catalog_types::{
    ActorProvider, AuditAction, CatalogError, MetricsSnapshot, PageRequest, Product, ProductId,
    ProductRepository, SearchFilter,
};
use std::sync::Arc;

pub const CATALOG_COMPONENT: &str = "catalog";

/// Mutations are audited; reads are timed only.
pub fn catalog_operations() -> OperationRegistry {
    OperationRegistry::new()
        .with(CATALOG_COMPONENT, "create", OperationSpec::audited(AuditAction::Create))
        .with(CATALOG_COMPONENT, "update", OperationSpec::audited(AuditAction::Update))
        .with(CATALOG_COMPONENT, "delete", OperationSpec::audited(AuditAction::Delete))
        .with(CATALOG_COMPONENT, "get", OperationSpec::timed())
        .with(CATALOG_COMPONENT, "list_all", OperationSpec::timed())
        .with(CATALOG_COMPONENT, "search", OperationSpec::timed())
        .with(CATALOG_COMPONENT, "search_page", OperationSpec::timed())
        .with(CATALOG_COMPONENT, "persist", OperationSpec::timed())
}

/// Public face of the catalog. Every call names its actor explicitly.
pub struct InstrumentedCatalog<R> {
    inner: Arc<CatalogService<R>>,
    interceptor: Interceptor,
}

impl<R> InstrumentedCatalog<R>
where
    R: ProductRepository,
{
    pub fn new(inner: Arc<CatalogService<R>>, interceptor: Interceptor) -> Self {
        Self { inner, interceptor }
    }

    pub fn service(&self) -> &Arc<CatalogService<R>> {
        &self.inner
    }

    pub async fn create(
        &self,
        actor: &dyn ActorProvider,
        product: Product,
    ) -> Result<Product, CatalogError> {
        let arg = product.clone();
        self.interceptor
            .operation(CATALOG_COMPONENT, "create")?
            .run(actor, &[&arg], self.inner.create(product))
            .await
    }

    pub async fn update(
        &self,
        actor: &dyn ActorProvider,
        product: Product,
    ) -> Result<Product, CatalogError> {
        let arg = product.clone();
        self.interceptor
            .operation(CATALOG_COMPONENT, "update")?
            .run(actor, &[&arg], self.inner.update(product))
            .await
    }

    pub async fn delete(
        &self,
        actor: &dyn ActorProvider,
        id: ProductId,
    ) -> Result<bool, CatalogError> {
        self.interceptor
            .operation(CATALOG_COMPONENT, "delete")?
            .run(actor, &[&id], self.inner.delete(id))
            .await
    }

    pub async fn get(
        &self,
        actor: &dyn ActorProvider,
        id: ProductId,
    ) -> Result<Option<Product>, CatalogError> {
        self.interceptor
            .operation(CATALOG_COMPONENT, "get")?
            .run(actor, &[&id], self.inner.get(id))
            .await
    }

    pub async fn list_all(&self, actor: &dyn ActorProvider) -> Result<Vec<Product>, CatalogError> {
        self.interceptor
            .operation(CATALOG_COMPONENT, "list_all")?
            .run(actor, &[], self.inner.list_all())
            .await
    }

    pub async fn search(
        &self,
        actor: &dyn ActorProvider,
        filter: &SearchFilter,
    ) -> Result<Vec<Product>, CatalogError> {
        self.interceptor
            .operation(CATALOG_COMPONENT, "search")?
            .run(actor, &[filter], self.inner.search(filter))
            .await
    }

    pub async fn search_page(
        &self,
        actor: &dyn ActorProvider,
        filter: &SearchFilter,
        page: PageRequest,
    ) -> Result<Vec<Product>, CatalogError> {
        self.interceptor
            .operation(CATALOG_COMPONENT, "search_page")?
            .run(actor, &[filter, &page], self.inner.search_page(filter, page))
            .await
    }

    pub async fn persist(&self, actor: &dyn ActorProvider) -> Result<(), CatalogError> {
        self.interceptor
            .operation(CATALOG_COMPONENT, "persist")?
            .run(actor, &[], self.inner.persist())
            .await
    }

    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.inner.metrics_snapshot()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.inner.cache_stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AtomicMetrics, InMemoryProductRepository, SearchCache};
    use catalog_instrument::{AuditDispatcher, InMemoryAuditSink, RecordingTimingSink, StaticActor};
    use catalog_types::{ActorError, AuditQuery, Category, InterceptError};

    struct Fixture {
        catalog: InstrumentedCatalog<InMemoryProductRepository>,
        audit: Arc<InMemoryAuditSink>,
        timings: Arc<RecordingTimingSink>,
    }

    fn fixture_with(registry: OperationRegistry) -> Fixture {
        let audit = Arc::new(InMemoryAuditSink::new());
        let timings = Arc::new(RecordingTimingSink::new());
        let interceptor = Interceptor::new(registry, AuditDispatcher::spawn(audit.clone()))
            .with_timing_sink(timings.clone());
        let service = CatalogService::new(
            InMemoryProductRepository::new(),
            Arc::new(AtomicMetrics::new()),
            SearchCache::new(16).unwrap(),
        );
        Fixture {
            catalog: InstrumentedCatalog::new(Arc::new(service), interceptor),
            audit,
            timings,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(catalog_operations())
    }

    #[tokio::test]
    async fn create_is_audited_under_the_callers_name() {
        let fx = fixture();
        let admin = StaticActor::new("admin");
        let saved = fx
            .catalog
            .create(
                &admin,
                Product::new("Kettle", "Bosch", Category::Home, 49.9).with_description("Electric"),
            )
            .await
            .unwrap();
        fx.catalog.interceptor.dispatcher().flush().await;

        let records = fx.audit.recent(10).await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].actor, "admin");
        assert_eq!(records[0].action, AuditAction::Create);
        assert_eq!(
            records[0].details,
            "method=create, args=[#- | Kettle (Bosch) | HOME | 49.90 | Electric]"
        );
        assert_eq!(saved.id, Some(1));
    }

    #[tokio::test]
    async fn reads_are_timed_but_not_audited() {
        let fx = fixture();
        let anyone = StaticActor::new("user");
        fx.catalog
            .search(&anyone, &SearchFilter::new().brand("bosch"))
            .await
            .unwrap();
        fx.catalog.list_all(&anyone).await.unwrap();
        fx.catalog.interceptor.dispatcher().flush().await;

        assert!(fx.audit.is_empty().await);
        let ops: Vec<_> = fx
            .timings
            .timings()
            .into_iter()
            .map(|t| t.operation)
            .collect();
        assert_eq!(ops, vec!["search", "list_all"]);
    }

    #[tokio::test]
    async fn failed_update_passes_the_error_through_unaudited() {
        let fx = fixture();
        let err = fx
            .catalog
            .update(
                &StaticActor::new("admin"),
                Product::new("Ghost", "None", Category::Other, 1.0).with_id(42),
            )
            .await
            .unwrap_err();
        assert_eq!(err, CatalogError::NotFound { id: Some(42) });
        fx.catalog.interceptor.dispatcher().flush().await;
        assert!(fx.audit.is_empty().await);
        assert!(!fx.timings.timings()[0].success);
    }

    #[tokio::test]
    async fn delete_with_failing_actor_is_recorded_anonymously() {
        let fx = fixture();
        let broken = || -> Result<Option<String>, ActorError> {
            Err(ActorError::Unavailable("no session".to_string()))
        };
        fx.catalog.delete(&broken, 7).await.unwrap();
        fx.catalog.interceptor.dispatcher().flush().await;

        let records = fx.audit.list(&AuditQuery::by_actor("-")).await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].details, "method=delete, args=[7]");
    }

    #[tokio::test]
    async fn unregistered_operation_is_a_wiring_error() {
        let fx = fixture_with(OperationRegistry::new());
        let err = fx.catalog.list_all(&StaticActor::new("x")).await.unwrap_err();
        assert_eq!(
            err,
            CatalogError::Wiring(InterceptError::OperationNotFound {
                component: CATALOG_COMPONENT.to_string(),
                operation: "list_all".to_string(),
            })
        );
        assert!(fx.timings.timings().is_empty());
    }
}
