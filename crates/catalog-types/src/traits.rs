//! Collaborator traits and error types.

use crate::{AuditRecord, MetricsSnapshot, Product, ProductId};
use async_trait::async_trait;

/// Product storage abstraction. The core never assumes a storage medium.
#[async_trait]
pub trait ProductRepository: Send + Sync {
    /// Snapshot of every stored product.
    async fn find_all(&self) -> Result<Vec<Product>, RepositoryError>;

    async fn find_by_id(&self, id: ProductId) -> Result<Option<Product>, RepositoryError>;

    /// Insert or overwrite; assigns an id when `product.id` is `None`.
    async fn save(&self, product: Product) -> Result<Product, RepositoryError>;

    /// Returns `true` when a product was removed.
    async fn delete_by_id(&self, id: ProductId) -> Result<bool, RepositoryError>;

    /// Overwrite `product` only if its id is already stored; `Ok(None)` otherwise.
    ///
    /// The default is a lookup followed by a save. Stores that can do both under one lock
    /// should override it so a concurrent delete cannot be undone.
    async fn replace(&self, product: Product) -> Result<Option<Product>, RepositoryError> {
        let Some(id) = product.id else {
            return Ok(None);
        };
        if self.find_by_id(id).await?.is_none() {
            return Ok(None);
        }
        self.save(product).await.map(Some)
    }

    /// Persist buffered state. Storage that writes through needs nothing here.
    async fn flush(&self) -> Result<(), RepositoryError> {
        Ok(())
    }
}

/// Process-wide counters updated by the search and mutation paths.
///
/// Implementations must be readable concurrently without a surrounding lock.
pub trait MetricsSink: Send + Sync {
    fn set_last_query_latency(&self, ms: u64);

    fn set_entity_count(&self, n: u64);

    fn set_cache_stats(&self, hits: u64, misses: u64);

    fn snapshot(&self) -> MetricsSnapshot;
}

/// Destination for audit records. Callers treat appends as fire-and-forget.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn append(&self, record: AuditRecord) -> Result<(), AuditSinkError>;
}

/// Resolves who is performing the current call.
///
/// `Ok(None)`, a blank name and `Err` all resolve to the anonymous actor.
pub trait ActorProvider: Send + Sync {
    fn current_actor_name(&self) -> Result<Option<String>, ActorError>;
}

impl<F> ActorProvider for F
where
    F: Fn() -> Result<Option<String>, ActorError> + Send + Sync,
{
    fn current_actor_name(&self) -> Result<Option<String>, ActorError> {
        self()
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RepositoryError {
    #[error("repository error: {0}")]
    Other(String),
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AuditSinkError {
    #[error("audit sink error: {0}")]
    Other(String),
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ActorError {
    #[error("actor unavailable: {0}")]
    Unavailable(String),
}

/// Wiring failure in the interceptor: the operation is not registered for the component.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InterceptError {
    #[error("operation '{operation}' not found on component '{component}'")]
    OperationNotFound { component: String, operation: String },
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CatalogError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("product not found{}", .id.map(|i| format!(": {}", i)).unwrap_or_default())]
    NotFound { id: Option<ProductId> },
    #[error("repository: {0}")]
    Repository(#[from] RepositoryError),
    #[error("wiring: {0}")]
    Wiring(#[from] InterceptError),
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AuthError {
    #[error("invalid username or password")]
    InvalidCredentials,
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("wiring: {0}")]
    Wiring(#[from] InterceptError),
}
