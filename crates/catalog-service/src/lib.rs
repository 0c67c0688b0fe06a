//! Catalog search service: filtered, paginated queries memoized in an LRU cache,
//! wholesale invalidation on mutation, and interceptor-wrapped entry points.

mod auth;
mod catalog;
mod instrumented;
mod metrics;
mod query;
mod repository;

pub use auth::{auth_operations, AuthService, Session, AUTH_COMPONENT};
pub use catalog::{paginate, CatalogService, SearchCache};
pub use instrumented::{catalog_operations, InstrumentedCatalog, CATALOG_COMPONENT};
pub use metrics::AtomicMetrics;
pub use query::{cache_key, matches, validate};
pub use repository::InMemoryProductRepository;
