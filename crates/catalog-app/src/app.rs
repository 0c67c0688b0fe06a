//! Wiring: repository, cache, metrics, interceptor and audit log assembled from config.

use crate::config::CatalogConfig;
use catalog_cache::CacheError;
use catalog_instrument::{AuditDispatcher, InMemoryAuditSink, Interceptor, JsonlAuditSink};
use catalog_service::{
    auth_operations, catalog_operations, AtomicMetrics, AuthService, CatalogService,
    InMemoryProductRepository, InstrumentedCatalog, SearchCache,
};
use catalog_types::{
    AuditQuery, AuditRecord, AuditSink, AuditSinkError, CatalogError, Clock, Product, SystemClock,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("cache: {0}")]
    Cache(#[from] CacheError),
    #[error("seed {}: {message}", .path.display())]
    Seed { path: PathBuf, message: String },
    #[error("catalog: {0}")]
    Catalog(#[from] CatalogError),
}

/// Where audit records end up; both variants can be read back.
pub enum AuditLog {
    Memory(Arc<InMemoryAuditSink>),
    Jsonl(Arc<JsonlAuditSink>),
}

impl AuditLog {
    fn sink(&self) -> Arc<dyn AuditSink + Send + Sync> {
        match self {
            AuditLog::Memory(s) => s.clone(),
            AuditLog::Jsonl(s) => s.clone(),
        }
    }

    pub async fn list(&self, query: &AuditQuery) -> Result<Vec<AuditRecord>, AuditSinkError> {
        match self {
            AuditLog::Memory(s) => Ok(s.list(query).await),
            AuditLog::Jsonl(s) => s.list(query).await,
        }
    }
}

/// The assembled application.
pub struct App {
    pub catalog: InstrumentedCatalog<InMemoryProductRepository>,
    pub auth: AuthService,
    audit_log: AuditLog,
    dispatcher: AuditDispatcher,
    clock: Arc<dyn Clock>,
}

impl App {
    /// Must run inside a tokio runtime (the audit worker is spawned here).
    pub async fn build(config: &CatalogConfig) -> Result<Self, AppError> {
        Self::build_with_clock(config, Arc::new(SystemClock)).await
    }

    /// Like [`App::build`], with one clock shared by search latency, call timing and every
    /// audit timestamp.
    pub async fn build_with_clock(
        config: &CatalogConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, AppError> {
        let products = match config.seed.as_deref() {
            Some(path) => load_seed(path).await?,
            None => Vec::new(),
        };
        let repo = InMemoryProductRepository::with_products(products);
        let service = CatalogService::new(
            repo,
            Arc::new(AtomicMetrics::new()),
            SearchCache::new(config.cache_size)?,
        )
        .with_clock(clock.clone());
        let count = service.refresh_entity_count().await?;

        let audit_log = match config.audit_log.as_deref() {
            Some(path) => AuditLog::Jsonl(Arc::new(JsonlAuditSink::new(path))),
            None => AuditLog::Memory(Arc::new(InMemoryAuditSink::new())),
        };
        let dispatcher = AuditDispatcher::spawn(audit_log.sink());
        let interceptor = Interceptor::new(
            catalog_operations().merge(auth_operations()),
            dispatcher.clone(),
        )
        .with_clock(clock.clone());

        tracing::info!(
            products = count,
            cache_size = config.cache_size,
            audit_log = ?config.audit_log,
            "catalog ready"
        );
        Ok(Self {
            catalog: InstrumentedCatalog::new(Arc::new(service), interceptor.clone()),
            auth: AuthService::with_default_users(interceptor),
            audit_log,
            dispatcher,
            clock,
        })
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Queue a record that does not come from an intercepted call.
    pub fn record(&self, record: AuditRecord) {
        self.dispatcher.dispatch(record);
    }

    /// Audit trail including every record dispatched before this call.
    pub async fn audit_trail(&self, query: &AuditQuery) -> Result<Vec<AuditRecord>, AuditSinkError> {
        self.dispatcher.flush().await;
        self.audit_log.list(query).await
    }

    /// Drain pending audit records.
    pub async fn shutdown(&self) {
        self.dispatcher.flush().await;
        tracing::info!("catalog stopped");
    }
}

async fn load_seed(path: &Path) -> Result<Vec<Product>, AppError> {
    let seed_error = |message: String| AppError::Seed {
        path: path.to_path_buf(),
        message,
    };
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| seed_error(e.to_string()))?;
    let products: Vec<Product> =
        serde_json::from_str(&content).map_err(|e| seed_error(e.to_string()))?;
    tracing::info!(path = %path.display(), count = products.len(), "seed loaded");
    Ok(products)
}
