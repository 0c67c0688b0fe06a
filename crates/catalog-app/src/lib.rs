//! Catalog kernel assembly: environment config, service wiring and the JSON-lines driver.

pub mod app;
pub mod config;
pub mod driver;

pub use app::{App, AppError, AuditLog};
pub use config::{CatalogConfig, ConfigError, DEFAULT_CACHE_SIZE};
pub use driver::{Command, Driver, DriverError, DEFAULT_PAGE_SIZE};
