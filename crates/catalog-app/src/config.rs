//! Environment configuration, read once at startup.

use std::path::PathBuf;

pub const DEFAULT_CACHE_SIZE: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("CATALOG_CACHE_SIZE must be a positive integer, got '{0}'")]
    InvalidCacheSize(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogConfig {
    /// Capacity of the search cache (`CATALOG_CACHE_SIZE`).
    pub cache_size: usize,
    /// JSONL audit log (`CATALOG_AUDIT_LOG`); in-memory when unset.
    pub audit_log: Option<PathBuf>,
    /// JSON array of products loaded at startup (`CATALOG_SEED`).
    pub seed: Option<PathBuf>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            cache_size: DEFAULT_CACHE_SIZE,
            audit_log: None,
            seed: None,
        }
    }
}

impl CatalogConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let cache_size = match get("CATALOG_CACHE_SIZE") {
            Some(raw) => match raw.trim().parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => return Err(ConfigError::InvalidCacheSize(raw)),
            },
            None => DEFAULT_CACHE_SIZE,
        };

        Ok(Self {
            cache_size,
            audit_log: get("CATALOG_AUDIT_LOG").map(PathBuf::from),
            seed: get("CATALOG_SEED").map(PathBuf::from),
        })
    }
}
