//! Search filter and page request.

use crate::{CatalogError, Category};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Filter for catalog search. Every field is optional; absent fields do not constrain results.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchFilter {
    /// Case-insensitive substring of name or description.
    #[serde(default)]
    pub text: Option<String>,
    /// Case-insensitive substring of brand.
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub category: Option<Category>,
    /// Inclusive lower price bound.
    #[serde(default)]
    pub min_price: Option<f64>,
    /// Inclusive upper price bound.
    #[serde(default)]
    pub max_price: Option<f64>,
    /// When `Some(true)`, inactive products are excluded.
    #[serde(default)]
    pub only_active: Option<bool>,
}

impl SearchFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn brand(mut self, brand: impl Into<String>) -> Self {
        self.brand = Some(brand.into());
        self
    }

    pub fn category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }

    pub fn min_price(mut self, min: f64) -> Self {
        self.min_price = Some(min);
        self
    }

    pub fn max_price(mut self, max: f64) -> Self {
        self.max_price = Some(max);
        self
    }

    pub fn only_active(mut self, only_active: bool) -> Self {
        self.only_active = Some(only_active);
        self
    }
}

impl fmt::Display for SearchFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn opt<T: fmt::Display>(v: &Option<T>) -> String {
            v.as_ref().map(|x| x.to_string()).unwrap_or_else(|| "-".to_string())
        }
        write!(
            f,
            "text={}, brand={}, category={}, min={}, max={}, onlyActive={}",
            opt(&self.text),
            opt(&self.brand),
            opt(&self.category),
            opt(&self.min_price),
            opt(&self.max_price),
            opt(&self.only_active)
        )
    }
}

/// Validated zero-based page request.
///
/// Built from signed values so transport layers can pass raw input through;
/// `page < 0` and `size <= 0` are rejected rather than clamped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: usize,
    size: usize,
}

impl PageRequest {
    pub fn new(page: i64, size: i64) -> Result<Self, CatalogError> {
        if size <= 0 {
            return Err(CatalogError::Validation("size must be > 0".to_string()));
        }
        if page < 0 {
            return Err(CatalogError::Validation("page must be >= 0".to_string()));
        }
        let page = usize::try_from(page)
            .map_err(|_| CatalogError::Validation(format!("page out of range: {}", page)))?;
        let size = usize::try_from(size)
            .map_err(|_| CatalogError::Validation(format!("size out of range: {}", size)))?;
        Ok(Self { page, size })
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Index of the first item on this page; `None` when it does not fit in `usize`.
    pub fn offset(&self) -> Option<usize> {
        self.page.checked_mul(self.size)
    }
}

impl fmt::Display for PageRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "page={}, size={}", self.page, self.size)
    }
}
