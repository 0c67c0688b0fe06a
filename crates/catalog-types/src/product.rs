//! Catalog entity: Product and its Category.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Repository-assigned product identifier.
pub type ProductId = u64;

/// Product category. Matched exactly by search filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Category {
    Electronics,
    Clothing,
    Food,
    Sports,
    Books,
    Home,
    Toys,
    Other,
}

impl Category {
    pub const ALL: [Category; 8] = [
        Category::Electronics,
        Category::Clothing,
        Category::Food,
        Category::Sports,
        Category::Books,
        Category::Home,
        Category::Toys,
        Category::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Electronics => "ELECTRONICS",
            Category::Clothing => "CLOTHING",
            Category::Food => "FOOD",
            Category::Sports => "SPORTS",
            Category::Books => "BOOKS",
            Category::Home => "HOME",
            Category::Toys => "TOYS",
            Category::Other => "OTHER",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown category: {0}")]
pub struct UnknownCategory(pub String);

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Category::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| UnknownCategory(s.to_string()))
    }
}

fn default_active() -> bool {
    true
}

/// Catalog product. `id` is `None` until the repository stores it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    #[serde(default)]
    pub id: Option<ProductId>,
    pub name: String,
    pub brand: String,
    pub category: Category,
    pub price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default = "default_active")]
    pub active: bool,
}

impl Product {
    /// New, not yet stored, active product.
    pub fn new(
        name: impl Into<String>,
        brand: impl Into<String>,
        category: Category,
        price: f64,
    ) -> Self {
        Self {
            id: None,
            name: name.into(),
            brand: brand.into(),
            category,
            price,
            description: None,
            active: true,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_id(mut self, id: ProductId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }
}

impl fmt::Display for Product {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.id {
            Some(id) => write!(f, "#{}", id)?,
            None => f.write_str("#-")?,
        }
        write!(
            f,
            " | {} ({}) | {} | {:.2} | {}",
            self.name,
            self.brand,
            self.category,
            self.price,
            self.description.as_deref().unwrap_or("")
        )?;
        if !self.active {
            f.write_str(" [INACTIVE]")?;
        }
        Ok(())
    }
}
