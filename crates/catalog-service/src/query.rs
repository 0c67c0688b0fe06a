//! Filter validation, predicate evaluation and cache-key derivation.

use catalog_types::{CatalogError, Product, SearchFilter};

const DELIMITER: char = '|';
const ESCAPE: char = '\\';
/// Field value for an absent filter. Escaping never yields this sequence on its own.
const ABSENT: &str = "\\-";

/// Trimmed text filter; blank counts as absent.
fn normalized(value: Option<&String>) -> Option<&str> {
    value.map(|s| s.trim()).filter(|s| !s.is_empty())
}

/// Reject price bounds that cannot describe a range.
pub fn validate(filter: &SearchFilter) -> Result<(), CatalogError> {
    for (name, bound) in [("min_price", filter.min_price), ("max_price", filter.max_price)] {
        if let Some(v) = bound {
            if !v.is_finite() || v < 0.0 {
                return Err(CatalogError::Validation(format!(
                    "{} must be a non-negative number, got {}",
                    name, v
                )));
            }
        }
    }
    if let (Some(min), Some(max)) = (filter.min_price, filter.max_price) {
        if min > max {
            return Err(CatalogError::Validation(format!(
                "min_price {} exceeds max_price {}",
                min, max
            )));
        }
    }
    Ok(())
}

/// Conjunction of every present filter field.
pub fn matches(filter: &SearchFilter, product: &Product) -> bool {
    if let Some(q) = normalized(filter.text.as_ref()) {
        let q = q.to_lowercase();
        let in_name = product.name.to_lowercase().contains(&q);
        let in_description = product
            .description
            .as_deref()
            .is_some_and(|d| d.to_lowercase().contains(&q));
        if !in_name && !in_description {
            return false;
        }
    }
    if let Some(b) = normalized(filter.brand.as_ref()) {
        if !product.brand.to_lowercase().contains(&b.to_lowercase()) {
            return false;
        }
    }
    if let Some(category) = filter.category {
        if product.category != category {
            return false;
        }
    }
    if let Some(min) = filter.min_price {
        if product.price < min {
            return false;
        }
    }
    if let Some(max) = filter.max_price {
        if product.price > max {
            return false;
        }
    }
    if filter.only_active == Some(true) && !product.active {
        return false;
    }
    true
}

fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if c == ESCAPE || c == DELIMITER {
            out.push(ESCAPE);
        }
        out.push(c);
    }
    out
}

fn text_field(value: Option<&String>) -> String {
    normalized(value)
        .map(escape)
        .unwrap_or_else(|| ABSENT.to_string())
}

fn price_field(value: Option<f64>) -> String {
    // Adding +0.0 folds -0.0 into 0.0.
    value
        .map(|p| (p + 0.0).to_string())
        .unwrap_or_else(|| ABSENT.to_string())
}

/// Structural cache key: text, brand, category, min, max, only-active joined by `|`.
///
/// Filters that select the same products by construction (surrounding whitespace,
/// blank text, `only_active = false`) map to the same key.
pub fn cache_key(filter: &SearchFilter) -> String {
    let fields = [
        text_field(filter.text.as_ref()),
        text_field(filter.brand.as_ref()),
        filter
            .category
            .map(|c| c.as_str().to_string())
            .unwrap_or_else(|| ABSENT.to_string()),
        price_field(filter.min_price),
        price_field(filter.max_price),
        match filter.only_active {
            Some(true) => "true".to_string(),
            _ => ABSENT.to_string(),
        },
    ];
    fields.join(&DELIMITER.to_string())
}
