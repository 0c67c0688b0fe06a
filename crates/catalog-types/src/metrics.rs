//! Point-in-time metrics view.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Copy of the metrics sink's counters. Fields are independent; no cross-field invariant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub last_query_latency_ms: u64,
    pub entity_count: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
}

impl fmt::Display for MetricsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- Metrics ---")?;
        writeln!(f, "products: {}", self.entity_count)?;
        writeln!(f, "lastQueryMs: {}", self.last_query_latency_ms)?;
        writeln!(
            f,
            "cache: hits={}, misses={}",
            self.cache_hits, self.cache_misses
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_operator_block() {
        let s = MetricsSnapshot {
            last_query_latency_ms: 3,
            entity_count: 4,
            cache_hits: 1,
            cache_misses: 2,
        };
        assert_eq!(
            s.to_string(),
            "--- Metrics ---\nproducts: 4\nlastQueryMs: 3\ncache: hits=1, misses=2\n"
        );
    }
}
