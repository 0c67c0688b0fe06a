//! Lock-free metrics sink.

use catalog_types::{MetricsSink, MetricsSnapshot};
use std::sync::atomic::{AtomicU64, Ordering};

/// Each field is an independent atomic; readers never block writers.
#[derive(Debug, Default)]
pub struct AtomicMetrics {
    last_query_latency_ms: AtomicU64,
    entity_count: AtomicU64,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
}

impl AtomicMetrics {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MetricsSink for AtomicMetrics {
    fn set_last_query_latency(&self, ms: u64) {
        self.last_query_latency_ms.store(ms, Ordering::Relaxed);
    }

    fn set_entity_count(&self, n: u64) {
        self.entity_count.store(n, Ordering::Relaxed);
    }

    fn set_cache_stats(&self, hits: u64, misses: u64) {
        self.cache_hits.store(hits, Ordering::Relaxed);
        self.cache_misses.store(misses, Ordering::Relaxed);
    }

    fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            last_query_latency_ms: self.last_query_latency_ms.load(Ordering::Relaxed),
            entity_count: self.entity_count.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_reflects_latest_writes() {
        let m = AtomicMetrics::new();
        m.set_entity_count(4);
        m.set_last_query_latency(12);
        m.set_cache_stats(3, 5);
        m.set_entity_count(3);
        assert_eq!(
            m.snapshot(),
            MetricsSnapshot {
                last_query_latency_ms: 12,
                entity_count: 3,
                cache_hits: 3,
                cache_misses: 5,
            }
        );
    }
}
