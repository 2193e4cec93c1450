//! Cache statistics and metrics tracking
//!
//! Counters for hit rates and teardown outcomes of resource caches.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Statistics for cache performance monitoring
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Current number of entries
    pub size: usize,

    /// Lookups served from the cache
    pub hits: u64,

    /// Lookups that had to create a new entry
    pub misses: u64,

    /// Total number of insert operations
    pub inserts: u64,

    /// Entries closed during teardown or release
    pub closed: u64,

    /// Closes that reported a failure
    pub close_failures: u64,
}

impl CacheStats {
    /// Calculate hit rate (hits / total accesses)
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Thread-safe metrics collector for cache operations
///
/// Atomic counters, so recording never takes a lock.
#[derive(Debug, Clone, Default)]
pub struct MetricsCollector {
    hits: Arc<AtomicU64>,
    misses: Arc<AtomicU64>,
    inserts: Arc<AtomicU64>,
    closed: Arc<AtomicU64>,
    close_failures: Arc<AtomicU64>,
}

impl MetricsCollector {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a cache hit
    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a cache miss
    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an insert operation
    pub fn record_insert(&self) {
        self.inserts.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a successful close of an entry
    pub fn record_close(&self) {
        self.closed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a close that failed
    pub fn record_close_failure(&self) {
        self.close_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Get current statistics snapshot
    pub fn snapshot(&self, size: usize) -> CacheStats {
        CacheStats {
            size,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            inserts: self.inserts.load(Ordering::Relaxed),
            closed: self.closed.load(Ordering::Relaxed),
            close_failures: self.close_failures.load(Ordering::Relaxed),
        }
    }

    /// Reset all metrics to zero
    pub fn reset(&self) {
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        self.inserts.store(0, Ordering::Relaxed);
        self.closed.store(0, Ordering::Relaxed);
        self.close_failures.store(0, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for cache::stats.
    use super::*;

    /// Validates `Default::default` behavior for the hit rate calculation
    /// scenario.
    ///
    /// Assertions:
    /// - Ensures `(stats.hit_rate() - 0.8).abs() < 1e-10` evaluates to true.
    #[test]
    fn test_hit_rate_calculation() {
        let stats = CacheStats { hits: 80, misses: 20, ..Default::default() };

        assert!((stats.hit_rate() - 0.8).abs() < 1e-10);
    }

    /// Validates `CacheStats::default` behavior for the hit rate no accesses
    /// scenario.
    ///
    /// Assertions:
    /// - Confirms `stats.hit_rate()` equals `0.0`.
    #[test]
    fn test_hit_rate_no_accesses() {
        let stats = CacheStats::default();
        assert_eq!(stats.hit_rate(), 0.0);
    }

    /// Validates `MetricsCollector::new` behavior for the metrics collector
    /// record operations scenario.
    ///
    /// Assertions:
    /// - Confirms every counter reflects one recorded event.
    /// - Confirms `stats.size` equals the size passed to `snapshot`.
    #[test]
    fn test_metrics_collector_record_operations() {
        let collector = MetricsCollector::new();

        collector.record_hit();
        collector.record_miss();
        collector.record_insert();
        collector.record_close();
        collector.record_close_failure();

        let stats = collector.snapshot(5);

        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.inserts, 1);
        assert_eq!(stats.closed, 1);
        assert_eq!(stats.close_failures, 1);
        assert_eq!(stats.size, 5);
    }

    /// Validates `MetricsCollector::reset` behavior.
    ///
    /// Assertions:
    /// - Confirms counters return to zero after reset.
    #[test]
    fn test_metrics_collector_reset() {
        let collector = MetricsCollector::new();
        collector.record_hit();
        collector.record_close_failure();

        collector.reset();

        assert_eq!(collector.snapshot(0), CacheStats::default());
    }

    /// Validates `MetricsCollector::clone` behavior for the shared counter
    /// scenario.
    ///
    /// Assertions:
    /// - Confirms both clones observe the same count.
    #[test]
    fn test_metrics_collector_clone() {
        let collector1 = MetricsCollector::new();
        collector1.record_hit();

        let collector2 = collector1.clone();
        collector2.record_hit();

        assert_eq!(collector1.snapshot(0).hits, 2);
        assert_eq!(collector2.snapshot(0).hits, 2);
    }

    /// Validates `Arc::new` behavior for the metrics collector thread safety
    /// scenario.
    ///
    /// Assertions:
    /// - Confirms `stats.hits` equals `1000`.
    #[test]
    fn test_metrics_collector_thread_safety() {
        use std::thread;

        let collector = Arc::new(MetricsCollector::new());
        let mut handles = vec![];

        for _ in 0..10 {
            let collector_clone = Arc::clone(&collector);
            handles.push(thread::spawn(move || {
                for _ in 0..100 {
                    collector_clone.record_hit();
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(collector.snapshot(0).hits, 1000);
    }
}
