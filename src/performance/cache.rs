//! Cache hit/miss counters
//!
//! Subsystems that front a cache (API responses, query results) own a
//! [`CacheCounters`] and record every lookup against it. The metric sources
//! read a [`CacheStats`] snapshot from the same counters.

use std::sync::atomic::{AtomicU64, Ordering};

/// Cache statistics for monitoring performance
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub total_requests: u64,
}

impl CacheStats {
    /// Ratio of hits to requests in `0.0..=1.0`; zero before the first request
    pub fn hit_rate(&self) -> f64 {
        if self.total_requests == 0 {
            0.0
        } else {
            self.hits as f64 / self.total_requests as f64
        }
    }

    /// Hit rate expressed as a percentage
    pub fn hit_rate_percent(&self) -> f64 {
        self.hit_rate() * 100.0
    }
}

/// Lock-free hit/miss counters shared between a cache and its metric source
#[derive(Debug, Default)]
pub struct CacheCounters {
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl CacheCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_eviction(&self) {
        self.evictions.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a lookup outcome
    pub fn record_lookup(&self, hit: bool) {
        if hit {
            self.record_hit();
        } else {
            self.record_miss();
        }
    }

    pub fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        CacheStats {
            hits,
            misses,
            evictions: self.evictions.load(Ordering::Relaxed),
            total_requests: hits + misses,
        }
    }

    /// Reset all counters (periodic rotation)
    pub fn reset(&self) {
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        self.evictions.store(0, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_counters_report_zero_hit_rate() {
        let counters = CacheCounters::new();
        let stats = counters.stats();
        assert_eq!(stats.total_requests, 0);
        assert_eq!(stats.hit_rate(), 0.0);
    }

    #[test]
    fn test_hit_rate_tracking() {
        let counters = CacheCounters::new();
        for _ in 0..17 {
            counters.record_lookup(true);
        }
        for _ in 0..3 {
            counters.record_lookup(false);
        }
        counters.record_eviction();

        let stats = counters.stats();
        assert_eq!(stats.hits, 17);
        assert_eq!(stats.misses, 3);
        assert_eq!(stats.evictions, 1);
        assert_eq!(stats.total_requests, 20);
        assert!((stats.hit_rate_percent() - 85.0).abs() < 1e-9);

        counters.reset();
        assert_eq!(counters.stats(), CacheStats::default());
    }
}
