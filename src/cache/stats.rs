//! Cache Statistics Module
//!
//! Tracks how intercepted requests were answered.

use serde::Serialize;

// == Cache Stats ==
/// Counters for the fetch handler.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheStats {
    /// Requests answered from the cache
    pub hits: u64,
    /// Requests that found nothing in the cache
    pub misses: u64,
    /// Network responses written into the cache
    pub stored: u64,
    /// Navigations answered with the cached index page while offline
    pub fallbacks: u64,
    /// Requests passed through without interception
    pub bypassed: u64,
    /// Current number of entries across all caches
    pub total_entries: usize,
}

impl CacheStats {
    // == Constructor ==
    /// Creates a new CacheStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Returns hits / (hits + misses), or 0.0 if nothing was intercepted.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn record_store(&mut self) {
        self.stored += 1;
    }

    pub fn record_fallback(&mut self) {
        self.fallbacks += 1;
    }

    pub fn record_bypass(&mut self) {
        self.bypassed += 1;
    }

    /// Updates the total entries count.
    pub fn set_total_entries(&mut self, count: usize) {
        self.total_entries = count;
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_new() {
        let stats = CacheStats::new();
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 0);
        assert_eq!(stats.stored, 0);
        assert_eq!(stats.total_entries, 0);
    }

    #[test]
    fn test_hit_rate_no_requests() {
        let stats = CacheStats::new();
        assert_eq!(stats.hit_rate(), 0.0);
    }

    #[test]
    fn test_hit_rate_mixed() {
        let mut stats = CacheStats::new();
        stats.record_hit();
        stats.record_miss();
        assert_eq!(stats.hit_rate(), 0.5);
    }

    #[test]
    fn test_bypass_not_counted_in_hit_rate() {
        let mut stats = CacheStats::new();
        stats.record_hit();
        stats.record_bypass();
        stats.record_bypass();
        assert_eq!(stats.hit_rate(), 1.0);
        assert_eq!(stats.bypassed, 2);
    }
}
