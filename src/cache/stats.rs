//! Cache Statistics Module
//!
//! Tracks cache performance metrics including hits, misses, evictions and fetches.

use serde::Serialize;

// == Cache Stats ==
/// Tracks cache performance metrics since process start.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheStats {
    /// Number of reads served from the cache
    pub hits: u64,
    /// Number of reads that found nothing
    pub misses: u64,
    /// Number of documents evicted by pruning
    pub evictions: u64,
    /// Number of network fetches issued by preloads
    pub fetches: u64,
}

impl CacheStats {
    // == Constructor ==
    /// Creates a new CacheStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Calculates the cache hit rate.
    ///
    /// Returns hits / (hits + misses), or 0.0 if no reads have been made.
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

    pub fn record_evictions(&mut self, count: usize) {
        self.evictions += count as u64;
    }

    pub fn record_fetch(&mut self) {
        self.fetches += 1;
    }
}

// == Cache Usage ==
/// Storage occupied by tracked documents against the current budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheUsage {
    /// Number of documents with a meta record
    pub entries: usize,
    /// Sum of tracked document sizes
    pub total_bytes: u64,
    /// Budget in effect when usage was computed
    pub budget_bytes: u64,
}
