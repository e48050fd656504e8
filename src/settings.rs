//! Settings Module
//!
//! The cache size setting and the budget it yields. The budget is read on
//! every prune, so changing the setting takes effect on the next write.

use std::sync::atomic::{AtomicU64, Ordering};

/// Smallest accepted cache size setting, in megabytes.
pub const MIN_CACHE_SIZE_MB: u64 = 64;

/// Largest accepted cache size setting, in megabytes.
pub const MAX_CACHE_SIZE_MB: u64 = 1024;

/// Cache size used when nothing is configured, in megabytes.
pub const DEFAULT_CACHE_SIZE_MB: u64 = 256;

const BYTES_PER_MB: u64 = 1024 * 1024;

// == Budget Source ==
/// Supplies the maximum number of bytes the cache may retain.
pub trait BudgetSource: Send + Sync {
    fn budget_bytes(&self) -> u64;
}

/// Clamps a megabyte setting into the accepted range.
pub fn clamp_cache_size_mb(megabytes: u64) -> u64 {
    megabytes.clamp(MIN_CACHE_SIZE_MB, MAX_CACHE_SIZE_MB)
}

// == Cache Settings ==
/// Live, user-adjustable cache size setting.
#[derive(Debug)]
pub struct CacheSettings {
    cache_size_mb: AtomicU64,
}

impl CacheSettings {
    /// Creates settings with the given size, clamped.
    pub fn new(cache_size_mb: u64) -> Self {
        Self {
            cache_size_mb: AtomicU64::new(clamp_cache_size_mb(cache_size_mb)),
        }
    }

    /// Current setting in megabytes.
    pub fn cache_size_mb(&self) -> u64 {
        self.cache_size_mb.load(Ordering::Relaxed)
    }

    /// Stores a new setting and returns the clamped value actually kept.
    pub fn set_cache_size_mb(&self, megabytes: u64) -> u64 {
        let clamped = clamp_cache_size_mb(megabytes);
        self.cache_size_mb.store(clamped, Ordering::Relaxed);
        clamped
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_SIZE_MB)
    }
}

impl BudgetSource for CacheSettings {
    fn budget_bytes(&self) -> u64 {
        self.cache_size_mb() * BYTES_PER_MB
    }
}

// == Fixed Budget ==
/// A constant budget in bytes, not subject to the megabyte clamp.
#[derive(Debug, Clone, Copy)]
pub struct FixedBudget(pub u64);

impl BudgetSource for FixedBudget {
    fn budget_bytes(&self) -> u64 {
        self.0
    }
}
