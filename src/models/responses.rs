//! Response DTOs for the cache HTTP API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;

use crate::cache::{CacheStats, CacheUsage, PreloadOutcome};

/// Response body for PUT /cache
#[derive(Debug, Clone, Serialize)]
pub struct SetResponse {
    /// Success message
    pub message: String,
    /// The key that was cached
    pub key: String,
    /// Number of bytes stored
    pub bytes: usize,
}

impl SetResponse {
    pub fn new(key: impl Into<String>, bytes: usize) -> Self {
        let key = key.into();
        Self {
            message: format!("Key '{}' cached successfully", key),
            key,
            bytes,
        }
    }
}

/// Response body for POST /preload
#[derive(Debug, Clone, Serialize)]
pub struct PreloadResponse {
    /// The preloaded key
    pub key: String,
    /// "cached" when nothing was fetched, "fetched" otherwise
    pub status: &'static str,
    /// Bytes fetched, zero when already cached
    pub bytes: usize,
}

impl PreloadResponse {
    pub fn new(key: impl Into<String>, outcome: PreloadOutcome) -> Self {
        let (status, bytes) = match outcome {
            PreloadOutcome::AlreadyCached => ("cached", 0),
            PreloadOutcome::Fetched { bytes } => ("fetched", bytes),
        };
        Self {
            key: key.into(),
            status,
            bytes,
        }
    }
}

/// Response body for DELETE /cache
#[derive(Debug, Clone, Serialize)]
pub struct ClearResponse {
    /// Success message
    pub message: String,
}

impl ClearResponse {
    pub fn purged() -> Self {
        Self {
            message: "Cache purged".to_string(),
        }
    }
}

/// Response body for GET /stats
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    /// Number of cache hits
    pub hits: u64,
    /// Number of cache misses
    pub misses: u64,
    /// Number of evictions
    pub evictions: u64,
    /// Number of network fetches
    pub fetches: u64,
    /// Hit rate (hits / (hits + misses))
    pub hit_rate: f64,
    /// Documents currently tracked
    pub total_entries: usize,
    /// Bytes currently tracked
    pub total_bytes: u64,
    /// Budget in bytes
    pub budget_bytes: u64,
}

impl StatsResponse {
    /// Creates a new StatsResponse from counters and current usage
    pub fn new(stats: &CacheStats, usage: CacheUsage) -> Self {
        Self {
            hits: stats.hits,
            misses: stats.misses,
            evictions: stats.evictions,
            fetches: stats.fetches,
            hit_rate: stats.hit_rate(),
            total_entries: usage.entries,
            total_bytes: usage.total_bytes,
            budget_bytes: usage.budget_bytes,
        }
    }
}

/// Response body for PUT /settings/cache-size
#[derive(Debug, Clone, Serialize)]
pub struct SettingsResponse {
    /// Setting actually applied, after clamping
    pub megabytes: u64,
    /// Resulting budget in bytes
    pub budget_bytes: u64,
}

/// Response body for GET /health
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}
