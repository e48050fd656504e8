//! Cache Module
//!
//! Byte-budgeted document cache with LRU eviction over a durable store.

mod entry;
mod manager;
mod stats;
mod tables;


// Re-export public types
pub use entry::{current_timestamp_ms, AccessClock, CacheMeta};
pub use manager::{
    validate_document_url, validate_key, CacheManager, PreloadOutcome, PruneReport,
};
pub use stats::{CacheStats, CacheUsage};
pub use tables::DocumentTables;

// == Public Constants ==
/// Partition holding document bytes
pub const BLOB_PARTITION: &str = "blob";

/// Partition holding size and recency records
pub const META_PARTITION: &str = "meta";

/// Schema version of the cache store
pub const STORE_VERSION: u32 = 1;

/// Maximum allowed key length in bytes
pub const MAX_KEY_LENGTH: usize = 2048;

/// Maximum accepted document size in bytes
pub const MAX_DOCUMENT_SIZE: usize = 1024 * 1024 * 1024; // 1 GiB
