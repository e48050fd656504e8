//! Cache Entry Module
//!
//! The per-document bookkeeping record and the clock that stamps it.

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::Utc;
use serde::{Deserialize, Serialize};

// == Cache Meta ==
/// Size and recency of one cached document, stored in the meta partition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheMeta {
    /// The document key (its resolved URL)
    pub key: String,
    /// Byte length of the cached document at write time
    pub size: u64,
    /// Last read or write (Unix milliseconds)
    pub last_accessed: i64,
}

impl CacheMeta {
    pub fn new(key: impl Into<String>, size: u64, last_accessed: i64) -> Self {
        Self {
            key: key.into(),
            size,
            last_accessed,
        }
    }

    /// Encodes the record for the meta partition.
    pub fn encode(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }

    /// Decodes a record read from the meta partition.
    pub fn decode(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }
}

// == Access Clock ==
/// Produces strictly increasing access stamps.
///
/// Each tick is the wall clock in milliseconds, or one past the previous
/// stamp if the wall clock has not moved on, so accesses made in the same
/// millisecond still order by call sequence.
#[derive(Debug, Default)]
pub struct AccessClock {
    last: AtomicI64,
}

impl AccessClock {
    pub fn new() -> Self {
        Self::default()
    }

    // == Tick ==
    /// Returns the next access stamp.
    pub fn tick(&self) -> i64 {
        let now = current_timestamp_ms();
        let previous = self
            .last
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(now.max(last + 1))
            })
            .unwrap_or_else(|last| last);
        now.max(previous + 1)
    }

    // == Observe ==
    /// Advances the clock past a stamp read back from storage.
    pub fn observe(&self, stamp: i64) {
        self.last.fetch_max(stamp, Ordering::SeqCst);
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> i64 {
    Utc::now().timestamp_millis()
}
