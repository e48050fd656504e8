//! Store Module
//!
//! Durable, asynchronous, partitioned key/value storage. Every call is an
//! independent transaction; there is no cross-partition atomicity.

mod fs;
mod memory;

use async_trait::async_trait;

use crate::error::StoreError;

pub use fs::FsStore;
pub use memory::MemoryStore;

/// Result type for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

// == Store Trait ==
/// A named key/value store over a fixed set of partitions.
#[async_trait]
pub trait Store: Send + Sync {
    /// Name the store was opened with.
    fn name(&self) -> &str;

    /// Reads `key` from `partition`. A missing key is `Ok(None)`.
    async fn get(&self, partition: &str, key: &str) -> StoreResult<Option<Vec<u8>>>;

    /// Writes `value` under `key`.
    ///
    /// Without `force`, an existing key fails with [`StoreError::KeyExists`]
    /// and the stored value is left untouched. With `force`, the value is
    /// replaced.
    async fn set(&self, partition: &str, key: &str, value: Vec<u8>, force: bool)
        -> StoreResult<()>;

    /// Removes `key`. Removing a missing key succeeds.
    async fn delete(&self, partition: &str, key: &str) -> StoreResult<()>;

    /// Snapshot of the keys currently stored in `partition`.
    async fn keys(&self, partition: &str) -> StoreResult<Keys>;

    /// Deletes every key in `partition`, one at a time.
    ///
    /// Best-effort: the first failure aborts, keys removed before it stay removed.
    async fn clear(&self, partition: &str) -> StoreResult<()> {
        for key in self.keys(partition).await? {
            self.delete(partition, &key).await?;
        }
        Ok(())
    }
}

// == Keys ==
/// Finite, non-restartable snapshot of a partition's keys, in ascending order.
#[derive(Debug)]
pub struct Keys {
    inner: std::vec::IntoIter<String>,
}

impl Keys {
    pub(crate) fn new(mut keys: Vec<String>) -> Self {
        keys.sort_unstable();
        Self {
            inner: keys.into_iter(),
        }
    }
}

impl Iterator for Keys {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for Keys {}
