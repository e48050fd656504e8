//! Document Tables
//!
//! The blob and meta partitions viewed as one table of cached documents.
//! The store has no cross-partition transactions, so the pairing is kept here:
//! blobs are written before their meta record and removed after it, and an
//! orphan on either side is treated as absent data rather than an error.

use std::sync::Arc;

use tracing::warn;

use crate::cache::{CacheMeta, BLOB_PARTITION, META_PARTITION};
use crate::store::{Keys, Store, StoreResult};

/// Paired access to the blob and meta partitions of a [`Store`].
#[derive(Clone)]
pub struct DocumentTables {
    store: Arc<dyn Store>,
}

impl DocumentTables {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Name of the underlying store.
    pub fn store_name(&self) -> &str {
        self.store.name()
    }

    pub async fn read_blob(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        self.store.get(BLOB_PARTITION, key).await
    }

    pub async fn has_meta(&self, key: &str) -> StoreResult<bool> {
        Ok(self.store.get(META_PARTITION, key).await?.is_some())
    }

    /// Reads a meta record. An undecodable record reads as absent.
    pub async fn read_meta(&self, key: &str) -> StoreResult<Option<CacheMeta>> {
        let Some(bytes) = self.store.get(META_PARTITION, key).await? else {
            return Ok(None);
        };
        match CacheMeta::decode(&bytes) {
            Ok(meta) => Ok(Some(meta)),
            Err(e) => {
                warn!(key, error = %e, "unreadable meta record");
                Ok(None)
            }
        }
    }

    /// Replaces the meta record for `meta.key`.
    pub async fn write_meta(&self, meta: &CacheMeta) -> StoreResult<()> {
        self.store
            .set(META_PARTITION, &meta.key, meta.encode()?, true)
            .await
    }

    // == Write Entry ==
    /// Replaces a document's bytes, then its meta record.
    pub async fn write_entry(
        &self,
        key: &str,
        bytes: Vec<u8>,
        accessed_at: i64,
    ) -> StoreResult<CacheMeta> {
        let meta = CacheMeta::new(key, bytes.len() as u64, accessed_at);
        self.store.set(BLOB_PARTITION, key, bytes, true).await?;
        self.write_meta(&meta).await?;
        Ok(meta)
    }

    // == Remove Entry ==
    /// Removes a document's meta record, then its bytes.
    pub async fn remove_entry(&self, key: &str) -> StoreResult<()> {
        self.store.delete(META_PARTITION, key).await?;
        self.store.delete(BLOB_PARTITION, key).await
    }

    /// Drops a meta record whose blob is gone. Returns whether one existed.
    pub async fn heal_missing_blob(&self, key: &str) -> StoreResult<bool> {
        if !self.has_meta(key).await? {
            return Ok(false);
        }
        warn!(key, "meta record without blob, removing");
        self.store.delete(META_PARTITION, key).await?;
        Ok(true)
    }

    // == Tracked ==
    /// Every readable meta record. Blobs without meta are not tracked.
    ///
    /// Undecodable meta records are removed so they stop counting toward
    /// the budget; the blob they described becomes an untracked orphan.
    pub async fn tracked(&self) -> StoreResult<Vec<CacheMeta>> {
        let mut records = Vec::new();

        for key in self.store.keys(META_PARTITION).await? {
            let Some(bytes) = self.store.get(META_PARTITION, &key).await? else {
                continue;
            };
            match CacheMeta::decode(&bytes) {
                Ok(meta) => records.push(meta),
                Err(e) => {
                    warn!(key = %key, error = %e, "dropping unreadable meta record");
                    self.store.delete(META_PARTITION, &key).await?;
                }
            }
        }

        Ok(records)
    }

    pub async fn blob_keys(&self) -> StoreResult<Keys> {
        self.store.keys(BLOB_PARTITION).await
    }

    pub async fn meta_keys(&self) -> StoreResult<Keys> {
        self.store.keys(META_PARTITION).await
    }

    // == Clear ==
    /// Empties both partitions, meta first.
    pub async fn clear(&self) -> StoreResult<()> {
        self.store.clear(META_PARTITION).await?;
        self.store.clear(BLOB_PARTITION).await
    }
}
