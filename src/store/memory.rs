//! In-memory store engine.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use super::{Keys, Store, StoreResult};
use crate::error::StoreError;

type Partition = BTreeMap<String, Vec<u8>>;

/// Volatile [`Store`] backed by one ordered map per partition.
#[derive(Debug)]
pub struct MemoryStore {
    name: String,
    partitions: RwLock<HashMap<String, Partition>>,
}

impl MemoryStore {
    /// Opens an empty store with the given partitions. Duplicate names collapse.
    pub fn open(name: impl Into<String>, partitions: &[&str]) -> Self {
        let partitions = partitions
            .iter()
            .map(|p| (p.to_string(), Partition::new()))
            .collect();

        Self {
            name: name.into(),
            partitions: RwLock::new(partitions),
        }
    }
}

#[async_trait]
impl Store for MemoryStore {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get(&self, partition: &str, key: &str) -> StoreResult<Option<Vec<u8>>> {
        let partitions = self.partitions.read().await;
        let table = partitions
            .get(partition)
            .ok_or_else(|| StoreError::UnknownPartition(partition.to_string()))?;
        Ok(table.get(key).cloned())
    }

    async fn set(
        &self,
        partition: &str,
        key: &str,
        value: Vec<u8>,
        force: bool,
    ) -> StoreResult<()> {
        let mut partitions = self.partitions.write().await;
        let table = partitions
            .get_mut(partition)
            .ok_or_else(|| StoreError::UnknownPartition(partition.to_string()))?;

        if !force && table.contains_key(key) {
            return Err(StoreError::KeyExists {
                partition: partition.to_string(),
                key: key.to_string(),
            });
        }

        debug!(partition, key, size = value.len(), "memory store write");
        table.insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, partition: &str, key: &str) -> StoreResult<()> {
        let mut partitions = self.partitions.write().await;
        let table = partitions
            .get_mut(partition)
            .ok_or_else(|| StoreError::UnknownPartition(partition.to_string()))?;
        table.remove(key);
        Ok(())
    }

    async fn keys(&self, partition: &str) -> StoreResult<Keys> {
        let partitions = self.partitions.read().await;
        let table = partitions
            .get(partition)
            .ok_or_else(|| StoreError::UnknownPartition(partition.to_string()))?;
        Ok(Keys::new(table.keys().cloned().collect()))
    }
}
