//! Cache Manager Module
//!
//! Budgeted document cache over the blob and meta partitions: reads refresh
//! recency, writes prune least-recently-accessed documents until the tracked
//! total fits the configured budget.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info};

use crate::cache::{
    AccessClock, CacheMeta, CacheStats, CacheUsage, DocumentTables, BLOB_PARTITION,
    MAX_KEY_LENGTH, META_PARTITION, STORE_VERSION,
};
use crate::config::Config;
use crate::error::{CacheError, PreloadError, Result};
use crate::fetch::{Fetcher, HttpFetcher};
use crate::settings::BudgetSource;
use crate::store::{FsStore, Store};

type PreloadGate = Arc<tokio::sync::Mutex<()>>;

// == Prune Report ==
/// Outcome of one eviction pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PruneReport {
    /// Evicted keys, oldest first
    pub evicted: Vec<String>,
    /// Tracked bytes left after the pass
    pub remaining_bytes: u64,
    /// Budget the pass enforced
    pub budget_bytes: u64,
}

// == Preload Outcome ==
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreloadOutcome {
    /// A non-empty copy was already cached; nothing was fetched
    AlreadyCached,
    /// The document was fetched and cached
    Fetched { bytes: usize },
}

// == Cache Manager ==
/// Byte-budgeted, LRU-evicting document cache.
pub struct CacheManager {
    tables: DocumentTables,
    budget: Arc<dyn BudgetSource>,
    fetcher: Arc<dyn Fetcher>,
    clock: AccessClock,
    stats: Mutex<CacheStats>,
    preload_gates: Mutex<HashMap<String, PreloadGate>>,
}

impl CacheManager {
    // == Constructor ==
    /// Creates a manager over an opened store holding the blob and meta partitions.
    pub fn new(
        store: Arc<dyn Store>,
        budget: Arc<dyn BudgetSource>,
        fetcher: Arc<dyn Fetcher>,
    ) -> Self {
        Self {
            tables: DocumentTables::new(store),
            budget,
            fetcher,
            clock: AccessClock::new(),
            stats: Mutex::new(CacheStats::new()),
            preload_gates: Mutex::new(HashMap::new()),
        }
    }

    /// Opens the durable store and HTTP fetcher described by `config`.
    pub async fn from_config(config: &Config, budget: Arc<dyn BudgetSource>) -> Result<Self> {
        let store = FsStore::open(
            &config.cache_dir,
            &config.store_name,
            &[BLOB_PARTITION, META_PARTITION],
            STORE_VERSION,
        )
        .await?;
        let fetcher = HttpFetcher::new(Duration::from_secs(config.fetch_timeout))?;

        Ok(Self::new(Arc::new(store), budget, Arc::new(fetcher)))
    }

    /// The paired blob/meta partitions backing this cache.
    pub fn tables(&self) -> &DocumentTables {
        &self.tables
    }

    // == Get ==
    /// Returns the cached bytes for `key`, refreshing its recency.
    ///
    /// A miss is `Ok(None)`; nothing is fetched.
    ///
    /// The meta record is rewritten after the blob is read. A prune evicting
    /// the same key in between leaves a meta record without a blob; it counts
    /// against the budget until the next read of that key removes it.
    pub async fn get_cache(&self, key: &str) -> Result<Option<Vec<u8>>> {
        validate_key(key)?;

        let Some(bytes) = self.tables.read_blob(key).await? else {
            self.tables.heal_missing_blob(key).await?;
            self.stats().record_miss();
            debug!(key, "cache miss");
            return Ok(None);
        };

        let meta = CacheMeta::new(key, bytes.len() as u64, self.clock.tick());
        self.tables.write_meta(&meta).await?;
        self.stats().record_hit();
        debug!(key, size = meta.size, "cache hit");

        Ok(Some(bytes))
    }

    // == Set ==
    /// Caches `bytes` under `key`, replacing any previous copy, then prunes.
    ///
    /// The written document is never evicted by its own prune pass.
    pub async fn set_cache(&self, key: &str, bytes: Vec<u8>) -> Result<()> {
        validate_key(key)?;

        let meta = self
            .tables
            .write_entry(key, bytes, self.clock.tick())
            .await?;
        debug!(key, size = meta.size, "cached document");

        self.prune_protecting(Some(key)).await?;
        Ok(())
    }

    // == Preload ==
    /// Makes sure `key` is cached, fetching it if there is no non-empty copy.
    ///
    /// The key must be an absolute `http`/`https` URL. Concurrent preloads of
    /// one key run one at a time, so only the first fetches and the rest find
    /// it cached. Failures are returned, never retried.
    pub async fn preload(&self, key: &str) -> Result<PreloadOutcome> {
        validate_document_url(key)?;

        let gate = self.preload_gate(key);
        let outcome = {
            let _held = gate.lock().await;
            self.preload_exclusive(key).await
        };
        self.release_preload_gate(key, gate);

        outcome
    }

    async fn preload_exclusive(&self, key: &str) -> Result<PreloadOutcome> {
        if let Some(bytes) = self.get_cache(key).await? {
            if !bytes.is_empty() {
                debug!(key, "preload skipped, already cached");
                return Ok(PreloadOutcome::AlreadyCached);
            }
        }

        self.stats().record_fetch();
        let document = self.fetcher.fetch(key).await?;

        if !document.is_success() {
            return Err(PreloadError::Status {
                key: key.to_string(),
                status: document.status,
            }
            .into());
        }
        if document.body.is_empty() {
            return Err(PreloadError::EmptyBody(key.to_string()).into());
        }

        let size = document.body.len();
        self.set_cache(key, document.body).await?;
        info!(key, size, "preloaded document");

        Ok(PreloadOutcome::Fetched { bytes: size })
    }

    fn preload_gate(&self, key: &str) -> PreloadGate {
        lock(&self.preload_gates)
            .entry(key.to_string())
            .or_default()
            .clone()
    }

    fn release_preload_gate(&self, key: &str, gate: PreloadGate) {
        let mut gates = lock(&self.preload_gates);
        // the map's handle plus ours means nobody else is waiting
        let idle = gates
            .get(key)
            .is_some_and(|held| Arc::ptr_eq(held, &gate) && Arc::strong_count(&gate) == 2);
        drop(gate);
        if idle {
            gates.remove(key);
        }
    }

    // == Prune ==
    /// Evicts least-recently-accessed documents until the tracked total is
    /// below the budget.
    ///
    /// The most recently accessed document is never evicted, even if it alone
    /// exceeds the budget. Equal stamps evict in ascending key order.
    pub async fn prune(&self) -> Result<PruneReport> {
        self.prune_protecting(None).await
    }

    async fn prune_protecting(&self, protected: Option<&str>) -> Result<PruneReport> {
        let budget_bytes = self.budget.budget_bytes();
        let mut records = self.tables.tracked().await?;

        records.sort_by(|a, b| {
            a.last_accessed
                .cmp(&b.last_accessed)
                .then_with(|| a.key.cmp(&b.key))
        });
        if let Some(newest) = records.last() {
            self.clock.observe(newest.last_accessed);
        }

        let newest = records.last().map(|meta| meta.key.clone());
        let mut total: u64 = records.iter().map(|meta| meta.size).sum();
        let mut evicted = Vec::new();

        for meta in &records {
            if total < budget_bytes {
                break;
            }
            if newest.as_deref() == Some(meta.key.as_str()) || protected == Some(meta.key.as_str())
            {
                continue;
            }

            self.tables.remove_entry(&meta.key).await?;
            total = total.saturating_sub(meta.size);
            evicted.push(meta.key.clone());
            debug!(key = %meta.key, size = meta.size, "evicted document");
        }

        if !evicted.is_empty() {
            self.stats().record_evictions(evicted.len());
            info!(
                evicted = evicted.len(),
                remaining_bytes = total,
                budget_bytes,
                "pruned cache"
            );
        }

        Ok(PruneReport {
            evicted,
            remaining_bytes: total,
            budget_bytes,
        })
    }

    // == Clear ==
    /// Removes every cached document. Not atomic across partitions.
    pub async fn clear(&self) -> Result<()> {
        self.tables.clear().await?;
        info!(store = self.tables.store_name(), "cache purged");
        Ok(())
    }

    // == Stats ==
    /// Counters since this manager was created.
    pub fn stats_snapshot(&self) -> CacheStats {
        self.stats().clone()
    }

    // == Usage ==
    /// Tracked documents and bytes against the current budget.
    pub async fn usage(&self) -> Result<CacheUsage> {
        let records = self.tables.tracked().await?;
        Ok(CacheUsage {
            entries: records.len(),
            total_bytes: records.iter().map(|meta| meta.size).sum(),
            budget_bytes: self.budget.budget_bytes(),
        })
    }

    fn stats(&self) -> MutexGuard<'_, CacheStats> {
        lock(&self.stats)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Rejects empty keys and keys over [`MAX_KEY_LENGTH`] bytes.
pub fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(CacheError::InvalidRequest("Key cannot be empty".to_string()));
    }
    if key.len() > MAX_KEY_LENGTH {
        return Err(CacheError::InvalidRequest(format!(
            "Key exceeds maximum length of {} bytes",
            MAX_KEY_LENGTH
        )));
    }
    Ok(())
}

/// Accepts keys that are absolute `http` or `https` URLs with a host.
///
/// Preload fetches its key, so nothing else may reach the fetcher.
pub fn validate_document_url(key: &str) -> Result<()> {
    validate_key(key)?;

    let url = reqwest::Url::parse(key)
        .map_err(|e| CacheError::InvalidRequest(format!("Key is not a valid URL: {e}")))?;
    if !matches!(url.scheme(), "http" | "https") || !url.has_host() {
        return Err(CacheError::InvalidRequest(format!(
            "Only http and https documents can be preloaded, got {}",
            url.scheme()
        )));
    }
    Ok(())
}
