//! Filesystem store engine.
//!
//! Layout: `<root>/<name>/VERSION` plus one directory per partition. Each key
//! lives in its own file named by the SHA-256 of the key; the file starts with
//! the key itself (`u32` little-endian length, then UTF-8 bytes) followed by
//! the value. Writes go through a fsynced temporary file that is published
//! atomically, so a crash never leaves a half-written value behind.
//!
//! Files whose key header cannot be read are not records: listings skip
//! them, reads treat them as absent and `clear` removes them.

use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{debug, info, warn};

use super::{Keys, Store, StoreResult};
use crate::error::StoreError;

const VERSION_FILE: &str = "VERSION";
const TEMP_SUFFIX: &str = ".tmp";
const HEADER_LEN: usize = 4;

/// Durable [`Store`] backed by a directory tree.
#[derive(Debug)]
pub struct FsStore {
    name: String,
    dir: PathBuf,
    partitions: HashSet<String>,
    temp_seq: AtomicU64,
}

impl FsStore {
    // == Open ==
    /// Opens (creating if absent) the store `name` under `root`.
    ///
    /// Existing partitions are kept as they are. Opening with a `version`
    /// older than the one recorded on disk fails with
    /// [`StoreError::VersionConflict`].
    pub async fn open(
        root: impl AsRef<Path>,
        name: &str,
        partitions: &[&str],
        version: u32,
    ) -> StoreResult<Self> {
        let dir = root.as_ref().join(name);
        let open_err = |path: &Path| {
            let path = path.to_path_buf();
            move |source: std::io::Error| StoreError::Open { path, source }
        };

        fs::create_dir_all(&dir).await.map_err(open_err(&dir))?;

        let version_path = dir.join(VERSION_FILE);
        let found = match fs::read_to_string(&version_path).await {
            Ok(text) => Some(text.trim().parse::<u32>().map_err(|_| StoreError::Open {
                path: version_path.clone(),
                source: std::io::Error::new(ErrorKind::InvalidData, "unreadable store version"),
            })?),
            Err(e) if e.kind() == ErrorKind::NotFound => None,
            Err(e) => return Err(open_err(&version_path)(e)),
        };

        if let Some(found) = found {
            if found > version {
                return Err(StoreError::VersionConflict {
                    found,
                    requested: version,
                });
            }
        }

        for partition in partitions {
            let partition_dir = dir.join(partition);
            fs::create_dir_all(&partition_dir)
                .await
                .map_err(open_err(&partition_dir))?;
            sweep_temp_files(&partition_dir).await?;
        }

        if found != Some(version) {
            fs::write(&version_path, version.to_string())
                .await
                .map_err(open_err(&version_path))?;
            info!(store = name, from = ?found, to = version, "store schema upgraded");
        }

        info!(store = name, path = %dir.display(), "store opened");

        Ok(Self {
            name: name.to_string(),
            dir,
            partitions: partitions.iter().map(|p| p.to_string()).collect(),
            temp_seq: AtomicU64::new(0),
        })
    }

    /// Directory holding this store's files.
    pub fn path(&self) -> &Path {
        &self.dir
    }

    fn partition_dir(&self, partition: &str) -> StoreResult<PathBuf> {
        if self.partitions.contains(partition) {
            Ok(self.dir.join(partition))
        } else {
            Err(StoreError::UnknownPartition(partition.to_string()))
        }
    }

    fn key_path(&self, partition: &str, key: &str) -> StoreResult<PathBuf> {
        Ok(self.partition_dir(partition)?.join(file_name(key)))
    }

    /// Writes a record to a fresh temporary file in `dir` and syncs it.
    async fn write_temp(&self, dir: &Path, key: &str, value: &[u8]) -> StoreResult<PathBuf> {
        let seq = self.temp_seq.fetch_add(1, Ordering::Relaxed);
        let temp = dir.join(format!(
            ".{}.{}.{}{}",
            file_name(key),
            std::process::id(),
            seq,
            TEMP_SUFFIX
        ));

        let mut file = fs::File::create(&temp).await?;
        file.write_all(&encode_header(key)).await?;
        file.write_all(value).await?;
        file.sync_all().await?;

        Ok(temp)
    }
}

#[async_trait]
impl Store for FsStore {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get(&self, partition: &str, key: &str) -> StoreResult<Option<Vec<u8>>> {
        let path = self.key_path(partition, key)?;

        let mut data = match fs::read(&path).await {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let Some(stored_key) = decode_header(&data) else {
            warn!(partition, key, "unreadable key header, treating as absent");
            return Ok(None);
        };
        if stored_key != key {
            warn!(partition, key, stored_key, "file name collision, treating as absent");
            return Ok(None);
        }

        let offset = HEADER_LEN + stored_key.len();
        data.drain(..offset);
        Ok(Some(data))
    }

    async fn set(
        &self,
        partition: &str,
        key: &str,
        value: Vec<u8>,
        force: bool,
    ) -> StoreResult<()> {
        let dir = self.partition_dir(partition)?;
        let dest = dir.join(file_name(key));
        let temp = self.write_temp(&dir, key, &value).await?;

        let published = if force {
            // rename replaces the destination atomically
            fs::rename(&temp, &dest).await
        } else {
            // hard_link refuses to replace an existing destination
            let linked = fs::hard_link(&temp, &dest).await;
            let _ = fs::remove_file(&temp).await;
            linked
        };

        match published {
            Ok(()) => {
                debug!(partition, key, size = value.len(), force, "store write");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Err(StoreError::KeyExists {
                partition: partition.to_string(),
                key: key.to_string(),
            }),
            Err(e) => {
                let _ = fs::remove_file(&temp).await;
                Err(e.into())
            }
        }
    }

    async fn delete(&self, partition: &str, key: &str) -> StoreResult<()> {
        let path = self.key_path(partition, key)?;
        match fs::remove_file(&path).await {
            Ok(()) => {
                debug!(partition, key, "store delete");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn keys(&self, partition: &str) -> StoreResult<Keys> {
        let dir = self.partition_dir(partition)?;
        let mut entries = fs::read_dir(&dir).await?;
        let mut keys = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            if !is_record_file(&entry).await? {
                continue;
            }
            if let Some(key) = read_key(&entry.path()).await? {
                keys.push(key);
            }
        }

        Ok(Keys::new(keys))
    }

    /// Removes every record file in `partition`, including unreadable ones.
    ///
    /// Temporary files of in-flight writes are left alone. The first failure
    /// aborts; files removed before it stay removed.
    async fn clear(&self, partition: &str) -> StoreResult<()> {
        let dir = self.partition_dir(partition)?;
        let mut entries = fs::read_dir(&dir).await?;
        let mut removed = 0usize;

        while let Some(entry) = entries.next_entry().await? {
            if !is_record_file(&entry).await? {
                continue;
            }
            match fs::remove_file(entry.path()).await {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }

        debug!(partition, removed, "store cleared");
        Ok(())
    }
}

// == Record Encoding ==

fn file_name(key: &str) -> String {
    hex::encode(Sha256::digest(key.as_bytes()))
}

fn encode_header(key: &str) -> Vec<u8> {
    let mut header = Vec::with_capacity(HEADER_LEN + key.len());
    header.extend_from_slice(&(key.len() as u32).to_le_bytes());
    header.extend_from_slice(key.as_bytes());
    header
}

fn decode_header(data: &[u8]) -> Option<&str> {
    let len_bytes: [u8; HEADER_LEN] = data.get(..HEADER_LEN)?.try_into().ok()?;
    let len = u32::from_le_bytes(len_bytes) as usize;
    let key = data.get(HEADER_LEN..HEADER_LEN.checked_add(len)?)?;
    std::str::from_utf8(key).ok()
}

/// Regular, non-hidden files; hidden ones are temporary writes.
async fn is_record_file(entry: &fs::DirEntry) -> StoreResult<bool> {
    if entry.file_name().to_string_lossy().starts_with('.') {
        return Ok(false);
    }
    match entry.file_type().await {
        Ok(file_type) => Ok(file_type.is_file()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

/// Reads only the key header of a record file.
///
/// A file removed since listing, or one without a readable header, yields
/// `Ok(None)`.
async fn read_key(path: &Path) -> StoreResult<Option<String>> {
    let mut file = match fs::File::open(path).await {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let file_len = file.metadata().await?.len();

    let key = read_header(&mut file, file_len).await;
    if key.is_none() {
        warn!(file = %path.display(), "skipping file with unreadable key header");
    }
    Ok(key)
}

async fn read_header(file: &mut fs::File, file_len: u64) -> Option<String> {
    let mut len_bytes = [0u8; HEADER_LEN];
    file.read_exact(&mut len_bytes).await.ok()?;

    // the length is untrusted; it must fit inside the file
    let len = u64::from(u32::from_le_bytes(len_bytes));
    if HEADER_LEN as u64 + len > file_len {
        return None;
    }

    let mut key = vec![0u8; len as usize];
    file.read_exact(&mut key).await.ok()?;
    String::from_utf8(key).ok()
}

/// Removes temporary files left behind by interrupted writes.
async fn sweep_temp_files(dir: &Path) -> StoreResult<()> {
    let mut entries = fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name.starts_with('.') && name.ends_with(TEMP_SUFFIX) {
            warn!(file = %name, "removing interrupted write");
            fs::remove_file(entry.path()).await?;
        }
    }
    Ok(())
}
