//! Persisting history stacks through a [`Storage`] backend.

use super::HistoryEntry;
use crate::storage::{Storage, StorageError, StorageResult};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Prefix for every key this store writes.
pub const HISTORY_KEY_PREFIX: &str = "history-";

/// Current persisted format version.
pub const HISTORY_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct PersistedHistory {
    version: u32,
    entries: Vec<HistoryEntry>,
}

/// Saves, loads and migrates persisted histories.
pub struct HistoryStore<S: Storage> {
    storage: Arc<S>,
}

impl<S: Storage> Clone for HistoryStore<S> {
    fn clone(&self) -> Self {
        Self {
            storage: Arc::clone(&self.storage),
        }
    }
}

impl<S: Storage> HistoryStore<S> {
    pub fn new(storage: Arc<S>) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &Arc<S> {
        &self.storage
    }

    fn storage_key(key: &str) -> String {
        format!("{HISTORY_KEY_PREFIX}{key}")
    }

    /// Write the most recent `max_entries` of `entries` under `key`.
    pub async fn save(&self, key: &str, entries: &[HistoryEntry], max_entries: usize) -> StorageResult<()> {
        let skip = entries.len().saturating_sub(max_entries);
        self.write(&Self::storage_key(key), entries[skip..].to_vec()).await
    }

    /// Load the history saved under `key`. Returns `None` if nothing was saved.
    pub async fn load(&self, key: &str) -> StorageResult<Option<Vec<HistoryEntry>>> {
        self.read(&Self::storage_key(key)).await
    }

    pub async fn delete(&self, key: &str) -> StorageResult<()> {
        self.storage.delete(&Self::storage_key(key)).await
    }

    /// Keys (without prefix) of every saved history.
    pub async fn keys(&self) -> StorageResult<Vec<String>> {
        let mut keys: Vec<String> = self
            .storage
            .list()
            .await?
            .into_iter()
            .filter_map(|k| k.strip_prefix(HISTORY_KEY_PREFIX).map(str::to_string))
            .collect();
        keys.sort();
        Ok(keys)
    }

    /// Rewrite every saved entry through `transform`, keeping entry order.
    /// Returns the number of histories rewritten.
    pub async fn migrate<F>(&self, mut transform: F) -> StorageResult<usize>
    where
        F: FnMut(HistoryEntry) -> HistoryEntry,
    {
        let mut migrated = 0;
        for key in self.keys().await? {
            let storage_key = Self::storage_key(&key);
            let Some(entries) = self.read(&storage_key).await? else {
                continue;
            };
            let entries = entries.into_iter().map(&mut transform).collect();
            self.write(&storage_key, entries).await?;
            migrated += 1;
        }
        log::info!("Migrated {} persisted histories", migrated);
        Ok(migrated)
    }

    async fn read(&self, storage_key: &str) -> StorageResult<Option<Vec<HistoryEntry>>> {
        let Some(blob) = self.storage.get(storage_key).await? else {
            return Ok(None);
        };
        let persisted: PersistedHistory =
            serde_json::from_str(&blob).map_err(|e| StorageError::Serialization(e.to_string()))?;
        if persisted.version > HISTORY_FORMAT_VERSION {
            return Err(StorageError::Serialization(format!(
                "unsupported history version {}",
                persisted.version
            )));
        }
        Ok(Some(persisted.entries))
    }

    async fn write(&self, storage_key: &str, entries: Vec<HistoryEntry>) -> StorageResult<()> {
        let persisted = PersistedHistory {
            version: HISTORY_FORMAT_VERSION,
            entries,
        };
        let blob = serde_json::to_string(&persisted).map_err(|e| StorageError::Serialization(e.to_string()))?;
        self.storage.put(storage_key, blob).await.inspect_err(|e| {
            log::error!("Failed to persist history {}: {}", storage_key, e);
        })
    }
}
