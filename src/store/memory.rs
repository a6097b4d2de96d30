//! In-Memory Repository
//!
//! Record map plus one secondary index per grouping attribute, so grouped
//! lookups never scan the whole store. Expiration is enforced on read and
//! physically applied by [`MemoryRepository::purge_expired`].

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::cache::{current_timestamp_ms, CacheEntry, EntryProbe};
use crate::error::Result;
use crate::store::CacheRepository;

type GroupIndex = HashMap<String, HashSet<String>>;

// == Stored Record ==
#[derive(Debug, Clone)]
struct StoredRecord {
    entry: CacheEntry,
    /// Expiration timestamp (Unix milliseconds), None = no expiration
    expires_at: Option<u64>,
}

impl StoredRecord {
    /// Expired once the current time reaches the deadline.
    fn is_expired(&self, now: u64) -> bool {
        match self.expires_at {
            Some(expires) => now >= expires,
            None => false,
        }
    }
}

#[derive(Debug, Default)]
struct Inner {
    records: HashMap<String, StoredRecord>,
    by_logical_key: GroupIndex,
    by_cache_name: GroupIndex,
    by_node_cache_name: GroupIndex,
}

impl Inner {
    fn insert(&mut self, entry: CacheEntry, now: u64) {
        let storage_key = entry.storage_key.clone();
        self.remove(&storage_key);

        add_to(&mut self.by_logical_key, &entry.logical_key, &storage_key);
        add_to(&mut self.by_cache_name, &entry.cache_name, &storage_key);
        add_to(&mut self.by_node_cache_name, &entry.node_cache_name, &storage_key);

        let expires_at = entry.expires_at(now);
        self.records
            .insert(storage_key, StoredRecord { entry, expires_at });
    }

    fn remove(&mut self, storage_key: &str) -> Option<StoredRecord> {
        let record = self.records.remove(storage_key)?;
        let entry = &record.entry;

        remove_from(&mut self.by_logical_key, &entry.logical_key, storage_key);
        remove_from(&mut self.by_cache_name, &entry.cache_name, storage_key);
        remove_from(&mut self.by_node_cache_name, &entry.node_cache_name, storage_key);

        Some(record)
    }

    /// Live records of one group, ordered by storage key.
    fn group(&self, index: &GroupIndex, group: &str, now: u64) -> Vec<CacheEntry> {
        let Some(keys) = index.get(group) else {
            return Vec::new();
        };

        let mut entries: Vec<CacheEntry> = keys
            .iter()
            .filter_map(|key| self.records.get(key))
            .filter(|record| !record.is_expired(now))
            .map(|record| record.entry.clone())
            .collect();
        entries.sort_by(|a, b| a.storage_key.cmp(&b.storage_key));
        entries
    }

    /// Picks the narrowest index the probe allows, or the whole map.
    fn candidates<'a>(&'a self, probe: &EntryProbe) -> Vec<&'a StoredRecord> {
        let narrowed = [
            (&probe.logical_key, &self.by_logical_key),
            (&probe.node_cache_name, &self.by_node_cache_name),
            (&probe.cache_name, &self.by_cache_name),
        ]
        .into_iter()
        .find_map(|(field, index)| field.as_deref().map(|group| index.get(group)));

        match narrowed {
            Some(Some(keys)) => keys.iter().filter_map(|k| self.records.get(k)).collect(),
            Some(None) => Vec::new(),
            None => self.records.values().collect(),
        }
    }
}

fn add_to(index: &mut GroupIndex, group: &str, storage_key: &str) {
    index
        .entry(group.to_string())
        .or_default()
        .insert(storage_key.to_string());
}

fn remove_from(index: &mut GroupIndex, group: &str, storage_key: &str) {
    if let Some(keys) = index.get_mut(group) {
        keys.remove(storage_key);
        if keys.is_empty() {
            index.remove(group);
        }
    }
}

// == Memory Repository ==
/// Shared in-process entry store.
///
/// Wrap it in an `Arc` and hand the same instance to every node's caches to
/// simulate one external store.
#[derive(Debug, Default)]
pub struct MemoryRepository {
    inner: RwLock<Inner>,
}

impl MemoryRepository {
    // == Constructor ==
    /// Creates an empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    // == Purge Expired ==
    /// Removes all expired records.
    ///
    /// Returns the number of records removed.
    pub async fn purge_expired(&self) -> usize {
        let now = current_timestamp_ms();
        let mut inner = self.inner.write().await;

        let expired_keys: Vec<String> = inner
            .records
            .iter()
            .filter(|(_, record)| record.is_expired(now))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired_keys {
            inner.remove(key);
        }

        expired_keys.len()
    }

    // == Length ==
    /// Returns the number of physical records, expired ones included until purged.
    pub async fn len(&self) -> usize {
        self.inner.read().await.records.len()
    }

    // == Is Empty ==
    /// Returns true if the repository holds no records.
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.records.is_empty()
    }
}

#[async_trait]
impl CacheRepository for MemoryRepository {
    async fn find_by_id(&self, storage_key: &str) -> Result<Option<CacheEntry>> {
        let now = current_timestamp_ms();
        let inner = self.inner.read().await;

        Ok(inner
            .records
            .get(storage_key)
            .filter(|record| !record.is_expired(now))
            .map(|record| record.entry.clone()))
    }

    async fn save(&self, entry: CacheEntry) -> Result<()> {
        debug!("Saving record {}", entry.storage_key);
        self.inner
            .write()
            .await
            .insert(entry, current_timestamp_ms());
        Ok(())
    }

    async fn delete_by_id(&self, storage_key: &str) -> Result<()> {
        self.inner.write().await.remove(storage_key);
        Ok(())
    }

    async fn delete_all(&self, entries: &[CacheEntry]) -> Result<()> {
        let mut inner = self.inner.write().await;
        for entry in entries {
            inner.remove(&entry.storage_key);
        }
        Ok(())
    }

    async fn find_by_logical_key(&self, logical_key: &str) -> Result<Vec<CacheEntry>> {
        let inner = self.inner.read().await;
        Ok(inner.group(&inner.by_logical_key, logical_key, current_timestamp_ms()))
    }

    async fn find_by_cache_name(&self, cache_name: &str) -> Result<Vec<CacheEntry>> {
        let inner = self.inner.read().await;
        Ok(inner.group(&inner.by_cache_name, cache_name, current_timestamp_ms()))
    }

    async fn find_by_node_cache_name(&self, node_cache_name: &str) -> Result<Vec<CacheEntry>> {
        let inner = self.inner.read().await;
        Ok(inner.group(
            &inner.by_node_cache_name,
            node_cache_name,
            current_timestamp_ms(),
        ))
    }

    async fn count(&self, probe: &EntryProbe) -> Result<usize> {
        let now = current_timestamp_ms();
        let inner = self.inner.read().await;

        Ok(inner
            .candidates(probe)
            .into_iter()
            .filter(|record| !record.is_expired(now) && probe.matches(&record.entry))
            .count())
    }
}
