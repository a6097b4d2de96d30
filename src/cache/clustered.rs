//! Clustered Cache Module
//!
//! Map-like cache whose entries live in the shared store. Every node owns its
//! own physical copy of a key; reads see every node's copy, counts and scans
//! of owned entries see only the local node's.

use std::collections::HashSet;
use std::fmt::Display;
use std::hash::Hash;
use std::marker::PhantomData;
use std::str::FromStr;
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::cache::entry::{logical_key, node_cache_name, storage_key};
use crate::cache::{Aggregate, CacheEntry, EntryProbe, Lookup, ValueCodec, ValueMatch};
use crate::cluster::NodeId;
use crate::error::{CacheError, Result};
use crate::store::CacheRepository;

// == Cache Settings ==
/// Per-instance configuration handed over by the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheSettings {
    /// Advisory maximum size; not enforced
    pub max_size: i64,
    /// Time to live in milliseconds attached to every write; negative never expires
    pub max_lifetime: i64,
    /// Whether entries of a departed node are purged from this cache
    pub purgeable: bool,
}

impl CacheSettings {
    pub fn new(max_size: i64, max_lifetime: i64, purgeable: bool) -> Self {
        Self {
            max_size,
            max_lifetime,
            purgeable,
        }
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            max_size: -1,
            max_lifetime: -1,
            purgeable: true,
        }
    }
}

// == Builder ==
/// Assembles a [`ClusteredCache`] from its injected collaborators.
pub struct ClusteredCacheBuilder<K, V> {
    name: String,
    node_id: NodeId,
    settings: CacheSettings,
    singleton: bool,
    repository: Option<Arc<dyn CacheRepository>>,
    codec: Option<ValueCodec<V>>,
    _key: PhantomData<fn(K)>,
}

impl<K, V> ClusteredCacheBuilder<K, V> {
    pub fn settings(mut self, settings: CacheSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Marks the cache as holding one entry per key across the whole cluster.
    pub fn singleton(mut self, singleton: bool) -> Self {
        self.singleton = singleton;
        self
    }

    pub fn repository(mut self, repository: Arc<dyn CacheRepository>) -> Self {
        self.repository = Some(repository);
        self
    }

    pub fn codec(mut self, codec: ValueCodec<V>) -> Self {
        self.codec = Some(codec);
        self
    }

    // == Build ==
    /// Creates the cache.
    ///
    /// Fails immediately when the repository or codec is missing, so a
    /// half-wired cache never reaches a caller.
    pub fn build(self) -> Result<ClusteredCache<K, V>> {
        if self.name.is_empty() {
            return Err(CacheError::InvalidRequest(
                "Cache name cannot be empty".to_string(),
            ));
        }

        let repository = self.repository.ok_or_else(|| {
            CacheError::MissingContext(format!("no repository for cache {}", self.name))
        })?;
        let codec = self.codec.ok_or_else(|| {
            CacheError::MissingContext(format!("no value codec for cache {}", self.name))
        })?;

        debug!(
            "Created cache {} on node {} decoding {}",
            self.name,
            self.node_id,
            codec.target_type()
        );

        Ok(ClusteredCache {
            node_cache_name: node_cache_name(&self.name, &self.node_id),
            name: self.name,
            node_id: self.node_id,
            max_size: self.settings.max_size,
            max_lifetime: self.settings.max_lifetime,
            purgeable: self.settings.purgeable,
            singleton: self.singleton,
            repository,
            codec,
            _key: PhantomData,
        })
    }
}

// == Clustered Cache ==
/// One node's handle on a named, cluster-wide cache.
///
/// Holds no entries itself. Every operation translates into independent calls
/// on the shared repository; nothing is composed transactionally.
pub struct ClusteredCache<K, V> {
    name: String,
    node_id: NodeId,
    node_cache_name: String,
    max_size: i64,
    max_lifetime: i64,
    purgeable: bool,
    singleton: bool,
    repository: Arc<dyn CacheRepository>,
    codec: ValueCodec<V>,
    _key: PhantomData<fn(K)>,
}

impl<K, V> ClusteredCache<K, V> {
    /// Starts building the cache `name` as seen from `node_id`.
    pub fn builder(name: impl Into<String>, node_id: NodeId) -> ClusteredCacheBuilder<K, V> {
        ClusteredCacheBuilder {
            name: name.into(),
            node_id,
            settings: CacheSettings::default(),
            singleton: false,
            repository: None,
            codec: None,
            _key: PhantomData,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Renames the cache; later operations address the new name.
    pub fn rename(&mut self, name: impl Into<String>) {
        self.name = name.into();
        self.node_cache_name = node_cache_name(&self.name, &self.node_id);
    }

    pub fn node_id(&self) -> &NodeId {
        &self.node_id
    }

    pub fn max_cache_size(&self) -> i64 {
        self.max_size
    }

    pub fn set_max_cache_size(&mut self, max_size: i64) {
        self.max_size = max_size;
    }

    pub fn max_lifetime(&self) -> i64 {
        self.max_lifetime
    }

    pub fn set_max_lifetime(&mut self, max_lifetime: i64) {
        self.max_lifetime = max_lifetime;
    }

    pub fn is_node_cache_purgeable(&self) -> bool {
        self.purgeable
    }

    /// True when at most one entry per key may exist across the cluster.
    pub fn is_singleton_cross_cluster_cache(&self) -> bool {
        self.singleton
    }

    fn local_probe(&self) -> EntryProbe {
        EntryProbe::default()
            .cache_name(self.name.as_str())
            .node_cache_name(self.node_cache_name.as_str())
    }

    /// Entries `node_id` owns in this cache.
    async fn owned_entries(&self, node_id: &NodeId) -> Result<Vec<CacheEntry>> {
        let mut entries = self
            .repository
            .find_by_node_cache_name(&node_cache_name(&self.name, node_id))
            .await?;
        // node cache names of different caches can collide
        entries.retain(|entry| entry.cache_name == self.name);
        Ok(entries)
    }

    /// Every node's copy of `key` in this cache.
    async fn copies(&self, key: &str) -> Result<Vec<CacheEntry>> {
        let mut entries = self
            .repository
            .find_by_logical_key(&logical_key(&self.name, key))
            .await?;
        // logical keys of different caches can collide too
        entries.retain(|entry| entry.cache_name == self.name);
        Ok(entries)
    }

    // == Size ==
    /// Number of entries the local node owns in this cache.
    pub async fn size(&self) -> Result<usize> {
        self.repository.count(&self.local_probe()).await
    }

    // == Is Empty ==
    /// Returns true if the local node owns no entries in this cache.
    pub async fn is_empty(&self) -> Result<bool> {
        Ok(self.size().await? == 0)
    }

    // == Clear ==
    /// Deletes every entry the local node owns in this cache.
    ///
    /// Other nodes' entries are untouched.
    pub async fn clear(&self) -> Result<()> {
        let entries = self.owned_entries(&self.node_id).await?;
        debug!(
            "Clearing {} entries of cache {} on node {}",
            entries.len(),
            self.name,
            self.node_id
        );
        self.repository.delete_all(&entries).await
    }

    // == Purge Node ==
    /// Deletes every entry `node_id` owns in this cache.
    ///
    /// Invoked when `node_id` leaves the cluster. Does nothing when the cache
    /// is not purgeable or is a singleton cross-cluster cache.
    ///
    /// # Returns
    /// The number of entries removed.
    pub async fn purge_clustered_node_caches(&self, node_id: &NodeId) -> Result<usize> {
        if !self.purgeable || self.singleton {
            debug!(
                "Skipping purge of cache {} for node {} (purgeable={}, singleton={})",
                self.name, node_id, self.purgeable, self.singleton
            );
            return Ok(0);
        }

        info!("Purging cluster cache {} on node {}", self.name, node_id);
        let entries = self.owned_entries(node_id).await?;
        self.repository.delete_all(&entries).await?;
        Ok(entries.len())
    }
}

impl<K, V> ClusteredCache<K, V>
where
    K: Display,
    V: Aggregate,
{
    fn decode_stored(&self, entry: &CacheEntry) -> Option<V> {
        let Some(stored) = entry.value.as_deref() else {
            warn!("Entry {} holds no value", entry.storage_key);
            return None;
        };

        match self.codec.decode(stored) {
            Ok(value) => Some(value),
            Err(e) => {
                error!(
                    "Error deserializing cache entry {} as {}; returning none: {}",
                    entry.storage_key,
                    self.codec.target_type(),
                    e
                );
                None
            }
        }
    }

    /// Builds the local node's record for `key`, with an empty value when
    /// the payload cannot be encoded.
    fn entry_for(&self, key: &str, value: &V) -> CacheEntry {
        let encoded = match self.codec.encode(value) {
            Ok(encoded) => Some(encoded),
            Err(e) => {
                error!(
                    "Error serializing entry {} of cache {}; storing empty value: {}",
                    key, self.name, e
                );
                None
            }
        };

        CacheEntry::new(&self.name, &self.node_id, key, encoded, self.max_lifetime)
    }

    // == Get ==
    /// Looks `key` up across every node.
    ///
    /// # Returns
    /// - `None` if no node holds the key, or none of its copies can be decoded
    /// - `Lookup::Single` if exactly one node holds the key
    /// - `Lookup::Merged` with every decodable copy flattened together otherwise
    pub async fn get(&self, key: &K) -> Result<Option<Lookup<V>>> {
        let entries = self.copies(&key.to_string()).await?;

        match entries.as_slice() {
            [] => Ok(None),
            [entry] => Ok(self.decode_stored(entry).map(Lookup::Single)),
            _ => {
                debug!(
                    "Merging {} copies of {} in cache {}",
                    entries.len(),
                    key,
                    self.name
                );
                let decoded: Vec<V> = entries
                    .iter()
                    .filter_map(|entry| self.decode_stored(entry))
                    .collect();
                if decoded.is_empty() {
                    return Ok(None);
                }
                Ok(Some(Lookup::merge(decoded)))
            }
        }
    }

    // == Put ==
    /// Writes the local node's copy of `key`.
    ///
    /// Singleton caches first delete every node's copy of the key. The delete
    /// and the write are separate store calls.
    ///
    /// # Returns
    /// The value passed in.
    pub async fn put(&self, key: &K, value: V) -> Result<V> {
        let key = key.to_string();

        if self.singleton {
            let existing = self.copies(&key).await?;
            if !existing.is_empty() {
                debug!(
                    "Replacing {} existing copies of {} in singleton cache {}",
                    existing.len(),
                    key,
                    self.name
                );
                self.repository.delete_all(&existing).await?;
            }
        }

        self.repository.save(self.entry_for(&key, &value)).await?;
        Ok(value)
    }

    // == Put All ==
    /// Applies [`put`](Self::put) to every pair; earlier writes stay if a later one fails.
    pub async fn put_all(&self, entries: impl IntoIterator<Item = (K, V)>) -> Result<()> {
        for (key, value) in entries {
            self.put(&key, value).await?;
        }
        Ok(())
    }

    // == Remove ==
    /// Deletes the local node's copy of `key`.
    ///
    /// # Returns
    /// The decoded prior value, or `None` if the local node held no copy.
    pub async fn remove(&self, key: &K) -> Result<Option<V>> {
        let storage_key = storage_key(&self.name, &self.node_id, &key.to_string());

        match self.repository.find_by_id(&storage_key).await? {
            Some(entry) if entry.cache_name == self.name => {
                self.repository.delete_by_id(&storage_key).await?;
                Ok(self.decode_stored(&entry))
            }
            _ => Ok(None),
        }
    }

    // == Contains Key ==
    /// True when any node holds `key`.
    pub async fn contains_key(&self, key: &K) -> Result<bool> {
        let probe = EntryProbe::default()
            .cache_name(self.name.as_str())
            .logical_key(logical_key(&self.name, &key.to_string()));
        Ok(self.repository.count(&probe).await? > 0)
    }

    // == Contains Value ==
    /// True when any node's entry in this cache holds exactly the encoded `value`.
    ///
    /// A value that cannot be encoded matches entries whose value is absent.
    pub async fn contains_value(&self, value: &V) -> Result<bool> {
        let value_match = match self.codec.encode(value) {
            Ok(encoded) => ValueMatch::Equals(encoded),
            Err(e) => {
                warn!("Probe value for cache {} cannot be encoded: {}", self.name, e);
                ValueMatch::Absent
            }
        };

        let probe = EntryProbe::default()
            .cache_name(self.name.as_str())
            .value(value_match);
        Ok(self.repository.count(&probe).await? > 0)
    }

    // == Values ==
    /// Every decodable value of the cache, across all nodes.
    pub async fn values(&self) -> Result<Vec<V>> {
        let entries = self.repository.find_by_cache_name(&self.name).await?;
        Ok(entries
            .iter()
            .filter_map(|entry| self.decode_stored(entry))
            .collect())
    }
}

impl<K, V> ClusteredCache<K, V>
where
    K: Display + FromStr + Eq + Hash,
    V: Aggregate,
{
    fn parse_key(&self, entry: &CacheEntry) -> Option<K> {
        let parsed = entry.entry_key().and_then(|raw| raw.parse().ok());
        if parsed.is_none() {
            warn!(
                "Skipping entry {} of cache {}: key cannot be recovered",
                entry.storage_key, self.name
            );
        }
        parsed
    }

    // == Key Set ==
    /// Keys the local node owns in this cache.
    pub async fn key_set(&self) -> Result<HashSet<K>> {
        let entries = self.owned_entries(&self.node_id).await?;
        Ok(entries
            .iter()
            .filter_map(|entry| self.parse_key(entry))
            .collect())
    }

    // == Entry Set ==
    /// Key/value pairs the local node owns in this cache.
    pub async fn entry_set(&self) -> Result<Vec<(K, V)>> {
        let entries = self.owned_entries(&self.node_id).await?;
        Ok(entries
            .iter()
            .filter_map(|entry| Some((self.parse_key(entry)?, self.decode_stored(entry)?)))
            .collect())
    }
}
