//! Store Module
//!
//! The shared entry store every cluster node reads from and writes to.
//!
//! # Backends
//! - [`MemoryRepository`]: in-process store with secondary indices and TTL
//!   enforcement, shared between cache instances through an `Arc`

mod memory;

use async_trait::async_trait;

use crate::cache::{CacheEntry, EntryProbe};
use crate::error::Result;

pub use memory::MemoryRepository;

// == Cache Repository ==
/// Flat CRUD and indexed query surface over the shared store.
///
/// Each call is expected to be atomic for a single record. Nothing is composed
/// transactionally across calls.
#[async_trait]
pub trait CacheRepository: Send + Sync {
    /// Looks up one record by its storage key.
    async fn find_by_id(&self, storage_key: &str) -> Result<Option<CacheEntry>>;

    /// Inserts or replaces the record at `entry.storage_key`.
    async fn save(&self, entry: CacheEntry) -> Result<()>;

    /// Deletes one record. Missing records are not an error.
    async fn delete_by_id(&self, storage_key: &str) -> Result<()>;

    /// Deletes every given record by storage key.
    async fn delete_all(&self, entries: &[CacheEntry]) -> Result<()>;

    /// Every node's copy of one logical entry.
    async fn find_by_logical_key(&self, logical_key: &str) -> Result<Vec<CacheEntry>>;

    /// Every entry of one cache, across all nodes.
    async fn find_by_cache_name(&self, cache_name: &str) -> Result<Vec<CacheEntry>>;

    /// Every entry one node owns in one cache.
    async fn find_by_node_cache_name(&self, node_cache_name: &str) -> Result<Vec<CacheEntry>>;

    /// Number of records matching every set field of `probe`.
    async fn count(&self, probe: &EntryProbe) -> Result<usize>;
}
