//! Cluster Membership
//!
//! Keeps every live cache instance of this process and fans a node-departure
//! signal out to all of them. Detecting departures is left to the caller.

use std::fmt::Display;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::cache::{Aggregate, ClusteredCache};
use crate::cluster::NodeId;
use crate::error::Result;

// == Managed Cache ==
/// Type-erased view of a cache instance, as needed for membership handling.
#[async_trait]
pub trait ManagedCache: Send + Sync {
    fn cache_name(&self) -> &str;

    fn is_node_cache_purgeable(&self) -> bool;

    fn is_singleton_cross_cluster_cache(&self) -> bool;

    /// Entries the local node owns in the cache.
    async fn local_size(&self) -> Result<usize>;

    /// Deletes the entries `node_id` owns; returns how many were removed.
    async fn purge_clustered_node_caches(&self, node_id: &NodeId) -> Result<usize>;
}

#[async_trait]
impl<K, V> ManagedCache for ClusteredCache<K, V>
where
    K: Display + Send + Sync,
    V: Aggregate + Send + Sync,
{
    fn cache_name(&self) -> &str {
        self.name()
    }

    fn is_node_cache_purgeable(&self) -> bool {
        ClusteredCache::is_node_cache_purgeable(self)
    }

    fn is_singleton_cross_cluster_cache(&self) -> bool {
        ClusteredCache::is_singleton_cross_cluster_cache(self)
    }

    async fn local_size(&self) -> Result<usize> {
        self.size().await
    }

    async fn purge_clustered_node_caches(&self, node_id: &NodeId) -> Result<usize> {
        ClusteredCache::purge_clustered_node_caches(self, node_id).await
    }
}

// == Departure Reason ==
/// Why a node left the cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DepartureReason {
    /// The node shut down cleanly
    #[default]
    Graceful,
    /// The node stopped answering and was evicted
    Evicted,
}

// == Purge Report ==
/// Outcome of purging a departed node from every live cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PurgeReport {
    pub node_id: NodeId,
    pub caches_visited: usize,
    pub entries_removed: usize,
}

// == Cluster Membership ==
/// Registry of the live cache instances of one node process.
pub struct ClusterMembership {
    local_node: NodeId,
    caches: RwLock<Vec<Arc<dyn ManagedCache>>>,
}

impl ClusterMembership {
    pub fn new(local_node: NodeId) -> Self {
        Self {
            local_node,
            caches: RwLock::new(Vec::new()),
        }
    }

    pub fn local_node(&self) -> &NodeId {
        &self.local_node
    }

    /// Starts delivering departure signals to `cache`.
    pub async fn track(&self, cache: Arc<dyn ManagedCache>) {
        info!("Tracking cache {} for membership changes", cache.cache_name());
        self.caches.write().await.push(cache);
    }

    /// Snapshot of the tracked caches.
    pub async fn caches(&self) -> Vec<Arc<dyn ManagedCache>> {
        self.caches.read().await.clone()
    }

    // == Node Left ==
    /// Purges `node_id` from every tracked cache.
    ///
    /// Caches that are not purgeable, and singleton caches, keep their entries.
    /// The first store failure aborts the fan-out and is returned.
    pub async fn node_left(&self, node_id: &NodeId, reason: DepartureReason) -> Result<PurgeReport> {
        if node_id == &self.local_node {
            warn!("Local node {} reported as departed; purging its entries", node_id);
        }
        info!("Node {} left the cluster ({:?})", node_id, reason);

        let caches = self.caches().await;
        let mut entries_removed = 0;
        for cache in &caches {
            entries_removed += cache.purge_clustered_node_caches(node_id).await?;
        }

        info!(
            "Purged {} entries of node {} across {} caches",
            entries_removed,
            node_id,
            caches.len()
        );

        Ok(PurgeReport {
            node_id: node_id.clone(),
            caches_visited: caches.len(),
            entries_removed,
        })
    }
}
