//! API Handlers
//!
//! HTTP request handlers for the node admin endpoints.

use std::sync::Arc;

use axum::{extract::State, Json};
use tracing::info;

use crate::cluster::{ClusterMembership, NodeId, PurgeReport};
use crate::error::{CacheError, Result};
use crate::models::{CacheListResponse, CacheSummary, HealthResponse, NodeDepartureRequest};

/// Application state shared across all handlers.
///
/// Holds the membership hub, which knows every live cache of this node.
#[derive(Clone)]
pub struct AppState {
    pub membership: Arc<ClusterMembership>,
}

impl AppState {
    /// Creates a new AppState around the given membership hub.
    pub fn new(membership: ClusterMembership) -> Self {
        Self {
            membership: Arc::new(membership),
        }
    }
}

/// Handler for GET /health
///
/// Returns health status of the node.
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse::healthy(state.membership.local_node().clone()))
}

/// Handler for GET /caches
///
/// Lists every live cache with the number of entries this node owns in it.
pub async fn list_caches_handler(State(state): State<AppState>) -> Result<Json<CacheListResponse>> {
    let mut caches = Vec::new();

    for cache in state.membership.caches().await {
        caches.push(CacheSummary {
            name: cache.cache_name().to_string(),
            local_entries: cache.local_size().await?,
            purgeable: cache.is_node_cache_purgeable(),
            singleton: cache.is_singleton_cross_cluster_cache(),
        });
    }

    Ok(Json(CacheListResponse {
        node_id: state.membership.local_node().clone(),
        caches,
    }))
}

/// Handler for POST /cluster/departures
///
/// Purges a departed node's entries from every live cache.
pub async fn node_departure_handler(
    State(state): State<AppState>,
    Json(req): Json<NodeDepartureRequest>,
) -> Result<Json<PurgeReport>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    info!("Departure of node {} reported over HTTP", req.node_id);
    let report = state
        .membership
        .node_left(&NodeId::new(req.node_id.trim()), req.reason)
        .await?;

    Ok(Json(report))
}
