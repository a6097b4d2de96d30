//! Response DTOs for the admin API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;

use crate::cluster::NodeId;

/// One live cache as seen from this node (GET /caches)
#[derive(Debug, Clone, Serialize)]
pub struct CacheSummary {
    /// Cache name
    pub name: String,
    /// Entries this node owns in the cache
    pub local_entries: usize,
    /// Whether a departed node's entries are purged
    pub purgeable: bool,
    /// Whether the cache holds one entry per key cluster-wide
    pub singleton: bool,
}

/// Response body for the cache listing (GET /caches)
#[derive(Debug, Clone, Serialize)]
pub struct CacheListResponse {
    /// The node answering
    pub node_id: NodeId,
    /// Live caches on this node
    pub caches: Vec<CacheSummary>,
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
    /// The node answering
    pub node_id: NodeId,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy(node_id: NodeId) -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            node_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_response_serialize() {
        let resp = HealthResponse::healthy(NodeId::new("node-1"));
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("healthy"));
        assert!(json.contains("timestamp"));
        assert!(json.contains("node-1"));
    }

    #[test]
    fn test_cache_list_serialize() {
        let resp = CacheListResponse {
            node_id: NodeId::new("node-1"),
            caches: vec![CacheSummary {
                name: "Roster".to_string(),
                local_entries: 3,
                purgeable: true,
                singleton: true,
            }],
        };
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["caches"][0]["name"], "Roster");
        assert_eq!(json["caches"][0]["local_entries"], 3);
        assert_eq!(json["node_id"], "node-1");
    }
}
