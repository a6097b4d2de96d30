//! Request DTOs for the admin API
//!
//! Defines the structure of incoming HTTP request bodies.

use serde::Deserialize;

use crate::cluster::DepartureReason;

/// Request body for reporting a departed node (POST /cluster/departures)
///
/// # Fields
/// - `node_id`: The cluster member that left
/// - `reason`: Graceful exit or liveness eviction (default: graceful)
#[derive(Debug, Clone, Deserialize)]
pub struct NodeDepartureRequest {
    /// The departed node
    pub node_id: String,
    /// Why the node left
    #[serde(default)]
    pub reason: DepartureReason,
}

impl NodeDepartureRequest {
    /// Validates the request data
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if self.node_id.trim().is_empty() {
            return Some("Node id cannot be empty".to_string());
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_departure_request_deserialize() {
        let json = r#"{"node_id": "node-2"}"#;
        let req: NodeDepartureRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.node_id, "node-2");
        assert_eq!(req.reason, DepartureReason::Graceful);
    }

    #[test]
    fn test_departure_request_with_reason() {
        let json = r#"{"node_id": "node-2", "reason": "evicted"}"#;
        let req: NodeDepartureRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.reason, DepartureReason::Evicted);
    }

    #[test]
    fn test_validate_empty_node_id() {
        let req = NodeDepartureRequest {
            node_id: "  ".to_string(),
            reason: DepartureReason::Graceful,
        };
        assert!(req.validate().is_some());
    }

    #[test]
    fn test_validate_valid_request() {
        let req = NodeDepartureRequest {
            node_id: "node-2".to_string(),
            reason: DepartureReason::Evicted,
        };
        assert!(req.validate().is_none());
    }
}
