//! Cluster Node Types
//!
//! Identifiers and payloads exchanged between cluster members through the
//! shared caches.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::cache::codec::{read_bool, read_str, write_bool, write_str, CodecResult, Externalizable};
use crate::error::CacheError;

// == Node Id ==
/// Identifier of one cluster member.
///
/// Its display form is spliced verbatim into storage keys, so two nodes must
/// never share the same text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    /// Creates a node id from its textual form.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

// == Domain Pair ==
/// Local/remote domain pair keying server-to-server routes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DomainPair {
    pub local: String,
    pub remote: String,
}

impl DomainPair {
    pub fn new(local: impl Into<String>, remote: impl Into<String>) -> Self {
        Self {
            local: local.into(),
            remote: remote.into(),
        }
    }
}

impl fmt::Display for DomainPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}", self.local, self.remote)
    }
}

impl FromStr for DomainPair {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.split_once('|')
            .map(|(local, remote)| Self::new(local, remote))
            .ok_or_else(|| CacheError::InvalidRequest(format!("not a domain pair: {}", s)))
    }
}

// == Client Route ==
/// Where a connected client session lives in the cluster.
///
/// Stored through its own binary layout rather than JSON.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientRoute {
    pub node_id: NodeId,
    pub available: bool,
}

impl ClientRoute {
    pub fn new(node_id: NodeId, available: bool) -> Self {
        Self { node_id, available }
    }
}

impl Externalizable for ClientRoute {
    fn write_external(&self, out: &mut Vec<u8>) -> CodecResult<()> {
        write_str(out, self.node_id.as_str());
        write_bool(out, self.available);
        Ok(())
    }

    fn read_external(input: &mut &[u8]) -> CodecResult<Self> {
        let node_id = NodeId::new(read_str(input)?);
        let available = read_bool(input)?;
        Ok(Self { node_id, available })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_id_serializes_as_string() {
        let json = serde_json::to_string(&NodeId::new("node-1")).unwrap();
        assert_eq!(json, "\"node-1\"");
    }

    #[test]
    fn test_domain_pair_parse_roundtrip() {
        let pair = DomainPair::new("example.org", "remote.example.com");
        let parsed: DomainPair = pair.to_string().parse().unwrap();
        assert_eq!(parsed, pair);
    }

    #[test]
    fn test_domain_pair_parse_invalid() {
        assert!("no-separator".parse::<DomainPair>().is_err());
    }

    #[test]
    fn test_client_route_binary_layout() {
        let route = ClientRoute::new(NodeId::new("ab"), true);
        let mut out = Vec::new();
        route.write_external(&mut out).unwrap();

        assert_eq!(out, vec![0, 0, 0, 2, b'a', b'b', 1]);

        let mut input = out.as_slice();
        assert_eq!(ClientRoute::read_external(&mut input).unwrap(), route);
        assert!(input.is_empty());
    }
}
