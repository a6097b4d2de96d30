//! Cache Entry Module
//!
//! Defines the physical record shared by every node and the key scheme that
//! multiplexes cache name, owning node and entry key into one flat namespace.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::cluster::NodeId;

// == Key Scheme ==
/// Unique id of the record owned by `node_id` for `key`: cache + node + key.
pub fn storage_key(cache_name: &str, node_id: &NodeId, key: &str) -> String {
    format!("{}{}{}", cache_name, node_id, key)
}

/// Key shared by every node's copy of one logical entry: cache + key.
pub fn logical_key(cache_name: &str, key: &str) -> String {
    format!("{}{}", cache_name, key)
}

/// Grouping of all entries one node owns within one cache: cache + node.
pub fn node_cache_name(cache_name: &str, node_id: &NodeId) -> String {
    format!("{}{}", cache_name, node_id)
}

// == Cache Entry ==
/// One physical record in the shared store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    /// Globally unique record id
    pub storage_key: String,
    /// Indexed, shared by every node holding the same entry key
    pub logical_key: String,
    /// Indexed, shared by every entry of the cache
    pub cache_name: String,
    /// Indexed, shared by every entry one node owns in the cache
    pub node_cache_name: String,
    /// Encoded payload; None when encoding failed
    pub value: Option<String>,
    /// Time to live in milliseconds; None or negative never expires
    pub expiration: Option<i64>,
}

impl CacheEntry {
    // == Constructor ==
    /// Composes a record for `key` owned by `node_id` in `cache_name`.
    ///
    /// # Arguments
    /// * `cache_name` - Logical cache the entry belongs to
    /// * `node_id` - Owning cluster node
    /// * `key` - Display form of the entry key
    /// * `value` - Encoded payload, if encoding succeeded
    /// * `expiration` - Time to live in milliseconds
    pub fn new(
        cache_name: &str,
        node_id: &NodeId,
        key: &str,
        value: Option<String>,
        expiration: i64,
    ) -> Self {
        Self {
            storage_key: storage_key(cache_name, node_id, key),
            logical_key: logical_key(cache_name, key),
            cache_name: cache_name.to_string(),
            node_cache_name: node_cache_name(cache_name, node_id),
            value,
            expiration: Some(expiration),
        }
    }

    // == Entry Key ==
    /// Recovers the entry key by stripping the cache name from the logical key.
    pub fn entry_key(&self) -> Option<&str> {
        self.logical_key.strip_prefix(self.cache_name.as_str())
    }

    // == Expiry Deadline ==
    /// Absolute expiry time in Unix milliseconds for a record saved at `saved_at`.
    ///
    /// # Returns
    /// - `None` if the entry never expires (no expiration or a negative one)
    /// - `Some(deadline)` otherwise
    pub fn expires_at(&self, saved_at: u64) -> Option<u64> {
        match self.expiration {
            Some(ttl) if ttl >= 0 => Some(saved_at.saturating_add(ttl as u64)),
            _ => None,
        }
    }
}

// == Entry Probe ==
/// How a probe matches the `value` column.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ValueMatch {
    /// Any value, including absent
    #[default]
    Any,
    /// Only entries whose value is absent
    Absent,
    /// Only entries holding exactly this encoded value
    Equals(String),
}

/// Partial entry used for pattern counts. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryProbe {
    pub cache_name: Option<String>,
    pub logical_key: Option<String>,
    pub node_cache_name: Option<String>,
    pub value: ValueMatch,
}

impl EntryProbe {
    pub fn cache_name(mut self, cache_name: impl Into<String>) -> Self {
        self.cache_name = Some(cache_name.into());
        self
    }

    pub fn logical_key(mut self, logical_key: impl Into<String>) -> Self {
        self.logical_key = Some(logical_key.into());
        self
    }

    pub fn node_cache_name(mut self, node_cache_name: impl Into<String>) -> Self {
        self.node_cache_name = Some(node_cache_name.into());
        self
    }

    pub fn value(mut self, value: ValueMatch) -> Self {
        self.value = value;
        self
    }

    /// Checks every set field against `entry`.
    pub fn matches(&self, entry: &CacheEntry) -> bool {
        let field_matches =
            |probe: &Option<String>, actual: &str| probe.as_deref().map_or(true, |p| p == actual);

        let value_matches = match &self.value {
            ValueMatch::Any => true,
            ValueMatch::Absent => entry.value.is_none(),
            ValueMatch::Equals(expected) => entry.value.as_deref() == Some(expected.as_str()),
        };

        field_matches(&self.cache_name, &entry.cache_name)
            && field_matches(&self.logical_key, &entry.logical_key)
            && field_matches(&self.node_cache_name, &entry.node_cache_name)
            && value_matches
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or(0)
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    fn sample_entry(value: Option<&str>) -> CacheEntry {
        CacheEntry::new(
            "Roster",
            &NodeId::new("node-a"),
            "alice",
            value.map(str::to_string),
            60_000,
        )
    }

    #[test]
    fn test_key_composition() {
        let entry = sample_entry(Some("\"v\""));

        assert_eq!(entry.storage_key, "Rosternode-aalice");
        assert_eq!(entry.logical_key, "Rosteralice");
        assert_eq!(entry.cache_name, "Roster");
        assert_eq!(entry.node_cache_name, "Rosternode-a");
        assert_eq!(entry.expiration, Some(60_000));
    }

    #[test]
    fn test_entry_key_strips_cache_name() {
        let entry = sample_entry(None);
        assert_eq!(entry.entry_key(), Some("alice"));
    }

    #[test]
    fn test_expires_at() {
        let entry = sample_entry(None);
        assert_eq!(entry.expires_at(1_000), Some(61_000));

        let mut forever = sample_entry(None);
        forever.expiration = Some(-1);
        assert_eq!(forever.expires_at(1_000), None);

        forever.expiration = None;
        assert_eq!(forever.expires_at(1_000), None);
    }

    #[test]
    fn test_persisted_layout_is_camel_case() {
        let json = serde_json::to_value(sample_entry(Some("x"))).unwrap();

        for field in [
            "storageKey",
            "logicalKey",
            "cacheName",
            "nodeCacheName",
            "value",
            "expiration",
        ] {
            assert!(json.get(field).is_some(), "missing field {}", field);
        }
    }

    #[test]
    fn test_probe_defaults_match_everything() {
        assert!(EntryProbe::default().matches(&sample_entry(None)));
        assert!(EntryProbe::default().matches(&sample_entry(Some("x"))));
    }

    #[test]
    fn test_probe_fields() {
        let entry = sample_entry(Some("\"v\""));

        assert!(EntryProbe::default()
            .cache_name("Roster")
            .node_cache_name("Rosternode-a")
            .matches(&entry));
        assert!(!EntryProbe::default()
            .node_cache_name("Rosternode-b")
            .matches(&entry));
        assert!(EntryProbe::default()
            .logical_key("Rosteralice")
            .matches(&entry));
    }

    #[test]
    fn test_probe_value_matching() {
        let present = sample_entry(Some("\"v\""));
        let absent = sample_entry(None);

        let equals = EntryProbe::default().value(ValueMatch::Equals("\"v\"".to_string()));
        assert!(equals.matches(&present));
        assert!(!equals.matches(&absent));

        let missing = EntryProbe::default().value(ValueMatch::Absent);
        assert!(missing.matches(&absent));
        assert!(!missing.matches(&present));
    }
}
